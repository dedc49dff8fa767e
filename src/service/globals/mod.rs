use std::sync::Arc;

use waveroom_core::{Result, Server, config::FeatureFlags, utils};

use crate::service;

pub struct Service {
	server: Arc<Server>,
}

impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self { server: args.server.clone() }))
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	/// Fresh identifier for a stored record.
	#[must_use]
	pub fn new_id(&self) -> String { utils::random_string(12) }

	/// Opaque token suitable for a session handle.
	#[must_use]
	pub fn new_token(&self) -> String { utils::random_string(32) }

	#[inline]
	#[must_use]
	pub fn server_name(&self) -> &str { &self.server.name }

	#[inline]
	#[must_use]
	pub fn features(&self) -> &FeatureFlags { &self.server.config.features }
}
