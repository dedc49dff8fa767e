use std::{path::PathBuf, sync::Arc};

use tokio::sync::Mutex;
use waveroom_core::{Error, Result, config::Config, implement, info, log::Log};
use waveroom_service::Services;

use crate::{clap, clap::Args, runtime};

/// Server runtime state; complete
pub struct Server {
	/// Server runtime state; public portion
	pub server: Arc<waveroom_core::Server>,

	pub services: Mutex<Option<Arc<Services>>>,
}

#[implement(Server)]
pub fn new(args: &Args, runtime: Option<&runtime::Handle>) -> Result<Arc<Self>, Error> {
	let _runtime_guard = runtime.map(runtime::Handle::enter);

	let config_paths = args
		.config
		.as_deref()
		.into_iter()
		.flat_map(<[_]>::iter)
		.map(PathBuf::as_path);

	let config = Config::load(config_paths)
		.and_then(|raw| clap::update(raw, args))
		.and_then(|raw| Config::new(&raw))?;

	let reload_handles = crate::logging::init(&config)?;

	config.check()?;

	info!(
		server_name = %config.server_name,
		log_levels = %config.log,
		"waveroom {}",
		env!("CARGO_PKG_VERSION"),
	);

	let logger = Log { reload: reload_handles };

	Ok(Arc::new(Self {
		server: Arc::new(waveroom_core::Server::new(config, runtime.cloned(), logger)),

		services: None.into(),
	}))
}
