use std::{
	ops::Deref,
	sync::{Arc, OnceLock},
};

use crate::Services;

/// Late-bound handle to the full Services container. Every service holds one
/// of these so construction order stops mattering; the container sets it
/// once at the end of build().
#[derive(Default)]
pub(crate) struct OnceServices {
	lock: OnceLock<Arc<Services>>,
}

impl OnceServices {
	pub(super) fn set(&self, services: Arc<Services>) -> Arc<Services> {
		self.lock.get_or_init(move || services).clone()
	}

	#[inline]
	pub(crate) fn get(&self) -> &Arc<Services> {
		self.lock
			.get()
			.expect("services must be initialized")
	}
}

impl Deref for OnceServices {
	type Target = Arc<Services>;

	#[inline]
	fn deref(&self) -> &Self::Target { self.get() }
}
