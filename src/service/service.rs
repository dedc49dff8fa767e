use std::{any::Any, sync::Arc};

use async_trait::async_trait;
use waveroom_core::{Result, Server, utils::string::SplitInfallible};
use waveroom_database::Database;

use crate::services::OnceServices;

/// Abstract interface for a Service
#[async_trait]
pub(crate) trait Service: Any + Send + Sync {
	/// Implement the construction of the service instance. Services are
	/// generally singletons so expect this to only be called once for a
	/// service type. Failure will shutdown the server with an error.
	fn build(args: &Args<'_>) -> Result<Arc<impl Service>>
	where
		Self: Sized;

	/// Implement the service's worker loop. The service manager spawns a
	/// task and calls this function after all services have been built.
	async fn worker(self: Arc<Self>) -> Result { Ok(()) }

	/// Interrupt the service. This is sent to initiate a graceful shutdown.
	/// The service worker should return from its work loop.
	async fn interrupt(&self) {}

	/// Memory usage report in a markdown string.
	async fn memory_usage(&self, _out: &mut (dyn std::fmt::Write + Send)) -> Result { Ok(()) }

	/// Return the name of the service.
	/// i.e. `crate::service::make_name(std::module_path!())`
	fn name(&self) -> &str;
}

/// Args are passed to `Service::build` when a service is constructed. This
/// allows for arguments to change with limited impact to the many services.
pub(crate) struct Args<'a> {
	pub(crate) server: &'a Arc<Server>,
	pub(crate) db: &'a Arc<Database>,
	pub(crate) services: &'a Arc<OnceServices>,
}

/// Utility for service implementations; see Service::name() in the trait.
#[inline]
pub(crate) fn make_name(module_path: &str) -> &str { module_path.split_once_infallible("::").1 }
