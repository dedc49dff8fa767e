pub mod clap;
pub mod logging;
pub mod runtime;
pub mod server;
pub mod signals;

use std::sync::Arc;

use waveroom_core::{Result, debug_info, error};
use waveroom_service::Services;

pub use self::server::Server;

pub fn exec(server: &Arc<Server>, runtime: tokio::runtime::Runtime) -> Result {
	run(server, &runtime)?;
	runtime::shutdown(runtime);

	Ok(())
}

pub fn run(server: &Arc<Server>, runtime: &tokio::runtime::Runtime) -> Result {
	runtime.block_on(async_exec(server))
}

/// Operate the server normally. This will start, run and stop the server
/// within the asynchronous runtime.
#[tracing::instrument(
	name = "main",
	parent = None,
	skip_all
)]
pub async fn async_exec(server: &Arc<Server>) -> Result {
	server
		.server
		.runtime()
		.spawn(signals::enable(server.clone()));

	async_start(server).await?;
	async_run(server).await?;
	async_stop(server).await?;

	debug_info!("Exit runtime");
	Ok(())
}

#[tracing::instrument(name = "start", skip_all)]
pub async fn async_start(server: &Arc<Server>) -> Result<Arc<Services>> {
	match Services::build(server.server.clone()).await {
		| Ok(services) => {
			services.start().await?;

			Ok(server
				.services
				.lock()
				.await
				.insert(services)
				.clone())
		},

		| Err(error) => {
			error!("Critical error starting server: {error}");
			Err(error)
		},
	}
}

/// Park until a shutdown signal; the services run their own workers.
pub async fn async_run(server: &Arc<Server>) -> Result {
	server.server.until_shutdown().await;

	Ok(())
}

#[tracing::instrument(name = "stop", skip_all)]
pub async fn async_stop(server: &Arc<Server>) -> Result {
	let services = server
		.services
		.lock()
		.await
		.take()
		.expect("services initialized");

	services.stop().await;

	Ok(())
}
