use std::time::Duration;

use tokio::runtime::Builder;
pub use tokio::runtime::{Handle, Runtime};
use waveroom_core::Result;

use crate::clap::Args;

const WORKER_NAME: &str = "waveroom:worker";
const WORKER_MIN: usize = 2;
const WORKER_KEEPALIVE: u64 = 36;
const MAX_BLOCKING_THREADS: usize = 1024;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(10_000);

pub fn new(args: &Args) -> Result<Runtime> {
	Builder::new_multi_thread()
		.enable_io()
		.enable_time()
		.thread_name(WORKER_NAME)
		.worker_threads(args.effective_workers().max(WORKER_MIN))
		.max_blocking_threads(MAX_BLOCKING_THREADS)
		.thread_keep_alive(Duration::from_secs(WORKER_KEEPALIVE))
		.build()
		.map_err(Into::into)
}

/// Tear the runtime down, bounded; pending work past the deadline is
/// abandoned rather than holding the exit open.
pub(crate) fn shutdown(runtime: Runtime) { runtime.shutdown_timeout(SHUTDOWN_TIMEOUT); }
