use std::sync::Arc;

use tokio::signal;
use waveroom_core::{debug_error, trace, warn};

use super::server::Server;

#[cfg(unix)]
#[tracing::instrument(skip_all)]
pub(super) async fn enable(server: Arc<Server>) {
	use signal::unix;
	use unix::SignalKind;

	let mut quit = unix::signal(SignalKind::quit()).expect("SIGQUIT handler");
	let mut term = unix::signal(SignalKind::terminate()).expect("SIGTERM handler");
	loop {
		trace!("Installed signal handlers");
		let sig: &'static str;
		tokio::select! {
			_ = signal::ctrl_c() => { sig = "SIGINT"; },
			_ = quit.recv() => { sig = "SIGQUIT"; },
			_ = term.recv() => { sig = "SIGTERM"; },
		}

		warn!("Received {sig}");
		if let Err(e) = server.server.shutdown() {
			debug_error!(?sig, "signal: {e}");
		}
	}
}

#[cfg(not(unix))]
#[tracing::instrument(skip_all)]
pub(super) async fn enable(server: Arc<Server>) {
	loop {
		tokio::select! {
			_ = signal::ctrl_c() => {
				warn!("Received Ctrl+C");
				if let Err(e) = server.server.shutdown() {
					debug_error!("signal channel: {e}");
				}
			},
		}
	}
}
