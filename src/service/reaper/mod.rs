use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use loole::{Receiver, Sender};
use tokio::time::{interval, timeout};
use waveroom_core::{
	Result, debug, debug_warn,
	result::{LogDebugErr, LogErr},
	trace, utils,
};
use waveroom_database::keys;

use crate::service;

/// Marker keys outlive any realistic grace period by a wide margin.
const DISCONNECT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Background hygiene. Two independent schedules: stale presence and empty
/// rooms on the fast clock, stale clients (with a reconnect grace window)
/// on the slow one. Sweeps log and continue; they never surface errors.
pub struct Service {
	services: Arc<crate::services::OnceServices>,
	shutdown: (Sender<()>, Receiver<()>),
	presence_interval: Duration,
	client_interval: Duration,
	grace: Duration,
	room_idle: Duration,
	probe_timeout: Duration,
	probe_retries: u32,
	probe_backoff: Duration,
}

#[async_trait]
impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		let config = &args.server.config;

		Ok(Arc::new(Self {
			services: args.services.clone(),
			shutdown: loole::unbounded(),
			presence_interval: Duration::from_secs(config.presence_sweep_interval_s),
			client_interval: Duration::from_secs(config.client_sweep_interval_s),
			grace: Duration::from_secs(config.disconnect_grace_s),
			room_idle: Duration::from_secs(config.room_idle_hibernate_s),
			probe_timeout: Duration::from_millis(config.probe_timeout_ms),
			probe_retries: config.probe_retries,
			probe_backoff: Duration::from_millis(config.probe_backoff_ms),
		}))
	}

	async fn worker(self: Arc<Self>) -> Result {
		let receiver = self.shutdown.1.clone();
		let mut presence_tick = interval(self.presence_interval);
		let mut client_tick = interval(self.client_interval);

		// the immediate first tick would sweep before anything exists
		presence_tick.tick().await;
		client_tick.tick().await;

		while !receiver.is_closed() {
			tokio::select! {
				_ = presence_tick.tick() => self.sweep_presence().await,
				_ = client_tick.tick() => self.sweep_clients().await,
				_ = receiver.recv_async() => break,
			}
		}

		Ok(())
	}

	async fn interrupt(&self) {
		let (shutdown, _) = &self.shutdown;
		if !shutdown.is_closed() {
			shutdown.close();
		}
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	/// Fast sweep: expired presence goes, long-idle empty rooms hibernate,
	/// and the store physically drops lapsed keys.
	pub(crate) async fn sweep_presence(&self) {
		trace!("presence sweep");

		if let Ok(removed) = self
			.services
			.presence
			.cleanup_expired()
			.await
			.log_err()
			&& removed > 0
		{
			debug!(removed, "stale presence records reaped");
		}

		let purged = self.services.db.purge_expired();
		if purged > 0 {
			trace!(purged, "expired keys dropped");
		}

		let now = utils::millis_since_unix_epoch();
		let idle_cutoff = duration_millis(self.room_idle);

		let Ok(state_keys) = self.services.db.keys("room:state:*").await.log_err() else {
			return;
		};

		for key in state_keys {
			let Some(room_id) = key.strip_prefix("room:state:") else {
				continue;
			};

			let Ok(state) = self.services.state.get_room_state(room_id).await else {
				continue;
			};

			if state.is_active
				&& state.active_users == 0
				&& now.saturating_sub(state.last_activity) > idle_cutoff
			{
				debug!(room_id, "idle empty room; hibernating");
				self.services
					.state
					.set_room_active(room_id, false)
					.await
					.log_debug_err()
					.ok();
			}
		}
	}

	/// Slow sweep: reconcile the online index against the gateway's
	/// connection registry, with a grace window so a blip is not a logout.
	pub(crate) async fn sweep_clients(&self) {
		trace!("stale client sweep");

		let Ok(online) = self
			.services
			.db
			.smembers(keys::ONLINE_USERS)
			.await
			.log_err()
		else {
			return;
		};

		for user_id in online {
			match self.probe_connected(&user_id).await {
				// healthy, or back within the grace window: clear any marker
				| Some(true) => {
					self.services
						.db
						.del(&keys::disconnect(&user_id))
						.await
						.log_debug_err()
						.ok();
				},
				| Some(false) => self.handle_disconnected(&user_id).await,
				// registry unreachable; decide nothing this pass
				| None => {},
			}
		}
	}

	async fn handle_disconnected(&self, user_id: &str) {
		let db = &self.services.db;
		let now = utils::millis_since_unix_epoch();
		let marker_key = keys::disconnect(user_id);

		let marker: Option<u64> = db
			.get(&marker_key)
			.await
			.ok()
			.and_then(|raw| raw.parse().ok());

		let Some(marked_at) = marker else {
			debug!(user_id, "disconnect detected; opening grace window");
			db.set(&marker_key, &now.to_string(), Some(DISCONNECT_TTL))
				.await
				.log_debug_err()
				.ok();

			return;
		};

		if now.saturating_sub(marked_at) <= duration_millis(self.grace) {
			trace!(user_id, "inside grace window");
			return;
		}

		// the window has lapsed; one last look before reaping
		if self.probe_connected(user_id).await != Some(false) {
			debug_warn!(user_id, "reconnected at the wire; sparing");
			db.del(&marker_key).await.log_debug_err().ok();

			return;
		}

		debug!(user_id, "grace lapsed; reaping client state");

		if let Ok(room_id) = db.get(&keys::user_room(user_id)).await
			&& !room_id.is_empty()
		{
			self.services
				.state
				.remove_user_from_room(&room_id, user_id)
				.await
				.log_debug_err()
				.ok();
		}

		db.pipeline()
			.del(&keys::presence(user_id))
			.del(&marker_key)
			.srem(keys::ONLINE_USERS, user_id)
			.execute()
			.await
			.log_err()
			.ok();
	}

	/// Bounded probe of the connection registry; None when every attempt
	/// timed out and nothing should be concluded.
	async fn probe_connected(&self, user_id: &str) -> Option<bool> {
		for attempt in 0..self.probe_retries.max(1) {
			if attempt > 0 {
				tokio::time::sleep(self.probe_backoff).await;
			}

			let probe = self.services.clients.is_connected(user_id);
			if let Ok(connected) = timeout(self.probe_timeout, probe).await {
				return Some(connected);
			}
		}

		debug_warn!(user_id, "connection probe timed out");

		None
	}
}

#[allow(clippy::as_conversions)]
fn duration_millis(duration: Duration) -> u64 { duration.as_millis() as u64 }
