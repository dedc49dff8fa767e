use std::{sync::Arc, time::Duration};

use waveroom_core::{
	Result, debug, model::Presence, result::LogDebugErr, trace, utils, warn,
};
use waveroom_database::keys;

use crate::service;

/// Online-user tracking: one TTL'd record per user plus the `online:users`
/// index. The record is the truth; the index accelerates sweeps and is
/// repaired by the reaper when it drifts.
pub struct Service {
	services: Arc<crate::services::OnceServices>,
	presence_ttl: Duration,
}

impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self {
			services: args.services.clone(),
			presence_ttl: Duration::from_secs(args.server.config.presence_ttl_s),
		}))
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	/// Heartbeat upsert. A status change rewrites the record; an unchanged
	/// status only advances the last-seen stamp. Either way the TTL resets.
	pub async fn update_presence(&self, user_id: &str, username: &str, status: &str) -> Result {
		let db = &self.services.db;
		let now = utils::millis_since_unix_epoch();

		let existing: Option<Presence> = db
			.get_object(&keys::presence(user_id))
			.await
			.ok();

		let record = match existing {
			| Some(mut presence) if presence.status == status => {
				presence.last_seen = now;
				presence
			},
			| Some(mut presence) => {
				trace!(user_id, from = %presence.status, to = %status, "presence status change");
				presence.username = username.to_owned();
				presence.status = status.to_owned();
				presence.last_activity = now;
				presence.last_seen = now;
				presence
			},
			| None => Presence {
				user_id: user_id.to_owned(),
				username: username.to_owned(),
				status: status.to_owned(),
				last_activity: now,
				current_room_id: String::new(),
				last_seen: now,
				data: Default::default(),
			},
		};

		db.set_object(&keys::presence(user_id), &record, Some(self.presence_ttl))
			.await?;

		// index add is secondary; the reaper repairs a miss on its next pass
		if let Err(error) = db.sadd(keys::ONLINE_USERS, user_id).await {
			warn!(user_id, "failed to index online user: {error}");
		}

		Ok(())
	}

	/// Point the record at a room; an empty id clears it. The last-known
	/// room key is kept alongside for the reaper's leave path.
	pub async fn set_user_room(&self, user_id: &str, room_id: &str) -> Result {
		let db = &self.services.db;

		let mut presence: Presence = db.get_object(&keys::presence(user_id)).await?;
		presence.current_room_id = room_id.to_owned();
		presence.last_activity = utils::millis_since_unix_epoch();

		db.set_object(&keys::presence(user_id), &presence, Some(self.presence_ttl))
			.await?;

		if room_id.is_empty() {
			db.del(&keys::user_room(user_id)).await?;
		} else {
			db.set(&keys::user_room(user_id), room_id, None).await?;
		}

		Ok(())
	}

	pub async fn get_presence(&self, user_id: &str) -> Result<Presence> {
		self.services
			.db
			.get_object(&keys::presence(user_id))
			.await
	}

	/// Membership in the index alone is not proof of life; the record must
	/// also exist. The double check hides index drift from callers.
	pub async fn is_user_online(&self, user_id: &str) -> Result<bool> {
		let db = &self.services.db;

		let indexed = db.sismember(keys::ONLINE_USERS, user_id).await?;

		Ok(indexed && db.exists(&keys::presence(user_id)).await)
	}

	/// Walk the index: evict entries whose record is gone, destroy records
	/// that outlived the heartbeat window. Called by the reaper.
	pub async fn cleanup_expired(&self) -> Result<usize> {
		let db = &self.services.db;
		let now = utils::millis_since_unix_epoch();
		let cutoff = now.saturating_sub(ttl_millis(self.presence_ttl));

		let mut removed = 0_usize;
		for user_id in db.smembers(keys::ONLINE_USERS).await? {
			let presence: Option<Presence> = db
				.get_object(&keys::presence(&user_id))
				.await
				.ok();

			match presence {
				| None => {
					debug!(user_id, "presence record gone; dropping from online index");
					db.srem(keys::ONLINE_USERS, &user_id).await?;
					removed = removed.saturating_add(1);
				},
				| Some(presence) if presence.last_seen < cutoff => {
					debug!(user_id, "presence stale; destroying");
					db.pipeline()
						.del(&keys::presence(&user_id))
						.srem(keys::ONLINE_USERS, &user_id)
						.execute()
						.await
						.log_debug_err()
						.ok();
					removed = removed.saturating_add(1);
				},
				| Some(_) => {},
			}
		}

		Ok(removed)
	}

	pub async fn remove_presence(&self, user_id: &str) -> Result {
		self.services
			.db
			.pipeline()
			.del(&keys::presence(user_id))
			.srem(keys::ONLINE_USERS, user_id)
			.execute()
			.await
			.map(|_| ())
	}
}

#[allow(clippy::as_conversions)]
fn ttl_millis(ttl: Duration) -> u64 { ttl.as_millis() as u64 }
