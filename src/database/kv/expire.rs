use std::time::Duration;

use waveroom_core::{Result, implement};

use crate::{Database, engine::live_mut, kv::ttl_millis};

/// Reset a key's time-to-live; false when the key does not exist.
#[implement(Database)]
pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
	self.engine.write(|table, now| {
		let Some(entry) = live_mut(table, key, now) else {
			return Ok(false);
		};

		entry.expires_at = Some(now.saturating_add(ttl_millis(ttl)));

		Ok(true)
	})
}

/// Remaining time-to-live; None for a key without expiry. Missing keys
/// error with is_not_found().
#[implement(Database)]
pub async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
	self.engine.read(|table, now| {
		let entry = crate::engine::live(table, key, now)
			.ok_or_else(|| waveroom_core::err!(NotFound("key {key:?} not found")))?;

		Ok(entry
			.expires_at
			.map(|at| Duration::from_millis(at.saturating_sub(now))))
	})
}
