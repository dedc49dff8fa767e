use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use waveroom_core::{Result, err, implement};

use crate::{
	Database,
	engine::{Entry, Value, live},
};

/// Fetch a string value. Missing or expired keys error with is_not_found().
#[implement(Database)]
pub async fn get(&self, key: &str) -> Result<String> {
	self.engine.read(|table, now| {
		live(table, key, now)
			.ok_or_else(|| err!(NotFound("key {key:?} not found")))?
			.value
			.str_ref()
			.cloned()
	})
}

/// Store a string value, optionally with a time-to-live. An existing value
/// of any type is replaced.
#[implement(Database)]
pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result {
	self.engine.write(|table, now| {
		let mut entry = Entry::new(Value::Str(value.to_owned()));
		entry.expires_at = ttl.map(|ttl| now.saturating_add(ttl_millis(ttl)));
		table.insert(key.to_owned(), entry);

		Ok(())
	})
}

/// Fetch and JSON-decode an object value.
#[implement(Database)]
pub async fn get_object<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
	let raw = self.get(key).await?;

	serde_json::from_str(&raw).map_err(Into::into)
}

/// JSON-encode and store an object value.
#[implement(Database)]
pub async fn set_object<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result {
	let raw = serde_json::to_string(value)?;

	self.set(key, &raw, ttl).await
}

/// Remove a key of any type; false when it did not exist.
#[implement(Database)]
pub async fn del(&self, key: &str) -> Result<bool> {
	self.engine.write(|table, now| {
		let existed = live(table, key, now).is_some();
		table.remove(key);

		Ok(existed)
	})
}

#[implement(Database)]
pub async fn exists(&self, key: &str) -> bool {
	self.engine
		.read(|table, now| live(table, key, now).is_some())
}

#[allow(clippy::as_conversions)]
pub(crate) fn ttl_millis(ttl: Duration) -> u64 { ttl.as_millis() as u64 }
