use std::collections::BTreeMap;

use waveroom_core::{Result, err, implement};

use crate::{
	Database,
	engine::{Entry, Value, live, live_mut},
};

/// Set one hash field; true when the field was newly created.
#[implement(Database)]
pub async fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
	self.engine.write(|table, now| {
		if live_mut(table, key, now).is_none() {
			table.insert(key.to_owned(), Entry::new(Value::Hash(BTreeMap::new())));
		}

		let hash = table
			.get_mut(key)
			.expect("hash entry just ensured")
			.value
			.hash_mut()?;

		Ok(hash
			.insert(field.to_owned(), value.to_owned())
			.is_none())
	})
}

#[implement(Database)]
pub async fn hget(&self, key: &str, field: &str) -> Result<String> {
	self.engine.read(|table, now| {
		live(table, key, now)
			.ok_or_else(|| err!(NotFound("key {key:?} not found")))?
			.value
			.hash_ref()?
			.get(field)
			.cloned()
			.ok_or_else(|| err!(NotFound("field {field:?} not found in {key:?}")))
	})
}

#[implement(Database)]
pub async fn hdel(&self, key: &str, field: &str) -> Result<bool> {
	self.engine.write(|table, now| {
		let Some(entry) = live_mut(table, key, now) else {
			return Ok(false);
		};

		Ok(entry.value.hash_mut()?.remove(field).is_some())
	})
}

#[implement(Database)]
pub async fn hexists(&self, key: &str, field: &str) -> Result<bool> {
	self.engine.read(|table, now| {
		let Some(entry) = live(table, key, now) else {
			return Ok(false);
		};

		Ok(entry.value.hash_ref()?.contains_key(field))
	})
}

#[implement(Database)]
pub async fn hlen(&self, key: &str) -> Result<usize> {
	self.engine.read(|table, now| {
		let Some(entry) = live(table, key, now) else {
			return Ok(0);
		};

		Ok(entry.value.hash_ref()?.len())
	})
}

#[implement(Database)]
pub async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>> {
	self.engine.read(|table, now| {
		let Some(entry) = live(table, key, now) else {
			return Ok(BTreeMap::new());
		};

		Ok(entry.value.hash_ref()?.clone())
	})
}
