use std::collections::BTreeSet;

use waveroom_core::{Result, implement};

use crate::{
	Database,
	engine::{Entry, Value, live, live_mut},
};

/// Add a member; true when it was not already present.
#[implement(Database)]
pub async fn sadd(&self, key: &str, member: &str) -> Result<bool> {
	self.engine.write(|table, now| {
		if live_mut(table, key, now).is_none() {
			table.insert(key.to_owned(), Entry::new(Value::Set(BTreeSet::new())));
		}

		let set = table
			.get_mut(key)
			.expect("set entry just ensured")
			.value
			.set_mut()?;

		Ok(set.insert(member.to_owned()))
	})
}

/// Remove a member; true when it was present.
#[implement(Database)]
pub async fn srem(&self, key: &str, member: &str) -> Result<bool> {
	self.engine.write(|table, now| {
		let Some(entry) = live_mut(table, key, now) else {
			return Ok(false);
		};

		Ok(entry.value.set_mut()?.remove(member))
	})
}

#[implement(Database)]
pub async fn smembers(&self, key: &str) -> Result<Vec<String>> {
	self.engine.read(|table, now| {
		let Some(entry) = live(table, key, now) else {
			return Ok(Vec::new());
		};

		Ok(entry
			.value
			.set_ref()?
			.iter()
			.cloned()
			.collect())
	})
}

#[implement(Database)]
pub async fn sismember(&self, key: &str, member: &str) -> Result<bool> {
	self.engine.read(|table, now| {
		let Some(entry) = live(table, key, now) else {
			return Ok(false);
		};

		Ok(entry.value.set_ref()?.contains(member))
	})
}

#[implement(Database)]
pub async fn scard(&self, key: &str) -> Result<usize> {
	self.engine.read(|table, now| {
		let Some(entry) = live(table, key, now) else {
			return Ok(0);
		};

		Ok(entry.value.set_ref()?.len())
	})
}
