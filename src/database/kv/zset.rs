use std::collections::BTreeSet;

use waveroom_core::{Result, implement};

use crate::{
	Database,
	engine::{Entry, Value, live, live_mut},
};

/// Add a member with a score, replacing the previous score if present;
/// true when the member was new.
#[implement(Database)]
pub async fn zadd(&self, key: &str, score: u64, member: &str) -> Result<bool> {
	self.engine.write(|table, now| {
		if live_mut(table, key, now).is_none() {
			table.insert(key.to_owned(), Entry::new(Value::Zset(BTreeSet::new())));
		}

		let zset = table
			.get_mut(key)
			.expect("zset entry just ensured")
			.value
			.zset_mut()?;

		let existed = zset
			.iter()
			.find(|(_, m)| m == member)
			.cloned();

		let was_new = existed.is_none();

		if let Some(pair) = existed {
			zset.remove(&pair);
		}

		zset.insert((score, member.to_owned()));

		Ok(was_new)
	})
}

#[implement(Database)]
pub async fn zrem(&self, key: &str, member: &str) -> Result<bool> {
	self.engine.write(|table, now| {
		let Some(entry) = live_mut(table, key, now) else {
			return Ok(false);
		};

		let zset = entry.value.zset_mut()?;
		let found = zset
			.iter()
			.find(|(_, m)| m == member)
			.cloned();

		Ok(found.is_some_and(|pair| zset.remove(&pair)))
	})
}

#[implement(Database)]
pub async fn zcard(&self, key: &str) -> Result<usize> {
	self.engine.read(|table, now| {
		let Some(entry) = live(table, key, now) else {
			return Ok(0);
		};

		Ok(entry.value.zset_ref()?.len())
	})
}

#[implement(Database)]
pub async fn zscore(&self, key: &str, member: &str) -> Result<Option<u64>> {
	self.engine.read(|table, now| {
		let Some(entry) = live(table, key, now) else {
			return Ok(None);
		};

		Ok(entry
			.value
			.zset_ref()?
			.iter()
			.find(|(_, m)| m == member)
			.map(|(score, _)| *score))
	})
}

/// Zero-based rank of a member in ascending score order.
#[implement(Database)]
pub async fn zrank(&self, key: &str, member: &str) -> Result<Option<usize>> {
	self.engine.read(|table, now| {
		let Some(entry) = live(table, key, now) else {
			return Ok(None);
		};

		Ok(entry
			.value
			.zset_ref()?
			.iter()
			.position(|(_, m)| m == member))
	})
}

/// Members with scores, ascending, over the inclusive rank range; negative
/// indices count from the tail.
#[implement(Database)]
pub async fn zrange_with_scores(
	&self,
	key: &str,
	start: i64,
	stop: i64,
) -> Result<Vec<(u64, String)>> {
	self.engine.read(|table, now| {
		let Some(entry) = live(table, key, now) else {
			return Ok(Vec::new());
		};

		let zset = entry.value.zset_ref()?;
		let Some((start, stop)) = super::list::resolve_range(zset.len(), start, stop) else {
			return Ok(Vec::new());
		};

		Ok(zset
			.iter()
			.skip(start)
			.take(stop.saturating_sub(start).saturating_add(1))
			.cloned()
			.collect())
	})
}

/// Drop every member scored at or below `max`; returns the number removed.
#[implement(Database)]
pub async fn zrem_range_by_score(&self, key: &str, max: u64) -> Result<usize> {
	self.engine.write(|table, now| {
		let Some(entry) = live_mut(table, key, now) else {
			return Ok(0);
		};

		let zset = entry.value.zset_mut()?;
		let keep = zset.split_off(&(max.saturating_add(1), String::new()));

		let removed = zset.len();
		*zset = keep;

		Ok(removed)
	})
}
