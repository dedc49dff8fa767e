use std::collections::VecDeque;

use waveroom_core::{Result, implement};

use crate::{
	Database,
	engine::{Entry, Table, Value, live, live_mut},
};

/// Push onto the head; returns the new length.
#[implement(Database)]
pub async fn lpush(&self, key: &str, value: &str) -> Result<usize> {
	self.engine.write(|table, now| {
		let list = ensure_list(table, key, now)?;
		list.push_front(value.to_owned());

		Ok(list.len())
	})
}

/// Push onto the tail; returns the new length.
#[implement(Database)]
pub async fn rpush(&self, key: &str, value: &str) -> Result<usize> {
	self.engine.write(|table, now| {
		let list = ensure_list(table, key, now)?;
		list.push_back(value.to_owned());

		Ok(list.len())
	})
}

#[implement(Database)]
pub async fn lpop(&self, key: &str) -> Result<Option<String>> {
	self.engine.write(|table, now| {
		let Some(entry) = live_mut(table, key, now) else {
			return Ok(None);
		};

		Ok(entry.value.list_mut()?.pop_front())
	})
}

#[implement(Database)]
pub async fn rpop(&self, key: &str) -> Result<Option<String>> {
	self.engine.write(|table, now| {
		let Some(entry) = live_mut(table, key, now) else {
			return Ok(None);
		};

		Ok(entry.value.list_mut()?.pop_back())
	})
}

/// Slice by inclusive indices; negative indices count from the tail, so
/// (0, -1) is the whole list.
#[implement(Database)]
pub async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
	self.engine.read(|table, now| {
		let Some(entry) = live(table, key, now) else {
			return Ok(Vec::new());
		};

		let list = entry.value.list_ref()?;
		let Some((start, stop)) = resolve_range(list.len(), start, stop) else {
			return Ok(Vec::new());
		};

		Ok(list
			.iter()
			.skip(start)
			.take(stop.saturating_sub(start).saturating_add(1))
			.cloned()
			.collect())
	})
}

#[implement(Database)]
pub async fn llen(&self, key: &str) -> Result<usize> {
	self.engine.read(|table, now| {
		let Some(entry) = live(table, key, now) else {
			return Ok(0);
		};

		Ok(entry.value.list_ref()?.len())
	})
}

/// Remove occurrences of a value: count > 0 from the head, count < 0 from
/// the tail, 0 for all. Returns the number removed.
#[implement(Database)]
pub async fn lrem(&self, key: &str, count: i64, value: &str) -> Result<usize> {
	self.engine.write(|table, now| {
		let Some(entry) = live_mut(table, key, now) else {
			return Ok(0);
		};

		let list = entry.value.list_mut()?;
		let limit = count.unsigned_abs().try_into().unwrap_or(usize::MAX);
		let limit = if count == 0 { usize::MAX } else { limit };

		let mut removed = 0_usize;
		let mut keep = VecDeque::with_capacity(list.len());
		let from_tail = count < 0;

		let drain: Box<dyn Iterator<Item = String>> = if from_tail {
			Box::new(std::mem::take(list).into_iter().rev())
		} else {
			Box::new(std::mem::take(list).into_iter())
		};

		for item in drain {
			if removed < limit && item == value {
				removed = removed.saturating_add(1);
				continue;
			}

			if from_tail {
				keep.push_front(item);
			} else {
				keep.push_back(item);
			}
		}

		*list = keep;

		Ok(removed)
	})
}

/// Keep only the inclusive index range, dropping the rest.
#[implement(Database)]
pub async fn ltrim(&self, key: &str, start: i64, stop: i64) -> Result {
	self.engine.write(|table, now| {
		let Some(entry) = live_mut(table, key, now) else {
			return Ok(());
		};

		let list = entry.value.list_mut()?;
		let Some((start, stop)) = resolve_range(list.len(), start, stop) else {
			list.clear();
			return Ok(());
		};

		let kept: VecDeque<_> = list
			.iter()
			.skip(start)
			.take(stop.saturating_sub(start).saturating_add(1))
			.cloned()
			.collect();

		*list = kept;

		Ok(())
	})
}

fn ensure_list<'a>(
	table: &'a mut Table,
	key: &str,
	now: u64,
) -> Result<&'a mut VecDeque<String>> {
	if live_mut(table, key, now).is_none() {
		table.insert(key.to_owned(), Entry::new(Value::List(VecDeque::new())));
	}

	table
		.get_mut(key)
		.expect("list entry just ensured")
		.value
		.list_mut()
}

/// Clamp redis-style inclusive indices onto a length; None when the range
/// selects nothing.
#[allow(clippy::as_conversions)]
pub(crate) fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
	let len_i = len as i64;

	let resolve = |index: i64| -> i64 {
		if index < 0 { len_i.saturating_add(index) } else { index }
	};

	let start = resolve(start).max(0);
	let stop = resolve(stop).min(len_i.saturating_sub(1));
	if len == 0 || start > stop {
		return None;
	}

	Some((start as usize, stop as usize))
}
