use waveroom_core::{Result, err, implement};

use crate::{
	Database,
	engine::{Entry, Table, Value, live_mut},
};

/// Increment an integer-valued string key, creating it at zero first.
/// Returns the post-increment value.
#[implement(Database)]
pub async fn incr(&self, key: &str, delta: i64) -> Result<i64> {
	self.engine
		.write(|table, now| incr_apply(table, key, delta, now))
}

/// Decrement; the counter may go negative, matching the store it models.
#[implement(Database)]
pub async fn decr(&self, key: &str, delta: i64) -> Result<i64> {
	self.engine
		.write(|table, now| incr_apply(table, key, delta.saturating_neg(), now))
}

pub(crate) fn incr_apply(table: &mut Table, key: &str, delta: i64, now: u64) -> Result<i64> {
	if live_mut(table, key, now).is_none() {
		table.insert(key.to_owned(), Entry::new(Value::Str("0".to_owned())));
	}

	let entry = table
		.get_mut(key)
		.expect("counter entry just ensured");

	let counter = entry.value.str_mut()?;
	let current: i64 = counter
		.parse()
		.map_err(|_| err!(Database("value at {key:?} is not an integer")))?;

	let next = current.saturating_add(delta);
	*counter = next.to_string();

	Ok(next)
}
