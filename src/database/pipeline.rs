use std::time::Duration;

use serde::Serialize;
use waveroom_core::{Result, err};

use crate::{
	Database,
	engine::{Entry, Table, Value, live, live_mut},
	kv::ttl_millis,
};

/// One queued operation. The set covers what the services batch: twin-key
/// session writes, the vote transition, and sweep cleanup.
#[derive(Clone, Debug)]
pub enum Op {
	Get { key: String },
	Set { key: String, value: String, ttl: Option<Duration> },
	Del { key: String },
	Expire { key: String, ttl: Duration },
	Incr { key: String, delta: i64 },
	SAdd { key: String, member: String },
	SRem { key: String, member: String },
	LPush { key: String, value: String },
	RPush { key: String, value: String },
	LTrim { key: String, start: i64, stop: i64 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum OpResult {
	Done,
	Str(Option<String>),
	Int(i64),
	Bool(bool),
}

/// A batch of operations applied under a single acquisition of the write
/// lock. Batched mode applies until the first failure; transactional mode
/// validates everything first so either all ops apply or none do.
pub struct Pipeline<'a> {
	db: &'a Database,
	atomic: bool,
	ops: Vec<Op>,
}

impl Database {
	#[must_use]
	pub fn pipeline(&self) -> Pipeline<'_> {
		Pipeline { db: self, atomic: false, ops: Vec::new() }
	}

	/// All-or-nothing variant of [`Self::pipeline`].
	#[must_use]
	pub fn transaction(&self) -> Pipeline<'_> {
		Pipeline { db: self, atomic: true, ops: Vec::new() }
	}
}

impl Pipeline<'_> {
	#[must_use]
	pub fn get(mut self, key: &str) -> Self {
		self.ops.push(Op::Get { key: key.to_owned() });
		self
	}

	#[must_use]
	pub fn set(mut self, key: &str, value: &str, ttl: Option<Duration>) -> Self {
		self.ops.push(Op::Set {
			key: key.to_owned(),
			value: value.to_owned(),
			ttl,
		});
		self
	}

	/// JSON-encode at enqueue time so a serialization failure surfaces
	/// before anything is applied.
	pub fn set_object<T: Serialize>(
		self,
		key: &str,
		value: &T,
		ttl: Option<Duration>,
	) -> Result<Self> {
		let raw = serde_json::to_string(value)?;

		Ok(self.set(key, &raw, ttl))
	}

	#[must_use]
	pub fn del(mut self, key: &str) -> Self {
		self.ops.push(Op::Del { key: key.to_owned() });
		self
	}

	#[must_use]
	pub fn expire(mut self, key: &str, ttl: Duration) -> Self {
		self.ops.push(Op::Expire { key: key.to_owned(), ttl });
		self
	}

	#[must_use]
	pub fn incr(mut self, key: &str, delta: i64) -> Self {
		self.ops.push(Op::Incr { key: key.to_owned(), delta });
		self
	}

	#[must_use]
	pub fn sadd(mut self, key: &str, member: &str) -> Self {
		self.ops.push(Op::SAdd {
			key: key.to_owned(),
			member: member.to_owned(),
		});
		self
	}

	#[must_use]
	pub fn srem(mut self, key: &str, member: &str) -> Self {
		self.ops.push(Op::SRem {
			key: key.to_owned(),
			member: member.to_owned(),
		});
		self
	}

	#[must_use]
	pub fn lpush(mut self, key: &str, value: &str) -> Self {
		self.ops.push(Op::LPush {
			key: key.to_owned(),
			value: value.to_owned(),
		});
		self
	}

	#[must_use]
	pub fn rpush(mut self, key: &str, value: &str) -> Self {
		self.ops.push(Op::RPush {
			key: key.to_owned(),
			value: value.to_owned(),
		});
		self
	}

	#[must_use]
	pub fn ltrim(mut self, key: &str, start: i64, stop: i64) -> Self {
		self.ops.push(Op::LTrim { key: key.to_owned(), start, stop });
		self
	}

	#[must_use]
	pub fn is_empty(&self) -> bool { self.ops.is_empty() }

	pub async fn execute(self) -> Result<Vec<OpResult>> {
		let Self { db, atomic, ops } = self;

		db.engine.write(|table, now| {
			if atomic {
				for op in &ops {
					validate(table, op, now)?;
				}
			}

			let mut results = Vec::with_capacity(ops.len());
			for op in &ops {
				results.push(apply(table, op, now)?);
			}

			Ok(results)
		})
	}
}

/// Prove an op cannot fail against the current table: type agreement and,
/// for counters, numeric content.
fn validate(table: &mut Table, op: &Op, now: u64) -> Result {
	let key = match op {
		| Op::Get { key }
		| Op::Set { key, .. }
		| Op::Del { key }
		| Op::Expire { key, .. }
		| Op::Incr { key, .. }
		| Op::SAdd { key, .. }
		| Op::SRem { key, .. }
		| Op::LPush { key, .. }
		| Op::RPush { key, .. }
		| Op::LTrim { key, .. } => key,
	};

	let Some(entry) = live_mut(table, key, now) else {
		return Ok(());
	};

	match op {
		| Op::Get { .. } => entry.value.str_ref().map(|_| ())?,
		| Op::Incr { .. } => {
			let counter = entry.value.str_ref()?;
			counter
				.parse::<i64>()
				.map_err(|_| err!(Database("value at {key:?} is not an integer")))?;
		},
		| Op::SAdd { .. } | Op::SRem { .. } => entry.value.set_ref().map(|_| ())?,
		| Op::LPush { .. } | Op::RPush { .. } | Op::LTrim { .. } =>
			entry.value.list_ref().map(|_| ())?,
		| Op::Set { .. } | Op::Del { .. } | Op::Expire { .. } => {},
	}

	Ok(())
}

fn apply(table: &mut Table, op: &Op, now: u64) -> Result<OpResult> {
	Ok(match op {
		| Op::Get { key } => OpResult::Str(
			live(table, key, now)
				.map(|entry| entry.value.str_ref().cloned())
				.transpose()?,
		),

		| Op::Set { key, value, ttl } => {
			let mut entry = Entry::new(Value::Str(value.clone()));
			entry.expires_at = ttl.map(|ttl| now.saturating_add(ttl_millis(ttl)));
			table.insert(key.clone(), entry);

			OpResult::Done
		},

		| Op::Del { key } => {
			let existed = live(table, key, now).is_some();
			table.remove(key);

			OpResult::Bool(existed)
		},

		| Op::Expire { key, ttl } => match live_mut(table, key, now) {
			| Some(entry) => {
				entry.expires_at = Some(now.saturating_add(ttl_millis(*ttl)));
				OpResult::Bool(true)
			},
			| None => OpResult::Bool(false),
		},

		| Op::Incr { key, delta } => {
			OpResult::Int(crate::kv::incr_apply(table, key, *delta, now)?)
		},

		| Op::SAdd { key, member } => {
			if live_mut(table, key, now).is_none() {
				table.insert(key.clone(), Entry::new(Value::Set(Default::default())));
			}

			let set = table
				.get_mut(key)
				.expect("set entry just ensured")
				.value
				.set_mut()?;

			OpResult::Bool(set.insert(member.clone()))
		},

		| Op::SRem { key, member } => match live_mut(table, key, now) {
			| Some(entry) => OpResult::Bool(entry.value.set_mut()?.remove(member)),
			| None => OpResult::Bool(false),
		},

		| Op::LPush { key, value } | Op::RPush { key, value } => {
			if live_mut(table, key, now).is_none() {
				table.insert(key.clone(), Entry::new(Value::List(Default::default())));
			}

			let list = table
				.get_mut(key)
				.expect("list entry just ensured")
				.value
				.list_mut()?;

			if matches!(op, Op::LPush { .. }) {
				list.push_front(value.clone());
			} else {
				list.push_back(value.clone());
			}

			OpResult::Int(list.len().try_into().unwrap_or(i64::MAX))
		},

		| Op::LTrim { .. } => {
			// shares the kv implementation's semantics via direct call
			apply_ltrim(table, op, now)?
		},
	})
}

fn apply_ltrim(table: &mut Table, op: &Op, now: u64) -> Result<OpResult> {
	let Op::LTrim { key, start, stop } = op else {
		return Ok(OpResult::Done);
	};

	if let Some(entry) = live_mut(table, key, now) {
		let list = entry.value.list_mut()?;
		match crate::kv::resolve_range(list.len(), *start, *stop) {
			| Some((start, stop)) => {
				let kept: std::collections::VecDeque<_> = list
					.iter()
					.skip(start)
					.take(stop.saturating_sub(start).saturating_add(1))
					.cloned()
					.collect();
				*list = kept;
			},
			| None => list.clear(),
		}
	}

	Ok(OpResult::Done)
}
