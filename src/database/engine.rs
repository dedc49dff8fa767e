use std::{
	collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
	sync::{Arc, RwLock},
};

use tokio::sync::broadcast;
use waveroom_core::{Result, Server, err, utils};

use crate::pubsub::BusMessage;

/// Storage cell for one key. Values are typed; a mismatched operation is a
/// caller bug surfaced as a Database error, never a coercion.
pub(crate) struct Entry {
	pub(crate) value: Value,
	/// unix-millis deadline; None never expires
	pub(crate) expires_at: Option<u64>,
}

pub(crate) enum Value {
	Str(String),
	List(VecDeque<String>),
	Set(BTreeSet<String>),
	Hash(BTreeMap<String, String>),
	/// ordered by (score, member); scores are unix-millis in practice
	Zset(BTreeSet<(u64, String)>),
}

/// The table plus the fan-out bus. Locks guard pure in-memory mutation only
/// and are never held across a suspension point.
pub struct Engine {
	table: RwLock<Table>,
	bus: broadcast::Sender<BusMessage>,
}

pub(crate) type Table = HashMap<String, Entry>;

impl Engine {
	pub(crate) fn open(server: &Arc<Server>) -> Result<Arc<Self>> {
		let capacity = server.config.bus_capacity;

		Ok(Arc::new(Self {
			table: RwLock::new(Table::new()),
			bus: broadcast::channel(capacity).0,
		}))
	}

	/// Run a closure under the read lock. Expired entries are presented to
	/// the closure as absent via [`live`].
	pub(crate) fn read<T>(&self, f: impl FnOnce(&Table, u64) -> T) -> T {
		let now = utils::millis_since_unix_epoch();
		let table = self.table.read().expect("locked");

		f(&table, now)
	}

	/// Run a closure under the write lock.
	pub(crate) fn write<T>(&self, f: impl FnOnce(&mut Table, u64) -> T) -> T {
		let now = utils::millis_since_unix_epoch();
		let mut table = self.table.write().expect("locked");

		f(&mut table, now)
	}

	pub(crate) fn publish(&self, message: BusMessage) -> usize {
		self.bus.send(message).unwrap_or(0)
	}

	pub(crate) fn bus_receiver(&self) -> broadcast::Receiver<BusMessage> {
		self.bus.subscribe()
	}

	pub(crate) fn purge_expired(&self) -> usize {
		self.write(|table, now| {
			let before = table.len();
			table.retain(|_, entry| !entry.is_expired(now));

			before.saturating_sub(table.len())
		})
	}

	pub(crate) fn len(&self) -> usize {
		self.read(|table, now| {
			table
				.values()
				.filter(|entry| !entry.is_expired(now))
				.count()
		})
	}
}

/// View an entry as live; expired keys read as missing even before the purge
/// sweep physically removes them.
pub(crate) fn live<'a>(table: &'a Table, key: &str, now: u64) -> Option<&'a Entry> {
	table
		.get(key)
		.filter(|entry| !entry.is_expired(now))
}

/// Mutable access to a live entry; an expired entry is dropped here so a
/// writer never resurrects stale state.
pub(crate) fn live_mut<'a>(table: &'a mut Table, key: &str, now: u64) -> Option<&'a mut Entry> {
	if table
		.get(key)
		.is_some_and(|entry| entry.is_expired(now))
	{
		table.remove(key);
	}

	table.get_mut(key)
}

impl Entry {
	pub(crate) fn new(value: Value) -> Self {
		Self {
			value,
			expires_at: None,
		}
	}

	#[inline]
	pub(crate) fn is_expired(&self, now: u64) -> bool {
		self.expires_at.is_some_and(|at| at <= now)
	}
}

impl Value {
	pub(crate) fn type_name(&self) -> &'static str {
		match self {
			| Self::Str(..) => "string",
			| Self::List(..) => "list",
			| Self::Set(..) => "set",
			| Self::Hash(..) => "hash",
			| Self::Zset(..) => "zset",
		}
	}

	pub(crate) fn str_ref(&self) -> Result<&String> {
		match self {
			| Self::Str(s) => Ok(s),
			| other => Err(wrong_type("string", other)),
		}
	}

	pub(crate) fn str_mut(&mut self) -> Result<&mut String> {
		match self {
			| Self::Str(s) => Ok(s),
			| other => Err(wrong_type("string", other)),
		}
	}

	pub(crate) fn list_ref(&self) -> Result<&VecDeque<String>> {
		match self {
			| Self::List(l) => Ok(l),
			| other => Err(wrong_type("list", other)),
		}
	}

	pub(crate) fn list_mut(&mut self) -> Result<&mut VecDeque<String>> {
		match self {
			| Self::List(l) => Ok(l),
			| other => Err(wrong_type("list", other)),
		}
	}

	pub(crate) fn set_ref(&self) -> Result<&BTreeSet<String>> {
		match self {
			| Self::Set(s) => Ok(s),
			| other => Err(wrong_type("set", other)),
		}
	}

	pub(crate) fn set_mut(&mut self) -> Result<&mut BTreeSet<String>> {
		match self {
			| Self::Set(s) => Ok(s),
			| other => Err(wrong_type("set", other)),
		}
	}

	pub(crate) fn hash_ref(&self) -> Result<&BTreeMap<String, String>> {
		match self {
			| Self::Hash(h) => Ok(h),
			| other => Err(wrong_type("hash", other)),
		}
	}

	pub(crate) fn hash_mut(&mut self) -> Result<&mut BTreeMap<String, String>> {
		match self {
			| Self::Hash(h) => Ok(h),
			| other => Err(wrong_type("hash", other)),
		}
	}

	pub(crate) fn zset_ref(&self) -> Result<&BTreeSet<(u64, String)>> {
		match self {
			| Self::Zset(z) => Ok(z),
			| other => Err(wrong_type("zset", other)),
		}
	}

	pub(crate) fn zset_mut(&mut self) -> Result<&mut BTreeSet<(u64, String)>> {
		match self {
			| Self::Zset(z) => Ok(z),
			| other => Err(wrong_type("zset", other)),
		}
	}
}

fn wrong_type(expected: &'static str, got: &Value) -> waveroom_core::Error {
	err!(Database(
		"WRONGTYPE operation expected {expected} against a {} value",
		got.type_name()
	))
}
