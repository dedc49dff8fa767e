mod collection;
mod engine;
pub mod keys;
mod kv;
mod pipeline;
mod pubsub;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use waveroom_core::{Result, Server, model};

pub use self::{
	collection::Collection,
	engine::Engine,
	pipeline::{Op, OpResult, Pipeline},
	pubsub::{BusMessage, Subscriber},
};

/// The shared keyed store. Every live datum of the system rides in here with
/// a TTL; durable records live in the `doc:` collections. The pub/sub bus
/// shares the engine so one handle serves the whole tree.
pub struct Database {
	pub(crate) engine: Arc<Engine>,

	pub users: Collection<model::User>,
	pub rooms: Collection<model::Room>,
	pub messages: Collection<model::ChatMessage>,
	pub user_bans: Collection<model::Ban>,
	pub moderation_log: Collection<model::ModerationLogEntry>,
	pub user_reports: Collection<model::Report>,
}

impl Database {
	/// Open the store for this server instance.
	pub async fn open(server: &Arc<Server>) -> Result<Arc<Self>> {
		let engine = Engine::open(server)?;

		Ok(Arc::new(Self {
			users: Collection::open(&engine, "users"),
			rooms: Collection::open(&engine, "rooms"),
			messages: Collection::open(&engine, "messages"),
			user_bans: Collection::open(&engine, "user_bans"),
			moderation_log: Collection::open(&engine, "moderation_log"),
			user_reports: Collection::open(&engine, "user_reports"),
			engine,
		}))
	}

	/// Physically drop every key whose TTL has lapsed. Reads never see
	/// expired keys regardless; this reclaims the memory.
	pub fn purge_expired(&self) -> usize { self.engine.purge_expired() }

	/// Count of live keys, for memory reporting.
	#[must_use]
	pub fn len(&self) -> usize { self.engine.len() }

	#[must_use]
	pub fn is_empty(&self) -> bool { self.len() == 0 }
}
