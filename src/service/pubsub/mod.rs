use std::{
	collections::{HashMap, HashSet},
	panic::AssertUnwindSafe,
	sync::{Arc, RwLock},
	time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use loole::{Receiver, Sender};
use serde_json::Value;
use tokio::time::timeout;
use waveroom_core::{
	Err, Result, debug, debug_warn, error,
	model::{Envelope, event::channel},
	trace,
};
use waveroom_database::BusMessage;

use crate::service;

/// A handler receives the channel name and the raw frame. Each invocation
/// runs in its own task with panic capture so one bad handler cannot stall
/// the dispatch loop or its peers.
pub type Handler = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Channels flowing by default; `subscribe` replaces this set.
const DEFAULT_CHANNELS: &[&str] = &["global:*", "room:*", "room:sync:*", "user:*"];

/// Event fan-out over the store's bus. Subscriptions select which channels
/// flow; handlers attach to literal channels or to `<prefix>:*` wildcards
/// covering one trailing segment.
pub struct Service {
	services: Arc<crate::services::OnceServices>,
	shutdown: (Sender<()>, Receiver<()>),
	publish_timeout: Duration,
	subscriptions: RwLock<HashSet<String>>,
	handlers: RwLock<HashMap<String, Vec<Handler>>>,
}

#[async_trait]
impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self {
			services: args.services.clone(),
			shutdown: loole::unbounded(),
			publish_timeout: Duration::from_secs(args.server.config.publish_timeout_s),
			subscriptions: RwLock::new(HashSet::new()),
			handlers: RwLock::new(HashMap::new()),
		}))
	}

	async fn worker(self: Arc<Self>) -> Result {
		// the core's whole channel namespace flows unless a caller narrows it
		if self.subscriptions.read().expect("locked").is_empty() {
			self.subscribe(DEFAULT_CHANNELS.iter().copied());
		}

		let mut subscriber = self.services.db.subscribe();
		let receiver = self.shutdown.1.clone();

		while !receiver.is_closed() {
			tokio::select! {
				message = subscriber.recv() => match message {
					| Ok(message) => self.dispatch(&message),
					| Err(error) => {
						debug_warn!("bus subscription ended: {error}");
						break;
					},
				},
				_ = receiver.recv_async() => break,
			}
		}

		Ok(())
	}

	async fn interrupt(&self) {
		let (shutdown, _) = &self.shutdown;
		if !shutdown.is_closed() {
			shutdown.close();
		}
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	/// Replace the active subscription set.
	pub fn subscribe<I, S>(&self, channels: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut subscriptions = self.subscriptions.write().expect("locked");
		subscriptions.clear();
		subscriptions.extend(channels.into_iter().map(Into::into));
	}

	pub fn unsubscribe<'a, I>(&self, channels: I)
	where
		I: IntoIterator<Item = &'a str>,
	{
		let mut subscriptions = self.subscriptions.write().expect("locked");
		for channel in channels {
			subscriptions.remove(channel);
		}
	}

	/// Attach a handler; multiple handlers per channel accumulate.
	pub fn add_handler(&self, channel: &str, handler: Handler) {
		self.handlers
			.write()
			.expect("locked")
			.entry(channel.to_owned())
			.or_default()
			.push(handler);
	}

	pub fn remove_all_handlers(&self, channel: &str) {
		self.handlers.write().expect("locked").remove(channel);
	}

	/// Publish raw bytes on a channel, bounded by the publish deadline.
	pub async fn publish(&self, channel: &str, payload: Bytes) -> Result {
		let db = self.services.db.clone();

		match timeout(self.publish_timeout, db.publish(channel, payload)).await {
			| Ok(result) => result.map(|_| ()),
			| Err(_) => Err!("publish on {channel:?} timed out"),
		}
	}

	/// JSON-encode and publish a value.
	pub async fn publish_json<T: serde::Serialize>(&self, channel: &str, payload: &T) -> Result {
		let bytes = serde_json::to_vec(payload)?;

		self.publish(channel, Bytes::from(bytes)).await
	}

	/// Wrap and publish a room-scoped event on `room:<roomId>`.
	pub async fn publish_to_room(&self, room_id: &str, kind: &str, data: Value) -> Result {
		let envelope = Envelope::room(room_id, kind, data);

		self.publish_json(&channel::room(room_id), &envelope)
			.await
	}

	/// Wrap and publish a user-targeted event on `user:<userId>`.
	pub async fn publish_to_user(&self, user_id: &str, kind: &str, data: Value) -> Result {
		let envelope = Envelope::user(user_id, kind, data);

		self.publish_json(&channel::user(user_id), &envelope)
			.await
	}

	/// Wrap and publish a system-wide event on `global:<eventType>`.
	pub async fn publish_global(&self, kind: &str, data: Value) -> Result {
		let envelope = Envelope::global(kind, data);

		self.publish_json(&channel::global(kind), &envelope)
			.await
	}

	/// Route one frame to every matching handler. Literal handlers first,
	/// then the wildcard covering the channel's final segment. Each handler
	/// runs isolated; ordering between them is not guaranteed.
	pub(crate) fn dispatch(&self, message: &BusMessage) {
		let channel = &*message.channel;
		if !self.is_subscribed(channel) {
			trace!(channel, "frame on unsubscribed channel");
			return;
		}

		let targets = {
			let handlers = self.handlers.read().expect("locked");
			let mut targets: Vec<Handler> = Vec::new();

			if let Some(literal) = handlers.get(channel) {
				targets.extend(literal.iter().cloned());
			}

			if let Some(wildcard) = wildcard_of(channel)
				&& let Some(matched) = handlers.get(&wildcard)
			{
				targets.extend(matched.iter().cloned());
			}

			targets
		};

		debug!(channel, handlers = targets.len(), "dispatching frame");
		for handler in targets {
			let channel = channel.to_owned();
			let payload = message.payload.clone();

			tokio::spawn(async move {
				let result = AssertUnwindSafe(async { handler(&channel, &payload) })
					.catch_unwind()
					.await;

				if result.is_err() {
					error!(channel, "event handler panicked");
				}
			});
		}
	}

	fn is_subscribed(&self, channel: &str) -> bool {
		let subscriptions = self.subscriptions.read().expect("locked");

		if subscriptions.contains(channel) {
			return true;
		}

		wildcard_of(channel).is_some_and(|wildcard| subscriptions.contains(&wildcard))
	}
}

/// The wildcard channel which would match this literal one: everything up
/// to the last `:`-segment, plus `*`. `room:sync:42` -> `room:sync:*`.
fn wildcard_of(channel: &str) -> Option<String> {
	channel
		.rsplit_once(':')
		.map(|(prefix, _)| format!("{prefix}:*"))
}
