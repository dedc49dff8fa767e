use std::{
	collections::HashMap,
	sync::{
		Arc, RwLock,
		atomic::{AtomicU64, Ordering},
	},
};

use serde_json::Value;
use tokio::sync::mpsc;
use waveroom_core::{
	Result, debug, debug_warn,
	model::{Envelope, PlaybackState, SyncEvent, SyncMessage},
	utils, warn,
};

use crate::service;

/// Lock-step playback. The room state carries the clock overlay; reads
/// project the position forward by elapsed wall time so every client lands
/// on the same second without a tick stream. Local consumers get a buffered
/// stream per room that drops rather than blocks.
pub struct Service {
	services: Arc<crate::services::OnceServices>,
	buffer: usize,
	next_id: AtomicU64,
	subscribers: RwLock<SubscriberMap>,
}

type SubscriberMap = HashMap<String, Vec<(u64, mpsc::Sender<SyncMessage>)>>;

/// One local subscription to a room's sync stream. Detach by handing it
/// back to [`Service::unsubscribe`].
pub struct Subscription {
	pub receiver: mpsc::Receiver<SyncMessage>,
	id: u64,
	room_id: String,
}

#[async_trait::async_trait]
impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self {
			services: args.services.clone(),
			buffer: args.server.config.sync_buffer,
			next_id: AtomicU64::new(1),
			subscribers: RwLock::new(SubscriberMap::new()),
		}))
	}

	/// Attach the bus side of the local fan-out: every frame on a
	/// `room:sync:*` channel feeds the room's subscriber streams. Worker
	/// restart re-registers, so clear our slot first.
	async fn worker(self: Arc<Self>) -> Result {
		self.services
			.pubsub
			.remove_all_handlers("room:sync:*");

		let self_ = self.clone();
		self.services.pubsub.add_handler(
			"room:sync:*",
			Arc::new(move |_channel, payload| self_.feed(payload)),
		);

		Ok(())
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	/// The effective playback state right now; a silent room reads as the
	/// default, stopped state.
	pub async fn get_playback_state(&self, room_id: &str) -> Result<PlaybackState> {
		let state = self.services.state.get_room_state(room_id).await;

		let playback = match state {
			| Ok(state) => state.data.playback_state.unwrap_or_default(),
			| Err(e) if e.is_not_found() => PlaybackState::default(),
			| Err(e) => return Err(e),
		};

		Ok(playback.at(utils::millis_since_unix_epoch()))
	}

	/// Store a new playback overlay and tell every client in the room which
	/// transition produced it.
	pub async fn update_playback_state(
		&self,
		room_id: &str,
		user_id: &str,
		mut playback: PlaybackState,
		event: SyncEvent,
	) -> Result {
		playback.last_updated = utils::millis_since_unix_epoch();

		let mut state = self.services.state.get_room_state(room_id).await?;
		state.data.playback_state = Some(playback.clone());
		self.services.state.update_room_state(&mut state).await?;

		let message = SyncMessage {
			room_id: room_id.to_owned(),
			user_id: user_id.to_owned(),
			event,
			state: playback,
			timestamp: utils::millis_since_unix_epoch(),
		};

		self.publish_sync(&message).await
	}

	/// Recompute and broadcast on join so the newcomer and everyone else
	/// reconcile to one clock.
	pub async fn sync_room_state(&self, room_id: &str, user_id: &str) -> Result {
		let playback = self.get_playback_state(room_id).await?;

		let message = SyncMessage {
			room_id: room_id.to_owned(),
			user_id: user_id.to_owned(),
			event: SyncEvent::UserJoin,
			state: playback,
			timestamp: utils::millis_since_unix_epoch(),
		};

		self.publish_sync(&message).await
	}

	async fn publish_sync(&self, message: &SyncMessage) -> Result {
		let channel = waveroom_core::model::event::channel::room_sync(&message.room_id);
		let envelope = Envelope::room(
			&message.room_id,
			message.event.as_str(),
			serde_json::to_value(message)?,
		);

		self.services
			.pubsub
			.publish_json(&channel, &envelope)
			.await
	}

	/// A lazy local stream of this room's sync messages, buffered; when the
	/// consumer cannot keep up, messages drop with a warning rather than
	/// blocking the dispatcher.
	#[must_use]
	pub fn subscribe_to_room(&self, room_id: &str) -> Subscription {
		let (sender, receiver) = mpsc::channel(self.buffer);
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);

		self.subscribers
			.write()
			.expect("locked")
			.entry(room_id.to_owned())
			.or_default()
			.push((id, sender));

		debug!(room_id, id, "sync subscription attached");

		Subscription { receiver, id, room_id: room_id.to_owned() }
	}

	pub fn unsubscribe(&self, subscription: &Subscription) {
		let mut subscribers = self.subscribers.write().expect("locked");

		if let Some(streams) = subscribers.get_mut(&subscription.room_id) {
			streams.retain(|(id, _)| *id != subscription.id);
			if streams.is_empty() {
				subscribers.remove(&subscription.room_id);
			}
		}

		debug!(
			room_id = %subscription.room_id,
			id = subscription.id,
			"sync subscription detached"
		);
	}

	/// Bus-to-local bridge. Runs inside a dispatch task; sends never block.
	fn feed(&self, payload: &[u8]) {
		let Ok(envelope) = serde_json::from_slice::<Envelope>(payload) else {
			debug_warn!("undecodable frame on sync channel");
			return;
		};

		let Ok(message) = serde_json::from_value::<SyncMessage>(envelope.data) else {
			debug_warn!("sync frame without a sync message payload");
			return;
		};

		let subscribers = self.subscribers.read().expect("locked");
		let Some(streams) = subscribers.get(&message.room_id) else {
			return;
		};

		for (id, sender) in streams {
			if sender.try_send(message.clone()).is_err() {
				warn!(
					room_id = %message.room_id,
					id,
					"sync subscriber full or gone; dropping message"
				);
			}
		}
	}
}

impl Subscription {
	#[inline]
	#[must_use]
	pub fn room_id(&self) -> &str { &self.room_id }
}
