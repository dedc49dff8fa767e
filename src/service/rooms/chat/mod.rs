use std::sync::Arc;

use serde_json::json;
use waveroom_core::{
	Err, Result, debug,
	model::{ChatMessage, Room},
	result::LogErr,
	utils,
};

use crate::service;

/// Chat rides the room channel. Every message passes the moderation
/// overlays before it exists: room active, sender present, chat enabled,
/// sender neither banned nor muted. The stored record is the truth; the
/// broadcast is best-effort.
pub struct Service {
	services: Arc<crate::services::OnceServices>,
}

impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self { services: args.services.clone() }))
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	pub async fn send_message(
		&self,
		room_id: &str,
		user_id: &str,
		content: &str,
	) -> Result<ChatMessage> {
		if content.trim().is_empty() {
			return Err!(BadRequest("message content cannot be empty"));
		}

		let room: Room = self.services.db.rooms.get(room_id).await?;
		let state = self.services.state.get_room_state(room_id).await?;
		if !state.is_active {
			return Err!(NotFound("room {room_id} is not active"));
		}

		if !self
			.services
			.state
			.is_user_in_room(room_id, user_id)
			.await?
		{
			return Err!(Forbidden("must be in the room to chat"));
		}

		let settings = state
			.data
			.settings
			.clone()
			.unwrap_or_else(|| room.settings.clone());
		if !settings.chat_enabled {
			return Err!(Forbidden("chat is disabled in this room"));
		}

		if room.banned_users.contains(user_id) {
			return Err!(Forbidden("banned from this room"));
		}

		if self
			.services
			.moderation
			.is_user_muted(room_id, user_id)
			.await?
		{
			return Err!(Forbidden("muted in this room"));
		}

		let user = self.services.users.get_user(user_id).await?;
		let message = ChatMessage {
			id: self.services.globals.new_id(),
			room_id: room_id.to_owned(),
			user_id: user_id.to_owned(),
			username: user.username.clone(),
			user_role: room.role_of(user_id),
			content: content.to_owned(),
			created_at: utils::millis_since_unix_epoch(),
			deleted: false,
			deleted_by: None,
			deleted_at: None,
		};

		// persistence is load-bearing; the broadcast is not
		self.services
			.db
			.messages
			.insert(&message.id, &message)
			.await?;

		self.services
			.pubsub
			.publish_to_room(room_id, "chat_message", serde_json::to_value(&message)?)
			.await
			.log_err()
			.ok();

		debug!(room_id, user_id, message_id = %message.id, "chat message sent");

		Ok(message)
	}

	/// Page backwards through a room's messages, newest first. `before`
	/// bounds by creation stamp for cursorless scrollback.
	pub async fn get_messages(
		&self,
		room_id: &str,
		limit: usize,
		before: Option<u64>,
	) -> Result<Vec<ChatMessage>> {
		let mut messages = self
			.services
			.db
			.messages
			.find(|message: &ChatMessage| {
				message.room_id == room_id
					&& before.is_none_or(|before| message.created_at < before)
			})
			.await?;

		messages.sort_unstable_by(|a, b| {
			b.created_at
				.cmp(&a.created_at)
				.then_with(|| b.id.cmp(&a.id))
		});
		messages.truncate(limit);

		Ok(messages)
	}

	/// Tombstone a message. The author may delete their own; the room's
	/// owner and moderators may delete anything.
	pub async fn delete_message(
		&self,
		room_id: &str,
		message_id: &str,
		user_id: &str,
	) -> Result {
		let room: Room = self.services.db.rooms.get(room_id).await?;
		let mut message: ChatMessage = self.services.db.messages.get(message_id).await?;

		if message.room_id != room_id {
			return Err!(NotFound("message {message_id} not found in room {room_id}"));
		}

		let authorised = message.user_id == user_id || room.is_moderator(user_id);
		if !authorised {
			return Err!(Forbidden("cannot delete another user's message"));
		}

		message.deleted = true;
		message.deleted_by = Some(user_id.to_owned());
		message.deleted_at = Some(utils::millis_since_unix_epoch());

		self.services
			.db
			.messages
			.put(message_id, &message)
			.await?;

		self.services
			.pubsub
			.publish_to_room(
				room_id,
				"chat_message_deleted",
				json!({ "messageId": message_id, "deletedBy": user_id }),
			)
			.await
			.log_err()
			.ok();

		Ok(())
	}
}
