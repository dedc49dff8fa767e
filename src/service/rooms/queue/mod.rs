use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use waveroom_core::{
	Err, Result, debug,
	model::{HistoryEntry, PublicUser, QueueEntry},
	result::{LogDebugErr, LogErr},
	utils,
};

use crate::service;

/// Rotation layer above the room state: enriches queue entries with user
/// snapshots for broadcast, carries the administrative reorder operations,
/// and announces every rotation on the room channel.
pub struct Service {
	services: Arc<crate::services::OnceServices>,
}

/// A queue entry as broadcast: the bare entry plus the user snapshot so
/// clients render without a second lookup.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSlot {
	#[serde(flatten)]
	pub entry: QueueEntry,
	pub user: Option<PublicUser>,
}

impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self { services: args.services.clone() }))
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	/// The rotation with user snapshots joined in; unknown users (deleted
	/// accounts) keep their slot with no snapshot.
	pub async fn queue_with_users(&self, room_id: &str) -> Result<Vec<QueueSlot>> {
		let queue = self.services.state.get_queue(room_id).await?;

		let mut slots = Vec::with_capacity(queue.len());
		for entry in queue {
			let user = self
				.services
				.users
				.get_user(&entry.user_id)
				.await
				.ok()
				.map(|user| user.public());

			slots.push(QueueSlot { entry, user });
		}

		Ok(slots)
	}

	/// Skip the playing track: rotate the decks and tell the room.
	pub async fn skip(&self, room_id: &str) -> Result<Option<String>> {
		let next = self.services.state.advance_dj(room_id).await?;

		self.broadcast_rotation(room_id, "dj_advance").await;

		Ok(next)
	}

	/// The current DJ starts a track; the room hears about it in one
	/// broadcast carrying the play clock.
	pub async fn play_media(
		&self,
		room_id: &str,
		dj_id: &str,
		media_id: &str,
		duration_secs: u64,
	) -> Result {
		let state = self.services.state.get_room_state(room_id).await?;
		if state.current_dj != dj_id {
			return Err!(Forbidden("only the current DJ may start a track"));
		}

		let state = self
			.services
			.state
			.set_current_media(room_id, media_id, duration_secs)
			.await?;

		self.services
			.pubsub
			.publish_to_room(
				room_id,
				"media_start",
				json!({
					"mediaId": media_id,
					"djId": dj_id,
					"mediaStartTime": state.media_start_time,
					"mediaEndTime": state.media_end_time,
				}),
			)
			.await
			.log_err()
			.ok();

		Ok(())
	}

	/// Randomize the rotation order. Positions re-densify on write.
	pub async fn shuffle_queue(&self, room_id: &str) -> Result {
		let _lock = self.services.state.lock_room(room_id).await;

		let mut queue = self.services.state.get_queue(room_id).await?;
		if queue.len() < 2 {
			return Ok(());
		}

		utils::shuffle(&mut queue);
		self.services
			.state
			.write_queue(room_id, queue.into_iter())
			.await?;

		debug!(room_id, "queue shuffled");
		self.broadcast_rotation(room_id, "queue_update").await;

		Ok(())
	}

	/// Move one user to a new slot, clamped to the queue's end.
	pub async fn move_in_queue(&self, room_id: &str, user_id: &str, new_position: usize) -> Result {
		let _lock = self.services.state.lock_room(room_id).await;

		let mut queue = self.services.state.get_queue(room_id).await?;

		let Some(index) = queue.iter().position(|e| e.user_id == user_id) else {
			return Err!(NotFound("user {user_id} is not in the queue"));
		};

		let entry = queue.remove(index);
		let new_position = new_position.min(queue.len());
		queue.insert(new_position, entry);

		self.services
			.state
			.write_queue(room_id, queue.into_iter())
			.await?;

		self.broadcast_rotation(room_id, "queue_update").await;

		Ok(())
	}

	/// Empty the rotation. The playing DJ finishes their track; the next
	/// advance then clears the decks.
	pub async fn clear_queue(&self, room_id: &str) -> Result {
		let _lock = self.services.state.lock_room(room_id).await;

		self.services
			.state
			.write_queue(room_id, std::iter::empty())
			.await?;

		debug!(room_id, "queue cleared");
		self.broadcast_rotation(room_id, "queue_update").await;

		Ok(())
	}

	pub async fn play_history(&self, room_id: &str) -> Result<Vec<HistoryEntry>> {
		self.services.state.get_history(room_id).await
	}

	/// Queue broadcasts are advisory; the store remains the truth when one
	/// is lost.
	async fn broadcast_rotation(&self, room_id: &str, kind: &str) {
		let slots = self
			.queue_with_users(room_id)
			.await
			.log_debug_err()
			.unwrap_or_default();

		let current_dj = self
			.services
			.state
			.get_room_state(room_id)
			.await
			.map(|state| state.current_dj)
			.unwrap_or_default();

		self.services
			.pubsub
			.publish_to_room(
				room_id,
				kind,
				json!({ "queue": slots, "currentDj": current_dj }),
			)
			.await
			.log_debug_err()
			.ok();
	}
}
