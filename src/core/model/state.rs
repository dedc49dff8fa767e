use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{room::RoomSettings, sync::PlaybackState};
use crate::utils;

/// Authoritative live view of one room. Persists in the keyed store under
/// `room:state:<roomId>` with an activity-dependent TTL.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
	pub room_id: String,
	pub is_active: bool,
	/// Mirror of the occupancy set cardinality; the updater maintains the
	/// equality, the reaper repairs drift.
	pub active_users: u64,
	/// Empty string when nobody holds the decks.
	#[serde(default)]
	pub current_dj: String,
	#[serde(default)]
	pub current_media: String,
	#[serde(default)]
	pub media_start_time: u64,
	#[serde(default)]
	pub media_end_time: u64,
	pub last_activity: u64,
	#[serde(default)]
	pub data: RoomStateData,
}

/// Typed overlays riding on the room state. Each field is explicit; the
/// open map this replaces grew exactly these four keys.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStateData {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub settings: Option<RoomSettings>,
	/// user id -> unmute deadline in unix-millis
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub muted_users: Option<BTreeMap<String, u64>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub playback_state: Option<PlaybackState>,
}

impl RoomState {
	#[must_use]
	pub fn new(room_id: &str) -> Self {
		Self {
			room_id: room_id.to_owned(),
			is_active: true,
			active_users: 0,
			current_dj: String::new(),
			current_media: String::new(),
			media_start_time: 0,
			media_end_time: 0,
			last_activity: utils::millis_since_unix_epoch(),
			data: RoomStateData::default(),
		}
	}

	#[inline]
	#[must_use]
	pub fn has_dj(&self) -> bool { !self.current_dj.is_empty() }

	#[inline]
	#[must_use]
	pub fn has_media(&self) -> bool { !self.current_media.is_empty() }

	/// Clear the now-playing fields; the next DJ must supply a fresh track.
	pub fn clear_media(&mut self) {
		self.current_media.clear();
		self.media_start_time = 0;
		self.media_end_time = 0;
	}
}

/// One slot in the DJ rotation. Positions are dense and zero-based; every
/// structural mutation rewrites them.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
	pub user_id: String,
	pub position: usize,
	pub join_time: u64,
	#[serde(default)]
	pub last_play: u64,
	#[serde(default)]
	pub play_count: u32,
}

impl QueueEntry {
	#[must_use]
	pub fn new(user_id: &str, position: usize) -> Self {
		Self {
			user_id: user_id.to_owned(),
			position,
			join_time: utils::millis_since_unix_epoch(),
			last_play: 0,
			play_count: 0,
		}
	}
}

/// Newest-first play log, trimmed to a fixed depth on append.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
	pub media_id: String,
	pub dj_id: String,
	pub time: u64,
	pub duration: u64,
}
