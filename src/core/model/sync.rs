use serde::{Deserialize, Serialize};

use crate::utils;

/// Playback clock overlay carried in the room state. Reads adjust
/// `current_time` by the wall time elapsed since `last_updated` so every
/// client derives the same position without a tick stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
	/// Seconds into the current track.
	pub current_time: f64,
	/// Track length in seconds.
	pub duration: f64,
	pub is_playing: bool,
	#[serde(default)]
	pub current_track: String,
	pub volume: f64,
	pub last_updated: u64,
}

impl Default for PlaybackState {
	fn default() -> Self {
		Self {
			current_time: 0.0,
			duration: 0.0,
			is_playing: false,
			current_track: String::new(),
			volume: 1.0,
			last_updated: utils::millis_since_unix_epoch(),
		}
	}
}

impl PlaybackState {
	/// Effective position at `now_millis`, clamped to the track length.
	#[must_use]
	#[allow(clippy::as_conversions, clippy::cast_precision_loss)]
	pub fn at(&self, now_millis: u64) -> Self {
		if !self.is_playing {
			return self.clone();
		}

		let elapsed = now_millis.saturating_sub(self.last_updated) as f64 / 1000.0;
		let mut state = self.clone();
		state.current_time = (self.current_time + elapsed).min(self.duration);
		state.last_updated = now_millis;

		state
	}
}

/// The closed set of playback transitions broadcast on `room:sync:<roomId>`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEvent {
	Play,
	Pause,
	Seek,
	TrackChange,
	VolumeChange,
	QueueUpdate,
	UserJoin,
	UserLeave,
	RoomUpdate,
}

impl SyncEvent {
	#[must_use]
	pub fn as_str(&self) -> &'static str {
		match self {
			| Self::Play => "play",
			| Self::Pause => "pause",
			| Self::Seek => "seek",
			| Self::TrackChange => "track_change",
			| Self::VolumeChange => "volume_change",
			| Self::QueueUpdate => "queue_update",
			| Self::UserJoin => "user_join",
			| Self::UserLeave => "user_leave",
			| Self::RoomUpdate => "room_update",
		}
	}
}

impl std::fmt::Display for SyncEvent {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMessage {
	pub room_id: String,
	pub user_id: String,
	pub event: SyncEvent,
	pub state: PlaybackState,
	pub timestamp: u64,
}
