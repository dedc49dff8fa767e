use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
	pub id: String,
	/// Unique, matched case-insensitively.
	pub slug: String,
	pub name: String,
	pub created_by: String,
	#[serde(default)]
	pub moderators: BTreeSet<String>,
	#[serde(default)]
	pub banned_users: BTreeSet<String>,
	#[serde(default)]
	pub settings: RoomSettings,
	pub is_active: bool,
	pub last_activity: u64,
	pub created_at: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
	pub capacity: u32,
	pub chat_enabled: bool,
	pub waitlist_max: u32,
}

impl Default for RoomSettings {
	fn default() -> Self {
		Self {
			capacity: 200,
			chat_enabled: true,
			waitlist_max: 50,
		}
	}
}

/// Rank of a user within one room, derived, never stored.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomRole {
	Owner,
	Moderator,
	User,
}

impl Room {
	#[must_use]
	pub fn role_of(&self, user_id: &str) -> RoomRole {
		if self.created_by == user_id {
			RoomRole::Owner
		} else if self.moderators.contains(user_id) {
			RoomRole::Moderator
		} else {
			RoomRole::User
		}
	}

	#[inline]
	#[must_use]
	pub fn is_moderator(&self, user_id: &str) -> bool {
		matches!(self.role_of(user_id), RoomRole::Owner | RoomRole::Moderator)
	}
}
