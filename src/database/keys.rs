//! Key namespace of the shared store. Every live key the system writes is
//! built here so the layout stays greppable in one place.

use waveroom_core::model::VoteType;

/// String, JSON session record. TTL = access-token lifetime.
#[must_use]
pub fn session(token: &str) -> String { format!("session:{token}") }

/// String, reverse index token for a user. Same TTL as the session.
#[must_use]
pub fn user_token(user_id: &str) -> String { format!("token:{user_id}") }

/// String, JSON presence record. TTL 2 minutes.
#[must_use]
pub fn presence(user_id: &str) -> String { format!("presence:{user_id}") }

/// Set of user ids with live presence.
pub const ONLINE_USERS: &str = "online:users";

/// String, JSON live room state. TTL 12h active / 7d hibernating.
#[must_use]
pub fn room_state(room_id: &str) -> String { format!("room:state:{room_id}") }

/// Set of occupant user ids; cardinality mirrors RoomState.activeUsers.
#[must_use]
pub fn room_users(room_id: &str) -> String { format!("room:users:{room_id}") }

/// List of JSON queue entries in rotation order.
#[must_use]
pub fn room_queue(room_id: &str) -> String { format!("room:queue:{room_id}") }

/// String, the playing media id. TTL = track duration + 60s.
#[must_use]
pub fn room_media(room_id: &str) -> String { format!("room:media:{room_id}") }

/// List of JSON history entries, newest first, trimmed on append.
#[must_use]
pub fn room_history(room_id: &str) -> String { format!("room:history:{room_id}") }

/// String counter per vote type per (room, media).
#[must_use]
pub fn vote_count(room_id: &str, media_id: &str, vote: VoteType) -> String {
	format!("room:votes:{room_id}:{media_id}:{vote}:count")
}

/// String, one voter's current vote type. TTL 24h.
#[must_use]
pub fn vote_user(room_id: &str, media_id: &str, user_id: &str) -> String {
	format!("room:votes:{room_id}:{media_id}:{user_id}")
}

/// Sorted set of request timestamps for a sliding rate-limit window.
#[must_use]
pub fn ratelimit(action: &str, identifier: &str) -> String {
	format!("ratelimit:{action}:{identifier}")
}

/// String marker opening the disconnect grace window. TTL 24h.
#[must_use]
pub fn disconnect(user_id: &str) -> String { format!("disconnect:{user_id}") }

/// String, last room the user was seen in.
#[must_use]
pub fn user_room(user_id: &str) -> String { format!("user:room:{user_id}") }
