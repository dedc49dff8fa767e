use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Heartbeat-refreshed liveness record under `presence:<userId>`. Status is
/// an open string; the well-known values live in [`status`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
	pub user_id: String,
	pub username: String,
	pub status: String,
	pub last_activity: u64,
	#[serde(default)]
	pub current_room_id: String,
	pub last_seen: u64,
	#[serde(default)]
	pub data: BTreeMap<String, Value>,
}

pub mod status {
	pub const ONLINE: &str = "online";
	pub const AWAY: &str = "away";
	pub const BUSY: &str = "busy";
	pub const OFFLINE: &str = "offline";
}
