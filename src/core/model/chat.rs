use serde::{Deserialize, Serialize};

use super::room::RoomRole;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
	pub id: String,
	pub room_id: String,
	pub user_id: String,
	pub username: String,
	pub user_role: RoomRole,
	pub content: String,
	pub created_at: u64,
	#[serde(default)]
	pub deleted: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub deleted_by: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub deleted_at: Option<u64>,
}
