use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::user::Role;

/// One authenticated client. Stored under `session:<token>` with the
/// access-token lifetime as TTL; a reverse index `token:<userId>` keeps the
/// at-most-one-session-per-user rule enforceable.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	pub user_id: String,
	pub username: String,
	#[serde(default)]
	pub roles: std::collections::BTreeSet<Role>,
	#[serde(default)]
	pub ip: String,
	#[serde(default)]
	pub user_agent: String,
	pub created_at: u64,
	pub expires_at: u64,
	pub last_activity: u64,
	#[serde(default)]
	pub data: BTreeMap<String, Value>,
}

impl Session {
	#[inline]
	#[must_use]
	pub fn is_expired(&self, now: u64) -> bool { now > self.expires_at }
}
