use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils;

/// The wire envelope every fan-out event travels in. Exactly one of
/// `room_id`/`user_id` is set for targeted events; global events carry
/// neither.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub room_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	pub data: Value,
	/// ISO-8601
	pub timestamp: String,
}

impl Envelope {
	#[must_use]
	pub fn room(room_id: &str, kind: &str, data: Value) -> Self {
		Self {
			kind: kind.to_owned(),
			room_id: Some(room_id.to_owned()),
			user_id: None,
			data,
			timestamp: utils::time::rfc3339_now(),
		}
	}

	#[must_use]
	pub fn user(user_id: &str, kind: &str, data: Value) -> Self {
		Self {
			kind: kind.to_owned(),
			room_id: None,
			user_id: Some(user_id.to_owned()),
			data,
			timestamp: utils::time::rfc3339_now(),
		}
	}

	#[must_use]
	pub fn global(kind: &str, data: Value) -> Self {
		Self {
			kind: kind.to_owned(),
			room_id: None,
			user_id: None,
			data,
			timestamp: utils::time::rfc3339_now(),
		}
	}
}

/// Channel naming for the fan-out bus. The wildcard form `<prefix>:*`
/// matches any single-segment suffix.
pub mod channel {
	#[must_use]
	pub fn room(room_id: &str) -> String { format!("room:{room_id}") }

	#[must_use]
	pub fn room_sync(room_id: &str) -> String { format!("room:sync:{room_id}") }

	#[must_use]
	pub fn user(user_id: &str) -> String { format!("user:{user_id}") }

	#[must_use]
	pub fn global(event_type: &str) -> String { format!("global:{event_type}") }
}
