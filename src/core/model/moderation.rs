use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Err, Result};

/// Ban lengths are a closed set; anything finer-grained belongs to mutes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum BanDuration {
	#[serde(rename = "1h")]
	OneHour,
	#[serde(rename = "24h")]
	OneDay,
	#[serde(rename = "7d")]
	SevenDays,
	#[serde(rename = "30d")]
	ThirtyDays,
	#[serde(rename = "permanent")]
	Permanent,
}

impl BanDuration {
	pub fn parse(duration: &str) -> Result<Self> {
		match duration {
			| "1h" => Ok(Self::OneHour),
			| "24h" => Ok(Self::OneDay),
			| "7d" => Ok(Self::SevenDays),
			| "30d" => Ok(Self::ThirtyDays),
			| "permanent" => Ok(Self::Permanent),
			| other => Err!(BadRequest(
				"Invalid ban duration '{other}'; allowed are 1h, 24h, 7d, 30d, permanent"
			)),
		}
	}

	/// None for a permanent ban.
	#[must_use]
	pub fn as_duration(&self) -> Option<Duration> {
		let secs = match self {
			| Self::OneHour => 60 * 60,
			| Self::OneDay => 24 * 60 * 60,
			| Self::SevenDays => 7 * 24 * 60 * 60,
			| Self::ThirtyDays => 30 * 24 * 60 * 60,
			| Self::Permanent => return None,
		};

		Some(Duration::from_secs(secs))
	}

	/// Expiry in unix-millis given a start point; 0 encodes "never".
	#[must_use]
	#[allow(clippy::as_conversions)]
	pub fn end_time(&self, start_millis: u64) -> u64 {
		self.as_duration()
			.map(|d| start_millis.saturating_add(d.as_millis() as u64))
			.unwrap_or(0)
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ban {
	pub id: String,
	pub user_id: String,
	/// Empty string scopes the ban globally.
	#[serde(default)]
	pub room_id: String,
	pub moderator_id: String,
	#[serde(default)]
	pub reason: String,
	pub duration: BanDuration,
	pub start_time: u64,
	/// 0 when the ban never expires.
	#[serde(default)]
	pub end_time: u64,
	pub active: bool,
}

impl Ban {
	#[inline]
	#[must_use]
	pub fn is_global(&self) -> bool { self.room_id.is_empty() }

	#[inline]
	#[must_use]
	pub fn is_expired(&self, now: u64) -> bool { self.end_time != 0 && self.end_time < now }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModAction {
	Warn,
	Mute,
	Unmute,
	Kick,
	Ban,
	Unban,
	DeleteMessage,
}

/// Append-only audit record; written fire-and-forget by every moderation
/// operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationLogEntry {
	pub id: String,
	pub action: ModAction,
	pub user_id: String,
	pub moderator_id: String,
	#[serde(default)]
	pub room_id: String,
	#[serde(default)]
	pub reason: String,
	pub timestamp: u64,
	#[serde(default)]
	pub details: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
	pub id: String,
	pub reporter_id: String,
	pub user_id: String,
	#[serde(default)]
	pub room_id: String,
	pub reason: String,
	pub created_at: u64,
	#[serde(default)]
	pub resolved: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resolved_by: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resolution: Option<String>,
}
