use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	User,
	Moderator,
	Admin,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	pub id: String,
	pub username: String,
	#[serde(default)]
	pub roles: BTreeSet<Role>,
	#[serde(default)]
	pub profile: Value,
	#[serde(default)]
	pub settings: Value,
	#[serde(default)]
	pub banned_users: BTreeSet<String>,
	pub created_at: u64,
	#[serde(default)]
	pub last_login: u64,
}

/// Trimmed projection broadcast to other occupants; never carries settings or
/// ban lists.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
	pub id: String,
	pub username: String,
	#[serde(default, skip_serializing_if = "Value::is_null")]
	pub profile: Value,
}

impl User {
	#[must_use]
	pub fn public(&self) -> PublicUser {
		PublicUser {
			id: self.id.clone(),
			username: self.username.clone(),
			profile: self.profile.clone(),
		}
	}

	#[inline]
	#[must_use]
	pub fn has_role(&self, role: Role) -> bool { self.roles.contains(&role) }

	#[inline]
	#[must_use]
	pub fn is_admin(&self) -> bool { self.has_role(Role::Admin) }
}

impl Role {
	#[must_use]
	pub fn as_str(&self) -> &'static str {
		match self {
			| Self::User => "user",
			| Self::Moderator => "moderator",
			| Self::Admin => "admin",
		}
	}
}

impl std::fmt::Display for Role {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}
