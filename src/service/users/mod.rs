use std::sync::Arc;

use waveroom_core::{
	Err, Result,
	model::{Role, User},
	utils,
};

use crate::service;

/// Accessor over the durable user records; everything identity-shaped the
/// other services need (role checks, username lookup, public snapshots)
/// funnels through here.
pub struct Service {
	services: Arc<crate::services::OnceServices>,
}

impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self { services: args.services.clone() }))
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	pub async fn get_user(&self, user_id: &str) -> Result<User> {
		self.services.db.users.get(user_id).await
	}

	pub async fn user_exists(&self, user_id: &str) -> bool {
		self.services.db.users.get(user_id).await.is_ok()
	}

	/// Usernames are unique case-insensitively.
	pub async fn get_user_by_username(&self, username: &str) -> Result<User> {
		let needle = username.to_lowercase();

		let mut found = self
			.services
			.db
			.users
			.find(|user: &User| user.username.to_lowercase() == needle)
			.await?;

		found
			.pop()
			.ok_or_else(|| waveroom_core::err!(NotFound("no user named {username:?}")))
	}

	/// Create a user record; registration must be open and the username
	/// free.
	pub async fn create_user(&self, username: &str) -> Result<User> {
		if !self.services.globals.features().enable_registration {
			return Err!(FeatureDisabled("registration"));
		}

		if username.trim().is_empty() {
			return Err!(BadRequest("username cannot be empty"));
		}

		if self.get_user_by_username(username).await.is_ok() {
			return Err!(Conflict("username {username:?} is taken"));
		}

		let user = User {
			id: self.services.globals.new_id(),
			username: username.to_owned(),
			roles: [Role::User].into(),
			profile: serde_json::Value::Null,
			settings: serde_json::Value::Null,
			banned_users: Default::default(),
			created_at: utils::millis_since_unix_epoch(),
			last_login: 0,
		};

		self.services.db.users.insert(&user.id, &user).await?;

		Ok(user)
	}

	pub async fn save_user(&self, user: &User) -> Result {
		self.services.db.users.put(&user.id, user).await
	}

	pub async fn has_role(&self, user_id: &str, role: Role) -> Result<bool> {
		Ok(self.get_user(user_id).await?.has_role(role))
	}

	pub async fn is_admin(&self, user_id: &str) -> bool {
		self.has_role(user_id, Role::Admin)
			.await
			.unwrap_or(false)
	}
}
