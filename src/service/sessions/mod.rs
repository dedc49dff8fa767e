use std::{sync::Arc, time::Duration};

use waveroom_core::{
	Err, Result, debug, debug_warn,
	model::{Session, User},
	result::LogDebugErr,
	utils,
};
use waveroom_database::keys;

use crate::service;

/// Token-to-session mapping with a reverse index per user. At most one
/// session stays live per user; a fresh login replaces and destroys the
/// previous one rather than orphaning it until TTL.
pub struct Service {
	services: Arc<crate::services::OnceServices>,
	session_ttl: Duration,
}

/// Tokens are opaque; only this prefix ever reaches the log stream.
const TOKEN_LOG_LEN: usize = 8;

impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self {
			services: args.services.clone(),
			session_ttl: Duration::from_secs(args.server.config.session_ttl_s),
		}))
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	/// Record a fresh login. Both keys commit in one transaction; a failure
	/// leaves neither behind.
	pub async fn create_session(
		&self,
		user: &User,
		token: &str,
		ip: &str,
		user_agent: &str,
	) -> Result<Session> {
		let db = &self.services.db;

		// a previous session for this user is replaced, not orphaned
		if let Ok(previous) = db.get(&keys::user_token(&user.id)).await
			&& previous != token
		{
			self.destroy_session(&previous).await.log_debug_err().ok();
		}

		let now = utils::millis_since_unix_epoch();
		let session = Session {
			user_id: user.id.clone(),
			username: user.username.clone(),
			roles: user.roles.clone(),
			ip: ip.to_owned(),
			user_agent: user_agent.to_owned(),
			created_at: now,
			expires_at: now.saturating_add(ttl_millis(self.session_ttl)),
			last_activity: now,
			data: Default::default(),
		};

		let result = db
			.transaction()
			.set_object(&keys::session(token), &session, Some(self.session_ttl))?
			.set(&keys::user_token(&user.id), token, Some(self.session_ttl))
			.execute()
			.await;

		if let Err(error) = result {
			debug_warn!(
				token = utils::truncated(token, TOKEN_LOG_LEN),
				"session write failed, cleaning both keys: {error}"
			);

			db.pipeline()
				.del(&keys::session(token))
				.del(&keys::user_token(&user.id))
				.execute()
				.await
				.log_debug_err()
				.ok();

			return Err(error);
		}

		debug!(
			user_id = %user.id,
			token = utils::truncated(token, TOKEN_LOG_LEN),
			"session created"
		);

		Ok(session)
	}

	/// Resolve a token. A record past its own expiry stamp is destroyed on
	/// sight even though the key TTL would catch it eventually.
	pub async fn get_session(&self, token: &str) -> Result<Session> {
		let session: Session = self
			.services
			.db
			.get_object(&keys::session(token))
			.await?;

		if session.is_expired(utils::millis_since_unix_epoch()) {
			debug!(
				token = utils::truncated(token, TOKEN_LOG_LEN),
				"session expired; destroying"
			);
			self.destroy_session(token).await.log_debug_err().ok();

			return Err!(NotFound("session expired"));
		}

		Ok(session)
	}

	/// Push the expiry horizon out to a full lifetime from now, on both keys.
	pub async fn refresh_session(&self, token: &str) -> Result<Session> {
		let mut session = self.get_session(token).await?;

		let now = utils::millis_since_unix_epoch();
		session.expires_at = now.saturating_add(ttl_millis(self.session_ttl));
		session.last_activity = now;

		let db = &self.services.db;
		db.transaction()
			.set_object(&keys::session(token), &session, Some(self.session_ttl))?
			.set(
				&keys::user_token(&session.user_id),
				token,
				Some(self.session_ttl),
			)
			.execute()
			.await?;

		Ok(session)
	}

	pub async fn destroy_session(&self, token: &str) -> Result {
		let db = &self.services.db;

		// resolve the owner so the reverse index goes too, unless it has
		// already been repointed at a newer token
		let owner = db
			.get_object::<Session>(&keys::session(token))
			.await
			.map(|session| session.user_id)
			.ok();

		let mut pipeline = db.pipeline().del(&keys::session(token));
		if let Some(user_id) = owner {
			let reverse = keys::user_token(&user_id);
			if db.get(&reverse).await.is_ok_and(|t| t == token) {
				pipeline = pipeline.del(&reverse);
			}
		}

		pipeline.execute().await?;

		debug!(
			token = utils::truncated(token, TOKEN_LOG_LEN),
			"session destroyed"
		);

		Ok(())
	}

	/// Destroy whatever session the user currently holds, by way of the
	/// reverse index; the only way to find a session from a user id.
	pub async fn destroy_user_sessions(&self, user_id: &str) -> Result {
		let token = self.services.db.get(&keys::user_token(user_id)).await;

		match token {
			| Ok(token) => self.destroy_session(&token).await,
			| Err(e) if e.is_not_found() => Ok(()),
			| Err(e) => Err(e),
		}
	}

}

#[allow(clippy::as_conversions)]
fn ttl_millis(ttl: Duration) -> u64 { ttl.as_millis() as u64 }
