use std::{sync::Arc, time::Duration};

use waveroom_core::{Error, Result, debug, utils};
use waveroom_database::keys;

use crate::service;

/// One named limit: at most `max` events per `window`.
#[derive(Clone, Copy, Debug)]
pub struct Limit {
	pub action: &'static str,
	pub max: u32,
	pub window: Duration,
}

/// The pre-declared profiles. Enforcement belongs to callers; this
/// component only counts.
pub mod limits {
	use std::time::Duration;

	use super::Limit;

	const fn limit(action: &'static str, max: u32, window_secs: u64) -> Limit {
		Limit { action, max, window: Duration::from_secs(window_secs) }
	}

	// auth
	pub const LOGIN: Limit = limit("login", 5, 5 * 60);
	pub const REGISTER: Limit = limit("register", 3, 60 * 60);
	pub const PASSWORD_RESET: Limit = limit("password_reset", 3, 24 * 60 * 60);

	// api
	pub const API_GENERAL: Limit = limit("api_general", 100, 60);
	pub const MEDIA_SEARCH: Limit = limit("media_search", 20, 60);
	pub const ROOM_CREATE: Limit = limit("room_create", 5, 60 * 60);

	// websocket
	pub const WS_CONNECT: Limit = limit("ws_connect", 10, 60);
	pub const CHAT_MESSAGE: Limit = limit("chat_message", 30, 60);
	pub const DJ_SKIP: Limit = limit("dj_skip", 5, 5 * 60);
	pub const MEDIA_VOTE: Limit = limit("media_vote", 20, 60);
}

/// The verdict for one probe of the window.
#[derive(Clone, Copy, Debug)]
pub struct Decision {
	pub allowed: bool,
	pub remaining: u32,
	pub retry_after: Option<Duration>,
}

/// Sliding-window counter over a sorted set per (action, identifier):
/// scores and members are the millisecond stamps of accepted events.
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
	/// Probe and, when allowed, consume one slot of the window.
	pub async fn check(&self, limit: Limit, identifier: &str) -> Result<Decision> {
		let db = &self.services.db;
		let key = keys::ratelimit(limit.action, identifier);
		let now = utils::millis_since_unix_epoch();
		let window = window_millis(limit.window);

		// everything older than the window slides off first
		db.zrem_range_by_score(&key, now.saturating_sub(window))
			.await?;

		let count: u32 = db.zcard(&key).await?.try_into()?;

		if count < limit.max {
			db.zadd(&key, now, &now.to_string()).await?;
			db.expire(&key, limit.window.saturating_mul(2)).await?;

			return Ok(Decision {
				allowed: true,
				remaining: limit.max.saturating_sub(count).saturating_sub(1),
				retry_after: None,
			});
		}

		let oldest = db
			.zrange_with_scores(&key, 0, 0)
			.await?
			.first()
			.map(|(score, _)| *score)
			.unwrap_or(now);

		let retry_after = oldest.saturating_add(window).saturating_sub(now);
		debug!(
			action = limit.action,
			identifier, retry_after, "rate limit exceeded"
		);

		Ok(Decision {
			allowed: false,
			remaining: 0,
			retry_after: Some(Duration::from_millis(retry_after)),
		})
	}

	/// Like [`Self::check`] but rejects with a RateLimited error carrying
	/// the retry hint.
	pub async fn enforce(&self, limit: Limit, identifier: &str) -> Result<Decision> {
		let decision = self.check(limit, identifier).await?;

		if !decision.allowed {
			return Err(Error::RateLimited(
				decision
					.retry_after
					.unwrap_or(limit.window),
			));
		}

		Ok(decision)
	}
}

#[allow(clippy::as_conversions)]
fn window_millis(window: Duration) -> u64 { window.as_millis() as u64 }
