use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use waveroom_core::{
	Err, Result, debug, error, info,
	model::{Ban, BanDuration, ModAction, ModerationLogEntry, Report},
	result::{LogDebugErr, LogErr},
	utils, warn,
};

use crate::service;

/// Scope key for bans that apply everywhere.
const GLOBAL: &str = "global";

/// A report handler runs in its own task per report; a panic is contained.
pub type ReportHandler = Arc<dyn Fn(&Report) + Send + Sync>;

/// The moderation overlay: every active ban held in memory, consulted on
/// every join/chat/queue action; the document store keeps the durable copy
/// and the audit trail. Mutes are lighter and live only on the room state.
pub struct Service {
	services: Arc<crate::services::OnceServices>,
	/// room id (or "global") -> user id -> ban
	bans: RwLock<BanIndex>,
	report_handlers: std::sync::RwLock<Vec<ReportHandler>>,
}

type BanIndex = HashMap<String, HashMap<String, Ban>>;

#[async_trait]
impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self {
			services: args.services.clone(),
			bans: RwLock::new(BanIndex::new()),
			report_handlers: std::sync::RwLock::new(Vec::new()),
		}))
	}

	/// Load every active ban before traffic arrives.
	async fn worker(self: Arc<Self>) -> Result {
		self.load_bans().await?;

		Ok(())
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	pub(crate) async fn load_bans(&self) -> Result {
		let active = self
			.services
			.db
			.user_bans
			.find(|ban: &Ban| ban.active)
			.await?;

		let mut index = BanIndex::new();
		let now = utils::millis_since_unix_epoch();
		let mut expired = 0_usize;

		for ban in active {
			if ban.is_expired(now) {
				// discovered stale on load; flip the stored record
				self.deactivate_ban(&ban).await;
				expired = expired.saturating_add(1);
				continue;
			}

			let scope = if ban.is_global() { GLOBAL.to_owned() } else { ban.room_id.clone() };
			index
				.entry(scope)
				.or_default()
				.insert(ban.user_id.clone(), ban);
		}

		let loaded: usize = index.values().map(HashMap::len).sum();
		info!(loaded, expired, "moderation overlay loaded");

		*self.bans.write().await = index;

		Ok(())
	}

	/// Global scope wins over room scope. A ban found expired is lazily
	/// flipped inactive and ignored.
	pub async fn is_user_banned(&self, user_id: &str, room_id: &str) -> Option<Ban> {
		let now = utils::millis_since_unix_epoch();

		let (ban, scope) = {
			let bans = self.bans.read().await;

			let global = bans.get(GLOBAL).and_then(|scope| scope.get(user_id));
			let scoped = bans.get(room_id).and_then(|scope| scope.get(user_id));

			match (global, scoped) {
				| (Some(ban), _) => (ban.clone(), GLOBAL.to_owned()),
				| (None, Some(ban)) => (ban.clone(), room_id.to_owned()),
				| (None, None) => return None,
			}
		};

		if ban.is_expired(now) {
			debug!(user_id, room_id, "ban expired; lazily deactivating");
			self.bans
				.write()
				.await
				.entry(scope)
				.or_default()
				.remove(user_id);
			self.deactivate_ban(&ban).await;

			return None;
		}

		Some(ban)
	}

	/// Record a ban, index it, evict the user if room-scoped, and leave an
	/// audit line. The eviction and audit never fail the ban itself.
	pub async fn ban_user(
		&self,
		user_id: &str,
		room_id: &str,
		moderator_id: &str,
		reason: &str,
		duration: BanDuration,
	) -> Result<Ban> {
		if user_id == moderator_id {
			return Err!(BadRequest("cannot ban yourself"));
		}

		let now = utils::millis_since_unix_epoch();
		let ban = Ban {
			id: self.services.globals.new_id(),
			user_id: user_id.to_owned(),
			room_id: room_id.to_owned(),
			moderator_id: moderator_id.to_owned(),
			reason: reason.to_owned(),
			duration,
			start_time: now,
			end_time: duration.end_time(now),
			active: true,
		};

		self.services
			.db
			.user_bans
			.insert(&ban.id, &ban)
			.await?;

		let scope = if ban.is_global() { GLOBAL.to_owned() } else { room_id.to_owned() };
		self.bans
			.write()
			.await
			.entry(scope)
			.or_default()
			.insert(user_id.to_owned(), ban.clone());

		if !ban.is_global() {
			if let Err(e) = self
				.services
				.state
				.remove_user_from_room(room_id, user_id)
				.await
				&& !e.is_not_found()
			{
				warn!(user_id, room_id, "failed to evict banned user: {e}");
			}

			self.services
				.pubsub
				.publish_to_room(
					room_id,
					"moderation",
					json!({ "action": "ban", "userId": user_id, "reason": reason }),
				)
				.await
				.log_debug_err()
				.ok();
		}

		self.log_action(
			ModAction::Ban,
			user_id,
			moderator_id,
			room_id,
			reason,
			json!({ "duration": duration, "endTime": ban.end_time }),
		);

		info!(user_id, room_id, moderator_id, "user banned");

		Ok(ban)
	}

	/// Deactivate every matching ban record and clear the index slot.
	pub async fn unban_user(
		&self,
		user_id: &str,
		room_id: &str,
		moderator_id: &str,
		reason: &str,
	) -> Result {
		let matching = self
			.services
			.db
			.user_bans
			.find(|ban: &Ban| ban.active && ban.user_id == user_id && ban.room_id == room_id)
			.await?;

		if matching.is_empty() {
			return Err!(NotFound("no active ban for {user_id} in scope {room_id:?}"));
		}

		for ban in matching {
			self.deactivate_ban(&ban).await;
		}

		let scope = if room_id.is_empty() { GLOBAL } else { room_id };
		self.bans
			.write()
			.await
			.entry(scope.to_owned())
			.or_default()
			.remove(user_id);

		self.log_action(ModAction::Unban, user_id, moderator_id, room_id, reason, Value::Null);

		info!(user_id, room_id, moderator_id, "user unbanned");

		Ok(())
	}

	/// Mute rides on the room's live state; it does not outlive the room's
	/// TTL and that is intentional.
	pub async fn mute_user(
		&self,
		room_id: &str,
		user_id: &str,
		moderator_id: &str,
		duration: Duration,
		reason: &str,
	) -> Result {
		let mut state = self.services.state.get_room_state(room_id).await?;

		let deadline = utils::millis_since_unix_epoch().saturating_add(duration_millis(duration));
		state
			.data
			.muted_users
			.get_or_insert_with(Default::default)
			.insert(user_id.to_owned(), deadline);

		self.services.state.update_room_state(&mut state).await?;

		self.services
			.pubsub
			.publish_to_room(
				room_id,
				"moderation",
				json!({ "action": "mute", "userId": user_id, "until": deadline }),
			)
			.await
			.log_debug_err()
			.ok();

		self.log_action(ModAction::Mute, user_id, moderator_id, room_id, reason, Value::Null);

		Ok(())
	}

	pub async fn unmute_user(
		&self,
		room_id: &str,
		user_id: &str,
		moderator_id: &str,
	) -> Result {
		let mut state = self.services.state.get_room_state(room_id).await?;

		let removed = state
			.data
			.muted_users
			.as_mut()
			.is_some_and(|muted| muted.remove(user_id).is_some());

		if removed {
			self.services.state.update_room_state(&mut state).await?;
		}

		self.services
			.pubsub
			.publish_to_room(
				room_id,
				"moderation",
				json!({ "action": "unmute", "userId": user_id }),
			)
			.await
			.log_debug_err()
			.ok();

		self.log_action(ModAction::Unmute, user_id, moderator_id, room_id, "", Value::Null);

		Ok(())
	}

	/// A mute past its deadline reads as unmuted and is scrubbed on sight.
	pub async fn is_user_muted(&self, room_id: &str, user_id: &str) -> Result<bool> {
		let mut state = match self.services.state.get_room_state(room_id).await {
			| Ok(state) => state,
			| Err(e) if e.is_not_found() => return Ok(false),
			| Err(e) => return Err(e),
		};

		let Some(muted) = state.data.muted_users.as_mut() else {
			return Ok(false);
		};

		let Some(deadline) = muted.get(user_id).copied() else {
			return Ok(false);
		};

		if deadline <= utils::millis_since_unix_epoch() {
			muted.remove(user_id);
			self.services
				.state
				.update_room_state(&mut state)
				.await
				.log_debug_err()
				.ok();

			return Ok(false);
		}

		Ok(true)
	}

	pub async fn kick_user(
		&self,
		room_id: &str,
		user_id: &str,
		moderator_id: &str,
		reason: &str,
	) -> Result {
		self.services
			.state
			.remove_user_from_room(room_id, user_id)
			.await?;

		self.services
			.pubsub
			.publish_to_room(
				room_id,
				"moderation",
				json!({ "action": "kick", "userId": user_id, "reason": reason }),
			)
			.await
			.log_debug_err()
			.ok();

		self.log_action(ModAction::Kick, user_id, moderator_id, room_id, reason, Value::Null);

		info!(user_id, room_id, moderator_id, "user kicked");

		Ok(())
	}

	pub async fn report_user(
		&self,
		reporter_id: &str,
		user_id: &str,
		room_id: &str,
		reason: &str,
	) -> Result<Report> {
		if reason.trim().is_empty() {
			return Err!(BadRequest("a report needs a reason"));
		}

		let report = Report {
			id: self.services.globals.new_id(),
			reporter_id: reporter_id.to_owned(),
			user_id: user_id.to_owned(),
			room_id: room_id.to_owned(),
			reason: reason.to_owned(),
			created_at: utils::millis_since_unix_epoch(),
			resolved: false,
			resolved_by: None,
			resolution: None,
		};

		self.services
			.db
			.user_reports
			.insert(&report.id, &report)
			.await?;

		// every registered handler sees the report, each in its own task
		let handlers = self.report_handlers.read().expect("locked").clone();
		for handler in handlers {
			let report = report.clone();
			tokio::spawn(async move {
				let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
					handler(&report);
				}));

				if result.is_err() {
					error!(report_id = %report.id, "report handler panicked");
				}
			});
		}

		Ok(report)
	}

	pub async fn resolve_report(
		&self,
		report_id: &str,
		moderator_id: &str,
		resolution: &str,
	) -> Result {
		let mut report: Report = self.services.db.user_reports.get(report_id).await?;

		if report.resolved {
			return Err!(Conflict("report {report_id} is already resolved"));
		}

		report.resolved = true;
		report.resolved_by = Some(moderator_id.to_owned());
		report.resolution = Some(resolution.to_owned());

		self.services
			.db
			.user_reports
			.put(report_id, &report)
			.await
	}

	pub fn add_report_handler(&self, handler: ReportHandler) {
		self.report_handlers
			.write()
			.expect("locked")
			.push(handler);
	}

	async fn deactivate_ban(&self, ban: &Ban) {
		let mut stale = ban.clone();
		stale.active = false;

		self.services
			.db
			.user_bans
			.put(&stale.id, &stale)
			.await
			.log_err()
			.ok();
	}

	/// Audit is fire-and-forget: losing a log line is logged, never fatal
	/// to the action that produced it.
	fn log_action(
		&self,
		action: ModAction,
		user_id: &str,
		moderator_id: &str,
		room_id: &str,
		reason: &str,
		details: Value,
	) {
		let entry = ModerationLogEntry {
			id: self.services.globals.new_id(),
			action,
			user_id: user_id.to_owned(),
			moderator_id: moderator_id.to_owned(),
			room_id: room_id.to_owned(),
			reason: reason.to_owned(),
			timestamp: utils::millis_since_unix_epoch(),
			details,
		};

		let services = self.services.clone();
		tokio::spawn(async move {
			services
				.db
				.moderation_log
				.insert(&entry.id, &entry)
				.await
				.log_err()
				.ok();
		});
	}
}

#[allow(clippy::as_conversions)]
fn duration_millis(duration: Duration) -> u64 { duration.as_millis() as u64 }
