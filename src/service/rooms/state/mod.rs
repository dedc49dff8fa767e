use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use waveroom_core::{
	Err, Result, debug, debug_warn,
	model::{HistoryEntry, QueueEntry, RoomState, VoteCounts, VoteType},
	trace, utils,
};
use waveroom_database::{OpResult, keys};

use crate::service;

/// The authoritative live view of every room: occupancy, rotation, the
/// playing track, votes, history. Mutations serialize per room through the
/// lock map; the store's transactions cover the multi-key steps.
pub struct Service {
	services: Arc<crate::services::OnceServices>,
	history_limit: usize,
	capacity_default: u32,
	waitlist_default: u32,
	locks: Mutex<LockMap>,
}

type LockMap = HashMap<String, Arc<Mutex<()>>>;

/// State of a room somebody is inside.
const ACTIVE_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// State of a hibernating room; it survives a week before the store forgets
/// it.
const HIBERNATE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// One user's vote on one track.
const VOTE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Slack on the media key past the track length.
const MEDIA_TTL_GRACE: Duration = Duration::from_secs(60);

#[async_trait]
impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self {
			services: args.services.clone(),
			history_limit: args.server.config.history_limit,
			capacity_default: args.server.config.room_capacity_default,
			waitlist_default: args.server.config.waitlist_max_default,
			locks: Mutex::new(LockMap::new()),
		}))
	}

	async fn memory_usage(&self, out: &mut (dyn std::fmt::Write + Send)) -> Result {
		use std::fmt::Write as _;

		let keys = self.services.db.len();
		let rooms = self.locks.lock().await.len();
		writeln!(out, "keyed store: {keys} live keys across {rooms} touched rooms")?;

		Ok(())
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	/// Ensure a room's live state exists and is marked active. Idempotent.
	pub async fn init_room(&self, room_id: &str) -> Result<RoomState> {
		let _lock = self.lock_room(room_id).await;

		self.init_room_locked(room_id).await
	}

	async fn init_room_locked(&self, room_id: &str) -> Result<RoomState> {
		match self.get_room_state(room_id).await {
			| Ok(mut state) => {
				if !state.is_active {
					state.is_active = true;
					self.write_state(&mut state).await?;
				}

				Ok(state)
			},
			| Err(e) if e.is_not_found() => {
				debug!(room_id, "creating live room state");
				let mut state = RoomState::new(room_id);
				self.write_state(&mut state).await?;

				Ok(state)
			},
			| Err(e) => Err(e),
		}
	}

	pub async fn get_room_state(&self, room_id: &str) -> Result<RoomState> {
		self.services
			.db
			.get_object(&keys::room_state(room_id))
			.await
	}

	/// Write a full state record. Stamps activity; the TTL follows the
	/// activity flag so hibernating rooms age out on the long clock.
	pub async fn update_room_state(&self, state: &mut RoomState) -> Result {
		self.write_state(state).await
	}

	async fn write_state(&self, state: &mut RoomState) -> Result {
		state.last_activity = utils::millis_since_unix_epoch();

		let ttl = if state.is_active { ACTIVE_TTL } else { HIBERNATE_TTL };

		self.services
			.db
			.set_object(&keys::room_state(&state.room_id), state, Some(ttl))
			.await
	}

	pub async fn set_room_active(&self, room_id: &str, active: bool) -> Result {
		let _lock = self.lock_room(room_id).await;

		let mut state = self.get_room_state(room_id).await?;
		state.is_active = active;

		self.write_state(&mut state).await
	}

	/// Join: banned users are refused before anything is touched, capacity
	/// is enforced from the settings snapshot, then the occupancy set and
	/// its cardinality mirror move together.
	pub async fn add_user_to_room(&self, room_id: &str, user_id: &str) -> Result<RoomState> {
		if let Some(ban) = self
			.services
			.moderation
			.is_user_banned(user_id, room_id)
			.await
		{
			let reason = ban.reason;
			let until = if ban.end_time == 0 {
				"forever".to_owned()
			} else {
				ban.end_time.to_string()
			};

			return Err!(Forbidden("banned from this room: {reason} (until {until})"));
		}

		let _lock = self.lock_room(room_id).await;
		let db = &self.services.db;

		let mut state = self.init_room_locked(room_id).await?;

		let capacity = state
			.data
			.settings
			.as_ref()
			.map_or(self.capacity_default, |settings| settings.capacity);

		let occupancy = db.scard(&keys::room_users(room_id)).await?;
		if !db.sismember(&keys::room_users(room_id), user_id).await?
			&& occupancy >= capacity.try_into()?
		{
			return Err!(Conflict("room {room_id} is full"));
		}

		db.sadd(&keys::room_users(room_id), user_id).await?;
		db.set(&keys::user_room(user_id), room_id, None).await?;

		state.active_users = db
			.scard(&keys::room_users(room_id))
			.await?
			.try_into()?;
		state.is_active = true;
		self.write_state(&mut state).await?;

		Ok(state)
	}

	/// Leave: the queue entry goes too, the decks advance past a leaving
	/// DJ, and the last occupant out hibernates the room.
	pub async fn remove_user_from_room(&self, room_id: &str, user_id: &str) -> Result<RoomState> {
		let _lock = self.lock_room(room_id).await;
		let db = &self.services.db;

		let mut state = self.get_room_state(room_id).await?;

		db.srem(&keys::room_users(room_id), user_id).await?;
		db.del(&keys::user_room(user_id)).await?;

		let queue = self.get_queue(room_id).await?;
		if queue.iter().any(|entry| entry.user_id == user_id) {
			self.write_queue(room_id, queue.into_iter().filter(|e| e.user_id != user_id))
				.await?;
		}

		state.active_users = db
			.scard(&keys::room_users(room_id))
			.await?
			.try_into()?;

		if state.current_dj == user_id {
			state = self.advance_dj_locked(state).await?;
		}

		if state.active_users == 0 {
			debug!(room_id, "room empty; hibernating");
			state.is_active = false;
		}

		self.write_state(&mut state).await?;

		Ok(state)
	}

	/// Join the rotation. Requires presence in the room; a user already in
	/// the queue is refused and nothing changes. The first entry into an
	/// idle rotation takes the decks immediately.
	pub async fn add_user_to_queue(&self, room_id: &str, user_id: &str) -> Result<Vec<QueueEntry>> {
		let _lock = self.lock_room(room_id).await;
		let db = &self.services.db;

		let mut state = self.get_room_state(room_id).await?;

		if !db.sismember(&keys::room_users(room_id), user_id).await? {
			return Err!(Forbidden("must be in the room to join its queue"));
		}

		let mut queue = self.get_queue(room_id).await?;
		if queue.iter().any(|entry| entry.user_id == user_id) {
			return Err!(Conflict("already in the queue"));
		}

		let waitlist_max = state
			.data
			.settings
			.as_ref()
			.map_or(self.waitlist_default, |settings| settings.waitlist_max);
		if queue.len() >= waitlist_max.try_into()? {
			return Err!(Conflict("queue for room {room_id} is full"));
		}

		queue.push(QueueEntry::new(user_id, queue.len()));
		self.write_queue(room_id, queue.clone().into_iter())
			.await?;

		if !state.has_dj() {
			state = self.advance_dj_locked(state).await?;
			self.write_state(&mut state).await?;

			return self.get_queue(room_id).await;
		}

		self.write_state(&mut state).await?;

		Ok(queue)
	}

	/// Leave the rotation; positions re-densify and a departing current DJ
	/// hands the decks on.
	pub async fn remove_user_from_queue(&self, room_id: &str, user_id: &str) -> Result {
		let _lock = self.lock_room(room_id).await;

		let mut state = self.get_room_state(room_id).await?;

		let queue = self.get_queue(room_id).await?;
		if !queue.iter().any(|entry| entry.user_id == user_id) {
			return Ok(());
		}

		self.write_queue(room_id, queue.into_iter().filter(|e| e.user_id != user_id))
			.await?;

		if state.current_dj == user_id {
			state = self.advance_dj_locked(state).await?;
		}

		self.write_state(&mut state).await
	}

	/// Rotate the decks to the next queue position.
	pub async fn advance_dj(&self, room_id: &str) -> Result<Option<String>> {
		let _lock = self.lock_room(room_id).await;

		let mut state = self.get_room_state(room_id).await?;
		state = self.advance_dj_locked(state).await?;
		self.write_state(&mut state).await?;

		Ok(Some(state.current_dj).filter(|dj| !dj.is_empty()))
	}

	/// The rotation primitive: a pointer walking dense positions. The entry
	/// that just played keeps its slot; cycling is the pointer wrapping,
	/// never a rewrite of the order.
	async fn advance_dj_locked(&self, mut state: RoomState) -> Result<RoomState> {
		let room_id = state.room_id.clone();
		let mut queue = self.get_queue(&room_id).await?;

		self.services
			.db
			.del(&keys::room_media(&room_id))
			.await?;
		state.clear_media();

		if queue.is_empty() {
			trace!(room_id, "queue empty; clearing decks");
			state.current_dj.clear();

			return Ok(state);
		}

		let current = queue
			.iter()
			.position(|entry| entry.user_id == state.current_dj);

		let next = match current {
			| None => 0,
			| Some(p) if p.saturating_add(1) >= queue.len() => 0,
			| Some(p) => p.saturating_add(1),
		};

		let entry = &mut queue[next];
		entry.play_count = entry.play_count.saturating_add(1);
		entry.last_play = utils::millis_since_unix_epoch();
		state.current_dj = entry.user_id.clone();

		debug!(room_id, dj = %state.current_dj, "decks advanced");
		self.write_queue(&room_id, queue.into_iter()).await?;

		Ok(state)
	}

	/// The current DJ starts a track. History appends best-effort; losing a
	/// history line never fails the play.
	pub async fn set_current_media(
		&self,
		room_id: &str,
		media_id: &str,
		duration_secs: u64,
	) -> Result<RoomState> {
		let _lock = self.lock_room(room_id).await;
		let db = &self.services.db;

		let mut state = self.get_room_state(room_id).await?;
		if !state.has_dj() {
			return Err!(BadRequest("no DJ on deck; media rejected"));
		}

		let now = utils::millis_since_unix_epoch();
		state.current_media = media_id.to_owned();
		state.media_start_time = now;
		state.media_end_time = now.saturating_add(duration_secs.saturating_mul(1000));
		self.write_state(&mut state).await?;

		let media_ttl = Duration::from_secs(duration_secs).saturating_add(MEDIA_TTL_GRACE);
		db.set(&keys::room_media(room_id), media_id, Some(media_ttl))
			.await?;

		let entry = HistoryEntry {
			media_id: media_id.to_owned(),
			dj_id: state.current_dj.clone(),
			time: now,
			duration: duration_secs,
		};

		if let Err(error) = self.append_history(room_id, &entry).await {
			debug_warn!(room_id, "history append failed: {error}");
		}

		Ok(state)
	}

	async fn append_history(&self, room_id: &str, entry: &HistoryEntry) -> Result {
		let raw = serde_json::to_string(entry)?;
		let stop: i64 = self
			.history_limit
			.saturating_sub(1)
			.try_into()?;

		self.services
			.db
			.pipeline()
			.lpush(&keys::room_history(room_id), &raw)
			.ltrim(&keys::room_history(room_id), 0, stop)
			.execute()
			.await
			.map(|_| ())
	}

	pub async fn get_history(&self, room_id: &str) -> Result<Vec<HistoryEntry>> {
		let raws = self
			.services
			.db
			.lrange(&keys::room_history(room_id), 0, -1)
			.await?;

		raws.iter()
			.map(|raw| serde_json::from_str(raw).map_err(Into::into))
			.collect()
	}

	/// One vote per user per track, transitions atomic. Voting the same way
	/// twice is a no-op; switching decrements the old tally and increments
	/// the new inside a single transaction.
	pub async fn record_vote(
		&self,
		room_id: &str,
		user_id: &str,
		media_id: &str,
		vote: VoteType,
	) -> Result {
		let db = &self.services.db;

		let state = self.get_room_state(room_id).await?;
		if state.current_media != media_id {
			return Err!(BadRequest("votes only count for the playing track"));
		}

		if !db.sismember(&keys::room_users(room_id), user_id).await? {
			return Err!(Forbidden("must be in the room to vote"));
		}

		let previous = db
			.get(&keys::vote_user(room_id, media_id, user_id))
			.await
			.ok()
			.map(|raw| VoteType::parse(&raw))
			.transpose()?;

		if previous == Some(vote) {
			return Ok(());
		}

		let mut txn = db.transaction();
		if let Some(previous) = previous {
			txn = txn.incr(&keys::vote_count(room_id, media_id, previous), -1);
		}

		txn.set(
			&keys::vote_user(room_id, media_id, user_id),
			vote.as_str(),
			Some(VOTE_TTL),
		)
		.incr(&keys::vote_count(room_id, media_id, vote), 1)
		.execute()
		.await
		.map(|_| ())
	}

	/// Tallies for a track; missing counters read as zero.
	pub async fn get_votes(&self, room_id: &str, media_id: &str) -> Result<VoteCounts> {
		let results = self
			.services
			.db
			.pipeline()
			.get(&keys::vote_count(room_id, media_id, VoteType::Woot))
			.get(&keys::vote_count(room_id, media_id, VoteType::Meh))
			.get(&keys::vote_count(room_id, media_id, VoteType::Grab))
			.execute()
			.await?;

		let count = |result: &OpResult| -> u64 {
			match result {
				| OpResult::Str(Some(raw)) => raw.parse::<i64>().unwrap_or(0).max(0).unsigned_abs(),
				| _ => 0,
			}
		};

		Ok(VoteCounts {
			woot: count(&results[0]),
			meh: count(&results[1]),
			grab: count(&results[2]),
		})
	}

	pub async fn get_queue(&self, room_id: &str) -> Result<Vec<QueueEntry>> {
		let raws = self
			.services
			.db
			.lrange(&keys::room_queue(room_id), 0, -1)
			.await?;

		raws.iter()
			.map(|raw| serde_json::from_str(raw).map_err(Into::into))
			.collect()
	}

	/// Rewrite the rotation with dense, zero-based positions; callers hand
	/// in any order and this is the only writer.
	pub(crate) async fn write_queue(
		&self,
		room_id: &str,
		entries: impl Iterator<Item = QueueEntry>,
	) -> Result {
		let key = keys::room_queue(room_id);
		let mut txn = self.services.db.transaction().del(&key);

		for (position, mut entry) in entries.enumerate() {
			entry.position = position;
			let raw = serde_json::to_string(&entry)?;
			txn = txn.rpush(&key, &raw);
		}

		txn.execute().await.map(|_| ())
	}

	pub async fn get_occupants(&self, room_id: &str) -> Result<Vec<String>> {
		self.services
			.db
			.smembers(&keys::room_users(room_id))
			.await
	}

	pub async fn is_user_in_room(&self, room_id: &str, user_id: &str) -> Result<bool> {
		self.services
			.db
			.sismember(&keys::room_users(room_id), user_id)
			.await
	}

	/// Serialize mutations per room; uncontended rooms cost one map probe.
	/// The rotation service shares this for its structural rewrites.
	pub(crate) async fn lock_room(&self, room_id: &str) -> OwnedMutexGuard<()> {
		let lock = self
			.locks
			.lock()
			.await
			.entry(room_id.to_owned())
			.or_default()
			.clone();

		lock.lock_owned().await
	}
}
