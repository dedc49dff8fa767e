#![cfg(test)]

use std::{sync::Arc, time::Duration};

use tokio::runtime::Handle;
use waveroom_core::{
	Server,
	config::{Config, Figment},
	log::{Log, LogLevelReloadHandles},
	model::{BanDuration, ModAction, ModerationLogEntry, PlaybackState, SyncEvent, User, VoteType},
	result::NotFound,
	utils,
};
use waveroom_database::keys;

use crate::{Services, ratelimit};

async fn services() -> Arc<Services> {
	let config = Config::new(&Figment::new()).expect("default config extracts");
	let log = Log { reload: LogLevelReloadHandles::default() };
	let server = Arc::new(Server::new(config, Some(Handle::current()), log));

	Services::build(server).await.expect("services build")
}

async fn make_user(services: &Services, username: &str) -> User {
	services
		.users
		.create_user(username)
		.await
		.expect("user created")
}

mod rotation {
	use super::*;

	#[tokio::test]
	async fn first_dj_auto_start() {
		let s = services().await;

		s.state.add_user_to_room("r1", "u1").await.unwrap();
		s.state.add_user_to_queue("r1", "u1").await.unwrap();

		let state = s.state.get_room_state("r1").await.unwrap();
		assert_eq!(state.current_dj, "u1");
		assert_eq!(state.current_media, "");

		let queue = s.state.get_queue("r1").await.unwrap();
		assert_eq!(queue.len(), 1);
		assert_eq!(queue[0].user_id, "u1");
		assert_eq!(queue[0].position, 0);
		assert_eq!(queue[0].play_count, 1);

		let state = s
			.state
			.set_current_media("r1", "m1", 300)
			.await
			.unwrap();
		assert_eq!(state.current_media, "m1");
		assert_eq!(state.media_end_time, state.media_start_time + 300_000);

		let history = s.state.get_history("r1").await.unwrap();
		assert_eq!(history.len(), 1);
		assert_eq!(history[0].media_id, "m1");
		assert_eq!(history[0].dj_id, "u1");
		assert_eq!(history[0].duration, 300);
	}

	#[tokio::test]
	async fn skip_rotates_and_wraps() {
		let s = services().await;

		s.state.add_user_to_room("r1", "u1").await.unwrap();
		s.state.add_user_to_queue("r1", "u1").await.unwrap();
		s.state
			.set_current_media("r1", "m1", 300)
			.await
			.unwrap();

		s.state.add_user_to_room("r1", "u2").await.unwrap();
		s.state.add_user_to_queue("r1", "u2").await.unwrap();

		let queue = s.state.get_queue("r1").await.unwrap();
		assert_eq!(queue[0].user_id, "u1");
		assert_eq!(queue[0].position, 0);
		assert_eq!(queue[1].user_id, "u2");
		assert_eq!(queue[1].position, 1);

		let next = s.state.advance_dj("r1").await.unwrap();
		assert_eq!(next.as_deref(), Some("u2"));

		let state = s.state.get_room_state("r1").await.unwrap();
		assert_eq!(state.current_dj, "u2");
		assert_eq!(state.current_media, "");

		let queue = s.state.get_queue("r1").await.unwrap();
		assert_eq!(queue[1].play_count, 1);

		// wraps back to index 0
		let next = s.state.advance_dj("r1").await.unwrap();
		assert_eq!(next.as_deref(), Some("u1"));

		let queue = s.state.get_queue("r1").await.unwrap();
		assert_eq!(queue[0].play_count, 2);
	}

	#[tokio::test]
	async fn advance_on_empty_queue_clears_decks() {
		let s = services().await;

		s.state.add_user_to_room("r1", "u1").await.unwrap();
		assert_eq!(s.state.advance_dj("r1").await.unwrap(), None);

		let state = s.state.get_room_state("r1").await.unwrap();
		assert_eq!(state.current_dj, "");
		assert_eq!(state.current_media, "");
		assert_eq!(state.media_start_time, 0);
	}

	#[tokio::test]
	async fn media_requires_a_dj() {
		let s = services().await;

		s.state.add_user_to_room("r1", "u1").await.unwrap();
		assert!(
			s.state
				.set_current_media("r1", "m1", 300)
				.await
				.is_err()
		);
	}

	#[tokio::test]
	async fn duplicate_queue_join_leaves_queue_unchanged() {
		let s = services().await;

		s.state.add_user_to_room("r1", "u1").await.unwrap();
		s.state.add_user_to_queue("r1", "u1").await.unwrap();

		let before = s.state.get_queue("r1").await.unwrap();
		assert!(s.state.add_user_to_queue("r1", "u1").await.is_err());

		let after = s.state.get_queue("r1").await.unwrap();
		assert_eq!(after.len(), before.len());
	}

	#[tokio::test]
	async fn dj_leaving_room_hands_decks_on() {
		let s = services().await;

		for user in ["u1", "u2"] {
			s.state.add_user_to_room("r1", user).await.unwrap();
			s.state.add_user_to_queue("r1", user).await.unwrap();
		}

		let state = s.state.get_room_state("r1").await.unwrap();
		assert_eq!(state.current_dj, "u1");

		let state = s.state.remove_user_from_room("r1", "u1").await.unwrap();
		assert_eq!(state.current_dj, "u2");

		let queue = s.state.get_queue("r1").await.unwrap();
		assert_eq!(queue.len(), 1);
		assert_eq!(queue[0].user_id, "u2");
		assert_eq!(queue[0].position, 0);
	}
}

mod occupancy {
	use super::*;

	/// The cardinality mirror holds over an arbitrary join/leave sequence.
	#[tokio::test]
	async fn active_users_mirrors_occupancy_set() {
		let s = services().await;

		let moves = [
			("u1", true),
			("u2", true),
			("u3", true),
			("u2", false),
			("u4", true),
			("u1", false),
			("u1", true),
		];

		for (user, join) in moves {
			if join {
				s.state.add_user_to_room("r1", user).await.unwrap();
			} else {
				s.state.remove_user_from_room("r1", user).await.unwrap();
			}

			let state = s.state.get_room_state("r1").await.unwrap();
			let occupants = s.state.get_occupants("r1").await.unwrap();
			assert_eq!(state.active_users, occupants.len() as u64);
		}
	}

	/// Positions stay dense and unique over structural churn.
	#[tokio::test]
	async fn queue_positions_stay_dense() {
		let s = services().await;

		for user in ["u1", "u2", "u3", "u4"] {
			s.state.add_user_to_room("r1", user).await.unwrap();
			s.state.add_user_to_queue("r1", user).await.unwrap();
		}

		s.state.remove_user_from_queue("r1", "u2").await.unwrap();
		s.queue.move_in_queue("r1", "u4", 0).await.unwrap();
		s.queue.shuffle_queue("r1").await.unwrap();

		let queue = s.state.get_queue("r1").await.unwrap();
		let mut positions: Vec<_> = queue.iter().map(|e| e.position).collect();
		positions.sort_unstable();
		assert_eq!(positions, (0..queue.len()).collect::<Vec<_>>());

		let mut users: Vec<_> = queue.iter().map(|e| e.user_id.clone()).collect();
		users.sort();
		assert_eq!(users, ["u1", "u3", "u4"]);
	}

	#[tokio::test]
	async fn last_leaver_hibernates_the_room() {
		let s = services().await;

		s.state.add_user_to_room("r1", "u1").await.unwrap();
		let state = s.state.remove_user_from_room("r1", "u1").await.unwrap();

		assert!(!state.is_active);
		assert_eq!(state.active_users, 0);

		// a week of slack remains on the key
		let ttl = s
			.db
			.ttl(&keys::room_state("r1"))
			.await
			.unwrap()
			.expect("state has a ttl");
		assert!(ttl > Duration::from_secs(6 * 24 * 60 * 60));
	}

	#[tokio::test]
	async fn init_room_is_idempotent() {
		let s = services().await;

		let first = s.state.init_room("r1").await.unwrap();
		let second = s.state.init_room("r1").await.unwrap();
		let third = s.state.init_room("r1").await.unwrap();

		assert_eq!(first.room_id, second.room_id);
		assert!(third.is_active);
		assert_eq!(third.active_users, 0);
	}

	#[tokio::test]
	async fn queue_join_requires_presence_in_room() {
		let s = services().await;

		s.state.init_room("r1").await.unwrap();
		assert!(s.state.add_user_to_queue("r1", "ghost").await.is_err());
	}
}

mod votes {
	use super::*;

	#[tokio::test]
	async fn vote_change_moves_the_tally() {
		let s = services().await;

		s.state.add_user_to_room("r1", "u1").await.unwrap();
		s.state.add_user_to_queue("r1", "u1").await.unwrap();
		s.state
			.set_current_media("r1", "m1", 300)
			.await
			.unwrap();

		s.state
			.record_vote("r1", "u1", "m1", VoteType::Woot)
			.await
			.unwrap();
		let votes = s.state.get_votes("r1", "m1").await.unwrap();
		assert_eq!((votes.woot, votes.meh, votes.grab), (1, 0, 0));

		s.state
			.record_vote("r1", "u1", "m1", VoteType::Meh)
			.await
			.unwrap();
		let votes = s.state.get_votes("r1", "m1").await.unwrap();
		assert_eq!((votes.woot, votes.meh, votes.grab), (0, 1, 0));

		// same vote again is a no-op
		s.state
			.record_vote("r1", "u1", "m1", VoteType::Meh)
			.await
			.unwrap();
		let votes = s.state.get_votes("r1", "m1").await.unwrap();
		assert_eq!((votes.woot, votes.meh, votes.grab), (0, 1, 0));
	}

	#[tokio::test]
	async fn counter_sum_equals_distinct_voters() {
		let s = services().await;

		s.state.add_user_to_room("r1", "dj").await.unwrap();
		s.state.add_user_to_queue("r1", "dj").await.unwrap();
		s.state
			.set_current_media("r1", "m1", 300)
			.await
			.unwrap();

		let voters = ["v1", "v2", "v3", "v4"];
		for voter in voters {
			s.state.add_user_to_room("r1", voter).await.unwrap();
		}

		// each voter flips around a few times
		for (voter, sequence) in [
			("v1", vec![VoteType::Woot, VoteType::Meh]),
			("v2", vec![VoteType::Woot]),
			("v3", vec![VoteType::Grab, VoteType::Grab, VoteType::Woot]),
			("v4", vec![VoteType::Meh, VoteType::Grab]),
		] {
			for vote in sequence {
				s.state.record_vote("r1", voter, "m1", vote).await.unwrap();
			}
		}

		let votes = s.state.get_votes("r1", "m1").await.unwrap();
		assert_eq!(votes.total(), voters.len() as u64);
	}

	#[tokio::test]
	async fn vote_for_wrong_media_is_rejected() {
		let s = services().await;

		s.state.add_user_to_room("r1", "u1").await.unwrap();
		s.state.add_user_to_queue("r1", "u1").await.unwrap();
		s.state
			.set_current_media("r1", "m1", 300)
			.await
			.unwrap();

		assert!(
			s.state
				.record_vote("r1", "u1", "m2", VoteType::Woot)
				.await
				.is_err()
		);
	}

	#[test]
	fn invalid_vote_type_is_rejected() {
		assert!(VoteType::parse("woot").is_ok());
		assert!(VoteType::parse("other").is_err());
	}
}

mod moderation {
	use super::*;

	#[tokio::test]
	async fn ban_bars_the_door() {
		let s = services().await;

		s.state.add_user_to_room("r1", "u2").await.unwrap();

		let ban = s
			.moderation
			.ban_user("u2", "r1", "mod1", "spam", BanDuration::OneDay)
			.await
			.unwrap();
		assert!(ban.active);
		assert!(ban.end_time > ban.start_time);

		// eviction happened as part of the ban
		let occupants = s.state.get_occupants("r1").await.unwrap();
		assert!(!occupants.contains(&"u2".to_owned()));

		let denied = s.state.add_user_to_room("r1", "u2").await;
		assert!(denied.is_err());
		assert!(!denied.is_not_found());

		// other rooms are unaffected by a room-scoped ban
		s.state.add_user_to_room("r2", "u2").await.unwrap();
	}

	#[tokio::test]
	async fn expired_ban_lifts_lazily() {
		let s = services().await;

		let mut ban = s
			.moderation
			.ban_user("u2", "r1", "mod1", "spam", BanDuration::OneHour)
			.await
			.unwrap();

		// age the stored record past its deadline and reload the overlay
		ban.end_time = utils::millis_since_unix_epoch() - 1;
		s.db.user_bans.put(&ban.id, &ban).await.unwrap();
		s.moderation.load_bans().await.unwrap();

		assert!(s.moderation.is_user_banned("u2", "r1").await.is_none());
		s.state.add_user_to_room("r1", "u2").await.unwrap();

		// the stored record was flipped inactive on discovery
		let stored = s.db.user_bans.get(&ban.id).await.unwrap();
		assert!(!stored.active);
	}

	#[tokio::test]
	async fn global_ban_covers_every_room() {
		let s = services().await;

		s.moderation
			.ban_user("u9", "", "mod1", "alt account", BanDuration::Permanent)
			.await
			.unwrap();

		assert!(s.state.add_user_to_room("r1", "u9").await.is_err());
		assert!(s.state.add_user_to_room("r2", "u9").await.is_err());

		s.moderation
			.unban_user("u9", "", "mod1", "appeal accepted")
			.await
			.unwrap();
		s.state.add_user_to_room("r1", "u9").await.unwrap();
	}

	#[tokio::test]
	async fn mute_expires_on_read() {
		let s = services().await;

		s.state.add_user_to_room("r1", "u1").await.unwrap();

		s.moderation
			.mute_user("r1", "u1", "mod1", Duration::from_millis(10), "cool off")
			.await
			.unwrap();
		assert!(s.moderation.is_user_muted("r1", "u1").await.unwrap());

		std::thread::sleep(Duration::from_millis(30));
		assert!(!s.moderation.is_user_muted("r1", "u1").await.unwrap());

		// the dead entry was scrubbed from the overlay
		let state = s.state.get_room_state("r1").await.unwrap();
		let scrubbed = state
			.data
			.muted_users
			.map_or(true, |muted| !muted.contains_key("u1"));
		assert!(scrubbed);
	}

	#[tokio::test]
	async fn audit_distinguishes_mute_from_unmute() {
		let s = services().await;

		s.state.add_user_to_room("r1", "u1").await.unwrap();

		s.moderation
			.mute_user("r1", "u1", "mod1", Duration::from_secs(60), "spam")
			.await
			.unwrap();
		s.moderation
			.unmute_user("r1", "u1", "mod1")
			.await
			.unwrap();

		// audit writes are fire-and-forget; give the tasks a moment
		let mut actions: Vec<ModAction> = Vec::new();
		for _ in 0..100 {
			actions = s
				.db
				.moderation_log
				.find(|entry: &ModerationLogEntry| entry.user_id == "u1")
				.await
				.unwrap()
				.iter()
				.map(|entry| entry.action)
				.collect();

			if actions.len() >= 2 {
				break;
			}

			tokio::time::sleep(Duration::from_millis(20)).await;
		}

		assert!(actions.contains(&ModAction::Mute));
		assert!(actions.contains(&ModAction::Unmute));
	}

	#[tokio::test]
	async fn report_handlers_run_isolated() {
		let s = services().await;

		let (tx, mut rx) = tokio::sync::mpsc::channel::<String>(4);

		// first handler panics; second must still observe the report
		s.moderation
			.add_report_handler(Arc::new(|_| panic!("handler bug")));
		s.moderation.add_report_handler(Arc::new(move |report| {
			tx.try_send(report.user_id.clone()).ok();
		}));

		s.moderation
			.report_user("u1", "u2", "r1", "abuse")
			.await
			.unwrap();

		let seen = tokio::time::timeout(Duration::from_secs(5), rx.recv())
			.await
			.expect("handler ran")
			.expect("value");
		assert_eq!(seen, "u2");
	}
}

mod chat {
	use super::*;

	async fn chat_room(s: &Services) -> (User, User) {
		let owner = make_user(s, "owner").await;
		let guest = make_user(s, "guest").await;

		let mut room = waveroom_core::model::Room {
			id: "r1".into(),
			slug: "r1".into(),
			name: "The Loft".into(),
			created_by: owner.id.clone(),
			moderators: Default::default(),
			banned_users: Default::default(),
			settings: Default::default(),
			is_active: true,
			last_activity: 0,
			created_at: 0,
		};
		room.last_activity = utils::millis_since_unix_epoch();
		s.db.rooms.insert("r1", &room).await.unwrap();

		s.state.add_user_to_room("r1", &owner.id).await.unwrap();
		s.state.add_user_to_room("r1", &guest.id).await.unwrap();

		(owner, guest)
	}

	#[tokio::test]
	async fn message_lifecycle() {
		let s = services().await;
		let (owner, guest) = chat_room(&s).await;

		let message = s
			.chat
			.send_message("r1", &guest.id, "first!")
			.await
			.unwrap();
		assert_eq!(message.username, "guest");
		assert!(matches!(
			message.user_role,
			waveroom_core::model::RoomRole::User
		));

		s.chat
			.send_message("r1", &owner.id, "welcome in")
			.await
			.unwrap();

		let page = s.chat.get_messages("r1", 10, None).await.unwrap();
		assert_eq!(page.len(), 2);
		// newest first
		assert_eq!(page[0].content, "welcome in");

		// the owner moderates someone else's message away
		s.chat
			.delete_message("r1", &message.id, &owner.id)
			.await
			.unwrap();

		let stored = s.db.messages.get(&message.id).await.unwrap();
		assert!(stored.deleted);
		assert_eq!(stored.deleted_by.as_deref(), Some(owner.id.as_str()));
	}

	#[tokio::test]
	async fn outsiders_and_muted_cannot_chat() {
		let s = services().await;
		let (_, guest) = chat_room(&s).await;

		let outsider = make_user(&s, "outsider").await;
		assert!(
			s.chat
				.send_message("r1", &outsider.id, "hello?")
				.await
				.is_err()
		);

		s.moderation
			.mute_user("r1", &guest.id, "mod", Duration::from_secs(60), "spam")
			.await
			.unwrap();
		assert!(
			s.chat
				.send_message("r1", &guest.id, "still here")
				.await
				.is_err()
		);

		assert!(s.chat.send_message("r1", &guest.id, "").await.is_err());
	}

	#[tokio::test]
	async fn non_moderator_cannot_delete_others_messages() {
		let s = services().await;
		let (owner, guest) = chat_room(&s).await;

		let message = s
			.chat
			.send_message("r1", &owner.id, "mine")
			.await
			.unwrap();

		assert!(
			s.chat
				.delete_message("r1", &message.id, &guest.id)
				.await
				.is_err()
		);
	}
}

mod sessions {
	use super::*;

	#[tokio::test]
	async fn login_roundtrip_and_replacement() {
		let s = services().await;
		let user = make_user(&s, "quartz").await;

		let first = s.globals.new_token();
		s.sessions
			.create_session(&user, &first, "10.0.0.1", "test-agent")
			.await
			.unwrap();

		let session = s.sessions.get_session(&first).await.unwrap();
		assert_eq!(session.user_id, user.id);
		assert_eq!(session.username, "quartz");

		// a second login replaces the first session outright
		let second = s.globals.new_token();
		s.sessions
			.create_session(&user, &second, "10.0.0.2", "test-agent")
			.await
			.unwrap();

		assert!(s.sessions.get_session(&first).await.is_not_found());
		assert!(s.sessions.get_session(&second).await.is_ok());

		s.sessions.destroy_user_sessions(&user.id).await.unwrap();
		assert!(s.sessions.get_session(&second).await.is_not_found());
		assert!(
			s.db.get(&keys::user_token(&user.id))
				.await
				.is_not_found()
		);
	}

	#[tokio::test]
	async fn refresh_extends_the_horizon() {
		let s = services().await;
		let user = make_user(&s, "quartz").await;

		let token = s.globals.new_token();
		let created = s
			.sessions
			.create_session(&user, &token, "10.0.0.1", "test-agent")
			.await
			.unwrap();

		let refreshed = s.sessions.refresh_session(&token).await.unwrap();
		assert!(refreshed.expires_at >= created.expires_at);
		assert!(refreshed.last_activity >= created.last_activity);
	}
}

mod presence {
	use super::*;

	#[tokio::test]
	async fn heartbeat_and_online_index() {
		let s = services().await;

		s.presence
			.update_presence("u1", "quartz", "online")
			.await
			.unwrap();
		assert!(s.presence.is_user_online("u1").await.unwrap());

		let first = s.presence.get_presence("u1").await.unwrap();

		s.presence
			.update_presence("u1", "quartz", "online")
			.await
			.unwrap();
		let second = s.presence.get_presence("u1").await.unwrap();
		assert!(second.last_seen >= first.last_seen);
		assert_eq!(second.last_activity, first.last_activity);

		s.presence
			.update_presence("u1", "quartz", "away")
			.await
			.unwrap();
		let third = s.presence.get_presence("u1").await.unwrap();
		assert_eq!(third.status, "away");
		assert!(third.last_activity >= second.last_activity);
	}

	#[tokio::test]
	async fn cleanup_reaps_stale_and_repairs_index() {
		let s = services().await;

		s.presence
			.update_presence("u1", "quartz", "online")
			.await
			.unwrap();

		// u2 is in the index with no record behind it (drift)
		s.db.sadd(keys::ONLINE_USERS, "u2").await.unwrap();

		// age u1 far past the heartbeat window
		let mut record = s.presence.get_presence("u1").await.unwrap();
		record.last_seen = 1;
		s.db.set_object(&keys::presence("u1"), &record, None)
			.await
			.unwrap();

		let removed = s.presence.cleanup_expired().await.unwrap();
		assert_eq!(removed, 2);
		assert!(!s.presence.is_user_online("u1").await.unwrap());
		assert!(!s.db.sismember(keys::ONLINE_USERS, "u2").await.unwrap());
	}
}

mod ratelimits {
	use super::*;

	#[tokio::test]
	async fn window_fills_and_slides() {
		let s = services().await;

		let limit = ratelimit::Limit {
			action: "test_action",
			max: 3,
			window: Duration::from_millis(200),
		};

		for n in 0..3 {
			let decision = s.ratelimit.check(limit, "client-1").await.unwrap();
			assert!(decision.allowed, "request {n} should pass");
		}

		let denied = s.ratelimit.check(limit, "client-1").await.unwrap();
		assert!(!denied.allowed);
		assert!(denied.retry_after.expect("retry hint") <= limit.window);

		// another identifier has its own window
		assert!(s.ratelimit.check(limit, "client-2").await.unwrap().allowed);

		// the window slides off
		std::thread::sleep(Duration::from_millis(250));
		assert!(s.ratelimit.check(limit, "client-1").await.unwrap().allowed);
	}

	#[tokio::test]
	async fn enforce_rejects_with_retry_after() {
		let s = services().await;

		let limit = ratelimit::Limit {
			action: "test_enforce",
			max: 1,
			window: Duration::from_secs(60),
		};

		s.ratelimit.enforce(limit, "client-1").await.unwrap();

		let error = s
			.ratelimit
			.enforce(limit, "client-1")
			.await
			.expect_err("second call is limited");
		assert!(error.retry_after().is_some());
	}
}

mod playback {
	use super::*;

	#[tokio::test]
	async fn silent_room_reads_as_stopped() {
		let s = services().await;

		let playback = s.sync.get_playback_state("nowhere").await.unwrap();
		assert!(!playback.is_playing);
		assert_eq!(playback.current_time, 0.0);
	}

	#[tokio::test]
	async fn position_is_monotonic_and_clamped() {
		let s = services().await;

		s.state.add_user_to_room("r1", "u1").await.unwrap();

		let playback = PlaybackState {
			current_time: 10.0,
			duration: 300.0,
			is_playing: true,
			current_track: "m1".into(),
			volume: 1.0,
			last_updated: 0,
		};

		s.sync
			.update_playback_state("r1", "u1", playback, SyncEvent::Play)
			.await
			.unwrap();

		let first = s.sync.get_playback_state("r1").await.unwrap();
		assert!(first.current_time >= 10.0);
		assert!(first.current_time <= 300.0);

		let second = s.sync.get_playback_state("r1").await.unwrap();
		assert!(second.current_time >= first.current_time);

		// a paused track does not move
		let paused = PlaybackState { is_playing: false, ..first.clone() };
		s.sync
			.update_playback_state("r1", "u1", paused, SyncEvent::Pause)
			.await
			.unwrap();

		let frozen = s.sync.get_playback_state("r1").await.unwrap();
		let again = s.sync.get_playback_state("r1").await.unwrap();
		assert_eq!(frozen.current_time, again.current_time);
	}

	#[tokio::test]
	async fn local_subscribers_hear_sync_events() {
		let s = services().await;

		s.state.add_user_to_room("r1", "u1").await.unwrap();

		// wire the bus bridge the way the manager would
		crate::Service::worker(s.sync.clone()).await.unwrap();

		let mut subscription = s.sync.subscribe_to_room("r1");

		let playback = PlaybackState {
			current_time: 0.0,
			duration: 180.0,
			is_playing: true,
			current_track: "m1".into(),
			volume: 1.0,
			last_updated: 0,
		};

		s.sync
			.update_playback_state("r1", "u1", playback, SyncEvent::Play)
			.await
			.unwrap();

		// hand-deliver the frame as the dispatch loop would
		let mut bus = s.db.subscribe();
		s.sync.sync_room_state("r1", "u1").await.unwrap();
		s.pubsub.subscribe(["room:sync:*"]);
		while let Ok(frame) = tokio::time::timeout(Duration::from_secs(1), bus.recv()).await {
			s.pubsub.dispatch(&frame.unwrap());
		}

		let message = tokio::time::timeout(Duration::from_secs(5), subscription.receiver.recv())
			.await
			.expect("sync message arrives")
			.expect("stream open");
		assert_eq!(message.room_id, "r1");

		s.sync.unsubscribe(&subscription);
	}
}

mod dispatch {
	use super::*;
	use bytes::Bytes;
	use waveroom_core::model::Envelope;
	use waveroom_database::BusMessage;

	#[tokio::test]
	async fn wildcard_and_literal_both_fire_despite_a_panic() {
		let s = services().await;

		s.pubsub.subscribe(["room:*"]);

		let (tx, mut rx) = tokio::sync::mpsc::channel::<&'static str>(4);

		// the wildcard handler panics; the literal one must still run
		s.pubsub
			.add_handler("room:*", Arc::new(|_, _| panic!("bad handler")));

		let tx2 = tx.clone();
		s.pubsub.add_handler(
			"room:42",
			Arc::new(move |channel, _| {
				assert_eq!(channel, "room:42");
				tx2.try_send("literal").ok();
			}),
		);

		s.pubsub.dispatch(&BusMessage {
			channel: "room:42".into(),
			payload: Bytes::from_static(b"{}"),
		});

		let seen = tokio::time::timeout(Duration::from_secs(5), rx.recv())
			.await
			.expect("literal handler ran")
			.expect("value");
		assert_eq!(seen, "literal");
	}

	#[tokio::test]
	async fn unsubscribed_channels_do_not_dispatch() {
		let s = services().await;

		s.pubsub.subscribe(["user:*"]);

		let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);
		s.pubsub.add_handler(
			"room:42",
			Arc::new(move |_, _| {
				tx.try_send(()).ok();
			}),
		);

		s.pubsub.dispatch(&BusMessage {
			channel: "room:42".into(),
			payload: Bytes::from_static(b"{}"),
		});

		let outcome = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
		assert!(outcome.is_err(), "handler must not run off-subscription");
	}

	#[tokio::test]
	async fn envelope_roundtrip_through_the_bus() {
		let s = services().await;

		let mut bus = s.db.subscribe();

		s.pubsub
			.publish_to_room("r1", "chat_message", serde_json::json!({ "content": "hey" }))
			.await
			.unwrap();

		let frame = tokio::time::timeout(Duration::from_secs(1), bus.recv())
			.await
			.expect("frame arrives")
			.unwrap();
		assert_eq!(&*frame.channel, "room:r1");

		let envelope: Envelope = serde_json::from_slice(&frame.payload).unwrap();
		assert_eq!(envelope.kind, "chat_message");
		assert_eq!(envelope.room_id.as_deref(), Some("r1"));
		assert_eq!(envelope.data["content"], "hey");
		assert!(!envelope.timestamp.is_empty());

		// decode→encode→decode is stable
		let reencoded = serde_json::to_vec(&envelope).unwrap();
		let again: Envelope = serde_json::from_slice(&reencoded).unwrap();
		assert_eq!(again, envelope);
	}
}

mod reaper {
	use super::*;

	#[tokio::test]
	async fn grace_window_spares_then_reaps() {
		let s = services().await;

		s.presence
			.update_presence("u3", "quartz", "online")
			.await
			.unwrap();
		s.state.add_user_to_room("r1", "u3").await.unwrap();

		// the registry never heard of u3: first sweep opens the window
		s.reaper.sweep_clients().await;
		assert!(s.db.exists(&keys::disconnect("u3")).await);
		assert!(s.db.sismember(keys::ONLINE_USERS, "u3").await.unwrap());

		// young marker: second sweep still spares
		s.reaper.sweep_clients().await;
		assert!(s.db.sismember(keys::ONLINE_USERS, "u3").await.unwrap());

		// age the marker past the grace period, then sweep for keeps
		let aged = utils::millis_since_unix_epoch() - 40_000;
		s.db.set(&keys::disconnect("u3"), &aged.to_string(), None)
			.await
			.unwrap();
		s.reaper.sweep_clients().await;

		assert!(!s.db.exists(&keys::presence("u3")).await);
		assert!(!s.db.exists(&keys::disconnect("u3")).await);
		assert!(!s.db.sismember(keys::ONLINE_USERS, "u3").await.unwrap());

		// and the room no longer counts them
		let occupants = s.state.get_occupants("r1").await.unwrap();
		assert!(!occupants.contains(&"u3".to_owned()));
	}

	#[tokio::test]
	async fn reconnection_cancels_the_window() {
		let s = services().await;

		s.presence
			.update_presence("u3", "quartz", "online")
			.await
			.unwrap();

		s.reaper.sweep_clients().await;
		assert!(s.db.exists(&keys::disconnect("u3")).await);

		// back before the grace lapses
		s.clients.register("u3").await;
		s.reaper.sweep_clients().await;

		assert!(!s.db.exists(&keys::disconnect("u3")).await);
		assert!(s.db.sismember(keys::ONLINE_USERS, "u3").await.unwrap());
	}

	#[tokio::test]
	async fn idle_empty_rooms_hibernate() {
		let s = services().await;

		s.state.add_user_to_room("r1", "u1").await.unwrap();
		s.state.remove_user_from_room("r1", "u1").await.unwrap();

		// force activity far into the past, then reactivate emptily
		let mut state = s.state.get_room_state("r1").await.unwrap();
		state.is_active = true;
		s.state.update_room_state(&mut state).await.unwrap();

		let mut state = s.state.get_room_state("r1").await.unwrap();
		state.last_activity = 1;
		s.db.set_object(&keys::room_state("r1"), &state, None)
			.await
			.unwrap();

		s.reaper.sweep_presence().await;

		let state = s.state.get_room_state("r1").await.unwrap();
		assert!(!state.is_active);
	}
}
