#![cfg(test)]

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use waveroom_core::{
	Server,
	config::{Config, Figment},
	log::{Log, LogLevelReloadHandles},
	result::NotFound,
};

use crate::{Database, OpResult, kv::glob_match};

async fn open() -> Arc<Database> {
	let config = Config::new(&Figment::new()).expect("defaults extract");
	let log = Log { reload: LogLevelReloadHandles::default() };
	let server = Arc::new(Server::new(config, None, log));

	Database::open(&server).await.expect("database opens")
}

#[tokio::test]
async fn string_roundtrip() {
	let db = open().await;

	db.set("greeting", "hello", None).await.unwrap();
	assert_eq!(db.get("greeting").await.unwrap(), "hello");
	assert!(db.exists("greeting").await);

	assert!(db.del("greeting").await.unwrap());
	assert!(db.get("greeting").await.is_not_found());
	assert!(!db.del("greeting").await.unwrap());
}

#[tokio::test]
async fn string_expiry() {
	let db = open().await;

	db.set("ephemeral", "x", Some(Duration::from_millis(20)))
		.await
		.unwrap();
	assert!(db.exists("ephemeral").await);

	std::thread::sleep(Duration::from_millis(40));
	assert!(!db.exists("ephemeral").await);
	assert!(db.get("ephemeral").await.is_not_found());

	// purge drops the corpse
	db.set("keep", "y", None).await.unwrap();
	assert_eq!(db.purge_expired(), 1);
	assert_eq!(db.len(), 1);
}

#[tokio::test]
async fn expire_and_ttl() {
	let db = open().await;

	db.set("key", "v", None).await.unwrap();
	assert_eq!(db.ttl("key").await.unwrap(), None);

	assert!(db.expire("key", Duration::from_secs(60)).await.unwrap());
	let ttl = db.ttl("key").await.unwrap().expect("ttl set");
	assert!(ttl <= Duration::from_secs(60));
	assert!(ttl > Duration::from_secs(58));

	assert!(!db.expire("absent", Duration::from_secs(1)).await.unwrap());
}

#[tokio::test]
async fn object_roundtrip() {
	let db = open().await;

	let presence = waveroom_core::model::Presence {
		user_id: "u1".into(),
		username: "dj_quartz".into(),
		status: "online".into(),
		last_activity: 1,
		current_room_id: String::new(),
		last_seen: 2,
		data: Default::default(),
	};

	db.set_object("presence:u1", &presence, None)
		.await
		.unwrap();

	let loaded: waveroom_core::model::Presence =
		db.get_object("presence:u1").await.unwrap();
	assert_eq!(loaded.user_id, "u1");
	assert_eq!(loaded.last_seen, 2);
}

#[tokio::test]
async fn counters() {
	let db = open().await;

	assert_eq!(db.incr("count", 1).await.unwrap(), 1);
	assert_eq!(db.incr("count", 2).await.unwrap(), 3);
	assert_eq!(db.decr("count", 1).await.unwrap(), 2);

	db.set("text", "not a number", None).await.unwrap();
	assert!(db.incr("text", 1).await.is_err());
}

#[tokio::test]
async fn wrong_type_is_an_error() {
	let db = open().await;

	db.sadd("tags", "a").await.unwrap();
	assert!(db.get("tags").await.is_err());
	assert!(db.lpush("tags", "x").await.is_err());
}

#[tokio::test]
async fn hash_ops() {
	let db = open().await;

	assert!(db.hset("h", "f1", "v1").await.unwrap());
	assert!(!db.hset("h", "f1", "v2").await.unwrap());
	assert_eq!(db.hget("h", "f1").await.unwrap(), "v2");
	assert!(db.hexists("h", "f1").await.unwrap());
	assert_eq!(db.hlen("h").await.unwrap(), 1);

	db.hset("h", "f2", "v3").await.unwrap();
	assert_eq!(db.hgetall("h").await.unwrap().len(), 2);

	assert!(db.hdel("h", "f1").await.unwrap());
	assert!(!db.hexists("h", "f1").await.unwrap());
	assert!(db.hget("h", "f1").await.is_not_found());
}

#[tokio::test]
async fn list_ops() {
	let db = open().await;

	db.rpush("l", "a").await.unwrap();
	db.rpush("l", "b").await.unwrap();
	db.lpush("l", "z").await.unwrap();
	assert_eq!(db.llen("l").await.unwrap(), 3);

	assert_eq!(db.lrange("l", 0, -1).await.unwrap(), vec!["z", "a", "b"]);
	assert_eq!(db.lrange("l", 1, 1).await.unwrap(), vec!["a"]);
	assert!(db.lrange("l", 5, 9).await.unwrap().is_empty());

	assert_eq!(db.lpop("l").await.unwrap().as_deref(), Some("z"));
	assert_eq!(db.rpop("l").await.unwrap().as_deref(), Some("b"));
}

#[tokio::test]
async fn list_rem_and_trim() {
	let db = open().await;

	for value in ["x", "y", "x", "z", "x"] {
		db.rpush("l", value).await.unwrap();
	}

	assert_eq!(db.lrem("l", 2, "x").await.unwrap(), 2);
	assert_eq!(db.lrange("l", 0, -1).await.unwrap(), vec!["y", "z", "x"]);

	db.ltrim("l", 0, 1).await.unwrap();
	assert_eq!(db.lrange("l", 0, -1).await.unwrap(), vec!["y", "z"]);
}

#[tokio::test]
async fn set_ops() {
	let db = open().await;

	assert!(db.sadd("s", "u1").await.unwrap());
	assert!(!db.sadd("s", "u1").await.unwrap());
	db.sadd("s", "u2").await.unwrap();

	assert!(db.sismember("s", "u1").await.unwrap());
	assert!(!db.sismember("s", "u3").await.unwrap());
	assert_eq!(db.scard("s").await.unwrap(), 2);
	assert_eq!(db.smembers("s").await.unwrap(), vec!["u1", "u2"]);

	assert!(db.srem("s", "u1").await.unwrap());
	assert_eq!(db.scard("s").await.unwrap(), 1);
}

#[tokio::test]
async fn zset_ops() {
	let db = open().await;

	assert!(db.zadd("z", 30, "c").await.unwrap());
	assert!(db.zadd("z", 10, "a").await.unwrap());
	assert!(db.zadd("z", 20, "b").await.unwrap());

	// re-score moves, not duplicates
	assert!(!db.zadd("z", 5, "c").await.unwrap());
	assert_eq!(db.zcard("z").await.unwrap(), 3);

	assert_eq!(db.zscore("z", "c").await.unwrap(), Some(5));
	assert_eq!(db.zrank("z", "a").await.unwrap(), Some(1));

	let range = db.zrange_with_scores("z", 0, 0).await.unwrap();
	assert_eq!(range, vec![(5, "c".to_owned())]);

	assert_eq!(db.zrem_range_by_score("z", 10).await.unwrap(), 2);
	assert_eq!(db.zcard("z").await.unwrap(), 1);

	assert!(db.zrem("z", "b").await.unwrap());
	assert_eq!(db.zcard("z").await.unwrap(), 0);
}

#[test]
fn glob_patterns() {
	assert!(glob_match("room:42", "room:42"));
	assert!(!glob_match("room:42", "room:421"));

	assert!(glob_match("room:*", "room:42"));
	assert!(glob_match("room:votes:r:m:*", "room:votes:r:m:u9"));
	assert!(!glob_match("room:*", "presence:u1"));

	assert!(glob_match("*:count", "room:votes:r:m:woot:count"));
	assert!(glob_match("room:*:count", "room:votes:count:count"));
	assert!(!glob_match("room:*:count", "room:votes"));
	assert!(glob_match("*", "anything"));
}

#[tokio::test]
async fn pipeline_batched() {
	let db = open().await;

	let results = db
		.pipeline()
		.set("a", "1", None)
		.incr("a", 4)
		.get("a")
		.execute()
		.await
		.unwrap();

	assert_eq!(results[1], OpResult::Int(5));
	assert_eq!(results[2], OpResult::Str(Some("5".to_owned())));
}

#[tokio::test]
async fn transaction_all_or_nothing() {
	let db = open().await;

	db.sadd("occupied", "member").await.unwrap();

	// the incr against a set must poison the whole batch
	let result = db
		.transaction()
		.set("fresh", "value", None)
		.incr("occupied", 1)
		.execute()
		.await;

	assert!(result.is_err());
	assert!(!db.exists("fresh").await);
}

#[tokio::test]
async fn publish_subscribe_roundtrip() {
	let db = open().await;

	let mut subscriber = db.subscribe();
	db.publish("room:42", Bytes::from_static(b"{\"type\":\"x\"}"))
		.await
		.unwrap();

	let message = subscriber.recv().await.unwrap();
	assert_eq!(&*message.channel, "room:42");
	assert_eq!(&message.payload[..], b"{\"type\":\"x\"}");
}

#[tokio::test]
async fn collection_crud() {
	let db = open().await;

	let user = waveroom_core::model::User {
		id: "u1".into(),
		username: "quartz".into(),
		roles: Default::default(),
		profile: serde_json::Value::Null,
		settings: serde_json::Value::Null,
		banned_users: Default::default(),
		created_at: 0,
		last_login: 0,
	};

	db.users.insert("u1", &user).await.unwrap();
	assert!(db.users.insert("u1", &user).await.is_err());

	let loaded = db.users.get("u1").await.unwrap();
	assert_eq!(loaded.username, "quartz");

	let matches = db
		.users
		.find(|u| u.username == "quartz")
		.await
		.unwrap();
	assert_eq!(matches.len(), 1);

	assert!(db.users.delete("u1").await.unwrap());
	assert!(db.users.get("u1").await.is_not_found());
}
