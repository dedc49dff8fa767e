pub mod check;

use std::path::Path;

use figment::providers::{Env, Format, Toml};
pub use figment::{Figment, value::Value as FigmentValue};
use serde::Deserialize;

pub use self::check::check;
use crate::{Result, err, error::Error, utils};

/// All the config options for waveroom.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	/// The pretty name of this deployment. Used in log lines and as the
	/// issuer tag on generated identifiers.
	#[serde(default = "default_server_name")]
	pub server_name: String,

	/// Shared secret the gateway signs access tokens with. Must be at least
	/// 16 characters; generated at startup when absent.
	#[serde(default)]
	pub jwt_secret: Option<String>,

	/// Text log level/filter directives, tracing EnvFilter syntax.
	#[serde(default = "default_log")]
	pub log: String,

	#[serde(default = "default_log_span_events")]
	pub log_span_events: String,

	#[serde(default = "true_fn")]
	pub log_colors: bool,

	#[serde(default)]
	pub log_thread_ids: bool,

	#[serde(default)]
	pub log_filter_regex: bool,

	/// Tokio worker threads; 0 sizes from available parallelism.
	#[serde(default)]
	pub worker_threads: usize,

	/// Access-token lifetime; also the session key TTL.
	#[serde(default = "default_session_ttl_s")]
	pub session_ttl_s: u64,

	/// Presence records expire this long after the last heartbeat.
	#[serde(default = "default_presence_ttl_s")]
	pub presence_ttl_s: u64,

	/// Cadence of the stale-presence / empty-room sweep.
	#[serde(default = "default_presence_sweep_interval_s")]
	pub presence_sweep_interval_s: u64,

	/// Cadence of the stale-client sweep against the connection registry.
	#[serde(default = "default_client_sweep_interval_s")]
	pub client_sweep_interval_s: u64,

	/// A disconnected client survives this long before its presence is
	/// reaped; reconnection inside the window cancels cleanup.
	#[serde(default = "default_disconnect_grace_s")]
	pub disconnect_grace_s: u64,

	/// Rooms idle longer than this with nobody inside are flagged inactive.
	#[serde(default = "default_room_idle_hibernate_s")]
	pub room_idle_hibernate_s: u64,

	/// Per-operation deadline for keyed-store calls.
	#[serde(default = "default_kv_timeout_s")]
	pub kv_timeout_s: u64,

	/// Per-operation deadline for document-store calls.
	#[serde(default = "default_doc_timeout_s")]
	pub doc_timeout_s: u64,

	/// Deadline for one publish on the fan-out bus.
	#[serde(default = "default_publish_timeout_s")]
	pub publish_timeout_s: u64,

	/// Deadline for one reaper probe of the connection registry.
	#[serde(default = "default_probe_timeout_ms")]
	pub probe_timeout_ms: u64,

	#[serde(default = "default_probe_retries")]
	pub probe_retries: u32,

	#[serde(default = "default_probe_backoff_ms")]
	pub probe_backoff_ms: u64,

	/// Ring capacity of the pub/sub bus; laggards drop oldest messages.
	#[serde(default = "default_bus_capacity")]
	pub bus_capacity: usize,

	/// Buffer depth of one local sync-subscriber stream.
	#[serde(default = "default_sync_buffer")]
	pub sync_buffer: usize,

	/// Play-history entries retained per room.
	#[serde(default = "default_history_limit")]
	pub history_limit: usize,

	#[serde(default = "default_room_capacity")]
	pub room_capacity_default: u32,

	#[serde(default = "default_waitlist_max")]
	pub waitlist_max_default: u32,

	/// Media providers tracks may be played from.
	#[serde(default = "default_allowed_media_sources")]
	pub allowed_media_sources: Vec<String>,

	/// Upper bound on one gateway WebSocket frame.
	#[serde(default = "default_ws_max_frame_bytes")]
	pub ws_max_frame_bytes: usize,

	#[serde(default)]
	pub features: FeatureFlags,
}

/// Feature switches, each an explicit boolean. Deliberately a closed struct
/// rather than a by-name lookup.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, Deserialize)]
pub struct FeatureFlags {
	#[serde(default = "true_fn")]
	pub enable_registration: bool,
	#[serde(default = "true_fn")]
	pub enable_room_creation: bool,
	#[serde(default = "true_fn")]
	pub enable_chat_commands: bool,
	#[serde(default = "true_fn")]
	pub enable_avatars: bool,
	#[serde(default)]
	pub enable_soundcloud: bool,
	#[serde(default)]
	pub enable_profanity_filter: bool,
}

impl Default for FeatureFlags {
	fn default() -> Self {
		Self {
			enable_registration: true,
			enable_room_creation: true,
			enable_chat_commands: true,
			enable_avatars: true,
			enable_soundcloud: false,
			enable_profanity_filter: false,
		}
	}
}

impl Config {
	/// Pre-initialize config
	pub fn load<'a, I>(paths: I) -> Result<Figment>
	where
		I: Iterator<Item = &'a Path>,
	{
		let envs = [Env::var("WAVEROOM_CONFIG")];

		let config = envs
			.into_iter()
			.flatten()
			.map(Toml::file)
			.chain(paths.map(Toml::file))
			.fold(Figment::new(), |config, file| config.merge(file.nested()))
			.merge(Env::prefixed("WAVEROOM_").global().split("__"));

		Ok(config)
	}

	/// Finalize config
	pub fn new(raw_config: &Figment) -> Result<Self> {
		let mut config = raw_config
			.extract::<Self>()
			.map_err(|e| err!("There was a problem with your configuration file: {e}"))?;

		if config.jwt_secret.is_none() {
			config.jwt_secret = Some(utils::random_string(32));
		}

		Ok(config)
	}

	pub fn check(&self) -> Result<(), Error> { check(self) }
}

fn true_fn() -> bool { true }

fn default_server_name() -> String { "waveroom".to_owned() }

fn default_log() -> String { "info".to_owned() }

fn default_log_span_events() -> String { "none".to_owned() }

fn default_session_ttl_s() -> u64 { 24 * 60 * 60 }

fn default_presence_ttl_s() -> u64 { 2 * 60 }

fn default_presence_sweep_interval_s() -> u64 { 60 }

fn default_client_sweep_interval_s() -> u64 { 5 * 60 }

fn default_disconnect_grace_s() -> u64 { 30 }

fn default_room_idle_hibernate_s() -> u64 { 6 * 60 * 60 }

fn default_kv_timeout_s() -> u64 { 3 }

fn default_doc_timeout_s() -> u64 { 10 }

fn default_publish_timeout_s() -> u64 { 5 }

fn default_probe_timeout_ms() -> u64 { 500 }

fn default_probe_retries() -> u32 { 3 }

fn default_probe_backoff_ms() -> u64 { 100 }

fn default_bus_capacity() -> usize { 1024 }

fn default_sync_buffer() -> usize { 100 }

fn default_history_limit() -> usize { 50 }

fn default_room_capacity() -> u32 { 200 }

fn default_waitlist_max() -> u32 { 50 }

fn default_allowed_media_sources() -> Vec<String> { vec!["youtube".to_owned()] }

fn default_ws_max_frame_bytes() -> usize { 64 * 1024 }
