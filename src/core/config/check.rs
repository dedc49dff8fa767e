use crate::{Config, Err, error::Error, info, warn};

/// Minimum length of the token-signing secret.
const JWT_SECRET_MIN: usize = 16;

/// Operation deadlines must land inside this window, seconds.
const TIMEOUT_MIN_S: u64 = 1;
const TIMEOUT_MAX_S: u64 = 5 * 60;

pub fn check(config: &Config) -> Result<(), Error> {
	#[cfg(debug_assertions)]
	info!("Note: waveroom was built without optimisations (i.e. debug build)");

	if config
		.jwt_secret
		.as_ref()
		.is_none_or(|secret| secret.len() < JWT_SECRET_MIN)
	{
		return Err!(Config(
			"jwt_secret",
			"Token secret must be at least {JWT_SECRET_MIN} characters."
		));
	}

	for (name, timeout) in [
		("kv_timeout_s", config.kv_timeout_s),
		("doc_timeout_s", config.doc_timeout_s),
		("publish_timeout_s", config.publish_timeout_s),
	] {
		if !(TIMEOUT_MIN_S..=TIMEOUT_MAX_S).contains(&timeout) {
			return Err(Error::Config(
				name,
				format!("Timeouts must be between {TIMEOUT_MIN_S}s and {TIMEOUT_MAX_S}s.").into(),
			));
		}
	}

	if config.room_capacity_default == 0 {
		return Err!(Config("room_capacity_default", "Room capacity cannot be zero."));
	}

	if config.allowed_media_sources.is_empty() {
		return Err!(Config(
			"allowed_media_sources",
			"At least one media source must be allowed."
		));
	}

	if config.features.enable_soundcloud
		&& !config
			.allowed_media_sources
			.iter()
			.any(|source| source == "soundcloud")
	{
		warn!(
			"enable_soundcloud is set but 'soundcloud' is not in allowed_media_sources; the \
			 flag has no effect."
		);
	}

	if config.bus_capacity == 0 || config.sync_buffer == 0 {
		return Err!(Config("bus_capacity", "Fan-out buffers cannot be zero-sized."));
	}

	Ok(())
}
