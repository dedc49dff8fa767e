use std::time::Duration;

#[inline]
#[must_use]
#[allow(clippy::as_conversions)]
pub fn now_millis() -> u64 {
	use std::time::UNIX_EPOCH;

	UNIX_EPOCH
		.elapsed()
		.expect("positive duration after epoch")
		.as_millis() as u64
}

#[inline]
#[must_use]
pub fn now_secs() -> u64 {
	use std::time::UNIX_EPOCH;

	UNIX_EPOCH
		.elapsed()
		.expect("positive duration after epoch")
		.as_secs()
}

/// Buoyant duration format for humans e.g. "2h 30m 1s".
#[must_use]
pub fn pretty(d: Duration) -> String { cyborgtime::format_duration(d).to_string() }

/// ISO-8601 timestamp for event envelopes.
#[must_use]
pub fn rfc3339_now() -> String {
	use chrono::{DateTime, SecondsFormat, Utc};

	let now: DateTime<Utc> = std::time::SystemTime::now().into();

	now.to_rfc3339_opts(SecondsFormat::Millis, true)
}
