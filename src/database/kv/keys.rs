use waveroom_core::{Result, implement};

use crate::Database;

/// List live keys matching a glob pattern. `*` matches any run of
/// characters including none; everything else is literal.
#[implement(Database)]
pub async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
	self.engine.read(|table, now| {
		let mut keys: Vec<_> = table
			.iter()
			.filter(|(_, entry)| !entry.is_expired(now))
			.map(|(key, _)| key)
			.filter(|key| glob_match(pattern, key))
			.cloned()
			.collect();

		keys.sort_unstable();

		Ok(keys)
	})
}

/// Anchored glob with `*` wildcards only. The first segment pins to the
/// start, the last to the end, the rest must appear in order between them.
pub(crate) fn glob_match(pattern: &str, input: &str) -> bool {
	if !pattern.contains('*') {
		return pattern == input;
	}

	let segments: Vec<&str> = pattern.split('*').collect();
	let (first, rest) = segments
		.split_first()
		.expect("split yields at least one segment");

	let mut remaining = input;
	if !first.is_empty() {
		match remaining.strip_prefix(first) {
			| Some(r) => remaining = r,
			| None => return false,
		}
	}

	let Some((last, middle)) = rest.split_last() else {
		// no '*' in the pattern is handled above
		return false;
	};

	if !last.is_empty() {
		match remaining.strip_suffix(last) {
			| Some(r) => remaining = r,
			| None => return false,
		}
	}

	for segment in middle {
		if segment.is_empty() {
			continue;
		}

		let Some(at) = remaining.find(segment) else {
			return false;
		};

		remaining = &remaining[at.saturating_add(segment.len())..];
	}

	true
}
