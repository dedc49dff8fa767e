use crate::Result;

pub const EMPTY: &str = "";

/// Split a string with default behavior when the delimiter is missing: the
/// entire input is the first half, the second half is empty.
pub trait SplitInfallible<'a> {
	fn split_once_infallible(&self, delim: &str) -> Pair<'a>;
}

type Pair<'a> = (&'a str, &'a str);

impl<'a> SplitInfallible<'a> for &'a str {
	#[inline]
	fn split_once_infallible(&self, delim: &str) -> Pair<'a> {
		self.split_once(delim).unwrap_or((*self, EMPTY))
	}
}

/// Prefix of a string for display purposes; opaque tokens are logged through
/// this so secrets never land in full in the log stream.
#[inline]
#[must_use]
pub fn truncated(str: &str, len: usize) -> &str { str.get(..len).unwrap_or(str) }

#[inline]
pub fn str_from_bytes(bytes: &[u8]) -> Result<&str> {
	std::str::from_utf8(bytes).map_err(Into::into)
}

#[inline]
pub fn string_from_bytes(bytes: &[u8]) -> Result<String> {
	String::from_utf8(bytes.to_vec()).map_err(Into::into)
}
