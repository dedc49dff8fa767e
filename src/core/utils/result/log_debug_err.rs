use std::fmt::Debug;

use super::Result;
use crate::error;

pub trait LogDebugErr<T, E: Debug> {
	#[must_use]
	fn log_debug_err(self) -> Self;
}

impl<T, E: Debug> LogDebugErr<T, E> for Result<T, E> {
	#[inline]
	fn log_debug_err(self) -> Self { self.inspect_err(error::inspect_debug_log) }
}
