use std::fmt::Display;

use super::Result;
use crate::error;

pub trait LogErr<T, E: Display> {
	#[must_use]
	fn log_err(self) -> Self;
}

impl<T, E: Display> LogErr<T, E> for Result<T, E> {
	#[inline]
	fn log_err(self) -> Self { self.inspect_err(error::inspect_log) }
}
