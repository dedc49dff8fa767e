use super::Result;

pub trait FlatOk<T> {
	/// Equivalent to .transpose().ok().flatten().flatten()
	fn flat_ok(self) -> Option<T>;
}

impl<T, E> FlatOk<T> for Option<Result<T, E>> {
	#[inline]
	fn flat_ok(self) -> Option<T> { self?.ok() }
}

impl<T, E> FlatOk<T> for Result<Option<T>, E> {
	#[inline]
	fn flat_ok(self) -> Option<T> { self.ok()? }
}
