use super::Result;

/// Inspect Result values with release-mode elision.
pub trait DebugInspect<T, E> {
	/// Inspects an Err contained value in debug-mode. In release-mode closure
	/// is elided.
	#[must_use]
	fn debug_inspect_err<F: FnOnce(&E)>(self, inspector: F) -> Self;

	/// Inspects an Ok contained value in debug-mode. In release-mode closure
	/// is elided.
	#[must_use]
	fn debug_inspect<F: FnOnce(&T)>(self, inspector: F) -> Self;
}

#[cfg(debug_assertions)]
impl<T, E> DebugInspect<T, E> for Result<T, E> {
	#[inline]
	fn debug_inspect<F: FnOnce(&T)>(self, inspector: F) -> Self { self.inspect(inspector) }

	#[inline]
	fn debug_inspect_err<F: FnOnce(&E)>(self, inspector: F) -> Self {
		self.inspect_err(inspector)
	}
}

#[cfg(not(debug_assertions))]
impl<T, E> DebugInspect<T, E> for Result<T, E> {
	#[inline]
	fn debug_inspect<F: FnOnce(&T)>(self, _: F) -> Self { self }

	#[inline]
	fn debug_inspect_err<F: FnOnce(&E)>(self, _: F) -> Self { self }
}
