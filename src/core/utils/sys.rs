/// Sizes the worker pool when the configuration leaves it to the machine.
#[inline]
#[must_use]
pub fn available_parallelism() -> usize {
	std::thread::available_parallelism()
		.expect("Unable to query for available parallelism.")
		.get()
}
