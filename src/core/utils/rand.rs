use rand::{Rng, seq::SliceRandom, thread_rng};

pub fn string(length: usize) -> String {
	thread_rng()
		.sample_iter(&rand::distributions::Alphanumeric)
		.take(length)
		.map(char::from)
		.collect()
}

#[inline]
pub fn shuffle<T>(vec: &mut [T]) {
	let mut rng = thread_rng();
	vec.shuffle(&mut rng);
}
