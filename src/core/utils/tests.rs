#![allow(clippy::needless_borrows_for_generic_args)]

use crate::utils;

#[test]
fn split_once_infallible() {
	use utils::string::SplitInfallible;

	let (a, b) = "waveroom_service::presence".split_once_infallible("::");
	assert_eq!(a, "waveroom_service");
	assert_eq!(b, "presence");

	let (a, b) = "nodelim".split_once_infallible("::");
	assert_eq!(a, "nodelim");
	assert_eq!(b, "");
}

#[test]
fn string_truncated() {
	assert_eq!(utils::truncated("abcdefghijkl", 8), "abcdefgh");
	assert_eq!(utils::truncated("short", 8), "short");
	assert_eq!(utils::truncated("", 8), "");
}

#[test]
fn random_string_charset() {
	let s = utils::random_string(24);
	assert_eq!(s.len(), 24);
	assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));

	// two draws colliding would mean the generator is broken
	assert_ne!(utils::random_string(24), s);
}

#[test]
fn shuffle_preserves_elements() {
	let mut vec: Vec<u64> = (0..64).collect();
	utils::shuffle(&mut vec);
	vec.sort_unstable();
	assert_eq!(vec, (0..64).collect::<Vec<u64>>());
}

#[test]
fn now_millis_monotonicish() {
	let a = utils::millis_since_unix_epoch();
	let b = utils::millis_since_unix_epoch();
	assert!(b >= a);
}

#[test]
fn checked_arithmetic() {
	use crate::checked;

	let a: u64 = 1_000;
	let b: u64 = 5;
	let result = checked!(a + b).expect("sum does not overflow");
	assert_eq!(result, 1_005);

	let max = u64::MAX;
	assert!(checked!(max + b).is_err());
}

#[test]
fn rfc3339_shape() {
	let ts = utils::time::rfc3339_now();
	assert!(ts.ends_with('Z'));
	assert!(ts.contains('T'));
}
