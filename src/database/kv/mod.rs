mod counter;
mod expire;
mod hash;
mod keys;
mod list;
mod sets;
mod strings;
mod zset;

pub(crate) use self::{
	counter::incr_apply, keys::glob_match, list::resolve_range, strings::ttl_millis,
};
