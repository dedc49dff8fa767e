//! Domain records shared across the tree. Everything here serializes to the
//! JSON shapes stored in the keyed store and carried on the wire; field names
//! are camelCase on the outside.

pub mod chat;
pub mod event;
pub mod moderation;
pub mod presence;
pub mod room;
pub mod session;
pub mod state;
pub mod sync;
pub mod user;
pub mod vote;

pub use self::{
	chat::ChatMessage,
	event::Envelope,
	moderation::{Ban, BanDuration, ModAction, ModerationLogEntry, Report},
	presence::Presence,
	room::{Room, RoomRole, RoomSettings},
	session::Session,
	state::{HistoryEntry, QueueEntry, RoomState, RoomStateData},
	sync::{PlaybackState, SyncEvent, SyncMessage},
	user::{PublicUser, Role, User},
	vote::{VoteCounts, VoteType},
};
