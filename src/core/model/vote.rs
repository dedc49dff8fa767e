use serde::{Deserialize, Serialize};

use crate::{Err, Result};

/// The closed set of audience reactions to the playing track.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
	Woot,
	Meh,
	Grab,
}

impl VoteType {
	pub const ALL: [Self; 3] = [Self::Woot, Self::Meh, Self::Grab];

	#[must_use]
	pub fn as_str(&self) -> &'static str {
		match self {
			| Self::Woot => "woot",
			| Self::Meh => "meh",
			| Self::Grab => "grab",
		}
	}

	pub fn parse(vote: &str) -> Result<Self> {
		match vote {
			| "woot" => Ok(Self::Woot),
			| "meh" => Ok(Self::Meh),
			| "grab" => Ok(Self::Grab),
			| other => Err!(BadRequest(
				"Invalid vote type '{other}'; allowed types are woot, meh, grab"
			)),
		}
	}
}

impl std::fmt::Display for VoteType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct VoteCounts {
	pub woot: u64,
	pub meh: u64,
	pub grab: u64,
}

impl VoteCounts {
	#[inline]
	#[must_use]
	pub fn total(&self) -> u64 {
		self.woot
			.saturating_add(self.meh)
			.saturating_add(self.grab)
	}
}
