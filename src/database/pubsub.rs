use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::broadcast::{self, error::RecvError};
use waveroom_core::{Err, Result, implement, warn};

use crate::Database;

/// One frame on the fan-out bus.
#[derive(Clone, Debug)]
pub struct BusMessage {
	pub channel: Arc<str>,
	pub payload: Bytes,
}

/// Receiving side of the bus. Publish order is preserved per channel;
/// a slow consumer drops the oldest frames rather than stalling anyone.
pub struct Subscriber {
	inner: broadcast::Receiver<BusMessage>,
}

/// Publish a payload on a channel. Returns the number of live subscribers
/// the frame reached; zero is not an error.
#[implement(Database)]
pub async fn publish(&self, channel: &str, payload: Bytes) -> Result<usize> {
	Ok(self.engine.publish(BusMessage {
		channel: channel.into(),
		payload,
	}))
}

/// Attach a subscriber to the bus. Channel filtering happens above; the
/// store fans every frame to every subscriber.
#[implement(Database)]
#[must_use]
pub fn subscribe(&self) -> Subscriber {
	Subscriber { inner: self.engine.bus_receiver() }
}

impl Subscriber {
	/// Next frame. Lag is absorbed with a warning; a closed bus ends the
	/// stream with an error the dispatch loop treats as terminal.
	pub async fn recv(&mut self) -> Result<BusMessage> {
		loop {
			match self.inner.recv().await {
				| Ok(message) => return Ok(message),
				| Err(RecvError::Lagged(skipped)) => {
					warn!(skipped, "subscriber lagging; dropped oldest frames");
				},
				| Err(RecvError::Closed) => return Err!("subscription closed"),
			}
		}
	}
}
