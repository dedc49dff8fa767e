use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use waveroom_core::{Result, debug, utils};

use crate::service;

/// Registry of live gateway connections. The gateway registers each
/// accepted WebSocket and unregisters on close; the reaper consults this to
/// distinguish a heartbeat gap from a true disconnect.
pub struct Service {
	connected: RwLock<HashMap<String, u64>>,
}

impl crate::Service for Service {
	fn build(_args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self { connected: RwLock::new(HashMap::new()) }))
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	pub async fn register(&self, user_id: &str) {
		debug!(user_id, "client connected");
		self.connected
			.write()
			.await
			.insert(user_id.to_owned(), utils::millis_since_unix_epoch());
	}

	pub async fn unregister(&self, user_id: &str) {
		debug!(user_id, "client disconnected");
		self.connected.write().await.remove(user_id);
	}

	pub async fn is_connected(&self, user_id: &str) -> bool {
		self.connected.read().await.contains_key(user_id)
	}

	pub async fn connected_count(&self) -> usize { self.connected.read().await.len() }
}
