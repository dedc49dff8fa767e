use std::sync::Arc;

use tokio::sync::Mutex;
use waveroom_core::{Result, Server, debug, debug_info, implement, info, trace};
use waveroom_database::Database;

pub(crate) use crate::OnceServices;
use crate::{
	clients, globals,
	manager::Manager,
	moderation, presence, pubsub, ratelimit, reaper, rooms,
	service::{Args, Service},
	sessions, users,
};

pub struct Services {
	pub clients: Arc<clients::Service>,
	pub globals: Arc<globals::Service>,
	pub moderation: Arc<moderation::Service>,
	pub presence: Arc<presence::Service>,
	pub pubsub: Arc<pubsub::Service>,
	pub ratelimit: Arc<ratelimit::Service>,
	pub reaper: Arc<reaper::Service>,
	pub chat: Arc<rooms::chat::Service>,
	pub queue: Arc<rooms::queue::Service>,
	pub state: Arc<rooms::state::Service>,
	pub sync: Arc<rooms::sync::Service>,
	pub sessions: Arc<sessions::Service>,
	pub users: Arc<users::Service>,

	manager: Mutex<Option<Arc<Manager>>>,
	pub server: Arc<Server>,
	pub db: Arc<Database>,
}

#[implement(Services)]
pub async fn build(server: Arc<Server>) -> Result<Arc<Self>> {
	let db = Database::open(&server).await?;
	let services = Arc::new(OnceServices::default());
	macro_rules! build {
		($tyname:ty) => {
			<$tyname>::build(&Args {
				db: &db,
				server: &server,
				services: &services,
			})?
		};
	}

	let res = Arc::new(Self {
		clients: build!(clients::Service),
		globals: build!(globals::Service),
		moderation: build!(moderation::Service),
		presence: build!(presence::Service),
		pubsub: build!(pubsub::Service),
		ratelimit: build!(ratelimit::Service),
		reaper: build!(reaper::Service),
		chat: build!(rooms::chat::Service),
		queue: build!(rooms::queue::Service),
		state: build!(rooms::state::Service),
		sync: build!(rooms::sync::Service),
		sessions: build!(sessions::Service),
		users: build!(users::Service),

		manager: Mutex::new(None),
		server,
		db,
	});

	Ok(services.set(res))
}

#[implement(Services)]
pub(crate) fn services(&self) -> impl Iterator<Item = Arc<dyn Service>> + Send {
	macro_rules! cast {
		($s:expr_2021) => {
			<Arc<dyn Service> as Into<_>>::into($s.clone())
		};
	}

	[
		cast!(self.clients),
		cast!(self.globals),
		cast!(self.moderation),
		cast!(self.presence),
		cast!(self.pubsub),
		cast!(self.ratelimit),
		cast!(self.reaper),
		cast!(self.chat),
		cast!(self.queue),
		cast!(self.state),
		cast!(self.sync),
		cast!(self.sessions),
		cast!(self.users),
	]
	.into_iter()
}

#[implement(Services)]
pub async fn start(self: &Arc<Self>) -> Result<Arc<Self>> {
	debug_info!("Starting services...");

	self.manager
		.lock()
		.await
		.insert(Manager::new(self))
		.clone()
		.start()
		.await?;

	debug_info!("Services startup complete.");

	Ok(Arc::clone(self))
}

#[implement(Services)]
pub async fn stop(&self) {
	info!("Shutting down services...");

	self.interrupt().await;
	if let Some(manager) = self.manager.lock().await.as_ref() {
		manager.stop().await;
	}

	debug_info!("Services shutdown complete.");
}

#[implement(Services)]
pub(crate) async fn interrupt(&self) {
	debug!("Interrupting services...");
	for service in self.services() {
		let name = service.name();
		trace!("Interrupting {name}");
		service.interrupt().await;
	}
}

#[implement(Services)]
pub async fn poll(&self) -> Result {
	if let Some(manager) = self.manager.lock().await.as_ref() {
		return manager.poll().await;
	}

	Ok(())
}

#[implement(Services)]
pub async fn memory_usage(&self) -> Result<String> {
	let mut out = String::new();
	for service in self.services() {
		service.memory_usage(&mut out).await?;
	}

	Ok(out)
}
