use std::{marker::PhantomData, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use waveroom_core::{Result, err};

use crate::engine::{Engine, Entry, Value, live};

/// Typed handle over one durable document namespace. Documents are JSON
/// under `doc:<collection>:<id>` and never expire; this is the material
/// that must survive restarts indefinitely.
pub struct Collection<T> {
	name: &'static str,
	engine: Arc<Engine>,
	_phantom: PhantomData<fn() -> T>,
}

impl<T> Collection<T> {
	pub(crate) fn open(engine: &Arc<Engine>, name: &'static str) -> Self {
		Self {
			name,
			engine: engine.clone(),
			_phantom: PhantomData,
		}
	}
}

impl<T: Serialize + DeserializeOwned> Collection<T> {
	fn key(&self, id: &str) -> String { format!("doc:{}:{id}", self.name) }

	/// Insert a new document; Conflict when the id is taken.
	pub async fn insert(&self, id: &str, doc: &T) -> Result {
		let raw = serde_json::to_string(doc)?;
		let key = self.key(id);

		self.engine.write(|table, now| {
			if live(table, &key, now).is_some() {
				return Err(err!(Conflict("{}/{id} already exists", self.name)));
			}

			table.insert(key.clone(), Entry::new(Value::Str(raw)));

			Ok(())
		})
	}

	/// Write a document unconditionally, creating or replacing.
	pub async fn put(&self, id: &str, doc: &T) -> Result {
		let raw = serde_json::to_string(doc)?;
		let key = self.key(id);

		self.engine.write(|table, _| {
			table.insert(key.clone(), Entry::new(Value::Str(raw)));

			Ok(())
		})
	}

	pub async fn get(&self, id: &str) -> Result<T> {
		let key = self.key(id);

		let raw = self.engine.read(|table, now| {
			live(table, &key, now)
				.ok_or_else(|| err!(NotFound("{}/{id} not found", self.name)))?
				.value
				.str_ref()
				.cloned()
		})?;

		serde_json::from_str(&raw).map_err(Into::into)
	}

	pub async fn delete(&self, id: &str) -> Result<bool> {
		let key = self.key(id);

		self.engine.write(|table, now| {
			let existed = live(table, &key, now).is_some();
			table.remove(&key);

			Ok(existed)
		})
	}

	/// Scan the collection, keeping documents the filter accepts. Linear;
	/// collections here are modest and secondary indexes live upstairs.
	pub async fn find(&self, filter: impl Fn(&T) -> bool) -> Result<Vec<T>> {
		let prefix = format!("doc:{}:", self.name);

		let raws: Vec<String> = self.engine.read(|table, now| {
			table
				.iter()
				.filter(|(key, _)| key.starts_with(&prefix))
				.filter(|(_, entry)| !entry.is_expired(now))
				.filter_map(|(_, entry)| entry.value.str_ref().ok().cloned())
				.collect()
		});

		let mut docs = Vec::new();
		for raw in raws {
			let doc: T = serde_json::from_str(&raw)?;
			if filter(&doc) {
				docs.push(doc);
			}
		}

		Ok(docs)
	}

	pub async fn all(&self) -> Result<Vec<T>> { self.find(|_| true).await }

	pub async fn count(&self, filter: impl Fn(&T) -> bool) -> Result<usize> {
		Ok(self.find(filter).await?.len())
	}
}
