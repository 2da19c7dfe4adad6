//! Observable settings holders persisted as JSON under fixed keys.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::graph::Credentials;

/// Storage key of [`ServerSettings`].
pub const SERVER_SETTINGS_KEY: &str = "serverSettings";
/// Storage key of [`AppSettings`].
pub const APP_SETTINGS_KEY: &str = "appSettings";

/// Query loaded when no other one was configured.
pub const DEFAULT_INITIAL_QUERY: &str = "MATCH (n)-[r]->(m) RETURN n,r,m";

/// Failures while persisting a setting.
#[derive(Debug, Error)]
pub enum SettingsError {
	/// The value could not be encoded.
	#[error("failed to serialize setting: {0}")]
	Serialize(#[from] serde_json::Error),

	/// The backing storage refused the write or is missing.
	#[error("storage unavailable: {0}")]
	Storage(String),
}

/// Key/value persistence behind [`Setting`].
pub trait SettingsStore {
	/// Raw stored value, if any.
	fn load(&self, key: &str) -> Option<String>;

	/// Store `value` under `key`.
	fn save(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// The browser's `localStorage`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorage;

impl LocalStorage {
	fn storage() -> Result<web_sys::Storage, SettingsError> {
		web_sys::window()
			.ok_or_else(|| SettingsError::Storage("no window".into()))?
			.local_storage()
			.map_err(|err| SettingsError::Storage(format!("{err:?}")))?
			.ok_or_else(|| SettingsError::Storage("localStorage disabled".into()))
	}
}

impl SettingsStore for LocalStorage {
	fn load(&self, key: &str) -> Option<String> {
		Self::storage().ok()?.get_item(key).ok().flatten()
	}

	fn save(&self, key: &str, value: &str) -> Result<(), SettingsError> {
		Self::storage()?
			.set_item(key, value)
			.map_err(|err| SettingsError::Storage(format!("{err:?}")))
	}
}

/// In-memory [`SettingsStore`] for hosts without `localStorage`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
	entries: RefCell<HashMap<String, String>>,
}

impl SettingsStore for MemoryStorage {
	fn load(&self, key: &str) -> Option<String> {
		self.entries.borrow().get(key).cloned()
	}

	fn save(&self, key: &str, value: &str) -> Result<(), SettingsError> {
		self.entries
			.borrow_mut()
			.insert(key.to_string(), value.to_string());
		Ok(())
	}
}

type Listener<T> = Box<dyn Fn(&T)>;

/// A value with change notification, loaded from and saved to a
/// [`SettingsStore`]. A missing or malformed stored value yields the default.
pub struct Setting<T> {
	key: &'static str,
	value: RefCell<T>,
	store: Rc<dyn SettingsStore>,
	listeners: RefCell<Vec<Listener<T>>>,
}

impl<T: Clone + Serialize + DeserializeOwned> Setting<T> {
	/// Load `key` from `store`, falling back to `default()`.
	pub fn load(key: &'static str, store: Rc<dyn SettingsStore>, default: impl FnOnce() -> T) -> Self {
		let value = match store.load(key).map(|raw| serde_json::from_str::<T>(&raw)) {
			Some(Ok(value)) => value,
			Some(Err(err)) => {
				warn!("ignoring malformed setting `{key}`: {err}");
				default()
			}
			None => {
				debug!("setting `{key}` not stored, using default");
				default()
			}
		};
		Self {
			key,
			value: RefCell::new(value),
			store,
			listeners: RefCell::new(Vec::new()),
		}
	}

	/// Current value.
	pub fn get(&self) -> T {
		self.value.borrow().clone()
	}

	/// Persist `value`, then publish it to subscribers.
	pub fn set(&self, value: T) -> Result<(), SettingsError> {
		let raw = serde_json::to_string(&value)?;
		self.store.save(self.key, &raw)?;
		*self.value.borrow_mut() = value;
		let current = self.get();
		for listener in self.listeners.borrow().iter() {
			listener(&current);
		}
		Ok(())
	}

	/// Call `listener` with every value passed to [`Setting::set`].
	pub fn subscribe(&self, listener: impl Fn(&T) + 'static) {
		self.listeners.borrow_mut().push(Box::new(listener));
	}
}

/// Connection details for the graph database.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
	/// Server URI.
	pub server: String,
	/// User name.
	pub user: String,
	/// Password.
	pub password: String,
}

impl ServerSettings {
	/// Whether enough is filled in to attempt a connection.
	pub fn is_complete(&self) -> bool {
		!self.server.trim().is_empty() && !self.user.is_empty()
	}

	/// Credentials for the engine.
	pub fn credentials(&self) -> Credentials {
		Credentials {
			server: self.server.clone(),
			user: self.user.clone(),
			password: self.password.clone(),
		}
	}
}

/// Editor preferences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
	/// Query loaded when the editor starts.
	pub initial_cypher: String,
}

impl Default for AppSettings {
	fn default() -> Self {
		Self {
			initial_cypher: DEFAULT_INITIAL_QUERY.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use super::*;

	fn storage() -> Rc<MemoryStorage> {
		Rc::new(MemoryStorage::default())
	}

	#[test]
	fn missing_or_malformed_values_fall_back_to_defaults() {
		let store = storage();
		let app = Setting::load(APP_SETTINGS_KEY, store.clone(), AppSettings::default);
		assert_eq!(app.get().initial_cypher, DEFAULT_INITIAL_QUERY);

		store.save(SERVER_SETTINGS_KEY, "{not json").unwrap();
		let server = Setting::load(SERVER_SETTINGS_KEY, store, ServerSettings::default);
		assert_eq!(server.get(), ServerSettings::default());
		assert!(!server.get().is_complete());
	}

	#[test]
	fn set_persists_and_notifies() {
		let store = storage();
		let app = Setting::load(APP_SETTINGS_KEY, store.clone(), AppSettings::default);
		let seen = Rc::new(Cell::new(0));
		let counter = seen.clone();
		app.subscribe(move |_| counter.set(counter.get() + 1));

		app.set(AppSettings {
			initial_cypher: "MATCH (n) RETURN n".into(),
		})
		.unwrap();

		assert_eq!(seen.get(), 1);
		assert_eq!(
			store.load(APP_SETTINGS_KEY).as_deref(),
			Some(r#"{"initialCypher":"MATCH (n) RETURN n"}"#)
		);
		let reloaded = Setting::load(APP_SETTINGS_KEY, store, AppSettings::default);
		assert_eq!(reloaded.get().initial_cypher, "MATCH (n) RETURN n");
	}

	#[test]
	fn partial_server_settings_fill_missing_fields() {
		let store = storage();
		store
			.save(SERVER_SETTINGS_KEY, r#"{"server":"http://localhost:7474","user":"neo4j"}"#)
			.unwrap();
		let server = Setting::load(SERVER_SETTINGS_KEY, store, ServerSettings::default).get();
		assert!(server.is_complete());
		assert_eq!(server.credentials().password, "");
	}
}
