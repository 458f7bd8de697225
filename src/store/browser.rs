//! `window.localStorage` access and cross-tab change notification.

use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{Storage, StorageEvent, Window};

use super::KeyValueStore;
use crate::error::StoreError;

fn js_error(context: &str, err: JsValue) -> StoreError {
	StoreError::Storage(format!("{context}: {err:?}"))
}

fn window() -> Result<Window, StoreError> {
	web_sys::window().ok_or_else(|| StoreError::Storage("no window available".into()))
}

/// [`KeyValueStore`] over the browser's `localStorage`.
#[derive(Debug, Default)]
pub struct BrowserStorage {
	storage: Option<Storage>,
}

impl BrowserStorage {
	/// Unopened handle; `localStorage` is looked up on [`KeyValueStore::open`].
	pub fn new() -> Self {
		Self::default()
	}

	fn storage(&self) -> Result<&Storage, StoreError> {
		self.storage
			.as_ref()
			.ok_or_else(|| StoreError::Storage("localStorage is not open".into()))
	}
}

impl KeyValueStore for BrowserStorage {
	fn open(&mut self) -> Result<(), StoreError> {
		let storage = window()?
			.local_storage()
			.map_err(|err| js_error("localStorage access denied", err))?
			.ok_or_else(|| StoreError::Storage("localStorage unavailable".into()))?;
		self.storage = Some(storage);
		Ok(())
	}

	fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
		self.storage()?
			.get_item(key)
			.map_err(|err| js_error("localStorage read failed", err))
	}

	fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
		self.storage()?
			.set_item(key, value)
			.map_err(|err| js_error("localStorage write failed", err))
	}

	fn close(&mut self) {
		self.storage = None;
	}
}

/// Listens for `storage` events on one key, fired when another tab or window
/// writes it. Delivery is best effort and unordered across tabs.
///
/// The listener is removed when the watcher is dropped, unless it was
/// [`detach`](Self::detach)ed for the lifetime of the page.
pub struct StorageWatcher {
	window: Window,
	listener: Option<Closure<dyn FnMut(StorageEvent)>>,
}

impl StorageWatcher {
	/// Calls `on_change` whenever another tab writes `key`.
	pub fn subscribe(
		key: impl Into<String>,
		mut on_change: impl FnMut() + 'static,
	) -> Result<Self, StoreError> {
		let window = window()?;
		let key = key.into();
		let listener = Closure::<dyn FnMut(StorageEvent)>::new(move |event: StorageEvent| {
			// A `null` key means the whole storage area was cleared.
			match event.key() {
				Some(changed) if changed != key => {}
				_ => {
					debug!("rhizome: storage key {key} changed in another tab");
					on_change();
				}
			}
		});
		window
			.add_event_listener_with_callback("storage", listener.as_ref().unchecked_ref())
			.map_err(|err| js_error("failed to watch storage", err))?;
		Ok(Self {
			window,
			listener: Some(listener),
		})
	}

	/// Keeps the listener installed for the rest of the page's life.
	pub fn detach(mut self) {
		if let Some(listener) = self.listener.take() {
			listener.forget();
		}
	}
}

impl Drop for StorageWatcher {
	fn drop(&mut self) {
		if let Some(listener) = self.listener.take() {
			if let Err(err) = self
				.window
				.remove_event_listener_with_callback("storage", listener.as_ref().unchecked_ref())
			{
				warn!("rhizome: failed to remove storage listener: {err:?}");
			}
		}
	}
}
