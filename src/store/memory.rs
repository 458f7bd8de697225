use std::collections::HashMap;

use super::KeyValueStore;
use crate::error::StoreError;

/// In-memory [`KeyValueStore`]. Used in tests and as a fallback when the
/// browser refuses access to `localStorage`.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
	entries: HashMap<String, String>,
	open: bool,
}

impl MemoryStorage {
	/// Closed, empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// A closed store pre-populated with one entry.
	pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
		let mut entries = HashMap::new();
		entries.insert(key.into(), value.into());
		Self {
			entries,
			open: false,
		}
	}

	/// Lifecycle state.
	pub fn is_open(&self) -> bool {
		self.open
	}

	/// Raw value regardless of lifecycle state.
	pub fn peek(&self, key: &str) -> Option<&str> {
		self.entries.get(key).map(String::as_str)
	}

	fn ensure_open(&self) -> Result<(), StoreError> {
		if self.open {
			Ok(())
		} else {
			Err(StoreError::Storage("memory store is closed".into()))
		}
	}
}

impl KeyValueStore for MemoryStorage {
	fn open(&mut self) -> Result<(), StoreError> {
		self.open = true;
		Ok(())
	}

	fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
		self.ensure_open()?;
		Ok(self.entries.get(key).cloned())
	}

	fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
		self.ensure_open()?;
		self.entries.insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn close(&mut self) {
		self.open = false;
	}
}
