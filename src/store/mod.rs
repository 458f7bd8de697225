//! Note storage backends behind one contract.
//!
//! Each backend has its own adapter that normalizes its record shape into the
//! canonical [`Note`](crate::notes::Note):
//!
//! - [`LocalNoteStore`]: a JSON array under one key of a [`KeyValueStore`]
//! - [`RemoteNoteStore`]: the HTTP article API with `{result, data, error}` envelopes

use async_trait::async_trait;

use crate::error::StoreError;
use crate::notes::{Note, NoteDraft};

mod browser;
mod local;
mod memory;
pub mod remote;

pub use browser::{BrowserStorage, StorageWatcher};
pub use local::{DEFAULT_STORAGE_KEY, LocalNoteStore, decode_notes};
pub use memory::MemoryStorage;
pub use remote::RemoteNoteStore;

/// CRUD contract shared by every backend.
///
/// Futures are not `Send`: everything runs on the browser's main thread.
#[async_trait(?Send)]
pub trait NoteStore {
	/// All notes in stored order.
	async fn list(&self) -> Result<Vec<Note>, StoreError>;

	/// The note with local `id`, or [`StoreError::NotFound`].
	async fn get(&self, id: &str) -> Result<Note, StoreError>;

	/// Validates and persists `draft`, returning the stored note.
	async fn create(&self, draft: NoteDraft) -> Result<Note, StoreError>;

	/// Replaces title, content and links of note `id`. Identity and
	/// creation time are kept.
	async fn update(&self, id: &str, draft: NoteDraft) -> Result<Note, StoreError>;

	/// Removes note `id`.
	async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// A synchronous string key-value medium with an explicit lifecycle.
///
/// `read`/`write` on a store that is not open fail with
/// [`StoreError::Storage`].
pub trait KeyValueStore {
	/// Makes the medium usable. Idempotent.
	fn open(&mut self) -> Result<(), StoreError>;

	/// Value under `key`, `None` when absent.
	fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

	/// Stores `value` under `key`, replacing any previous value.
	fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

	/// Releases the medium. Persisted values survive.
	fn close(&mut self);
}
