//! Notes persisted as one JSON array under a single key.

use std::cell::RefCell;
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{KeyValueStore, NoteStore};
use crate::error::StoreError;
use crate::notes::{Note, NoteDraft};

/// Key used by the article pages.
pub const DEFAULT_STORAGE_KEY: &str = "articles";

const UNTITLED: &str = "Untitled";

/// Persisted record. Article pages write `relatedArticles` with both
/// timestamps; memo pages write `backlinks` with a single `date`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalRecord {
	id: String,
	#[serde(default)]
	article_id: String,
	#[serde(default)]
	title: String,
	#[serde(default)]
	content: String,
	#[serde(default)]
	created_at: String,
	#[serde(default)]
	updated_at: String,
	#[serde(default, alias = "relatedIds", alias = "backlinks")]
	related_articles: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	date: Option<String>,
}

impl LocalRecord {
	fn external_id(&self) -> &str {
		if self.article_id.trim().is_empty() {
			&self.id
		} else {
			&self.article_id
		}
	}
}

impl From<LocalRecord> for Note {
	fn from(record: LocalRecord) -> Self {
		let external_id = record.external_id().to_string();
		let title = if record.title.trim().is_empty() {
			UNTITLED.to_string()
		} else {
			record.title
		};
		let date = record.date.unwrap_or_default();
		let created_at = if record.created_at.is_empty() { date.clone() } else { record.created_at };
		let updated_at = if record.updated_at.is_empty() { date } else { record.updated_at };
		Note {
			id: record.id,
			external_id,
			title,
			content: record.content,
			created_at,
			updated_at,
			related_ids: record.related_articles,
		}
	}
}

impl From<&Note> for LocalRecord {
	fn from(note: &Note) -> Self {
		LocalRecord {
			id: note.id.clone(),
			article_id: note.external_id.clone(),
			title: note.title.clone(),
			content: note.content.clone(),
			created_at: note.created_at.clone(),
			updated_at: note.updated_at.clone(),
			related_articles: note.related_ids.clone(),
			date: None,
		}
	}
}

/// Indices of the records that are shown: the first record for each `id`
/// and each external id. Later repeats stay persisted but hidden.
fn visible(records: &[LocalRecord]) -> Vec<usize> {
	let mut ids = HashSet::new();
	let mut external_ids = HashSet::new();
	let mut shown = Vec::with_capacity(records.len());
	for (index, record) in records.iter().enumerate() {
		if !ids.insert(record.id.as_str()) || !external_ids.insert(record.external_id()) {
			warn!("rhizome: skipping duplicate stored note {}", record.id);
			continue;
		}
		shown.push(index);
	}
	shown
}

fn unique_notes(records: Vec<LocalRecord>) -> Vec<Note> {
	let shown: HashSet<usize> = visible(&records).into_iter().collect();
	records
		.into_iter()
		.enumerate()
		.filter(|(index, _)| shown.contains(index))
		.map(|(_, record)| Note::from(record))
		.collect()
}

/// Parses a persisted collection. Records repeating an earlier `id` or
/// external id are left out so both stay unique.
pub fn decode_notes(raw: &str) -> Result<Vec<Note>, StoreError> {
	let records: Vec<LocalRecord> = serde_json::from_str(raw)?;
	Ok(unique_notes(records))
}

fn timestamp() -> String {
	Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// [`NoteStore`] over a [`KeyValueStore`]. The whole collection is read on
/// every call and written back on every mutation.
///
/// Reads are lenient: an unreadable value lists as empty. Mutations are
/// strict: they fail with [`StoreError::Parse`] and leave the value alone,
/// and they write back every persisted record, hidden duplicates included.
pub struct LocalNoteStore<K: KeyValueStore> {
	kv: RefCell<K>,
	key: String,
}

impl<K: KeyValueStore> LocalNoteStore<K> {
	/// Opens `kv` and binds the store to `key`.
	pub fn open(mut kv: K, key: impl Into<String>) -> Result<Self, StoreError> {
		kv.open()?;
		Ok(Self {
			kv: RefCell::new(kv),
			key: key.into(),
		})
	}

	/// Key the collection lives under.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Closes the underlying medium and hands it back.
	pub fn close(self) -> K {
		let mut kv = self.kv.into_inner();
		kv.close();
		kv
	}

	fn records(&self) -> Result<Vec<LocalRecord>, StoreError> {
		let raw = self.kv.borrow().read(&self.key)?;
		match raw {
			Some(raw) => Ok(serde_json::from_str(&raw)?),
			None => Ok(Vec::new()),
		}
	}

	/// Malformed data reads as an empty collection.
	fn load(&self) -> Result<Vec<Note>, StoreError> {
		match self.records() {
			Ok(records) => Ok(unique_notes(records)),
			Err(StoreError::Parse(err)) => {
				warn!("rhizome: stored notes under {:?} are unreadable: {}", self.key, err);
				Ok(Vec::new())
			}
			Err(err) => Err(err),
		}
	}

	/// Position of the shown record with `id`.
	fn locate(records: &[LocalRecord], id: &str) -> Result<usize, StoreError> {
		visible(records)
			.into_iter()
			.find(|&index| records[index].id == id)
			.ok_or_else(|| StoreError::NotFound(id.to_string()))
	}

	fn save(&self, records: &[LocalRecord]) -> Result<(), StoreError> {
		let json = serde_json::to_string(records)?;
		self.kv.borrow_mut().write(&self.key, &json)?;
		debug!("rhizome: saved {} notes under {:?}", records.len(), self.key);
		Ok(())
	}
}

#[async_trait(?Send)]
impl<K: KeyValueStore> NoteStore for LocalNoteStore<K> {
	async fn list(&self) -> Result<Vec<Note>, StoreError> {
		self.load()
	}

	async fn get(&self, id: &str) -> Result<Note, StoreError> {
		self.load()?
			.into_iter()
			.find(|note| note.id == id)
			.ok_or_else(|| StoreError::NotFound(id.to_string()))
	}

	async fn create(&self, draft: NoteDraft) -> Result<Note, StoreError> {
		draft.validate()?;
		let mut records = self.records()?;

		let id = Uuid::new_v4().to_string();
		let external_id = draft
			.external_id
			.filter(|external_id| !external_id.trim().is_empty())
			.unwrap_or_else(|| id.clone());
		if records.iter().any(|record| record.external_id() == external_id) {
			return Err(StoreError::DuplicateExternalId(external_id));
		}

		let now = timestamp();
		let note = Note {
			id,
			external_id,
			title: draft.title,
			content: draft.content,
			created_at: now.clone(),
			updated_at: now,
			related_ids: draft.related_ids,
		};
		records.push(LocalRecord::from(&note));
		self.save(&records)?;
		Ok(note)
	}

	async fn update(&self, id: &str, draft: NoteDraft) -> Result<Note, StoreError> {
		draft.validate()?;
		let mut records = self.records()?;
		let index = Self::locate(&records, id)?;

		let record = &mut records[index];
		record.title = draft.title;
		record.content = draft.content;
		record.related_articles = draft.related_ids;
		record.updated_at = timestamp();
		let updated = Note::from(record.clone());

		self.save(&records)?;
		Ok(updated)
	}

	/// Also strips the deleted note from every other note's `related_ids`.
	async fn delete(&self, id: &str) -> Result<(), StoreError> {
		let mut records = self.records()?;
		let index = Self::locate(&records, id)?;
		let removed = records.remove(index);
		let external_id = removed.external_id();
		for record in &mut records {
			record.related_articles.retain(|related| related != external_id);
		}
		self.save(&records)
	}
}
