//! Canonical note entity shared by every store backend.
//!
//! Local and remote records are normalized into [`Note`] by their adapters in
//! [`crate::store`]; everything downstream (link resolution, projection, the
//! graph view) only sees this shape.

use std::collections::HashSet;

use crate::error::StoreError;

pub mod links;

pub use links::{Adjacency, LinkMode, extract_markers, resolve};

/// A user-authored note or article.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Note {
	/// Stable local identifier, unique within a collection.
	pub id: String,
	/// Identifier used by other notes to reference this one. Equal to `id`
	/// for local notes, the stringified numeric key for remote articles.
	pub external_id: String,
	/// Display title, also the target of inline `[[title]]` markers.
	pub title: String,
	/// Free text, may embed `[[title]]` markers.
	pub content: String,
	/// ISO-8601 timestamp, empty when the backend does not report one.
	pub created_at: String,
	/// Last edit, same format as `created_at`.
	pub updated_at: String,
	/// Ordered `external_id` references. May contain duplicates or ids that
	/// no longer exist; both are cleaned up during link resolution.
	pub related_ids: Vec<String>,
}

impl Note {
	/// Creates a note whose external id equals its local id.
	pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
		let id = id.into();
		Self {
			external_id: id.clone(),
			id,
			title: title.into(),
			..Self::default()
		}
	}

	/// Overrides the external id.
	pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
		self.external_id = external_id.into();
		self
	}

	/// Sets the body text.
	pub fn with_content(mut self, content: impl Into<String>) -> Self {
		self.content = content.into();
		self
	}

	/// Sets the structured links, in order.
	pub fn with_related<I, S>(mut self, related: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.related_ids = related.into_iter().map(Into::into).collect();
		self
	}
}

/// User input for creating or editing a note.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteDraft {
	/// Must not be blank.
	pub title: String,
	/// Body text.
	pub content: String,
	/// External ids of the notes this one links to.
	pub related_ids: Vec<String>,
	/// Requested external id (local backend only). Ignored on update.
	pub external_id: Option<String>,
}

impl NoteDraft {
	/// Draft with no links.
	pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
		Self {
			title: title.into(),
			content: content.into(),
			..Self::default()
		}
	}

	/// Sets the links to create.
	pub fn with_related<I, S>(mut self, related: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.related_ids = related.into_iter().map(Into::into).collect();
		self
	}

	/// Asks the local backend for a specific external id.
	pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
		self.external_id = Some(external_id.into());
		self
	}

	/// Rejects drafts that would produce a note without a title.
	pub fn validate(&self) -> Result<(), StoreError> {
		if self.title.trim().is_empty() {
			return Err(StoreError::InvalidDraft("title must not be empty".into()));
		}
		Ok(())
	}
}

/// Finds a note by its local id.
pub fn find_by_id<'a>(notes: &'a [Note], id: &str) -> Option<&'a Note> {
	notes.iter().find(|note| note.id == id)
}

/// Resolves a note's `related_ids` against the collection, in declared order,
/// skipping duplicates and ids with no matching note.
pub fn related_notes<'a>(note: &Note, notes: &'a [Note]) -> Vec<&'a Note> {
	let mut seen = HashSet::new();
	note.related_ids
		.iter()
		.filter(|id| seen.insert(id.as_str()))
		.filter_map(|id| notes.iter().find(|candidate| &candidate.external_id == id))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn blank_title_is_rejected() {
		let err = NoteDraft::new("   ", "body").validate().unwrap_err();
		assert!(matches!(err, StoreError::InvalidDraft(_)));
		assert!(NoteDraft::new("Title", "").validate().is_ok());
	}

	#[test]
	fn related_notes_skip_duplicates_and_dangling_ids() {
		let notes = vec![
			Note::new("1", "A").with_related(["2", "missing", "2", "3"]),
			Note::new("2", "B"),
			Note::new("3", "C"),
		];
		let titles: Vec<_> = related_notes(&notes[0], &notes)
			.into_iter()
			.map(|note| note.title.as_str())
			.collect();
		assert_eq!(titles, ["B", "C"]);
	}
}
