//! Node-link graph data projected from a note collection.

use std::hash::{DefaultHasher, Hash, Hasher};

use serde::Serialize;

use crate::notes::Note;

/// Binary node classification used for coloring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorClass {
	/// At least one resolved link in or out.
	Linked,
	/// No resolved links at all.
	#[default]
	Isolated,
}

impl ColorClass {
	/// Class for a node with `degree` links in either direction.
	pub fn from_degree(degree: usize) -> Self {
		if degree > 0 {
			ColorClass::Linked
		} else {
			ColorClass::Isolated
		}
	}

	/// Lowercase name, as serialized.
	pub fn as_str(self) -> &'static str {
		match self {
			ColorClass::Linked => "linked",
			ColorClass::Isolated => "isolated",
		}
	}
}

/// A note as seen by the graph view.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
	/// Same as the originating `Note::id`.
	pub id: String,
	/// Same as the originating `Note::external_id`.
	pub external_id: String,
	/// Same as the originating `Note::title`.
	pub label: String,
	/// Relative node size, at least 1.0 and non-decreasing in out-degree.
	pub weight: f64,
	/// Linked or isolated, by total degree.
	pub color_class: ColorClass,
}

/// A directed link "source relates to target", by node id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
	/// Node that declares the link.
	pub source_id: String,
	/// Node it points at.
	pub target_id: String,
}

/// Complete projected graph. Rebuilt wholesale whenever the notes change.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GraphData {
	/// One node per note, in collection order.
	pub nodes: Vec<GraphNode>,
	/// Resolved links, in resolution order.
	pub edges: Vec<GraphEdge>,
}

impl GraphData {
	/// True when there are no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Node by id.
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.iter().find(|node| node.id == id)
	}

	/// Content hash of the stable JSON form. Equal graphs (same nodes and
	/// edges in the same order) always share a fingerprint.
	pub fn fingerprint(&self) -> u64 {
		let encoded = serde_json::to_vec(self).unwrap_or_default();
		let mut hasher = DefaultHasher::new();
		encoded.hash(&mut hasher);
		hasher.finish()
	}

	/// Maps a clicked node back to its note. `None` when the note is gone.
	pub fn note_for<'a>(&self, node_id: &str, notes: &'a [Note]) -> Option<&'a Note> {
		notes.iter().find(|note| note.id == node_id)
	}
}
