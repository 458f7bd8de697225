//! Projects notes and their resolved links into [`GraphData`].

use std::collections::HashMap;

use serde::Deserialize;

use super::types::{ColorClass, GraphData, GraphEdge, GraphNode};
use crate::notes::{Adjacency, LinkMode, Note, resolve};

/// Node sizing constants: `weight = base_weight + weight_per_link * out_degree`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectorConfig {
	/// Weight of a note with no outgoing links. Raised to 1.0 if lower.
	pub base_weight: f64,
	/// Weight added per resolved outgoing link.
	pub weight_per_link: f64,
}

impl Default for ProjectorConfig {
	fn default() -> Self {
		Self {
			base_weight: 1.0,
			weight_per_link: 0.5,
		}
	}
}

impl ProjectorConfig {
	/// Clamped so the result is always >= 1 and never decreases with degree.
	pub fn weight(&self, out_degree: usize) -> f64 {
		self.base_weight.max(1.0) + self.weight_per_link.max(0.0) * out_degree as f64
	}
}

/// Projects with the default sizing constants.
pub fn project(notes: &[Note], adjacency: &Adjacency) -> GraphData {
	project_with(notes, adjacency, &ProjectorConfig::default())
}

/// Builds nodes in `notes` order and edges in `adjacency` order. Pairs whose
/// endpoints map to no current note are dropped.
pub fn project_with(notes: &[Note], adjacency: &Adjacency, config: &ProjectorConfig) -> GraphData {
	let node_ids: HashMap<&str, &str> = notes
		.iter()
		.map(|note| (note.external_id.as_str(), note.id.as_str()))
		.collect();

	let mut out_degree: HashMap<&str, usize> = HashMap::new();
	let mut in_degree: HashMap<&str, usize> = HashMap::new();
	let mut edges = Vec::with_capacity(adjacency.len());

	for (source, target) in adjacency.pairs() {
		let (Some(&source_id), Some(&target_id)) =
			(node_ids.get(source.as_str()), node_ids.get(target.as_str()))
		else {
			continue;
		};
		*out_degree.entry(source.as_str()).or_insert(0) += 1;
		*in_degree.entry(target.as_str()).or_insert(0) += 1;
		edges.push(GraphEdge {
			source_id: source_id.to_string(),
			target_id: target_id.to_string(),
		});
	}

	let nodes = notes
		.iter()
		.map(|note| {
			let key = note.external_id.as_str();
			let outgoing = out_degree.get(key).copied().unwrap_or(0);
			let incoming = in_degree.get(key).copied().unwrap_or(0);
			GraphNode {
				id: note.id.clone(),
				external_id: note.external_id.clone(),
				label: note.title.clone(),
				weight: config.weight(outgoing),
				color_class: ColorClass::from_degree(outgoing + incoming),
			}
		})
		.collect();

	GraphData { nodes, edges }
}

/// Resolves links with `mode` and projects the result in one step.
pub fn derive(notes: &[Note], mode: LinkMode, config: &ProjectorConfig) -> GraphData {
	project_with(notes, &resolve(notes, mode), config)
}

/// Remembers the last projection so unchanged re-reads can be ignored.
#[derive(Clone, Debug, Default)]
pub struct Projection {
	fingerprint: Option<u64>,
	data: GraphData,
}

impl Projection {
	/// Stores `data` and returns true if it differs from the previous
	/// projection. The first update always counts as a change.
	pub fn update(&mut self, data: GraphData) -> bool {
		let fingerprint = data.fingerprint();
		if self.fingerprint == Some(fingerprint) {
			return false;
		}
		self.fingerprint = Some(fingerprint);
		self.data = data;
		true
	}

	/// Last accepted graph.
	pub fn data(&self) -> &GraphData {
		&self.data
	}

	/// Fingerprint of the last accepted graph.
	pub fn fingerprint(&self) -> Option<u64> {
		self.fingerprint
	}

	/// Forgets the last graph so the next update always counts as a change.
	pub fn reset(&mut self) {
		*self = Self::default();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> Vec<Note> {
		vec![
			Note::new("1", "A").with_related(["2"]),
			Note::new("2", "B"),
		]
	}

	#[test]
	fn two_notes_one_link() {
		let notes = sample();
		let data = derive(&notes, LinkMode::Structured, &ProjectorConfig::default());

		let labels: Vec<_> = data.nodes.iter().map(|n| n.label.as_str()).collect();
		assert_eq!(labels, ["A", "B"]);
		assert_eq!(
			data.edges,
			[GraphEdge {
				source_id: "1".into(),
				target_id: "2".into(),
			}]
		);
		assert_eq!(data.nodes[0].weight, 1.5);
		assert_eq!(data.nodes[1].weight, 1.0);
		assert_eq!(data.nodes[0].color_class, ColorClass::Linked);
		assert_eq!(data.nodes[1].color_class, ColorClass::Linked);
	}

	#[test]
	fn projection_is_deterministic() {
		let notes = sample();
		let adjacency = resolve(&notes, LinkMode::Structured);
		let first = project(&notes, &adjacency);
		let second = project(&notes, &adjacency);
		assert_eq!(first, second);
		assert_eq!(first.fingerprint(), second.fingerprint());
	}

	#[test]
	fn edges_map_external_ids_to_node_ids() {
		let notes = vec![
			Note::new("a", "A").with_external_id("7").with_related(["8"]),
			Note::new("b", "B").with_external_id("8"),
		];
		let data = derive(&notes, LinkMode::Structured, &ProjectorConfig::default());
		assert_eq!(data.edges[0].source_id, "a");
		assert_eq!(data.edges[0].target_id, "b");
	}

	#[test]
	fn unknown_endpoints_are_dropped() {
		let notes = vec![Note::new("1", "A")];
		let adjacency = Adjacency::from_pairs([("1", "404"), ("404", "1")]);
		let data = project(&notes, &adjacency);
		assert!(data.edges.is_empty());
		assert_eq!(data.nodes[0].color_class, ColorClass::Isolated);
	}

	#[test]
	fn weight_is_monotonic_in_out_degree() {
		let notes = vec![
			Note::new("hub", "Hub").with_related(["x", "y", "z"]),
			Note::new("leaf", "Leaf").with_related(["x"]),
			Note::new("x", "X"),
			Note::new("y", "Y"),
			Note::new("z", "Z"),
		];
		let data = derive(&notes, LinkMode::Structured, &ProjectorConfig::default());
		let hub = data.node("hub").unwrap();
		let leaf = data.node("leaf").unwrap();
		assert!(hub.weight >= leaf.weight);
		assert!(data.nodes.iter().all(|n| n.weight >= 1.0));

		let odd = ProjectorConfig {
			base_weight: -3.0,
			weight_per_link: -1.0,
		};
		assert!(odd.weight(3) >= odd.weight(1));
		assert!(odd.weight(0) >= 1.0);
	}

	#[test]
	fn projection_tracker_ignores_identical_data() {
		let notes = sample();
		let mut projection = Projection::default();
		assert!(projection.update(derive(&notes, LinkMode::Structured, &ProjectorConfig::default())));
		assert!(!projection.update(derive(&notes, LinkMode::Structured, &ProjectorConfig::default())));

		let renamed = vec![Note::new("1", "A2").with_related(["2"]), Note::new("2", "B")];
		assert!(projection.update(derive(&renamed, LinkMode::Structured, &ProjectorConfig::default())));
		assert_eq!(projection.data().nodes[0].label, "A2");
	}
}
