//! Link resolution: turns a note collection into a directed adjacency list.
//!
//! Structured `related_ids` are the primary link source. Inline `[[title]]`
//! markers are an opt-in layer on top; when both are enabled, a note's
//! structured targets come first, followed by its inline targets in order of
//! appearance, and only the first occurrence of each pair is kept.

use std::collections::{HashMap, HashSet};

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::Note;

static LINK_MARKER_RE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"\[\[(.*?)\]\]").expect("valid link marker regex"));

/// Which link encodings are read from a note.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
	/// Only the explicit `related_ids` sequence.
	#[default]
	Structured,
	/// Only `[[title]]` markers found in the content.
	Inline,
	/// Structured links first, then inline markers.
	Combined,
}

impl LinkMode {
	fn structured(self) -> bool {
		matches!(self, LinkMode::Structured | LinkMode::Combined)
	}

	fn inline(self) -> bool {
		matches!(self, LinkMode::Inline | LinkMode::Combined)
	}
}

/// Resolved `(source external id, target external id)` pairs.
///
/// Pairs are unique, never self-referencing, and (when produced by [`resolve`])
/// only point at notes present in the collection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Adjacency {
	pairs: Vec<(String, String)>,
}

impl Adjacency {
	/// Builds an adjacency from raw pairs, dropping self references and
	/// repeated pairs. Targets are not checked against any collection.
	pub fn from_pairs<I, S>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (S, S)>,
		S: Into<String>,
	{
		let mut adjacency = Self::default();
		let mut seen = HashSet::new();
		for (source, target) in pairs {
			adjacency.push(&mut seen, source.into(), target.into());
		}
		adjacency
	}

	fn push(&mut self, seen: &mut HashSet<(String, String)>, source: String, target: String) {
		if source == target {
			return;
		}
		let pair = (source, target);
		if seen.insert(pair.clone()) {
			self.pairs.push(pair);
		}
	}

	/// Pairs in resolution order.
	pub fn pairs(&self) -> &[(String, String)] {
		&self.pairs
	}

	/// Number of resolved links.
	pub fn len(&self) -> usize {
		self.pairs.len()
	}

	/// True when nothing resolved.
	pub fn is_empty(&self) -> bool {
		self.pairs.is_empty()
	}

	/// Number of resolved outgoing links from `external_id`.
	pub fn out_degree(&self, external_id: &str) -> usize {
		self.pairs.iter().filter(|(source, _)| source == external_id).count()
	}

	/// Number of resolved incoming links to `external_id`.
	pub fn in_degree(&self, external_id: &str) -> usize {
		self.pairs.iter().filter(|(_, target)| target == external_id).count()
	}

	/// Targets referenced by `external_id`, in resolution order.
	pub fn targets_of<'a>(&'a self, external_id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
		self.pairs
			.iter()
			.filter(move |(source, _)| source == external_id)
			.map(|(_, target)| target.as_str())
	}
}

/// Extracts the trimmed titles of every `[[title]]` marker in `content`.
/// Empty markers (`[[]]`) are skipped.
pub fn extract_markers(content: &str) -> Vec<&str> {
	LINK_MARKER_RE
		.captures_iter(content)
		.filter_map(|caps| caps.get(1))
		.map(|m| m.as_str().trim())
		.filter(|title| !title.is_empty())
		.collect()
}

/// Resolves every note's links against the collection.
///
/// Unknown targets and unmatched titles are dropped silently; resolution never
/// fails. Titles are matched exactly (case-sensitive) and resolve to the first
/// note with that title in collection order.
pub fn resolve(notes: &[Note], mode: LinkMode) -> Adjacency {
	let known: HashSet<&str> = notes.iter().map(|note| note.external_id.as_str()).collect();

	let mut by_title: HashMap<&str, &str> = HashMap::new();
	if mode.inline() {
		for note in notes {
			by_title
				.entry(note.title.as_str())
				.or_insert(note.external_id.as_str());
		}
	}

	let mut adjacency = Adjacency::default();
	let mut seen = HashSet::new();

	for note in notes {
		let mut targets: Vec<&str> = Vec::new();
		if mode.structured() {
			targets.extend(note.related_ids.iter().map(String::as_str));
		}
		if mode.inline() {
			for title in extract_markers(&note.content) {
				match by_title.get(title) {
					Some(&external_id) => targets.push(external_id),
					None => debug!("rhizome: no note titled {:?} (from {})", title, note.id),
				}
			}
		}

		for target in targets {
			if !known.contains(target) {
				debug!("rhizome: dropping dangling link {} -> {}", note.external_id, target);
				continue;
			}
			adjacency.push(&mut seen, note.external_id.clone(), target.to_string());
		}
	}

	adjacency
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pairs(adjacency: &Adjacency) -> Vec<(&str, &str)> {
		adjacency
			.pairs()
			.iter()
			.map(|(s, t)| (s.as_str(), t.as_str()))
			.collect()
	}

	#[test]
	fn structured_links_drop_dangling_duplicate_and_self_references() {
		let notes = vec![
			Note::new("1", "A").with_related(["2", "2", "1", "99"]),
			Note::new("2", "B"),
		];
		let adjacency = resolve(&notes, LinkMode::Structured);
		assert_eq!(pairs(&adjacency), [("1", "2")]);
	}

	#[test]
	fn missing_title_marker_produces_no_links() {
		let notes = vec![
			Note::new("1", "A").with_content("see [[Missing Title]]"),
			Note::new("2", "B"),
		];
		assert!(resolve(&notes, LinkMode::Inline).is_empty());
	}

	#[test]
	fn inline_markers_resolve_to_first_title_match() {
		let notes = vec![
			Note::new("1", "Source").with_content("[[ Dup ]] and [[dup]] and [[]]"),
			Note::new("2", "Dup"),
			Note::new("3", "Dup"),
		];
		let adjacency = resolve(&notes, LinkMode::Inline);
		assert_eq!(pairs(&adjacency), [("1", "2")]);
	}

	#[test]
	fn inline_mode_ignores_related_ids() {
		let notes = vec![Note::new("1", "A").with_related(["2"]), Note::new("2", "B")];
		assert!(resolve(&notes, LinkMode::Inline).is_empty());
		assert!(resolve(&notes, LinkMode::Structured).len() == 1);
	}

	#[test]
	fn combined_mode_orders_structured_before_inline() {
		let notes = vec![
			Note::new("1", "A")
				.with_content("[[C]] then [[B]]")
				.with_related(["2"]),
			Note::new("2", "B"),
			Note::new("3", "C"),
		];
		let adjacency = resolve(&notes, LinkMode::Combined);
		assert_eq!(pairs(&adjacency), [("1", "2"), ("1", "3")]);
	}

	#[test]
	fn links_use_external_ids() {
		let notes = vec![
			Note::new("local-a", "A").with_external_id("10").with_related(["20"]),
			Note::new("local-b", "B").with_external_id("20"),
		];
		let adjacency = resolve(&notes, LinkMode::Structured);
		assert_eq!(pairs(&adjacency), [("10", "20")]);
		assert_eq!(adjacency.out_degree("10"), 1);
		assert_eq!(adjacency.in_degree("20"), 1);
		assert_eq!(adjacency.targets_of("10").collect::<Vec<_>>(), ["20"]);
	}

	#[test]
	fn extract_markers_trims_and_skips_empty() {
		assert_eq!(extract_markers("a [[ One ]] b [[Two]] [[  ]]"), ["One", "Two"]);
	}
}
