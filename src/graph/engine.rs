//! Force simulation behind a small trait, with a `force_graph` implementation.
//!
//! The stabilizer only talks to [`ForceEngine`], so its phase logic can be
//! exercised without real physics. [`ForceGraphEngine`] is the production
//! engine used by the canvas view.

use std::collections::HashMap;
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use super::types::{ColorClass, GraphData, GraphNode};

/// A position in simulation units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	/// Horizontal coordinate.
	pub x: f32,
	/// Vertical coordinate.
	pub y: f32,
}

/// Velocity lost per tick in every phase.
pub const VELOCITY_DECAY: f32 = 0.6;

/// Force tuning knobs, named after the usual d3-force parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutParams {
	/// Many-body strength. Negative values repel.
	pub charge_strength: f32,
	/// Rest length of an edge.
	pub link_distance: f32,
	/// Pull the graph's centroid towards the origin.
	pub centering: bool,
	/// Fraction of velocity lost per tick (0.0 = none, 1.0 = all).
	pub velocity_decay: f32,
}

impl LayoutParams {
	/// Free simulation used right after seeding.
	pub const fn seeding() -> Self {
		Self {
			charge_strength: -150.0,
			link_distance: 30.0,
			centering: true,
			velocity_decay: VELOCITY_DECAY,
		}
	}

	/// Calmer forces applied once the initial burst is over.
	pub const fn settled() -> Self {
		Self {
			charge_strength: -120.0,
			link_distance: 60.0,
			centering: false,
			velocity_decay: VELOCITY_DECAY,
		}
	}
}

/// The physics capability the stabilizer drives.
pub trait ForceEngine {
	/// Replaces the simulated graph. Nodes found in `carried` start at that
	/// position; the rest are placed on a ring around the origin.
	fn seed(&mut self, data: &GraphData, carried: &HashMap<String, Point>, params: &LayoutParams);

	/// Changes force parameters without resetting positions.
	fn tune(&mut self, params: &LayoutParams);

	/// Advances the simulation by `dt` seconds. No-op once frozen.
	fn step(&mut self, dt: f32);

	/// Halts the simulation; positions stay where they are.
	fn freeze(&mut self);

	/// Drops every node and edge.
	fn clear(&mut self);

	/// True once motion has died down since the last seed or tune.
	fn is_settled(&self) -> bool;

	/// Current position of every node, by node id.
	fn positions(&self) -> HashMap<String, Point>;
}

/// Per-node display metadata carried through the simulation.
#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	/// Node id, equal to the note id.
	pub id: String,
	/// Text drawn next to the node.
	pub label: String,
	/// Fill class.
	pub color_class: ColorClass,
	/// Size factor, see [`GraphNode::weight`].
	pub weight: f64,
}

impl From<&GraphNode> for NodeInfo {
	fn from(node: &GraphNode) -> Self {
		Self {
			id: node.id.clone(),
			label: node.label.clone(),
			color_class: node.color_class,
			weight: node.weight,
		}
	}
}

const NODE_MASS: f32 = 10.0;
const SEED_RADIUS: f64 = 100.0;
const CENTER_STRENGTH: f32 = 0.5;
/// Spring constant that yields roughly `REFERENCE_LINK_DISTANCE` rest spacing.
const BASE_SPRING: f32 = 0.05;
const REFERENCE_LINK_DISTANCE: f32 = 30.0;
/// Mean per-tick displacement below which a tick counts as calm.
const REST_MOTION: f32 = 0.05;
const CALM_TICKS: u32 = 30;
/// Hard stop after this many ticks without settling.
const COOLDOWN_TICKS: u32 = 200;

fn simulation_parameters(params: &LayoutParams) -> SimulationParameters {
	SimulationParameters {
		force_charge: -params.charge_strength,
		force_spring: BASE_SPRING * REFERENCE_LINK_DISTANCE / params.link_distance.max(1.0),
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 1.0 - params.velocity_decay.clamp(0.0, 1.0),
	}
}

fn ring_position(i: usize, count: usize) -> Point {
	let angle = (i as f64) * 2.0 * PI / count.max(1) as f64;
	Point {
		x: (SEED_RADIUS * angle.cos()) as f32,
		y: (SEED_RADIUS * angle.sin()) as f32,
	}
}

/// [`ForceEngine`] backed by the `force_graph` crate.
pub struct ForceGraphEngine {
	graph: ForceGraph<NodeInfo, ()>,
	edges: Vec<(DefaultNodeIdx, DefaultNodeIdx)>,
	params: LayoutParams,
	node_count: usize,
	frozen: bool,
	ticks: u32,
	calm_ticks: u32,
}

impl Default for ForceGraphEngine {
	fn default() -> Self {
		Self::new()
	}
}

impl ForceGraphEngine {
	/// Empty, frozen engine.
	pub fn new() -> Self {
		let params = LayoutParams::seeding();
		Self {
			graph: ForceGraph::new(simulation_parameters(&params)),
			edges: Vec::new(),
			params,
			node_count: 0,
			frozen: true,
			ticks: 0,
			calm_ticks: 0,
		}
	}

	/// Underlying simulation, for drawing and hit tests.
	pub fn graph(&self) -> &ForceGraph<NodeInfo, ()> {
		&self.graph
	}

	/// Simulated edges as index pairs, used for hover neighborhoods.
	pub fn edges(&self) -> &[(DefaultNodeIdx, DefaultNodeIdx)] {
		&self.edges
	}

	/// Number of simulated nodes.
	pub fn node_count(&self) -> usize {
		self.node_count
	}

	/// True once [`ForceEngine::freeze`] was called, or before any seed.
	pub fn is_frozen(&self) -> bool {
		self.frozen
	}

	/// Parameters currently in effect.
	pub fn params(&self) -> &LayoutParams {
		&self.params
	}

	/// Position of node `idx`, if it exists.
	pub fn node_position(&self, idx: DefaultNodeIdx) -> Option<Point> {
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some(Point {
					x: node.x(),
					y: node.y(),
				});
			}
		});
		found
	}

	/// Places a node directly and pins it there. Does not unfreeze.
	pub fn move_node(&mut self, idx: DefaultNodeIdx, to: Point) {
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.x = to.x;
				node.data.y = to.y;
				node.data.is_anchor = true;
			}
		});
	}

	fn snapshot(&self) -> Vec<Point> {
		let mut points = Vec::with_capacity(self.node_count);
		self.graph.visit_nodes(|node| {
			points.push(Point {
				x: node.x(),
				y: node.y(),
			});
		});
		points
	}

	fn recenter(&mut self) {
		let (mut sx, mut sy, mut n) = (0.0f32, 0.0f32, 0usize);
		self.graph.visit_nodes(|node| {
			if !node.data.is_anchor {
				sx += node.x();
				sy += node.y();
				n += 1;
			}
		});
		if n == 0 {
			return;
		}
		let (dx, dy) = (
			-sx / n as f32 * CENTER_STRENGTH,
			-sy / n as f32 * CENTER_STRENGTH,
		);
		self.graph.visit_nodes_mut(|node| {
			if !node.data.is_anchor {
				node.data.x += dx;
				node.data.y += dy;
			}
		});
	}

	/// `force_graph` fixes its parameters at construction, so retuning
	/// rebuilds the graph in place with the same nodes and positions.
	fn rebuild(&mut self, params: &LayoutParams) {
		let mut nodes = Vec::with_capacity(self.node_count);
		self.graph.visit_nodes(|node| {
			nodes.push((
				node.index(),
				NodeData {
					x: node.x(),
					y: node.y(),
					mass: node.data.mass,
					is_anchor: node.data.is_anchor,
					user_data: node.data.user_data.clone(),
				},
			));
		});

		let mut graph = ForceGraph::new(simulation_parameters(params));
		let mut remap = HashMap::with_capacity(nodes.len());
		for (old, data) in nodes {
			remap.insert(old, graph.add_node(data));
		}
		self.edges = self
			.edges
			.iter()
			.filter_map(|(a, b)| Some((*remap.get(a)?, *remap.get(b)?)))
			.collect();
		for &(a, b) in &self.edges {
			graph.add_edge(a, b, EdgeData::default());
		}
		self.graph = graph;
	}
}

impl ForceEngine for ForceGraphEngine {
	fn seed(&mut self, data: &GraphData, carried: &HashMap<String, Point>, params: &LayoutParams) {
		let mut graph = ForceGraph::new(simulation_parameters(params));
		let mut index_by_id = HashMap::with_capacity(data.nodes.len());

		for (i, node) in data.nodes.iter().enumerate() {
			let at = carried
				.get(&node.id)
				.copied()
				.unwrap_or_else(|| ring_position(i, data.nodes.len()));
			let idx = graph.add_node(NodeData {
				x: at.x,
				y: at.y,
				mass: NODE_MASS,
				is_anchor: false,
				user_data: NodeInfo::from(node),
			});
			index_by_id.insert(node.id.as_str(), idx);
		}

		let mut edges = Vec::with_capacity(data.edges.len());
		for edge in &data.edges {
			if let (Some(&src), Some(&tgt)) = (
				index_by_id.get(edge.source_id.as_str()),
				index_by_id.get(edge.target_id.as_str()),
			) {
				if src != tgt {
					graph.add_edge(src, tgt, EdgeData::default());
					edges.push((src, tgt));
				}
			}
		}

		self.graph = graph;
		self.edges = edges;
		self.params = *params;
		self.node_count = data.nodes.len();
		self.frozen = false;
		self.ticks = 0;
		self.calm_ticks = 0;
	}

	fn tune(&mut self, params: &LayoutParams) {
		if *params != self.params {
			self.rebuild(params);
			self.params = *params;
		}
		self.ticks = 0;
		self.calm_ticks = 0;
	}

	fn step(&mut self, dt: f32) {
		if self.frozen || self.node_count == 0 {
			return;
		}
		let before = self.snapshot();
		self.graph.update(dt);
		if self.params.centering {
			self.recenter();
		}
		let after = self.snapshot();

		let motion = before
			.iter()
			.zip(&after)
			.map(|(a, b)| ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt())
			.sum::<f32>()
			/ after.len().max(1) as f32;

		self.ticks = self.ticks.saturating_add(1);
		if motion.is_finite() && motion < REST_MOTION {
			self.calm_ticks += 1;
		} else {
			self.calm_ticks = 0;
		}
	}

	fn freeze(&mut self) {
		self.frozen = true;
	}

	fn clear(&mut self) {
		self.graph = ForceGraph::new(simulation_parameters(&self.params));
		self.edges.clear();
		self.node_count = 0;
		self.frozen = true;
		self.ticks = 0;
		self.calm_ticks = 0;
	}

	fn is_settled(&self) -> bool {
		self.node_count > 0 && (self.calm_ticks >= CALM_TICKS || self.ticks >= COOLDOWN_TICKS)
	}

	fn positions(&self) -> HashMap<String, Point> {
		let mut positions = HashMap::with_capacity(self.node_count);
		self.graph.visit_nodes(|node| {
			positions.insert(
				node.data.user_data.id.clone(),
				Point {
					x: node.x(),
					y: node.y(),
				},
			);
		});
		positions
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::project;
	use crate::notes::{LinkMode, Note, resolve};

	fn triangle() -> GraphData {
		let notes = vec![
			Note::new("a", "A").with_related(["b"]),
			Note::new("b", "B").with_related(["c"]),
			Note::new("c", "C"),
		];
		project(&notes, &resolve(&notes, LinkMode::Structured))
	}

	#[test]
	fn seeding_places_nodes_and_edges() {
		let mut engine = ForceGraphEngine::new();
		engine.seed(&triangle(), &HashMap::new(), &LayoutParams::seeding());
		assert_eq!(engine.node_count(), 3);
		assert_eq!(engine.edges().len(), 2);
		assert!(!engine.is_frozen());
		assert_eq!(engine.positions().len(), 3);
	}

	#[test]
	fn carried_positions_are_reused() {
		let mut carried = HashMap::new();
		carried.insert("b".to_string(), Point { x: 42.0, y: -7.0 });
		let mut engine = ForceGraphEngine::new();
		engine.seed(&triangle(), &carried, &LayoutParams::seeding());
		assert_eq!(engine.positions()["b"], Point { x: 42.0, y: -7.0 });
	}

	#[test]
	fn steps_move_nodes_until_frozen() {
		let mut engine = ForceGraphEngine::new();
		engine.seed(&triangle(), &HashMap::new(), &LayoutParams::seeding());
		let start = engine.positions();
		for _ in 0..10 {
			engine.step(0.016);
		}
		let moved = engine.positions();
		assert_ne!(start, moved);
		assert!(moved.values().all(|p| p.x.is_finite() && p.y.is_finite()));

		engine.freeze();
		engine.step(0.016);
		assert_eq!(engine.positions(), moved);
	}

	#[test]
	fn tuning_keeps_positions_and_edges() {
		let mut engine = ForceGraphEngine::new();
		engine.seed(&triangle(), &HashMap::new(), &LayoutParams::seeding());
		engine.step(0.016);
		let before = engine.positions();
		engine.tune(&LayoutParams::settled());
		assert_eq!(engine.positions(), before);
		assert_eq!(engine.edges().len(), 2);
		assert_eq!(engine.params(), &LayoutParams::settled());
	}

	#[test]
	fn both_phases_share_one_velocity_decay() {
		assert_eq!(LayoutParams::seeding().velocity_decay, VELOCITY_DECAY);
		assert_eq!(LayoutParams::settled().velocity_decay, VELOCITY_DECAY);
		let damping = simulation_parameters(&LayoutParams::settled()).damping_factor;
		assert!((damping - 0.4).abs() < 1e-6);
	}

	#[test]
	fn cooldown_reports_settled() {
		let mut engine = ForceGraphEngine::new();
		engine.seed(&triangle(), &HashMap::new(), &LayoutParams::settled());
		assert!(!engine.is_settled());
		for _ in 0..COOLDOWN_TICKS {
			engine.step(0.016);
		}
		assert!(engine.is_settled());
	}

	#[test]
	fn clearing_empties_the_graph() {
		let mut engine = ForceGraphEngine::new();
		engine.seed(&triangle(), &HashMap::new(), &LayoutParams::seeding());
		engine.clear();
		assert_eq!(engine.node_count(), 0);
		assert!(engine.positions().is_empty());
		assert!(!engine.is_settled());
	}
}
