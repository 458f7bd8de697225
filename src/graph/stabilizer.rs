//! Drives a [`ForceEngine`] from a fresh seed to a frozen layout.
//!
//! The stabilizer is clock driven: the owner passes a monotonically increasing
//! time in milliseconds to [`Stabilizer::advance`] (usually once per animation
//! frame). Phase deadlines live in the stabilizer itself, so re-seeding or
//! dropping it cancels any pending transition.
//!
//! ```text
//! Idle --load(non-empty)--> Seeding --settle_delay--> Settling --freeze_delay or settled--> Frozen
//!   ^                          ^                                                             |
//!   +------load(empty)---------+-------------------load(changed)------------------------------+
//! ```

use std::collections::HashMap;

use log::{debug, info};
use serde::Deserialize;

use super::engine::{ForceEngine, LayoutParams};
use super::projector::Projection;
use super::types::GraphData;

/// Layout lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
	/// Nothing to lay out.
	Idle,
	/// Free simulation with strong forces and centering.
	Seeding,
	/// Calmer forces, centering off, waiting to freeze.
	Settling,
	/// Simulation halted until the data changes.
	Frozen,
}

/// Phase timings.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StabilizerConfig {
	/// Time from seeding to the settle retune.
	pub settle_delay_ms: f64,
	/// Time from the settle retune to the forced freeze.
	pub freeze_delay_ms: f64,
	/// Start surviving nodes at their previous position on re-seed.
	pub carry_positions: bool,
}

impl Default for StabilizerConfig {
	fn default() -> Self {
		Self {
			settle_delay_ms: 1000.0,
			freeze_delay_ms: 3000.0,
			carry_positions: true,
		}
	}
}

/// Drives a [`ForceEngine`] through the layout phases.
///
/// The caller owns the clock: every method that can move the phase forward
/// takes `now` in milliseconds, and deadlines are compared against it.
pub struct Stabilizer<E: ForceEngine> {
	engine: E,
	config: StabilizerConfig,
	projection: Projection,
	phase: Phase,
	/// When the current phase ends, in the caller's clock.
	deadline: Option<f64>,
}

impl<E: ForceEngine> Stabilizer<E> {
	/// Idle stabilizer around `engine`.
	pub fn new(engine: E, config: StabilizerConfig) -> Self {
		Self {
			engine,
			config,
			projection: Projection::default(),
			phase: Phase::Idle,
			deadline: None,
		}
	}

	/// Current phase.
	pub fn phase(&self) -> Phase {
		self.phase
	}

	/// True while the simulation is still moving nodes.
	pub fn is_active(&self) -> bool {
		matches!(self.phase, Phase::Seeding | Phase::Settling)
	}

	/// The wrapped engine.
	pub fn engine(&self) -> &E {
		&self.engine
	}

	/// Mutable access for pointer drags. Does not change the phase.
	pub fn engine_mut(&mut self) -> &mut E {
		&mut self.engine
	}

	/// The graph currently being laid out.
	pub fn data(&self) -> &GraphData {
		self.projection.data()
	}

	/// Phase timings.
	pub fn config(&self) -> &StabilizerConfig {
		&self.config
	}

	/// Feeds a new projection. Returns true if it differed from the previous
	/// one and the layout was restarted (or cleared, for an empty graph).
	pub fn load(&mut self, data: GraphData, now: f64) -> bool {
		if !self.projection.update(data) {
			debug!("rhizome: graph unchanged, keeping layout");
			return false;
		}

		let data = self.projection.data();
		if data.is_empty() {
			self.engine.clear();
			self.phase = Phase::Idle;
			self.deadline = None;
			info!("rhizome: no notes to lay out");
			return true;
		}

		let carried = if self.config.carry_positions {
			self.engine.positions()
		} else {
			HashMap::new()
		};
		self.engine.seed(data, &carried, &LayoutParams::seeding());
		self.phase = Phase::Seeding;
		self.deadline = Some(now + self.config.settle_delay_ms);
		info!(
			"rhizome: seeding layout with {} nodes, {} edges ({} carried)",
			data.nodes.len(),
			data.edges.len(),
			carried.len()
		);
		true
	}

	/// Applies every phase transition due at `now` and returns the new phase.
	pub fn advance(&mut self, now: f64) -> Phase {
		loop {
			match (self.phase, self.deadline) {
				(Phase::Seeding, Some(due)) if now >= due => {
					self.engine.tune(&LayoutParams::settled());
					self.phase = Phase::Settling;
					self.deadline = Some(due + self.config.freeze_delay_ms);
					debug!("rhizome: layout settling");
				}
				(Phase::Settling, Some(due)) if now >= due => self.freeze("deadline"),
				(Phase::Settling, _) if self.engine.is_settled() => self.freeze("converged"),
				_ => break,
			}
		}
		self.phase
	}

	/// Advances physics by `dt` seconds. Returns false (and does nothing)
	/// unless the layout is active.
	pub fn step(&mut self, dt: f32) -> bool {
		if !self.is_active() {
			return false;
		}
		self.engine.step(dt);
		true
	}

	/// One animation frame: phase transitions, then physics.
	pub fn tick(&mut self, now: f64, dt: f32) -> bool {
		self.advance(now);
		self.step(dt)
	}

	/// Drops any pending transition and stops the engine. The next
	/// [`load`](Self::load) re-seeds even if the data is unchanged.
	pub fn cancel(&mut self) {
		self.engine.freeze();
		self.deadline = None;
		self.phase = Phase::Idle;
		self.projection.reset();
	}

	fn freeze(&mut self, reason: &str) {
		self.engine.freeze();
		self.phase = Phase::Frozen;
		self.deadline = None;
		info!("rhizome: layout frozen ({reason})");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::engine::Point;
	use crate::graph::project;
	use crate::notes::{LinkMode, Note, resolve};

	#[derive(Default)]
	struct ScriptedEngine {
		seeds: usize,
		tunes: Vec<LayoutParams>,
		steps: usize,
		frozen: bool,
		settled: bool,
		carried: HashMap<String, Point>,
		nodes: Vec<String>,
	}

	impl ForceEngine for ScriptedEngine {
		fn seed(&mut self, data: &GraphData, carried: &HashMap<String, Point>, _: &LayoutParams) {
			self.seeds += 1;
			self.frozen = false;
			self.carried = carried.clone();
			self.nodes = data.nodes.iter().map(|n| n.id.clone()).collect();
		}
		fn tune(&mut self, params: &LayoutParams) {
			self.tunes.push(*params);
		}
		fn step(&mut self, _: f32) {
			if !self.frozen {
				self.steps += 1;
			}
		}
		fn freeze(&mut self) {
			self.frozen = true;
		}
		fn clear(&mut self) {
			self.nodes.clear();
			self.frozen = true;
		}
		fn is_settled(&self) -> bool {
			self.settled
		}
		fn positions(&self) -> HashMap<String, Point> {
			self.nodes
				.iter()
				.map(|id| (id.clone(), Point { x: 1.0, y: 2.0 }))
				.collect()
		}
	}

	fn graph(notes: &[Note]) -> GraphData {
		project(notes, &resolve(notes, LinkMode::Structured))
	}

	fn pair() -> GraphData {
		graph(&[Note::new("1", "A").with_related(["2"]), Note::new("2", "B")])
	}

	#[test]
	fn walks_through_every_phase() {
		let mut stabilizer = Stabilizer::new(ScriptedEngine::default(), StabilizerConfig::default());
		assert_eq!(stabilizer.phase(), Phase::Idle);

		assert!(stabilizer.load(pair(), 0.0));
		assert_eq!(stabilizer.phase(), Phase::Seeding);
		assert_eq!(stabilizer.advance(999.0), Phase::Seeding);
		assert_eq!(stabilizer.advance(1000.0), Phase::Settling);
		assert_eq!(stabilizer.engine().tunes, [LayoutParams::settled()]);
		assert_eq!(stabilizer.advance(3999.0), Phase::Settling);
		assert_eq!(stabilizer.advance(4000.0), Phase::Frozen);
		assert!(stabilizer.engine().frozen);
	}

	#[test]
	fn frozen_layout_stops_stepping() {
		let mut stabilizer = Stabilizer::new(ScriptedEngine::default(), StabilizerConfig::default());
		stabilizer.load(pair(), 0.0);
		let mut now = 0.0;
		while now < 4000.0 {
			stabilizer.tick(now, 0.016);
			now += 16.0;
		}
		let steps = stabilizer.engine().steps;
		assert!(steps > 0);
		for _ in 0..100 {
			now += 16.0;
			assert!(!stabilizer.tick(now, 0.016));
		}
		assert_eq!(stabilizer.engine().steps, steps);
		assert_eq!(stabilizer.phase(), Phase::Frozen);
	}

	#[test]
	fn late_clock_catches_up_in_one_call() {
		let mut stabilizer = Stabilizer::new(ScriptedEngine::default(), StabilizerConfig::default());
		stabilizer.load(pair(), 0.0);
		assert_eq!(stabilizer.advance(10_000.0), Phase::Frozen);
	}

	#[test]
	fn convergence_freezes_early_only_after_settling() {
		let mut stabilizer = Stabilizer::new(ScriptedEngine::default(), StabilizerConfig::default());
		stabilizer.load(pair(), 0.0);
		stabilizer.engine_mut().settled = true;
		assert_eq!(stabilizer.advance(500.0), Phase::Seeding);
		assert_eq!(stabilizer.advance(1000.0), Phase::Frozen);
	}

	#[test]
	fn unchanged_data_does_not_reseed() {
		let mut stabilizer = Stabilizer::new(ScriptedEngine::default(), StabilizerConfig::default());
		assert!(stabilizer.load(pair(), 0.0));
		stabilizer.advance(5000.0);
		assert!(!stabilizer.load(pair(), 6000.0));
		assert_eq!(stabilizer.phase(), Phase::Frozen);
		assert_eq!(stabilizer.engine().seeds, 1);
	}

	#[test]
	fn changed_data_reseeds_with_carried_positions() {
		let mut stabilizer = Stabilizer::new(ScriptedEngine::default(), StabilizerConfig::default());
		stabilizer.load(pair(), 0.0);
		stabilizer.advance(5000.0);

		let grown = graph(&[
			Note::new("1", "A").with_related(["2"]),
			Note::new("2", "B"),
			Note::new("3", "C"),
		]);
		assert!(stabilizer.load(grown, 6000.0));
		assert_eq!(stabilizer.phase(), Phase::Seeding);
		assert_eq!(stabilizer.engine().seeds, 2);
		let carried = &stabilizer.engine().carried;
		assert!(carried.contains_key("1") && carried.contains_key("2"));
		assert!(!carried.contains_key("3"));

		// The old deadline is gone: the new seed settles relative to 6000.
		assert_eq!(stabilizer.advance(6999.0), Phase::Seeding);
		assert_eq!(stabilizer.advance(7000.0), Phase::Settling);
	}

	#[test]
	fn carry_can_be_disabled() {
		let config = StabilizerConfig {
			carry_positions: false,
			..StabilizerConfig::default()
		};
		let mut stabilizer = Stabilizer::new(ScriptedEngine::default(), config);
		stabilizer.load(pair(), 0.0);
		stabilizer.load(graph(&[Note::new("1", "A")]), 10.0);
		assert!(stabilizer.engine().carried.is_empty());
	}

	#[test]
	fn empty_data_goes_idle() {
		let mut stabilizer = Stabilizer::new(ScriptedEngine::default(), StabilizerConfig::default());
		stabilizer.load(pair(), 0.0);
		assert!(stabilizer.load(GraphData::default(), 100.0));
		assert_eq!(stabilizer.phase(), Phase::Idle);
		assert!(!stabilizer.step(0.016));
		assert_eq!(stabilizer.advance(10_000.0), Phase::Idle);
	}

	#[test]
	fn cancel_drops_pending_transitions() {
		let mut stabilizer = Stabilizer::new(ScriptedEngine::default(), StabilizerConfig::default());
		stabilizer.load(pair(), 0.0);
		stabilizer.cancel();
		assert_eq!(stabilizer.advance(2000.0), Phase::Idle);
		assert!(stabilizer.engine().tunes.is_empty());
		assert!(stabilizer.load(pair(), 3000.0));
	}
}
