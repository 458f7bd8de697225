//! View state for the note graph: the layout stabilizer plus everything the
//! pointer does to it (pan, zoom, hover, optional drag, click detection).
//!
//! Nothing here touches the DOM, so the interaction rules are testable off the
//! browser. Coordinates named `sx`/`sy` are canvas pixels, `gx`/`gy` are graph
//! space.

use std::collections::{HashMap, HashSet};

use force_graph::DefaultNodeIdx;

use super::particles::LinkParticles;
use super::scale::{ScaleConfig, ScaledValues};
use super::theme::ParticleStyle;
use crate::graph::{ForceGraphEngine, GraphData, Point, Stabilizer, StabilizerConfig};

/// Fixed physics step per animation frame, in seconds.
const PHYSICS_DT: f32 = 0.016;
/// Longest wall-clock gap a single frame may account for.
const MAX_FRAME_SECS: f64 = 0.1;
/// Pointer travel (pixels) that turns a press into a pan or drag.
const CLICK_SLOP: f64 = 4.0;
const MIN_ZOOM: f64 = 0.1;
const MAX_ZOOM: f64 = 10.0;

/// Pan and zoom transform applied to the entire graph view.
#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	/// Horizontal offset of the graph origin in screen pixels.
	pub x: f64,
	/// Vertical offset of the graph origin in screen pixels.
	pub y: f64,
	/// Zoom factor, clamped to `MIN_ZOOM..=MAX_ZOOM`.
	pub k: f64,
}

/// Primary button held down somewhere on the canvas.
#[derive(Clone, Debug, Default)]
pub struct PressState {
	/// Button is down.
	pub active: bool,
	/// Travelled further than [`CLICK_SLOP`]; the release is not a click.
	pub moved: bool,
	/// Press position in screen pixels.
	pub start_x: f64,
	/// Press position in screen pixels.
	pub start_y: f64,
	/// Pan offset when the press began.
	pub transform_start_x: f64,
	/// Pan offset when the press began.
	pub transform_start_y: f64,
}

/// Node being dragged, only when dragging is enabled.
#[derive(Clone, Debug, Default)]
pub struct DragState {
	/// Grabbed node.
	pub node_idx: Option<DefaultNodeIdx>,
	/// Its position when grabbed.
	pub node_start: Point,
}

/// Remaining-visible threshold for hover fades.
const VISIBLE: f64 = 0.005;
/// Seconds a highlight lingers before fading once the pointer leaves.
const HOLD_SECS: f64 = 0.12;
const FADE_IN_RATE: f64 = 6.0;
const FADE_OUT_RATE: f64 = 4.0;

#[derive(Clone, Copy, Debug, Default)]
struct Fade {
	/// Highlight of the node and its incident edges.
	level: f64,
	/// Ring drawn around the hovered node.
	ring: f64,
	hold: f64,
}

/// Smoothed hover highlight for the hovered node and its neighbours.
///
/// Each node eases toward full highlight while targeted and decays once it is
/// not, after a short hold so a pointer skimming past a node does not flash.
#[derive(Clone, Debug, Default)]
pub struct HoverFade {
	hovered: Option<DefaultNodeIdx>,
	targets: HashSet<DefaultNodeIdx>,
	fades: HashMap<DefaultNodeIdx, Fade>,
	peak: f64,
}

impl HoverFade {
	/// Returns true if the hovered node changed.
	pub fn set_hover(&mut self, node: Option<DefaultNodeIdx>, edges: &[(DefaultNodeIdx, DefaultNodeIdx)]) -> bool {
		if self.hovered == node {
			return false;
		}
		self.hovered = node;
		self.targets.clear();

		if let Some(idx) = node {
			self.targets.insert(idx);
			for &(src, tgt) in edges {
				if src == idx {
					self.targets.insert(tgt);
				} else if tgt == idx {
					self.targets.insert(src);
				}
			}
			for &idx in &self.targets {
				self.fades.entry(idx).or_default().hold = HOLD_SECS;
			}
		}
		true
	}

	/// Eases every fade by `dt` seconds.
	pub fn tick(&mut self, dt: f64) {
		let rise = 1.0 - (-FADE_IN_RATE * dt).exp();
		let decay = (-FADE_OUT_RATE * dt).exp();
		let mut peak: f64 = 0.0;

		self.fades.retain(|idx, fade| {
			let targeted = self.targets.contains(idx);
			let holding = !targeted && fade.hold > 0.0;
			if holding {
				fade.hold -= dt;
			}

			if targeted {
				fade.level += (1.0 - fade.level) * rise;
			} else if !holding {
				fade.level *= decay;
			}

			if self.hovered == Some(*idx) {
				fade.ring += (1.0 - fade.ring) * rise;
			} else if !holding {
				fade.ring *= decay;
			}

			peak = peak.max(fade.level);
			targeted || fade.level > VISIBLE || fade.ring > VISIBLE
		});
		self.peak = peak;
	}

	/// True while any fade is still moving toward its goal.
	pub fn is_animating(&self) -> bool {
		self.fades.iter().any(|(idx, fade)| {
			let level_goal = if self.targets.contains(idx) { 1.0 } else { 0.0 };
			let ring_goal = if self.hovered == Some(*idx) { 1.0 } else { 0.0 };
			(level_goal - fade.level).abs() > VISIBLE || (ring_goal - fade.ring).abs() > VISIBLE
		})
	}

	/// Node currently under the pointer.
	pub fn hovered(&self) -> Option<DefaultNodeIdx> {
		self.hovered
	}

	/// Highlight level of `idx` in `[0, 1]`.
	pub fn level(&self, idx: DefaultNodeIdx) -> f64 {
		self.fades.get(&idx).map_or(0.0, |fade| fade.level)
	}

	/// Hover ring opacity of `idx` in `[0, 1]`.
	pub fn ring(&self, idx: DefaultNodeIdx) -> f64 {
		self.fades.get(&idx).map_or(0.0, |fade| fade.ring)
	}

	/// Geometric mean of the endpoint levels.
	pub fn edge_level(&self, a: DefaultNodeIdx, b: DefaultNodeIdx) -> f64 {
		(self.level(a) * self.level(b)).sqrt()
	}

	/// Strongest node level, used to dim everything else.
	pub fn peak(&self) -> f64 {
		self.peak
	}

	/// Forgets all fades, for when node indices are rebuilt.
	pub fn clear(&mut self) {
		*self = Self::default();
	}
}

/// Everything one canvas needs between frames.
///
/// Pointer handling lives here rather than in the component so it can be
/// driven without a browser.
pub struct ForceGraphState {
	/// Phased layout around the physics engine.
	pub layout: Stabilizer<ForceGraphEngine>,
	/// Zoom-dependent sizing.
	pub scale: ScaleConfig,
	/// Current pan and zoom.
	pub transform: ViewTransform,
	/// Button held on the canvas.
	pub press: PressState,
	/// Grabbed node, if dragging is enabled.
	pub drag: DragState,
	/// Hover highlight animation.
	pub hover: HoverFade,
	/// Particle flow clock.
	pub particles: LinkParticles,
	/// Particle radius in screen pixels.
	pub particle_size: f64,
	/// Canvas width in CSS pixels.
	pub width: f64,
	/// Canvas height in CSS pixels.
	pub height: f64,
	/// Seconds of animation so far.
	pub flow_time: f64,
	last_frame: Option<f64>,
}

impl ForceGraphState {
	/// Empty state for a `width` x `height` canvas with the origin centered.
	pub fn new(layout: StabilizerConfig, particles: &ParticleStyle, width: f64, height: f64) -> Self {
		Self {
			layout: Stabilizer::new(ForceGraphEngine::new(), layout),
			scale: ScaleConfig::default(),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			press: PressState::default(),
			drag: DragState::default(),
			hover: HoverFade::default(),
			particles: LinkParticles::new(particles),
			particle_size: particles.size,
			width,
			height,
			flow_time: 0.0,
			last_frame: None,
		}
	}

	/// Hands a fresh projection to the stabilizer. Returns true if the layout
	/// restarted.
	pub fn load(&mut self, data: GraphData, now: f64) -> bool {
		let changed = self.layout.load(data, now);
		if changed {
			self.hover.clear();
			self.drag = DragState::default();
			self.particles.reset();
		}
		changed
	}

	/// Sizes resolved for the current zoom.
	pub fn scaled(&self) -> ScaledValues {
		ScaledValues::new(&self.scale, self.transform.k, self.particle_size)
	}

	/// Canvas pixel to graph coordinates.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Closest node whose hit circle contains the point.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let scale = self.scaled();
		let mut best: Option<(f64, DefaultNodeIdx)> = None;
		self.layout.engine().graph().visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			let dist = (dx * dx + dy * dy).sqrt();
			if dist < scale.hit_radius_for(node.data.user_data.weight)
				&& best.is_none_or(|(closest, _)| dist < closest)
			{
				best = Some((dist, node.index()));
			}
		});
		best.map(|(_, idx)| idx)
	}

	/// Id of the node under the point.
	pub fn node_id_at(&self, sx: f64, sy: f64) -> Option<String> {
		let idx = self.node_at_position(sx, sy)?;
		let mut id = None;
		self.layout.engine().graph().visit_nodes(|node| {
			if node.index() == idx {
				id = Some(node.data.user_data.id.clone());
			}
		});
		id
	}

	/// Moves the hover highlight. Returns true when it changed.
	pub fn set_hover(&mut self, node: Option<DefaultNodeIdx>) -> bool {
		self.hover.set_hover(node, self.layout.engine().edges())
	}

	/// Primary button down. With `allow_drag`, pressing a node grabs it.
	pub fn press(&mut self, sx: f64, sy: f64, allow_drag: bool) {
		self.press = PressState {
			active: true,
			moved: false,
			start_x: sx,
			start_y: sy,
			transform_start_x: self.transform.x,
			transform_start_y: self.transform.y,
		};
		self.drag = DragState::default();
		if allow_drag {
			if let Some(idx) = self.node_at_position(sx, sy) {
				if let Some(at) = self.layout.engine().node_position(idx) {
					self.drag = DragState {
						node_idx: Some(idx),
						node_start: at,
					};
				}
			}
		}
	}

	/// Pointer moved. Pans, drags or updates the hover target. Returns true if
	/// a redraw is needed.
	pub fn move_pointer(&mut self, sx: f64, sy: f64) -> bool {
		if !self.press.active {
			let hovered = self.node_at_position(sx, sy);
			return self.set_hover(hovered);
		}

		let (dx, dy) = (sx - self.press.start_x, sy - self.press.start_y);
		if !self.press.moved && (dx * dx + dy * dy).sqrt() > CLICK_SLOP {
			self.press.moved = true;
		}
		if !self.press.moved {
			return false;
		}

		if let Some(idx) = self.drag.node_idx {
			let to = Point {
				x: self.drag.node_start.x + (dx / self.transform.k) as f32,
				y: self.drag.node_start.y + (dy / self.transform.k) as f32,
			};
			self.layout.engine_mut().move_node(idx, to);
		} else {
			self.transform.x = self.press.transform_start_x + dx;
			self.transform.y = self.press.transform_start_y + dy;
		}
		true
	}

	/// Primary button up. Returns the id of the clicked node when the press
	/// did not travel and ended on a node.
	pub fn release(&mut self, sx: f64, sy: f64) -> Option<String> {
		let was_click = self.press.active && !self.press.moved;
		self.press = PressState::default();
		self.drag = DragState::default();
		if was_click { self.node_id_at(sx, sy) } else { None }
	}

	/// Pointer left the canvas: cancel the press and the hover.
	pub fn leave(&mut self) {
		self.press = PressState::default();
		self.drag = DragState::default();
		self.set_hover(None);
	}

	/// Zooms around the pointer, one notch per wheel event.
	pub fn zoom(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let new_k = (self.transform.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	/// Particles move while the layout does, or while a node is hovered.
	pub fn particles_flowing(&self) -> bool {
		self.particles.is_enabled()
			&& !self.layout.data().edges.is_empty()
			&& (self.layout.is_active() || self.hover.hovered().is_some())
	}

	/// Whether another animation frame is needed after this one.
	pub fn needs_frame(&self) -> bool {
		self.layout.is_active()
			|| self.hover.is_animating()
			|| self.particles_flowing()
			|| self.drag.node_idx.is_some()
	}

	/// One animation frame at time `now` (milliseconds). Returns
	/// [`needs_frame`](Self::needs_frame).
	pub fn tick(&mut self, now: f64) -> bool {
		let elapsed = match self.last_frame {
			Some(previous) => ((now - previous) / 1000.0).clamp(0.0, MAX_FRAME_SECS),
			None => PHYSICS_DT as f64,
		};
		self.layout.tick(now, PHYSICS_DT);
		self.hover.tick(elapsed);
		if self.particles_flowing() {
			self.particles.update(elapsed);
		}
		self.flow_time += elapsed;

		let again = self.needs_frame();
		// A parked loop must not count the idle gap as frame time.
		self.last_frame = again.then_some(now);
		again
	}

	/// Keeps the graph centered when the canvas changes size.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.transform.x += (width - self.width) / 2.0;
		self.transform.y += (height - self.height) / 2.0;
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::theme::Theme;
	use crate::graph::{Phase, derive};
	use crate::notes::{LinkMode, Note};

	const W: f64 = 800.0;
	const H: f64 = 600.0;

	fn state_with(notes: &[Note]) -> ForceGraphState {
		let mut state = ForceGraphState::new(StabilizerConfig::default(), &Theme::default().particles, W, H);
		let data = derive(notes, LinkMode::Structured, &Default::default());
		state.load(data, 0.0);
		state
	}

	fn two_notes() -> Vec<Note> {
		vec![Note::new("1", "A").with_related(["2"]), Note::new("2", "B")]
	}

	#[test]
	fn seeded_nodes_are_hit_at_their_ring_position() {
		let state = state_with(&two_notes());
		// Seeds sit on a ring of radius 100 around the view center.
		assert_eq!(state.node_id_at(W / 2.0 + 100.0, H / 2.0).as_deref(), Some("1"));
		assert_eq!(state.node_id_at(W / 2.0 - 100.0, H / 2.0).as_deref(), Some("2"));
		assert_eq!(state.node_id_at(W / 2.0, H / 2.0), None);
	}

	#[test]
	fn press_and_release_in_place_is_a_click() {
		let mut state = state_with(&two_notes());
		state.press(W / 2.0 + 100.0, H / 2.0, false);
		assert_eq!(state.release(W / 2.0 + 101.0, H / 2.0).as_deref(), Some("1"));
	}

	#[test]
	fn panning_is_not_a_click() {
		let mut state = state_with(&two_notes());
		state.press(W / 2.0 + 100.0, H / 2.0, false);
		assert!(state.move_pointer(W / 2.0 + 160.0, H / 2.0));
		assert_eq!(state.transform.x, W / 2.0 + 60.0);
		assert_eq!(state.release(W / 2.0 + 160.0, H / 2.0), None);
	}

	#[test]
	fn background_click_yields_nothing() {
		let mut state = state_with(&two_notes());
		state.press(10.0, 10.0, false);
		assert_eq!(state.release(10.0, 10.0), None);
	}

	#[test]
	fn drag_moves_the_node_only_when_allowed() {
		let mut state = state_with(&two_notes());
		state.press(W / 2.0 + 100.0, H / 2.0, true);
		assert!(state.drag.node_idx.is_some());
		state.move_pointer(W / 2.0 + 100.0, H / 2.0 + 50.0);
		assert_eq!(state.transform.y, H / 2.0);
		assert_eq!(state.node_id_at(W / 2.0 + 100.0, H / 2.0 + 50.0).as_deref(), Some("1"));
		state.release(W / 2.0 + 100.0, H / 2.0 + 50.0);

		state.press(W / 2.0 - 100.0, H / 2.0, false);
		assert!(state.drag.node_idx.is_none());
	}

	#[test]
	fn zoom_is_clamped_and_keeps_the_pointer_fixed() {
		let mut state = state_with(&two_notes());
		let before = state.screen_to_graph(100.0, 100.0);
		state.zoom(100.0, 100.0, -1.0);
		let after = state.screen_to_graph(100.0, 100.0);
		assert!((before.0 - after.0).abs() < 1e-9 && (before.1 - after.1).abs() < 1e-9);

		for _ in 0..200 {
			state.zoom(0.0, 0.0, 1.0);
		}
		assert!((state.transform.k - MIN_ZOOM).abs() < 1e-9);
	}

	#[test]
	fn hover_highlights_neighbours_then_fades() {
		let mut state = state_with(&two_notes());
		assert!(state.move_pointer(W / 2.0 + 100.0, H / 2.0));
		let hovered = state.hover.hovered().unwrap();
		for _ in 0..120 {
			state.hover.tick(0.016);
		}
		assert!(state.hover.level(hovered) > 0.99);
		assert!(state.hover.ring(hovered) > 0.99);
		assert!(!state.hover.is_animating());

		state.leave();
		assert!(state.hover.is_animating());
		state.hover.tick(0.05);
		// Still held.
		assert!(state.hover.level(hovered) > 0.99);
		for _ in 0..240 {
			state.hover.tick(0.016);
		}
		assert_eq!(state.hover.level(hovered), 0.0);
		assert!(!state.hover.is_animating());
	}

	#[test]
	fn frame_loop_parks_once_frozen() {
		let mut state = state_with(&two_notes());
		assert!(state.tick(0.0));
		let mut now = 0.0;
		while now < 4_100.0 {
			now += 16.0;
			state.tick(now);
		}
		assert_eq!(state.layout.phase(), Phase::Frozen);
		assert!(!state.needs_frame());
		assert!(!state.tick(now + 16.0));
	}

	#[test]
	fn empty_collection_is_idle() {
		let state = state_with(&[]);
		assert_eq!(state.layout.phase(), Phase::Idle);
		assert!(!state.needs_frame());
	}

	#[test]
	fn resize_keeps_center() {
		let mut state = state_with(&two_notes());
		state.resize(1000.0, 600.0);
		assert_eq!(state.transform.x, 500.0);
	}
}
