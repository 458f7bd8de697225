//! Directional particles flowing along edges, source to target.

use super::theme::ParticleStyle;

/// Spreads the particles of neighbouring edges apart.
const EDGE_STAGGER: f64 = 0.618_033_988_75;

/// Shared flow clock for every edge. Particle `j` of edge `e` sits at
/// `frac(progress + j / per_edge + e * EDGE_STAGGER)` along the edge.
#[derive(Clone, Debug)]
pub struct LinkParticles {
	per_edge: usize,
	speed: f64,
	progress: f64,
}

impl LinkParticles {
	/// Flow configured from the theme's particle style.
	pub fn new(style: &ParticleStyle) -> Self {
		Self {
			per_edge: style.per_edge,
			speed: style.speed.max(0.0),
			progress: 0.0,
		}
	}

	/// False when the theme turns particles off.
	pub fn is_enabled(&self) -> bool {
		self.per_edge > 0 && self.speed > 0.0
	}

	/// Advances by `dt` seconds.
	pub fn update(&mut self, dt: f64) {
		self.progress = (self.progress + self.speed * dt * 60.0).fract();
	}

	/// Back to the start of the flow.
	pub fn reset(&mut self) {
		self.progress = 0.0;
	}

	/// Positions along edge `edge_index`, each in `[0, 1)`.
	pub fn offsets(&self, edge_index: usize) -> impl Iterator<Item = f64> + '_ {
		let stagger = (edge_index as f64 * EDGE_STAGGER).fract();
		(0..self.per_edge).map(move |j| (self.progress + j as f64 / self.per_edge as f64 + stagger).fract())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::theme::Theme;

	#[test]
	fn particles_are_evenly_spaced_along_an_edge() {
		let particles = LinkParticles::new(&Theme::default().particles);
		let offsets: Vec<f64> = particles.offsets(0).collect();
		assert_eq!(offsets, [0.0, 0.5]);
	}

	#[test]
	fn flow_wraps_around() {
		let mut particles = LinkParticles::new(&Theme::default().particles);
		// 0.01 per frame: one second at 60 Hz covers 60% of the edge.
		particles.update(1.0);
		particles.update(1.0);
		for offset in particles.offsets(3) {
			assert!((0.0..1.0).contains(&offset));
		}
		let first = particles.offsets(0).next().unwrap_or_default();
		assert!((first - 0.2).abs() < 1e-9);
	}

	#[test]
	fn zero_per_edge_disables_flow() {
		let style = ParticleStyle {
			per_edge: 0,
			..Theme::default().particles
		};
		let particles = LinkParticles::new(&style);
		assert!(!particles.is_enabled());
		assert_eq!(particles.offsets(0).count(), 0);
	}
}
