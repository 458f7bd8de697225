//! Zoom-dependent scaling for graph visuals.
//!
//! Sizes are given as base values and resolved per frame into world-space
//! values (what the canvas draws after the pan/zoom transform is applied).
//! Node sizes additionally grow with the square root of the node weight, so a
//! note's area tracks how many links it declares.
//!
//! # Coordinate spaces
//!
//! - **World-space**: graph coordinates. Drawing happens here, after the
//!   canvas transform, so a world-space length looks `k` times bigger on screen.
//! - **Screen-space**: canvas pixels. Configuration that reads "in pixels" is
//!   divided by `k` before drawing so it keeps its on-screen size.
//!
//! # Behaviors
//!
//! - [`ScaleBehavior::Screen`]: constant pixel size at every zoom level.
//! - [`ScaleBehavior::Clamped`]: grows and shrinks with the zoom, within
//!   pixel bounds, so nodes never vanish when zoomed far out.

/// How a size reacts to the zoom factor `k`.
#[derive(Clone, Debug)]
pub enum ScaleBehavior {
	/// Constant screen size in pixels.
	Screen,
	/// World-space size, kept within `[min_screen, max_screen]` pixels.
	/// Use `f64::INFINITY` for an open upper bound.
	Clamped {
		/// Smallest on-screen size in pixels.
		min_screen: f64,
		/// Largest on-screen size in pixels.
		max_screen: f64,
	},
}

impl ScaleBehavior {
	/// World-space value for `base` at zoom `k`.
	///
	/// The result is meant for drawing calls made after the canvas transform
	/// has been applied.
	pub fn apply(&self, base: f64, k: f64) -> f64 {
		match self {
			ScaleBehavior::Screen => base / k,
			ScaleBehavior::Clamped {
				min_screen,
				max_screen,
			} => base.clamp(min_screen / k, max_screen / k),
		}
	}
}

/// How opacity reacts to the zoom factor.
#[derive(Clone, Debug)]
pub enum AlphaBehavior {
	/// `k` clamped to [0, 1].
	ScaleWithZoom,
	/// Zero at `zero_alpha_k`, fully opaque at `full_alpha_k`.
	Fade {
		/// Zoom level at which the element is invisible.
		zero_alpha_k: f64,
		/// Zoom level from which the element is fully opaque.
		full_alpha_k: f64,
	},
}

impl AlphaBehavior {
	/// Opacity in `[0, 1]` at zoom `k`. Equal thresholds mean always opaque.
	pub fn apply(&self, k: f64) -> f64 {
		match self {
			AlphaBehavior::ScaleWithZoom => k.clamp(0.0, 1.0),
			AlphaBehavior::Fade {
				zero_alpha_k,
				full_alpha_k,
			} => {
				if zero_alpha_k == full_alpha_k {
					return 1.0;
				}
				((k - zero_alpha_k) / (full_alpha_k - zero_alpha_k)).clamp(0.0, 1.0)
			}
		}
	}
}

/// Node sizing. The radius applies to a weight-1 node; heavier nodes scale
/// it by `sqrt(weight)`.
#[derive(Clone, Debug)]
pub struct NodeScaleConfig {
	/// Radius of a weight-1 node in world units.
	pub radius: f64,
	/// How `radius` reacts to zoom.
	pub radius_behavior: ScaleBehavior,
	/// Pointer hit radius of a weight-1 node. Larger than `radius` so small
	/// nodes stay easy to click.
	pub hit_radius: f64,
	/// How `hit_radius` reacts to zoom.
	pub hit_behavior: ScaleBehavior,
	/// Label font size in screen pixels.
	pub label_size: f64,
	/// Below this zoom labels stop shrinking and keep their world size.
	pub label_min_k: f64,
	/// Labels of non-highlighted nodes fade out when zoomed out.
	pub label_alpha_behavior: AlphaBehavior,
}

/// Edge line sizing.
#[derive(Clone, Debug)]
pub struct EdgeScaleConfig {
	/// Line width in screen pixels.
	pub line_width: f64,
}

/// Arrowheads marking link direction.
#[derive(Clone, Debug)]
pub struct ArrowScaleConfig {
	/// Arrowhead length in world units.
	pub size: f64,
	/// How `size` reacts to zoom.
	pub size_behavior: ScaleBehavior,
	/// Arrows fade out when zoomed far out, where they only add noise.
	pub alpha_behavior: AlphaBehavior,
	/// Arrows fainter than this are skipped.
	pub cull_alpha: f64,
}

/// Highlight ring drawn around the hovered node.
#[derive(Clone, Debug)]
pub struct RingScaleConfig {
	/// Stroke width in screen pixels.
	pub width: f64,
	/// Gap between node edge and ring in screen pixels.
	pub offset: f64,
}

/// All zoom-dependent sizing in one place.
///
/// Adjust the [`Default`] values to tune how the graph looks at different
/// zoom levels.
#[derive(Clone, Debug)]
pub struct ScaleConfig {
	/// Node radius, hit area and labels.
	pub node: NodeScaleConfig,
	/// Edge lines.
	pub edge: EdgeScaleConfig,
	/// Arrowheads.
	pub arrow: ArrowScaleConfig,
	/// Hover ring.
	pub ring: RingScaleConfig,
	/// How link particle size reacts to zoom.
	pub particle_behavior: ScaleBehavior,
}

impl Default for ScaleConfig {
	fn default() -> Self {
		Self {
			node: NodeScaleConfig {
				radius: 5.0,
				radius_behavior: ScaleBehavior::Clamped {
					min_screen: 4.0,
					max_screen: f64::INFINITY,
				},
				hit_radius: 10.0,
				hit_behavior: ScaleBehavior::Clamped {
					min_screen: 6.0,
					max_screen: f64::INFINITY,
				},
				label_size: 11.0,
				label_min_k: 0.5,
				label_alpha_behavior: AlphaBehavior::Fade {
					zero_alpha_k: 0.6,
					full_alpha_k: 1.2,
				},
			},
			edge: EdgeScaleConfig { line_width: 1.2 },
			arrow: ArrowScaleConfig {
				size: 5.0,
				size_behavior: ScaleBehavior::Clamped {
					min_screen: 0.0,
					max_screen: 16.0,
				},
				alpha_behavior: AlphaBehavior::ScaleWithZoom,
				cull_alpha: 0.05,
			},
			ring: RingScaleConfig {
				width: 1.5,
				offset: 2.0,
			},
			particle_behavior: ScaleBehavior::Screen,
		}
	}
}

/// Scale values resolved for one zoom level. Built once per frame.
///
/// All lengths are world-space and ready for drawing calls made after the
/// canvas transform.
#[derive(Clone, Debug)]
pub struct ScaledValues {
	/// Zoom factor the values were resolved for.
	pub k: f64,
	/// Radius of a weight-1 node.
	pub node_radius: f64,
	/// Hit radius of a weight-1 node.
	pub hit_radius: f64,
	/// CSS font shorthand for labels.
	pub label_font: String,
	/// Opacity of labels on nodes that are not highlighted.
	pub label_alpha: f64,
	/// Edge stroke width.
	pub edge_line_width: f64,
	/// Arrowhead length.
	pub arrow_size: f64,
	/// Arrowhead opacity.
	pub arrow_alpha: f64,
	/// True when arrows are too faint to be worth drawing.
	pub cull_arrows: bool,
	/// Hover ring stroke width.
	pub ring_width: f64,
	/// Gap between node rim and hover ring.
	pub ring_offset: f64,
	/// Link particle radius.
	pub particle_radius: f64,
}

impl ScaledValues {
	/// Resolves `config` at zoom `k`. `particle_size` is the theme's particle
	/// radius in pixels.
	pub fn new(config: &ScaleConfig, k: f64, particle_size: f64) -> Self {
		let arrow_alpha = config.arrow.alpha_behavior.apply(k);
		Self {
			k,
			node_radius: config.node.radius_behavior.apply(config.node.radius, k),
			hit_radius: config.node.hit_behavior.apply(config.node.hit_radius, k),
			label_font: format!("{}px sans-serif", config.node.label_size / k.max(config.node.label_min_k)),
			label_alpha: config.node.label_alpha_behavior.apply(k),
			edge_line_width: config.edge.line_width / k,
			arrow_size: config.arrow.size_behavior.apply(config.arrow.size, k),
			arrow_alpha,
			cull_arrows: arrow_alpha < config.arrow.cull_alpha,
			ring_width: config.ring.width / k,
			ring_offset: config.ring.offset / k,
			particle_radius: config.particle_behavior.apply(particle_size, k),
		}
	}

	/// Drawn radius of a node with the given weight.
	pub fn radius_for(&self, weight: f64) -> f64 {
		self.node_radius * weight.max(1.0).sqrt()
	}

	/// Hit-test radius of a node with the given weight.
	pub fn hit_radius_for(&self, weight: f64) -> f64 {
		self.hit_radius.max(self.radius_for(weight))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clamped_sizes_keep_a_minimum_on_screen() {
		let behavior = ScaleBehavior::Clamped {
			min_screen: 4.0,
			max_screen: 16.0,
		};
		assert_eq!(behavior.apply(5.0, 1.0), 5.0);
		// Zoomed far out the world size grows so the screen size stays at 4px.
		assert_eq!(behavior.apply(5.0, 0.1), 40.0);
		assert_eq!(behavior.apply(5.0, 10.0), 1.6);
	}

	#[test]
	fn fade_alpha_ramps_between_thresholds() {
		let fade = AlphaBehavior::Fade {
			zero_alpha_k: 0.6,
			full_alpha_k: 1.2,
		};
		assert_eq!(fade.apply(0.5), 0.0);
		assert!((fade.apply(0.9) - 0.5).abs() < 1e-9);
		assert_eq!(fade.apply(2.0), 1.0);
	}

	#[test]
	fn heavier_nodes_are_larger() {
		let scale = ScaledValues::new(&ScaleConfig::default(), 1.0, 2.0);
		assert!(scale.radius_for(4.0) > scale.radius_for(1.5));
		assert_eq!(scale.radius_for(4.0), scale.node_radius * 2.0);
		assert!(scale.hit_radius_for(1.0) >= scale.radius_for(1.0));
	}
}
