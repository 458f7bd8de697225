//! Visual theming for the note graph.

use crate::graph::ColorClass;

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	/// Red channel.
	pub r: u8,
	/// Green channel.
	pub g: u8,
	/// Blue channel.
	pub b: u8,
	/// Opacity in `[0, 1]`.
	pub a: f64,
}

impl Color {
	/// Opaque color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// Color with explicit alpha.
	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Same color with alpha replaced.
	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Multiplies the current alpha by `factor`.
	pub fn fade(self, factor: f64) -> Self {
		self.with_alpha(self.a * factor.clamp(0.0, 1.0))
	}

	/// Lighten the color by a factor (0.0 = unchanged, 1.0 = white)
	pub fn lighten(self, factor: f64) -> Self {
		let f = factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 + (255.0 - self.r as f64) * f) as u8,
			g: (self.g as f64 + (255.0 - self.g as f64) * f) as u8,
			b: (self.b as f64 + (255.0 - self.b as f64) * f) as u8,
			a: self.a,
		}
	}

	/// Darken the color by a factor (0.0 = unchanged, 1.0 = black)
	pub fn darken(self, factor: f64) -> Self {
		let f = 1.0 - factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 * f) as u8,
			g: (self.g as f64 * f) as u8,
			b: (self.b as f64 * f) as u8,
			a: self.a,
		}
	}

	/// CSS color string: hex when opaque, `rgba(...)` otherwise.
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}
}

/// Canvas background.
#[derive(Clone, Debug)]
pub struct BackgroundStyle {
	/// Fill color, and the outer color of the gradient.
	pub color: Color,
	/// Center color of the radial gradient.
	pub color_secondary: Color,
	/// Draw a radial gradient instead of a flat fill.
	pub use_gradient: bool,
}

/// Link lines.
#[derive(Clone, Debug)]
pub struct EdgeStyle {
	/// Stroke color.
	pub color: Color,
	/// Draw an arrow head at the target end.
	pub arrows: bool,
}

/// Node fills and labels.
#[derive(Clone, Debug)]
pub struct NodeStyle {
	/// Notes with at least one resolved link.
	pub linked: Color,
	/// Notes with no links at all.
	pub isolated: Color,
	/// Shade nodes with a radial gradient.
	pub use_gradient: bool,
	/// Label text color.
	pub label: Color,
}

/// Dots that travel along edges from source to target.
#[derive(Clone, Debug)]
pub struct ParticleStyle {
	/// Particles per edge; 0 disables them.
	pub per_edge: usize,
	/// Fraction of the edge length covered per 60 Hz frame.
	pub speed: f64,
	/// Radius in screen pixels.
	pub size: f64,
	/// Fill color.
	pub color: Color,
}

/// Every color and style the renderer uses.
#[derive(Clone, Debug)]
pub struct Theme {
	/// Canvas background.
	pub background: BackgroundStyle,
	/// Link lines and arrows.
	pub edge: EdgeStyle,
	/// Nodes and labels.
	pub node: NodeStyle,
	/// Link particles.
	pub particles: ParticleStyle,
	/// Color of the empty-graph message.
	pub message: Color,
}

impl Theme {
	/// Fill color for a node of `class`.
	pub fn node_color(&self, class: ColorClass) -> Color {
		match class {
			ColorClass::Linked => self.node.linked,
			ColorClass::Isolated => self.node.isolated,
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self {
			background: BackgroundStyle {
				color: Color::rgb(22, 27, 34),
				color_secondary: Color::rgb(30, 35, 42),
				use_gradient: true,
			},
			edge: EdgeStyle {
				color: Color::rgba(156, 163, 175, 0.6),
				arrows: true,
			},
			node: NodeStyle {
				linked: Color::rgb(79, 70, 229),
				isolated: Color::rgb(156, 163, 175),
				use_gradient: true,
				label: Color::rgba(255, 255, 255, 0.85),
			},
			particles: ParticleStyle {
				per_edge: 2,
				speed: 0.01,
				size: 2.0,
				color: Color::rgba(165, 180, 252, 0.9),
			},
			message: Color::rgba(200, 205, 215, 0.8),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn css_output() {
		assert_eq!(Color::rgb(79, 70, 229).to_css(), "#4f46e5");
		assert_eq!(Color::rgba(0, 0, 0, 0.5).to_css(), "rgba(0, 0, 0, 0.5)");
	}

	#[test]
	fn color_classes_map_to_palette() {
		let theme = Theme::default();
		assert_eq!(theme.node_color(ColorClass::Linked).to_css(), "#4f46e5");
		assert_eq!(theme.node_color(ColorClass::Isolated).to_css(), "#9ca3af");
	}

	#[test]
	fn lighten_and_darken_bounds() {
		let c = Color::rgb(100, 100, 100);
		assert_eq!(c.lighten(1.0), Color::rgb(255, 255, 255));
		assert_eq!(c.darken(1.0), Color::rgb(0, 0, 0));
		assert_eq!(c.fade(0.5).a, 0.5);
	}
}
