//! Canvas rendering for the note graph.
//!
//! Passes, back to front:
//! 1. Background (screen space)
//! 2. Edges with arrow heads, then link particles (world space)
//! 3. Dimmed nodes, then highlighted nodes with ring and label on top
//! 4. Empty-graph message (screen space)

use std::collections::HashMap;
use std::f64::consts::PI;

use force_graph::Node;
use web_sys::CanvasRenderingContext2d;

use super::scale::ScaledValues;
use super::state::ForceGraphState;
use super::theme::{Color, Theme};
use crate::graph::{NodeInfo, Phase};

const EMPTY_MESSAGE: &str = "No notes yet";

fn smooth_step(t: f64) -> f64 {
	t * t * (3.0 - 2.0 * t)
}

/// Renders the complete graph to the canvas.
pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let scale = state.scaled();

	draw_background(state, ctx, theme);

	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);

	draw_edges(state, ctx, &scale, theme);
	if state.particles_flowing() {
		draw_particles(state, ctx, &scale, theme);
	}
	draw_nodes(state, ctx, &scale, theme);

	ctx.restore();

	if state.layout.phase() == Phase::Idle {
		draw_empty_message(state, ctx, theme);
	}
}

fn draw_background(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let (cx, cy) = (state.width / 2.0, state.height / 2.0);
	let gradient = theme
		.background
		.use_gradient
		.then(|| ctx.create_radial_gradient(cx, cy, 0.0, cx, cy, state.width.max(state.height) * 0.8).ok())
		.flatten();

	match gradient {
		Some(gradient) => {
			let _ = gradient.add_color_stop(0.0, &theme.background.color_secondary.to_css());
			let _ = gradient.add_color_stop(1.0, &theme.background.color.to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		None => ctx.set_fill_style_str(&theme.background.color.to_css()),
	}
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
}

/// Position and weight of a node, enough to trim edges to its rim.
#[derive(Clone, Copy)]
struct Disc {
	x: f64,
	y: f64,
	weight: f64,
}

impl From<&Node<NodeInfo>> for Disc {
	fn from(node: &Node<NodeInfo>) -> Self {
		Self {
			x: node.x() as f64,
			y: node.y() as f64,
			weight: node.data.user_data.weight,
		}
	}
}

/// Start and end of an edge trimmed to the node rims, plus its direction.
struct EdgeGeometry {
	from: (f64, f64),
	to: (f64, f64),
	unit: (f64, f64),
	length: f64,
}

fn edge_geometry(a: Disc, b: Disc, scale: &ScaledValues) -> Option<EdgeGeometry> {
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	let dist = (dx * dx + dy * dy).sqrt();
	let (r1, r2) = (scale.radius_for(a.weight), scale.radius_for(b.weight));
	if dist <= r1 + r2 {
		return None;
	}
	let unit = (dx / dist, dy / dist);
	Some(EdgeGeometry {
		from: (a.x + unit.0 * r1, a.y + unit.1 * r1),
		to: (b.x - unit.0 * r2, b.y - unit.1 * r2),
		unit,
		length: dist - r1 - r2,
	})
}

fn draw_edges(
	state: &ForceGraphState,
	ctx: &CanvasRenderingContext2d,
	scale: &ScaledValues,
	theme: &Theme,
) {
	let peak = smooth_step(state.hover.peak());
	let color = theme.edge.color;

	state.layout.engine().graph().visit_edges(|n1, n2, _| {
		let Some(edge) = edge_geometry(n1.into(), n2.into(), scale) else {
			return;
		};

		let edge_t = smooth_step(state.hover.edge_level(n1.index(), n2.index()));
		let (alpha, width) = if edge_t > 0.01 {
			(0.7 + 0.3 * edge_t, scale.edge_line_width * (1.0 + 0.5 * edge_t))
		} else {
			(0.7 - 0.5 * peak, scale.edge_line_width * (1.0 - 0.3 * peak))
		};

		let arrow = if theme.edge.arrows && !scale.cull_arrows {
			scale.arrow_size.min(edge.length * 0.5)
		} else {
			0.0
		};

		ctx.set_stroke_style_str(&color.fade(alpha).to_css());
		ctx.set_line_width(width);
		ctx.begin_path();
		ctx.move_to(edge.from.0, edge.from.1);
		ctx.line_to(edge.to.0 - edge.unit.0 * arrow, edge.to.1 - edge.unit.1 * arrow);
		ctx.stroke();

		if arrow > 0.0 {
			let (ux, uy) = edge.unit;
			let (tip_x, tip_y) = edge.to;
			let (back_x, back_y) = (tip_x - ux * arrow, tip_y - uy * arrow);
			let (px, py) = (-uy * arrow * 0.5, ux * arrow * 0.5);

			ctx.set_fill_style_str(&color.fade(alpha * scale.arrow_alpha).to_css());
			ctx.begin_path();
			ctx.move_to(tip_x, tip_y);
			ctx.line_to(back_x + px, back_y + py);
			ctx.line_to(back_x - px, back_y - py);
			ctx.close_path();
			ctx.fill();
		}
	});
}

/// While the layout runs every edge carries particles; afterwards only the
/// edges around the hovered node do.
fn draw_particles(
	state: &ForceGraphState,
	ctx: &CanvasRenderingContext2d,
	scale: &ScaledValues,
	theme: &Theme,
) {
	let engine = state.layout.engine();
	let mut discs = HashMap::with_capacity(engine.node_count());
	engine.graph().visit_nodes(|node| {
		discs.insert(node.index(), Disc::from(node));
	});

	let everywhere = state.layout.is_active();
	let color = theme.particles.color;

	for (index, &(source, target)) in engine.edges().iter().enumerate() {
		let alpha = if everywhere {
			1.0
		} else {
			smooth_step(state.hover.edge_level(source, target))
		};
		if alpha < 0.01 {
			continue;
		}
		let (Some(&a), Some(&b)) = (discs.get(&source), discs.get(&target)) else {
			continue;
		};
		let Some(edge) = edge_geometry(a, b, scale) else {
			continue;
		};

		ctx.set_fill_style_str(&color.fade(alpha).to_css());
		for t in state.particles.offsets(index) {
			let (x, y) = (
				edge.from.0 + edge.unit.0 * edge.length * t,
				edge.from.1 + edge.unit.1 * edge.length * t,
			);
			ctx.begin_path();
			let _ = ctx.arc(x, y, scale.particle_radius, 0.0, 2.0 * PI);
			ctx.fill();
		}
	}
}

fn draw_nodes(
	state: &ForceGraphState,
	ctx: &CanvasRenderingContext2d,
	scale: &ScaledValues,
	theme: &Theme,
) {
	let peak = smooth_step(state.hover.peak());
	let dim_alpha = 1.0 - 0.7 * peak;
	let graph = state.layout.engine().graph();

	graph.visit_nodes(|node| {
		if state.hover.level(node.index()) > 0.001 {
			return;
		}
		draw_node(ctx, node, scale, theme, dim_alpha, 1.0 - 0.15 * peak);
		if scale.label_alpha * dim_alpha > 0.05 {
			draw_label(ctx, node, scale, theme, scale.label_alpha * dim_alpha, 1.0);
		}
	});

	graph.visit_nodes(|node| {
		let idx = node.index();
		let node_t = smooth_step(state.hover.level(idx));
		if node_t <= 0.001 {
			return;
		}
		let ring_t = smooth_step(state.hover.ring(idx));
		let grow = 1.0 + (0.25 + 0.15 * ring_t) * node_t;
		let alpha = dim_alpha + (1.0 - dim_alpha) * node_t;

		draw_node(ctx, node, scale, theme, alpha, grow);

		if ring_t > 0.01 {
			let (x, y) = (node.x() as f64, node.y() as f64);
			let radius = scale.radius_for(node.data.user_data.weight) * grow + scale.ring_offset;
			ctx.begin_path();
			let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&Color::rgba(255, 255, 255, 0.8 * ring_t).to_css());
			ctx.set_line_width(scale.ring_width);
			ctx.stroke();
		}

		draw_label(ctx, node, scale, theme, alpha.max(scale.label_alpha), grow);
	});
}

fn draw_node(
	ctx: &CanvasRenderingContext2d,
	node: &Node<NodeInfo>,
	scale: &ScaledValues,
	theme: &Theme,
	alpha: f64,
	radius_mult: f64,
) {
	let (x, y) = (node.x() as f64, node.y() as f64);
	let radius = scale.radius_for(node.data.user_data.weight) * radius_mult;
	let color = theme.node_color(node.data.user_data.color_class);

	ctx.set_global_alpha(alpha);
	let gradient = theme
		.node
		.use_gradient
		.then(|| ctx.create_radial_gradient(x - radius * 0.3, y - radius * 0.3, 0.0, x, y, radius).ok())
		.flatten();

	ctx.begin_path();
	let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
	match gradient {
		Some(gradient) => {
			let _ = gradient.add_color_stop(0.0, &color.lighten(0.4).to_css());
			let _ = gradient.add_color_stop(0.7, &color.to_css());
			let _ = gradient.add_color_stop(1.0, &color.darken(0.2).to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		None => ctx.set_fill_style_str(&color.to_css()),
	}
	ctx.fill();
	ctx.set_global_alpha(1.0);
}

fn draw_label(
	ctx: &CanvasRenderingContext2d,
	node: &Node<NodeInfo>,
	scale: &ScaledValues,
	theme: &Theme,
	alpha: f64,
	radius_mult: f64,
) {
	let label = &node.data.user_data.label;
	if label.is_empty() {
		return;
	}
	let (x, y) = (node.x() as f64, node.y() as f64);
	let radius = scale.radius_for(node.data.user_data.weight) * radius_mult;
	ctx.set_fill_style_str(&theme.node.label.fade(alpha).to_css());
	ctx.set_font(&scale.label_font);
	let _ = ctx.fill_text(label, x + radius + 4.0 / scale.k, y + 3.0 / scale.k);
}

fn draw_empty_message(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	ctx.set_fill_style_str(&theme.message.to_css());
	ctx.set_font("14px sans-serif");
	ctx.set_text_align("center");
	let _ = ctx.fill_text(EMPTY_MESSAGE, state.width / 2.0, state.height / 2.0);
	ctx.set_text_align("start");
}
