//! Leptos component wrapping the note graph canvas.
//!
//! Whenever the `notes` signal changes the component re-derives the graph and
//! hands it to the stabilizer; an unchanged projection leaves the layout
//! alone. Frames are requested through `requestAnimationFrame` only while
//! something moves, so a frozen graph costs nothing until the pointer or the
//! data wakes it again.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use leptos::prelude::*;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::ForceGraphState;
use super::theme::Theme;
use crate::graph::{ProjectorConfig, StabilizerConfig, derive};
use crate::notes::{LinkMode, Note};

const FALLBACK_SIZE: (f64, f64) = (800.0, 600.0);

type Shared = Rc<RefCell<Option<GraphContext>>>;

/// Graph state plus the 2D context it draws into.
struct GraphContext {
	state: ForceGraphState,
	theme: Theme,
	ctx: CanvasRenderingContext2d,
	/// Window resize listener, removed with the context.
	_resize: Option<WindowListener>,
}

/// A `window` event listener that is removed on drop.
struct WindowListener {
	window: Window,
	event: &'static str,
	callback: Closure<dyn FnMut()>,
}

impl WindowListener {
	fn install(window: &Window, event: &'static str, callback: Closure<dyn FnMut()>) -> Option<Self> {
		match window.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref()) {
			Ok(()) => Some(Self {
				window: window.clone(),
				event,
				callback,
			}),
			Err(err) => {
				warn!("rhizome: failed to listen for {event}: {err:?}");
				None
			}
		}
	}
}

impl Drop for WindowListener {
	fn drop(&mut self) {
		let _ = self
			.window
			.remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
	}
}

/// The `requestAnimationFrame` callback and the id of the pending request.
/// Dropping it cancels the pending frame.
#[derive(Default)]
struct FrameLoop {
	callback: Option<Closure<dyn FnMut()>>,
	pending: Option<i32>,
}

impl FrameLoop {
	/// Schedules one frame unless one is already pending.
	fn wake(&mut self) {
		if self.pending.is_some() {
			return;
		}
		let (Some(window), Some(callback)) = (web_sys::window(), self.callback.as_ref()) else {
			return;
		};
		match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
			Ok(id) => self.pending = Some(id),
			Err(err) => warn!("rhizome: requestAnimationFrame failed: {err:?}"),
		}
	}
}

impl Drop for FrameLoop {
	fn drop(&mut self) {
		if let (Some(id), Some(window)) = (self.pending.take(), web_sys::window()) {
			let _ = window.cancel_animation_frame(id);
		}
	}
}

fn viewport_size(window: &Window) -> Option<(f64, f64)> {
	let width = window.inner_width().ok()?.as_f64()?;
	let height = window.inner_height().ok()?.as_f64()?;
	Some((width, height))
}

fn canvas_size(canvas: &HtmlCanvasElement, fullscreen: bool, width: Option<f64>, height: Option<f64>) -> (f64, f64) {
	if fullscreen {
		return web_sys::window()
			.as_ref()
			.and_then(viewport_size)
			.unwrap_or(FALLBACK_SIZE);
	}
	let parent = canvas.parent_element();
	(
		width.unwrap_or_else(|| {
			parent
				.as_ref()
				.map(|p| p.client_width() as f64)
				.filter(|w| *w > 0.0)
				.unwrap_or(FALLBACK_SIZE.0)
		}),
		height.unwrap_or_else(|| {
			parent
				.as_ref()
				.map(|p| p.client_height() as f64)
				.filter(|h| *h > 0.0)
				.unwrap_or(FALLBACK_SIZE.1)
		}),
	)
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok()??.dyn_into().ok()
}

/// Canvas-relative pointer position.
fn pointer(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((ev.client_x() as f64 - rect.left(), ev.client_y() as f64 - rect.top()))
}

fn set_cursor(canvas_ref: NodeRef<leptos::html::Canvas>, cursor: &str) {
	if let Some(canvas) = canvas_ref.get_untracked() {
		let canvas: HtmlCanvasElement = canvas.into();
		let _ = web_sys::HtmlElement::style(&canvas).set_property("cursor", cursor);
	}
}

fn build_context(
	canvas: &HtmlCanvasElement,
	shared: &Shared,
	frames: &Rc<RefCell<FrameLoop>>,
	layout: StabilizerConfig,
	theme: Theme,
	(fullscreen, width, height): (bool, Option<f64>, Option<f64>),
) -> Option<GraphContext> {
	let (w, h) = canvas_size(canvas, fullscreen, width, height);
	canvas.set_width(w as u32);
	canvas.set_height(h as u32);

	let Some(ctx) = context_2d(canvas) else {
		warn!("rhizome: canvas 2d context unavailable");
		return None;
	};

	let resize = if fullscreen {
		web_sys::window().and_then(|window| {
			let (shared, frames, canvas) = (Rc::downgrade(shared), Rc::downgrade(frames), canvas.clone());
			let on_resize = Closure::<dyn FnMut()>::new(move || {
				let (Some(shared), Some((nw, nh))) =
					(shared.upgrade(), web_sys::window().as_ref().and_then(viewport_size))
				else {
					return;
				};
				canvas.set_width(nw as u32);
				canvas.set_height(nh as u32);
				if let Some(c) = shared.borrow_mut().as_mut() {
					c.state.resize(nw, nh);
				}
				if let Some(frames) = frames.upgrade() {
					frames.borrow_mut().wake();
				}
			});
			WindowListener::install(&window, "resize", on_resize)
		})
	} else {
		None
	};

	Some(GraphContext {
		state: ForceGraphState::new(layout, &theme.particles, w, h),
		theme,
		ctx,
		_resize: resize,
	})
}

/// Installs the frame callback. It holds only weak references, so dropping
/// the component drops the stabilizer along with any pending deadline.
fn install_frame_callback(shared: &Shared, frames: &Rc<RefCell<FrameLoop>>) {
	let (weak_shared, weak_frames): (Weak<_>, Weak<_>) = (Rc::downgrade(shared), Rc::downgrade(frames));
	let callback = Closure::<dyn FnMut()>::new(move || {
		let (Some(shared), Some(frames)) = (weak_shared.upgrade(), weak_frames.upgrade()) else {
			return;
		};
		frames.borrow_mut().pending = None;

		let again = match shared.borrow_mut().as_mut() {
			Some(c) => {
				let again = c.state.tick(js_sys::Date::now());
				render::render(&c.state, &c.ctx, &c.theme);
				again
			}
			None => false,
		};
		if again {
			frames.borrow_mut().wake();
		}
	});
	frames.borrow_mut().callback = Some(callback);
}

/// Renders the note graph on a canvas and reports node clicks.
///
/// `on_node_click` receives the clicked note, or `None` when the node's note
/// is no longer in `notes`. Clicks on the background are ignored. The canvas
/// sizes itself to its parent unless `fullscreen` or explicit `width`/`height`
/// are given.
#[component]
pub fn ForceGraphCanvas(
	/// Notes to draw. Any change re-derives the graph.
	#[prop(into)]
	notes: Signal<Vec<Note>>,
	/// Called with the clicked node's note.
	#[prop(into)]
	on_node_click: Callback<Option<Note>>,
	/// Which link encodings become edges.
	#[prop(default = LinkMode::Structured)]
	link_mode: LinkMode,
	/// Node weight constants.
	#[prop(default = ProjectorConfig::default())]
	projector: ProjectorConfig,
	/// Layout phase timings.
	#[prop(default = StabilizerConfig::default())]
	layout: StabilizerConfig,
	/// Colors and styles.
	#[prop(optional)]
	theme: Theme,
	/// Fill the window and follow its size.
	#[prop(default = false)]
	fullscreen: bool,
	/// Fixed width in CSS pixels.
	#[prop(default = None)]
	width: Option<f64>,
	/// Fixed height in CSS pixels.
	#[prop(default = None)]
	height: Option<f64>,
	/// Lets the pointer pin nodes in place. Off by default: a click only reads.
	#[prop(default = false)]
	allow_drag: bool,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let shared: Shared = Rc::new(RefCell::new(None));
	let frames = Rc::new(RefCell::new(FrameLoop::default()));
	install_frame_callback(&shared, &frames);

	let (shared_load, frames_load) = (shared.clone(), frames.clone());
	Effect::new(move |_| {
		let notes = notes.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();

		let mut slot = shared_load.borrow_mut();
		if slot.is_none() {
			*slot = build_context(
				&canvas,
				&shared_load,
				&frames_load,
				layout,
				theme.clone(),
				(fullscreen, width, height),
			);
		}
		let Some(c) = slot.as_mut() else {
			return;
		};

		let data = derive(&notes, link_mode, &projector);
		if c.state.load(data, js_sys::Date::now()) {
			debug!("rhizome: graph view reloaded");
		}
		drop(slot);
		frames_load.borrow_mut().wake();
	});

	let (shared_md, frames_md) = (shared.clone(), frames.clone());
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(c) = shared_md.borrow_mut().as_mut() {
			c.state.press(x, y, allow_drag);
		}
		frames_md.borrow_mut().wake();
	};

	let (shared_mm, frames_mm) = (shared.clone(), frames.clone());
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let (redraw, over_node) = match shared_mm.borrow_mut().as_mut() {
			Some(c) => (c.state.move_pointer(x, y), c.state.hover.hovered().is_some()),
			None => return,
		};
		set_cursor(canvas_ref, if over_node { "pointer" } else { "grab" });
		if redraw {
			frames_mm.borrow_mut().wake();
		}
	};

	let (shared_mu, frames_mu) = (shared.clone(), frames.clone());
	let on_mouseup = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let clicked = match shared_mu.borrow_mut().as_mut() {
			Some(c) => c.state.release(x, y).map(|id| {
				notes.with_untracked(|notes| c.state.layout.data().note_for(&id, notes).cloned())
			}),
			None => None,
		};
		frames_mu.borrow_mut().wake();
		if let Some(note) = clicked {
			debug!("rhizome: node click resolved to {:?}", note.as_ref().map(|n| &n.id));
			on_node_click.run(note);
		}
	};

	let (shared_ml, frames_ml) = (shared.clone(), frames.clone());
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(c) = shared_ml.borrow_mut().as_mut() {
			c.state.leave();
		}
		frames_ml.borrow_mut().wake();
	};

	let (shared_wh, frames_wh) = (shared, frames);
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(c) = shared_wh.borrow_mut().as_mut() {
			c.state.zoom(x, y, ev.delta_y());
		}
		frames_wh.borrow_mut().wake();
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
