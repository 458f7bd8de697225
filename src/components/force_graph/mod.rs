//! Canvas view of the note graph.
//!
//! Renders the stabilized layout with pan, zoom and hover highlighting, and
//! maps node clicks back to the clicked note.
//!
//! # Example
//!
//! ```ignore
//! use rhizome_graph::components::force_graph::ForceGraphCanvas;
//!
//! let (notes, _) = signal(vec![Note::new("1", "A").with_related(["2"]), Note::new("2", "B")]);
//! let on_click = Callback::new(|note: Option<Note>| log::info!("clicked {note:?}"));
//!
//! view! { <ForceGraphCanvas notes=notes on_node_click=on_click fullscreen=true /> }
//! ```

mod component;
mod particles;
mod render;
pub mod scale;
mod state;
pub mod theme;

pub use component::ForceGraphCanvas;
pub use state::ForceGraphState;
pub use theme::Theme;
