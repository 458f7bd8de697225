//! UI components.

pub mod force_graph;
pub mod note_panel;
