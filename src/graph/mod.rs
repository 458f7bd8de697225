//! Note graph projection and layout stabilization.
//!
//! - [`projector`]: notes + adjacency -> [`GraphData`], with fingerprints
//! - [`stabilizer`]: Seeding -> Settling -> Frozen state machine
//! - [`engine`]: the force simulation behind the [`ForceEngine`] trait

pub mod engine;
pub mod projector;
pub mod stabilizer;
mod types;

pub use engine::{ForceEngine, ForceGraphEngine, LayoutParams, NodeInfo, Point};
pub use projector::{Projection, ProjectorConfig, derive, project, project_with};
pub use stabilizer::{Phase, Stabilizer, StabilizerConfig};
pub use types::{ColorClass, GraphData, GraphEdge, GraphNode};
