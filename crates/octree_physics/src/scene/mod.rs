//! Scene integration
//!
//! Owns the models, the rigid-body arena and the octree root, and drives
//! them once per frame:
//!
//! ```text
//! spawn / mark dead  (any time)
//!      ↓
//! new_frame: sweep dead → place pending → advance, re-sort, collide
//!      ↓
//! instance_transforms (renderer) / pick (input)
//! ```

mod instance_id;
mod model;
mod physics_scene;

pub use instance_id::IdAllocator;
pub use model::Model;
pub use physics_scene::{FrameReport, PhysicsScene, PickHit, SceneError};
