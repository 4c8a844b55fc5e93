//! Geometric collision primitives
//!
//! # Module Organization
//!
//! - [`primitives`] - Axis-aligned boxes and triangles
//! - [`bounds`] - Sphere/box bounding regions used by the broad phase
//! - [`mesh`] - Model-space triangle meshes for the narrow phase
//! - [`ray`] - Rays with slab, sphere and Möller-Trumbore tests

pub mod primitives;
pub mod bounds;
pub mod mesh;
pub mod ray;

// Re-export commonly used types
pub use primitives::{Aabb, Triangle};
pub use bounds::{BoundKind, BoundingRegion, BoundsError};
pub use mesh::CollisionMesh;
pub use ray::Ray;
