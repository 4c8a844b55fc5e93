//! # Octree Physics
//!
//! Broad-phase collision and rigid-body core for a 3D scene.
//!
//! ## Features
//!
//! - **Octree broad phase**: Lazily split, merge-on-removal spatial index
//!   over sphere and box bounding regions
//! - **Rigid bodies**: Semi-implicit Euler integration with debounced
//!   elastic collision response
//! - **Ray picking**: Slab and sphere broad phase confirmed on triangle meshes
//! - **Deferred mutation**: Spawns and deletions are applied at fixed points
//!   of the frame
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use octree_physics::prelude::*;
//!
//! fn main() -> Result<(), SceneError> {
//!     let mut scene = PhysicsScene::new(PhysicsConfig::default());
//!     let ball = BoundingRegion::sphere(Vec3::zeros(), 0.5)?;
//!     scene.register_model(Model::new("ball", ball, 64))?;
//!
//!     scene.generate_instance("ball", Vec3::repeat(1.0), 1.0, Vec3::zeros(), Vec3::zeros())?;
//!
//!     let mut debug = DebugDrawSystem::new();
//!     let report = scene.new_frame(1.0 / 60.0, &mut debug);
//!     println!("{} bodies resident", report.resident);
//!
//!     if let Some(hit) = scene.pick(&Ray::new(Vec3::new(0.0, 0.0, -10.0), Vec3::z())) {
//!         scene.mark_for_deletion(&hit.instance_id);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod debug;
pub mod foundation;
pub mod physics;
pub mod scene;
pub mod spatial;

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        config::{Config, PhysicsConfig},
        debug::DebugDrawSystem,
        foundation::math::{Mat3, Mat4, Transform, Vec3},
        physics::{
            BodyHandle, BoundKind, BoundingRegion, CollisionMesh, Lifecycle, Ray, RigidBody,
        },
        scene::{FrameReport, Model, PhysicsScene, PickHit, SceneError},
        spatial::{Octree, OctreeConfig, UpdateReport},
    };
}
