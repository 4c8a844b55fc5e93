//! Physics module for bounding volumes, rays and rigid bodies
//!
//! Provides the broad-phase bounding regions, the picking ray, and the
//! rigid-body model the octree advances every frame.

pub mod collision;
pub mod rigid_body;

pub use collision::{Aabb, BoundKind, BoundingRegion, BoundsError, CollisionMesh, Ray, Triangle};
pub use rigid_body::{BodyArena, BodyHandle, Lifecycle, PhysicsError, RigidBody, COLLISION_THRESHOLD};
