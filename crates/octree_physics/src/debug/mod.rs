//! Debug visualization collaborators
//!
//! The octree and scene push shapes here; a renderer (or a log dump) reads
//! them back. Nothing in here affects simulation results.

pub mod draw;

pub use draw::{DebugDrawSystem, DebugShape, DebugShapeId};
