//! Spatial partitioning data structures
//!
//! The octree is the broad phase for contacts and ray picking.

mod octree;

pub use octree::{
    Octree, OctreeConfig, OctreeEntry, OctreeError, OctreeNode, PendingReport, RayHit, UpdateReport,
};
