//! Collision mesh representations
//!
//! Meshes are stored in model space and only transformed into world space
//! while a narrow-phase test runs.

use crate::foundation::math::{Mat4, Vec3};
use super::primitives::{Aabb, Triangle};

/// A triangle mesh stored in MODEL SPACE (local coordinates)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionMesh {
    /// Triangles in model space, never modified after construction
    pub triangles: Vec<Triangle>,
}

impl CollisionMesh {
    /// Build a mesh from model-space vertices and a triangle index list
    ///
    /// Trailing indices that do not form a full triangle and indices that
    /// point past the vertex list are skipped.
    pub fn from_vertices(vertices: &[Vec3], indices: &[u32]) -> Self {
        let mut triangles = Vec::with_capacity(indices.len() / 3);
        let mut skipped = 0usize;

        for chunk in indices.chunks_exact(3) {
            let corner = |i: u32| vertices.get(i as usize).copied();
            match (corner(chunk[0]), corner(chunk[1]), corner(chunk[2])) {
                (Some(v0), Some(v1), Some(v2)) => triangles.push(Triangle::new(v0, v1, v2)),
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            log::warn!("Skipped {} collision triangles with out-of-range indices", skipped);
        }

        Self { triangles }
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Model-space bounds of all triangle vertices
    pub fn local_bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.triangles.iter().flat_map(|t| [&t.v0, &t.v1, &t.v2]))
    }

    /// Iterate the triangles moved into world space by `model_matrix`
    pub fn world_triangles<'a>(&'a self, model_matrix: &'a Mat4) -> impl Iterator<Item = Triangle> + 'a {
        self.triangles.iter().map(move |triangle| triangle.transformed(model_matrix))
    }
}
