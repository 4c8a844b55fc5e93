//! Rays for picking and removal queries

use crate::foundation::math::Vec3;
use crate::physics::rigid_body::RigidBody;
use super::bounds::BoundingRegion;
use super::mesh::CollisionMesh;
use super::primitives::Aabb;

/// A parametric line `origin + t * direction`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// Unit direction of the ray
    pub direction: Vec3,
    /// Component-wise reciprocal of `direction`; infinite on axes the ray is parallel to
    pub inv_dir: Vec3,
}

impl Ray {
    /// Creates a new ray; the direction is normalized
    ///
    /// A zero direction produces a ray that hits nothing.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        let direction = direction.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);
        Self {
            origin,
            direction,
            inv_dir: direction.map(|d| 1.0 / d),
        }
    }

    fn is_degenerate(&self) -> bool {
        self.direction == Vec3::zeros()
    }

    /// Slab test against a box
    ///
    /// Returns the entry and exit parameters. `tmin` is negative when the
    /// origin is inside the box. Boxes entirely behind the origin miss.
    pub fn intersects_aabb(&self, bounds: &Aabb) -> Option<(f32, f32)> {
        if self.is_degenerate() {
            return None;
        }

        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;

        for axis in 0..3 {
            if self.direction[axis] == 0.0 {
                // Parallel to this slab: inside it or never
                if self.origin[axis] < bounds.min[axis] || self.origin[axis] > bounds.max[axis] {
                    return None;
                }
                continue;
            }

            let t1 = (bounds.min[axis] - self.origin[axis]) * self.inv_dir[axis];
            let t2 = (bounds.max[axis] - self.origin[axis]) * self.inv_dir[axis];
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
        }

        if tmax < tmin || tmax < 0.0 {
            None
        } else {
            Some((tmin, tmax))
        }
    }

    /// Broad-phase test against a bounding region
    ///
    /// Boxes use the slab method; spheres are solved analytically. Returns
    /// `(tmin, tmax)`; regions behind the origin are not hits.
    pub fn intersects_bounding_region(&self, region: &BoundingRegion) -> Option<(f32, f32)> {
        match *region {
            BoundingRegion::Box { min, max, .. } => self.intersects_aabb(&Aabb::new(min, max)),
            BoundingRegion::Sphere { center, radius, .. } => {
                if self.is_degenerate() {
                    return None;
                }

                // |origin + t*direction - center|^2 = radius^2 with a unit direction
                let oc = self.origin - center;
                let b = oc.dot(&self.direction);
                let c = oc.magnitude_squared() - radius * radius;
                let discriminant = b * b - c;
                if discriminant < 0.0 {
                    return None;
                }

                let root = discriminant.sqrt();
                let (tmin, tmax) = (-b - root, -b + root);
                (tmax >= 0.0).then_some((tmin, tmax))
            }
        }
    }

    /// Narrow-phase test against a collision mesh posed by `body`
    ///
    /// Returns the smallest positive `t` over all triangles.
    pub fn intersects_mesh(&self, mesh: &CollisionMesh, body: &RigidBody) -> Option<f32> {
        if self.is_degenerate() {
            return None;
        }

        let model_matrix = body.model_matrix();
        mesh.world_triangles(model_matrix)
            .filter_map(|triangle| triangle.intersect_ray(&self.origin, &self.direction))
            .min_by(f32::total_cmp)
    }
}
