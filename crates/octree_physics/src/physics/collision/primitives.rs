//! Primitive collision shapes and intersection algorithms
//!
//! Provides the axis-aligned box used for node extents and the triangle used
//! for exact mesh tests.

use crate::foundation::math::{component_max, component_min, Mat4, Point3, Vec3};

/// Axis-Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given half-extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest AABB enclosing all the given points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = *points.next()?;
        Some(points.fold(Self::new(first, first), |bounds, p| Self {
            min: component_min(&bounds.min, p),
            max: component_max(&bounds.max, p),
        }))
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Full edge lengths
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// The eight corners, in octant order (bit 0 = x, bit 1 = y, bit 2 = z)
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|octant| {
            Vec3::new(
                if octant & 1 != 0 { self.max.x } else { self.min.x },
                if octant & 2 != 0 { self.max.y } else { self.min.y },
                if octant & 4 != 0 { self.max.z } else { self.min.z },
            )
        })
    }

    /// Axis-aligned bound of this box after an affine transform
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let corners = self
            .corners()
            .map(|corner| matrix.transform_point(&Point3::from(corner)).coords);
        // Eight corners always yield a box
        Self::from_points(corners.iter()).unwrap_or(*self)
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if another AABB lies entirely within this one
    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        other.min.x >= self.min.x && other.max.x <= self.max.x &&
        other.min.y >= self.min.y && other.max.y <= self.max.y &&
        other.min.z >= self.min.z && other.max.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Point of this box closest to `point`
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        Vec3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        )
    }

    /// One of the eight octants of this box
    pub fn octant(&self, index: usize) -> Self {
        let center = self.center();
        let quarter_extents = self.extents() * 0.5;
        let sign = |bit: usize| if index & bit != 0 { 1.0 } else { -1.0 };

        let child_center = Vec3::new(
            center.x + quarter_extents.x * sign(1),
            center.y + quarter_extents.y * sign(2),
            center.z + quarter_extents.z * sign(4),
        );
        Self::from_center_extents(child_center, quarter_extents)
    }
}

/// A triangle for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Triangle with every vertex run through `matrix`
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let apply = |v: &Vec3| matrix.transform_point(&Point3::from(*v)).coords;
        Self::new(apply(&self.v0), apply(&self.v1), apply(&self.v2))
    }

    /// Möller-Trumbore ray-triangle intersection algorithm
    ///
    /// Returns the parametric distance `t` along `direction` when the ray
    /// hits the triangle in front of its origin.
    /// See: "Fast, Minimum Storage Ray/Triangle Intersection" by Möller & Trumbore
    pub fn intersect_ray(&self, origin: &Vec3, direction: &Vec3) -> Option<f32> {
        const EPSILON: f32 = 0.000001;

        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = direction.cross(&edge2);
        let a = edge1.dot(&h);

        // Ray parallel to triangle?
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = origin - self.v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        (t > EPSILON).then_some(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_contains_aabb() {
        let outer = unit_box();
        let inner = Aabb::new(Vec3::new(-0.5, -0.5, -0.5), Vec3::new(0.5, 1.0, 0.5));
        let straddling = Aabb::new(Vec3::new(0.5, 0.5, 0.5), Vec3::new(1.5, 1.0, 1.0));

        assert!(outer.contains_aabb(&inner));
        assert!(outer.contains_aabb(&outer));
        assert!(!outer.contains_aabb(&straddling));
        assert!(outer.intersects(&straddling));
    }

    #[test]
    fn test_octants_tile_parent() {
        let parent = unit_box();
        let mut volume = 0.0;
        for index in 0..8 {
            let child = parent.octant(index);
            assert!(parent.contains_aabb(&child));
            let size = child.size();
            volume += size.x * size.y * size.z;
        }
        assert_relative_eq!(volume, 8.0);

        // Octant 7 is the +X +Y +Z corner
        assert_eq!(parent.octant(7).min, Vec3::zeros());
        assert_eq!(parent.octant(0).max, Vec3::zeros());
    }

    #[test]
    fn test_transformed_box_grows_under_rotation() {
        let rotation = Mat4::from_euler_angles(0.0, 0.0, std::f32::consts::FRAC_PI_4);
        let rotated = unit_box().transformed(&rotation);
        let half_diagonal = 2.0_f32.sqrt();
        assert_relative_eq!(rotated.max.x, half_diagonal, epsilon = 1e-5);
        assert_relative_eq!(rotated.max.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_ray_hits_triangle() {
        let triangle = Triangle::new(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let hit = triangle.intersect_ray(&Vec3::new(0.0, 0.0, -5.0), &Vec3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(hit.unwrap(), 5.0);

        // Pointing away
        assert!(triangle
            .intersect_ray(&Vec3::new(0.0, 0.0, -5.0), &Vec3::new(0.0, 0.0, -1.0))
            .is_none());
        // Outside the triangle
        assert!(triangle
            .intersect_ray(&Vec3::new(3.0, 0.0, -5.0), &Vec3::new(0.0, 0.0, 1.0))
            .is_none());
    }
}
