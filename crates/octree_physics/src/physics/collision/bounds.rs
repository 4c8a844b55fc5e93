//! Bounding regions for broad-phase tests
//!
//! A [`BoundingRegion`] is either a sphere or an axis-aligned box. Both kinds
//! remember the model-space shape they were created from so that they can be
//! re-derived from the owning body's transform every frame without drift.

use crate::foundation::math::{Transform, Vec3};
use super::primitives::Aabb;

/// Errors raised when constructing a bounding region
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    /// Box corners are inverted on at least one axis
    #[error("box min {min:?} exceeds max {max:?}")]
    InvertedBox {
        /// Offending minimum corner
        min: Vec3,
        /// Offending maximum corner
        max: Vec3,
    },

    /// Sphere radius is negative
    #[error("sphere radius {0} is negative")]
    NegativeRadius(f32),

    /// A coordinate or radius is NaN or infinite
    #[error("bounding region has non-finite components")]
    NonFinite,
}

/// The two supported region shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundKind {
    /// Center and radius
    Sphere,
    /// Axis-aligned min/max corners
    Box,
}

/// A volumetric bound around one instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundingRegion {
    /// Spherical bound
    Sphere {
        /// Current world-space center
        center: Vec3,
        /// Current world-space radius
        radius: f32,
        /// Model-space center the region was created with
        original_center: Vec3,
        /// Model-space radius the region was created with
        original_radius: f32,
    },
    /// Axis-aligned box bound
    Box {
        /// Current world-space minimum corner
        min: Vec3,
        /// Current world-space maximum corner
        max: Vec3,
        /// Model-space minimum corner
        original_min: Vec3,
        /// Model-space maximum corner
        original_max: Vec3,
    },
}

impl BoundingRegion {
    /// Create a sphere region
    pub fn sphere(center: Vec3, radius: f32) -> Result<Self, BoundsError> {
        if !radius.is_finite() || center.iter().any(|c| !c.is_finite()) {
            return Err(BoundsError::NonFinite);
        }
        if radius < 0.0 {
            return Err(BoundsError::NegativeRadius(radius));
        }
        Ok(Self::Sphere {
            center,
            radius,
            original_center: center,
            original_radius: radius,
        })
    }

    /// Create a box region; inverted corners are rejected, never swapped
    pub fn aabb(min: Vec3, max: Vec3) -> Result<Self, BoundsError> {
        if min.iter().chain(max.iter()).any(|c| !c.is_finite()) {
            return Err(BoundsError::NonFinite);
        }
        if min.x > max.x || min.y > max.y || min.z > max.z {
            return Err(BoundsError::InvertedBox { min, max });
        }
        Ok(Self::Box {
            min,
            max,
            original_min: min,
            original_max: max,
        })
    }

    /// Shape of this region
    pub fn kind(&self) -> BoundKind {
        match self {
            Self::Sphere { .. } => BoundKind::Sphere,
            Self::Box { .. } => BoundKind::Box,
        }
    }

    /// Current world-space center
    pub fn center(&self) -> Vec3 {
        match self {
            Self::Sphere { center, .. } => *center,
            Self::Box { min, max, .. } => (min + max) * 0.5,
        }
    }

    /// Smallest axis-aligned box enclosing the region
    pub fn enclosing_box(&self) -> Aabb {
        match *self {
            Self::Sphere { center, radius, .. } => {
                Aabb::from_center_extents(center, Vec3::repeat(radius))
            }
            Self::Box { min, max, .. } => Aabb::new(min, max),
        }
    }

    /// Point containment (boundary counts as inside)
    pub fn contains(&self, point: Vec3) -> bool {
        match *self {
            Self::Sphere { center, radius, .. } => {
                (point - center).magnitude_squared() <= radius * radius
            }
            Self::Box { min, max, .. } => Aabb::new(min, max).contains_point(point),
        }
    }

    /// Overlap test between two regions of any kind
    pub fn intersects(&self, other: &BoundingRegion) -> bool {
        match (*self, *other) {
            (
                Self::Sphere { center: a, radius: ra, .. },
                Self::Sphere { center: b, radius: rb, .. },
            ) => {
                let radius_sum = ra + rb;
                (a - b).magnitude_squared() <= radius_sum * radius_sum
            }
            (Self::Sphere { center, radius, .. }, Self::Box { min, max, .. })
            | (Self::Box { min, max, .. }, Self::Sphere { center, radius, .. }) => {
                let closest = Aabb::new(min, max).closest_point(center);
                (closest - center).magnitude_squared() <= radius * radius
            }
            (Self::Box { min: a_min, max: a_max, .. }, Self::Box { min: b_min, max: b_max, .. }) => {
                Aabb::new(a_min, a_max).intersects(&Aabb::new(b_min, b_max))
            }
        }
    }

    /// Unit normal pointing from this region toward `other`
    ///
    /// Returns `None` when the direction is degenerate (coincident centers).
    pub fn contact_normal(&self, other: &BoundingRegion) -> Option<Vec3> {
        let direction = match (*self, *other) {
            (Self::Sphere { center, .. }, Self::Box { min, max, .. }) => {
                let closest = Aabb::new(min, max).closest_point(center);
                if closest == center {
                    other.center() - center
                } else {
                    closest - center
                }
            }
            (Self::Box { .. }, Self::Sphere { .. }) => -other.contact_normal(self)?,
            (Self::Box { min: a_min, max: a_max, .. }, Self::Box { min: b_min, max: b_max, .. }) => {
                // Axis of least penetration
                let overlap = a_max.zip_map(&b_max, f32::min) - a_min.zip_map(&b_min, f32::max);
                let axis = overlap.imin();
                let offset = other.center()[axis] - self.center()[axis];
                let mut normal = Vec3::zeros();
                normal[axis] = if offset < 0.0 { -1.0 } else { 1.0 };
                normal
            }
            (Self::Sphere { .. }, Self::Sphere { .. }) => other.center() - self.center(),
        };
        direction.try_normalize(f32::EPSILON)
    }

    /// Re-derive the world-space region from the owner's transform
    ///
    /// Spheres move their center through the full transform and scale the
    /// radius by the largest scale component; rotation does not change the
    /// radius. Boxes become the axis-aligned bound of the transformed
    /// model-space box, so rotation widens them.
    pub fn update_from_transform(&mut self, transform: &Transform) {
        match self {
            Self::Sphere { center, radius, original_center, original_radius } => {
                *center = transform.transform_point(original_center);
                *radius = *original_radius * transform.scale.abs().max();
            }
            Self::Box { min, max, original_min, original_max } => {
                let moved = Aabb::new(*original_min, *original_max).transformed(&transform.to_matrix());
                *min = moved.min;
                *max = moved.max;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_4;

    fn unit_sphere() -> BoundingRegion {
        BoundingRegion::sphere(Vec3::zeros(), 1.0).unwrap()
    }

    #[test]
    fn test_sphere_box_separation_and_overlap() {
        let sphere = unit_sphere();
        let far_box = BoundingRegion::aabb(Vec3::new(2.0, 2.0, 2.0), Vec3::new(3.0, 3.0, 3.0)).unwrap();
        assert!(!sphere.intersects(&far_box));
        assert!(!far_box.intersects(&sphere));

        let near_box = BoundingRegion::aabb(Vec3::new(0.5, 0.5, 0.5), Vec3::new(3.0, 3.0, 3.0)).unwrap();
        assert!(sphere.intersects(&near_box));
        assert!(near_box.intersects(&sphere));
    }

    #[test]
    fn test_mixed_kinds_are_not_approximated() {
        // The box's enclosing sphere would reach the unit sphere, the box itself does not
        let sphere = unit_sphere();
        let corner_box = BoundingRegion::aabb(Vec3::new(0.8, 0.8, 0.8), Vec3::new(2.0, 2.0, 2.0)).unwrap();
        assert!(sphere.enclosing_box().intersects(&corner_box.enclosing_box()));
        assert!(!sphere.intersects(&corner_box));
    }

    #[test]
    fn test_sphere_sphere() {
        let a = unit_sphere();
        let touching = BoundingRegion::sphere(Vec3::new(2.0, 0.0, 0.0), 1.0).unwrap();
        let apart = BoundingRegion::sphere(Vec3::new(2.1, 0.0, 0.0), 1.0).unwrap();
        assert!(a.intersects(&touching));
        assert!(!a.intersects(&apart));
    }

    #[test]
    fn test_contains_point() {
        let sphere = unit_sphere();
        assert!(sphere.contains(Vec3::new(0.0, 1.0, 0.0)));
        assert!(!sphere.contains(Vec3::new(0.8, 0.8, 0.0)));

        let cube = BoundingRegion::aabb(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)).unwrap();
        assert!(cube.contains(Vec3::new(0.8, 0.8, 0.0)));
        assert!(!cube.contains(Vec3::new(1.1, 0.5, 0.5)));
    }

    #[test]
    fn test_construction_rejects_bad_input() {
        assert!(matches!(
            BoundingRegion::aabb(Vec3::new(1.0, 0.0, 0.0), Vec3::zeros()),
            Err(BoundsError::InvertedBox { .. })
        ));
        assert_eq!(
            BoundingRegion::sphere(Vec3::zeros(), -1.0),
            Err(BoundsError::NegativeRadius(-1.0))
        );
        assert_eq!(
            BoundingRegion::sphere(Vec3::new(f32::NAN, 0.0, 0.0), 1.0),
            Err(BoundsError::NonFinite)
        );
        // Degenerate (flat) boxes are allowed
        assert!(BoundingRegion::aabb(Vec3::zeros(), Vec3::new(1.0, 0.0, 1.0)).is_ok());
    }

    #[test]
    fn test_sphere_follows_transform() {
        let mut region = BoundingRegion::sphere(Vec3::new(1.0, 0.0, 0.0), 0.5).unwrap();
        let transform = Transform::new(
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2),
            Vec3::new(2.0, 3.0, 1.0),
        );
        region.update_from_transform(&transform);

        match region {
            BoundingRegion::Sphere { center, radius, original_radius, .. } => {
                assert_relative_eq!(center, Vec3::new(10.0, 2.0, 0.0), epsilon = 1e-5);
                assert_relative_eq!(radius, 1.5);
                assert_relative_eq!(original_radius, 0.5);
            }
            BoundingRegion::Box { .. } => panic!("kind changed"),
        }

        // Re-deriving from identity restores the original shape
        region.update_from_transform(&Transform::identity());
        assert_relative_eq!(region.center(), Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_box_rotation_widens_extents() {
        let mut region = BoundingRegion::aabb(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0)).unwrap();
        let transform = Transform::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, 0.0, FRAC_PI_4), Vec3::repeat(1.0));
        region.update_from_transform(&transform);

        let bounds = region.enclosing_box();
        assert_relative_eq!(bounds.max.x, 2.0_f32.sqrt(), epsilon = 1e-5);
        assert_relative_eq!(bounds.max.y, 5.0 + 2.0_f32.sqrt(), epsilon = 1e-5);
        assert_relative_eq!(bounds.max.z, 1.0, epsilon = 1e-5);
        assert_eq!(region.kind(), BoundKind::Box);
    }

    #[test]
    fn test_contact_normals() {
        let a = unit_sphere();
        let b = BoundingRegion::sphere(Vec3::new(1.5, 0.0, 0.0), 1.0).unwrap();
        assert_relative_eq!(a.contact_normal(&b).unwrap(), Vec3::x(), epsilon = 1e-6);
        assert_relative_eq!(b.contact_normal(&a).unwrap(), -Vec3::x(), epsilon = 1e-6);

        let floor = BoundingRegion::aabb(Vec3::new(-5.0, -2.0, -5.0), Vec3::new(5.0, -0.5, 5.0)).unwrap();
        assert_relative_eq!(a.contact_normal(&floor).unwrap(), -Vec3::y(), epsilon = 1e-6);
        assert_relative_eq!(floor.contact_normal(&a).unwrap(), Vec3::y(), epsilon = 1e-6);

        let left = BoundingRegion::aabb(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)).unwrap();
        let right = BoundingRegion::aabb(Vec3::new(0.9, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0)).unwrap();
        assert_eq!(left.contact_normal(&right), Some(Vec3::x()));

        assert_eq!(a.contact_normal(&a), None);
    }
}
