//! Math utilities and types
//!
//! Provides the fundamental math types shared by the bounding volumes,
//! rigid bodies and the octree.

pub use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type (debug colors)
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Transform representing position, Euler rotation, and non-uniform scale
///
/// Rotation is stored as Euler angles in radians (`x` = roll, `y` = pitch,
/// `z` = yaw) and applied in `Z * Y * X` order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Euler angles in radians
    pub rotation: Vec3,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform from all three components
    pub fn new(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Rotation part as a matrix (`Rz * Ry * Rx`)
    pub fn rotation_matrix(&self) -> Rotation3<f32> {
        Rotation3::from_euler_angles(self.rotation.x, self.rotation.y, self.rotation.z)
    }

    /// Convert to a transformation matrix (`T * R * S`)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation_matrix().to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Inverse-transpose of the upper 3x3 of the model matrix
    ///
    /// Falls back to identity when the scale is degenerate.
    pub fn normal_matrix(&self) -> Mat3 {
        let upper: Mat3 = self.to_matrix().fixed_view::<3, 3>(0, 0).into_owned();
        upper
            .try_inverse()
            .map_or_else(Mat3::identity, |inverse| inverse.transpose())
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: &Vec3) -> Vec3 {
        self.to_matrix()
            .transform_point(&Point3::from(*point))
            .coords
    }
}

/// Component-wise minimum of two vectors
pub fn component_min(a: &Vec3, b: &Vec3) -> Vec3 {
    a.zip_map(b, f32::min)
}

/// Component-wise maximum of two vectors
pub fn component_max(a: &Vec3, b: &Vec3) -> Vec3 {
    a.zip_map(b, f32::max)
}

/// Reflect `v` about the plane with unit normal `n`
pub fn reflect(v: &Vec3, n: &Vec3) -> Vec3 {
    v - n * (2.0 * v.dot(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_identity_matrix() {
        assert_relative_eq!(Transform::identity().to_matrix(), Mat4::identity(), epsilon = EPSILON);
    }

    #[test]
    fn test_trs_order() {
        // Scale then rotate 90 degrees about Z then translate
        let transform = Transform::new(
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, FRAC_PI_2),
            Vec3::new(2.0, 1.0, 1.0),
        );
        let moved = transform.transform_point(&Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(moved, Vec3::new(10.0, 2.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_normal_matrix_undoes_nonuniform_scale() {
        let transform = Transform::new(Vec3::zeros(), Vec3::zeros(), Vec3::new(2.0, 4.0, 1.0));
        let normal = transform.normal_matrix();
        assert_relative_eq!(normal, Mat3::from_diagonal(&Vec3::new(0.5, 0.25, 1.0)), epsilon = EPSILON);
    }

    #[test]
    fn test_normal_matrix_degenerate_scale() {
        let transform = Transform::new(Vec3::zeros(), Vec3::zeros(), Vec3::zeros());
        assert_eq!(transform.normal_matrix(), Mat3::identity());
    }

    #[test]
    fn test_reflect() {
        let reflected = reflect(&Vec3::new(1.0, -1.0, 0.0), &Vec3::y());
        assert_relative_eq!(reflected, Vec3::new(1.0, 1.0, 0.0), epsilon = EPSILON);
    }
}
