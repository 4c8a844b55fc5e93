//! Rigid body kinematics and collision response
//!
//! A [`RigidBody`] is one physical instance of a model. It integrates its own
//! motion with semi-implicit Euler steps and resolves contacts with an
//! elastic reflection that is debounced per collision partner.

use crate::foundation::math::{reflect, Mat3, Mat4, Transform, Vec3};
use slotmap::SlotMap;

/// Default minimum number of seconds between two resolutions of a contact
/// with the same partner
pub const COLLISION_THRESHOLD: f32 = 0.05;

slotmap::new_key_type! {
    /// Stable arena slot of a rigid body
    ///
    /// The octree, the pending queue and the scene registry all refer to
    /// bodies through this handle; none of them own the body.
    pub struct BodyHandle;
}

/// Arena owning every rigid body of a scene
pub type BodyArena = SlotMap<BodyHandle, RigidBody>;

/// Errors raised when creating a rigid body
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// Mass was zero, negative, or not finite
    #[error("rigid body mass must be finite and positive, got {0}")]
    InvalidMass(f32),
}

/// Where a body is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
    /// Spawned but not yet placed in the octree
    #[default]
    Pending,
    /// Resident in the octree and simulated
    Active,
    /// Marked for deletion; removed at the next batch point
    Dead,
}

/// A physical instance of a model
#[derive(Debug, Clone)]
pub struct RigidBody {
    instance_id: String,
    model_id: String,

    /// Position in world space
    pub position: Vec3,
    /// Velocity in world units per second
    pub velocity: Vec3,
    /// Accumulated acceleration
    pub acceleration: Vec3,
    /// Euler angles in radians
    pub rotation: Vec3,
    /// Non-uniform scale
    pub size: Vec3,

    mass: f32,
    lifecycle: Lifecycle,
    moved: bool,
    dynamic: bool,

    collision_cooldown: f32,
    last_collision_time: f32,
    last_collision_partner: Option<String>,

    model_matrix: Mat4,
    normal_matrix: Mat3,
}

impl RigidBody {
    /// Create a body at rest
    ///
    /// The instance id starts empty; the owning scene assigns it on spawn.
    pub fn new(
        model_id: impl Into<String>,
        size: Vec3,
        mass: f32,
        position: Vec3,
        rotation: Vec3,
    ) -> Result<Self, PhysicsError> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(PhysicsError::InvalidMass(mass));
        }

        let mut body = Self {
            instance_id: String::new(),
            model_id: model_id.into(),
            position,
            velocity: Vec3::zeros(),
            acceleration: Vec3::zeros(),
            rotation,
            size,
            mass,
            lifecycle: Lifecycle::Pending,
            moved: false,
            dynamic: true,
            collision_cooldown: COLLISION_THRESHOLD,
            last_collision_time: COLLISION_THRESHOLD,
            last_collision_partner: None,
            model_matrix: Mat4::identity(),
            normal_matrix: Mat3::identity(),
        };
        body.update(0.0);
        Ok(body)
    }

    /// Set the unique instance id
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    /// Set the contact debounce window; the first contact is always resolved
    pub fn with_collision_cooldown(mut self, cooldown: f32) -> Self {
        self.set_collision_cooldown(cooldown);
        self
    }

    /// Replace the contact debounce window and re-arm the first contact
    pub fn set_collision_cooldown(&mut self, cooldown: f32) {
        self.collision_cooldown = cooldown;
        self.last_collision_time = cooldown;
    }

    /// Mark whether the body is integrated each frame
    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Unique id assigned by the scene
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Model this instance renders
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Mass, always positive
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Lifecycle state
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    /// True once marked for deletion
    pub fn is_dead(&self) -> bool {
        self.lifecycle == Lifecycle::Dead
    }

    /// Whether the last step changed the position
    pub fn moved(&self) -> bool {
        self.moved
    }

    /// Whether the body is integrated each frame
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Seconds since the last resolved contact
    pub fn last_collision_time(&self) -> f32 {
        self.last_collision_time
    }

    /// Id of the last contact partner
    pub fn last_collision_partner(&self) -> Option<&str> {
        self.last_collision_partner.as_deref()
    }

    /// Current position, rotation and size as a transform
    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.rotation, self.size)
    }

    /// Model matrix from the last integration step
    pub fn model_matrix(&self) -> &Mat4 {
        &self.model_matrix
    }

    /// Normal matrix from the last integration step
    pub fn normal_matrix(&self) -> &Mat3 {
        &self.normal_matrix
    }

    /// Advance by `dt` seconds with a semi-implicit Euler step
    pub fn update(&mut self, dt: f32) {
        let displacement = self.velocity * dt + self.acceleration * (0.5 * dt * dt);
        self.position += displacement;
        self.velocity += self.acceleration * dt;
        self.moved = displacement != Vec3::zeros();

        self.refresh_matrices();
        self.last_collision_time += dt;
    }

    /// Let time pass without integrating (static bodies)
    pub fn hold(&mut self, dt: f32) {
        self.moved = false;
        self.refresh_matrices();
        self.last_collision_time += dt;
    }

    fn refresh_matrices(&mut self) {
        let transform = self.transform();
        self.model_matrix = transform.to_matrix();
        self.normal_matrix = transform.normal_matrix();
    }

    /// Apply a force; accumulates into the acceleration
    pub fn apply_force(&mut self, force: Vec3) {
        self.acceleration += force / self.mass;
    }

    /// Apply a force given as direction and magnitude
    pub fn apply_force_along(&mut self, direction: Vec3, magnitude: f32) {
        self.apply_force(direction * magnitude);
    }

    /// Add to the acceleration without dividing by mass
    pub fn apply_acceleration(&mut self, acceleration: Vec3) {
        self.acceleration += acceleration;
    }

    /// Add an acceleration given as direction and magnitude
    pub fn apply_acceleration_along(&mut self, direction: Vec3, magnitude: f32) {
        self.apply_acceleration(direction * magnitude);
    }

    /// Instantaneous velocity change from a force applied over `dt`
    pub fn apply_impulse(&mut self, force: Vec3, dt: f32) {
        self.velocity += force / self.mass * dt;
    }

    /// Impulse given as direction and magnitude
    pub fn apply_impulse_along(&mut self, direction: Vec3, magnitude: f32, dt: f32) {
        self.apply_impulse(direction * magnitude, dt);
    }

    /// Convert a kinetic energy delta into a velocity change along `direction`
    ///
    /// From `KE = 1/2 m v^2`; positive joules push along `direction`,
    /// negative joules push against it. Only the orientation of `direction`
    /// is used: it is normalized first, so its length never scales the
    /// change, and a zero direction leaves the velocity untouched.
    pub fn transfer_energy(&mut self, joules: f32, direction: Vec3) {
        if joules == 0.0 {
            return;
        }
        let Some(direction) = direction.try_normalize(f32::EPSILON) else {
            return;
        };

        let speed = (2.0 * joules.abs() / self.mass).sqrt();
        let delta_v = direction * speed;
        if joules > 0.0 {
            self.velocity += delta_v;
        } else {
            self.velocity -= delta_v;
        }
    }

    /// Elastic response against `other_id` across `normal`
    ///
    /// The velocity is reflected only when the cooldown has elapsed or the
    /// partner differs from the last one. Returns whether it was reflected.
    pub fn handle_collision(&mut self, other_id: &str, normal: &Vec3) -> bool {
        let Some(normal) = normal.try_normalize(f32::EPSILON) else {
            return false;
        };

        let new_partner = self.last_collision_partner.as_deref() != Some(other_id);
        let resolved = self.last_collision_time >= self.collision_cooldown || new_partner;
        if resolved {
            self.velocity = reflect(&self.velocity, &normal);
            self.last_collision_time = 0.0;
        }

        if new_partner {
            self.last_collision_partner = Some(other_id.to_string());
        }
        resolved
    }
}

impl PartialEq for RigidBody {
    fn eq(&self, other: &Self) -> bool {
        self.instance_id == other.instance_id
    }
}

impl Eq for RigidBody {}

impl PartialEq<str> for RigidBody {
    fn eq(&self, other: &str) -> bool {
        self.instance_id == other
    }
}

impl PartialEq<&str> for RigidBody {
    fn eq(&self, other: &&str) -> bool {
        self.instance_id == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn body() -> RigidBody {
        RigidBody::new("sphere", Vec3::repeat(1.0), 2.0, Vec3::zeros(), Vec3::zeros())
            .unwrap()
            .with_instance_id("aaaaaaab")
    }

    #[test]
    fn test_rejects_invalid_mass() {
        for mass in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let result = RigidBody::new("m", Vec3::repeat(1.0), mass, Vec3::zeros(), Vec3::zeros());
            assert!(matches!(result, Err(PhysicsError::InvalidMass(_))));
        }
    }

    #[test]
    fn test_update_integrates_acceleration() {
        let mut rb = body();
        rb.velocity = Vec3::new(1.0, 0.0, 0.0);
        rb.apply_acceleration(Vec3::new(0.0, -2.0, 0.0));
        rb.update(0.5);

        assert_relative_eq!(rb.position, Vec3::new(0.5, -0.25, 0.0), epsilon = 1e-6);
        assert_relative_eq!(rb.velocity, Vec3::new(1.0, -1.0, 0.0), epsilon = 1e-6);
        assert!(rb.moved());
        assert_relative_eq!(rb.model_matrix()[(1, 3)], -0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_force_divides_by_mass_acceleration_does_not() {
        let mut rb = body();
        rb.apply_force(Vec3::new(4.0, 0.0, 0.0));
        assert_relative_eq!(rb.acceleration, Vec3::new(2.0, 0.0, 0.0));
        rb.apply_acceleration_along(Vec3::y(), 3.0);
        assert_relative_eq!(rb.acceleration, Vec3::new(2.0, 3.0, 0.0));
        rb.apply_force_along(Vec3::z(), 2.0);
        assert_relative_eq!(rb.acceleration, Vec3::new(2.0, 3.0, 1.0));
    }

    #[test]
    fn test_impulse_changes_velocity_once() {
        let mut rb = body();
        rb.apply_impulse_along(Vec3::x(), 10.0, 0.1);
        assert_relative_eq!(rb.velocity, Vec3::new(0.5, 0.0, 0.0), epsilon = 1e-6);
        assert_eq!(rb.acceleration, Vec3::zeros());

        rb.update(1.0);
        rb.update(1.0);
        assert_relative_eq!(rb.velocity, Vec3::new(0.5, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_energy_transfer_sign() {
        let mut rb = body();
        rb.velocity = Vec3::new(5.0, 0.0, 0.0);

        rb.transfer_energy(0.0, Vec3::x());
        assert_eq!(rb.velocity, Vec3::new(5.0, 0.0, 0.0));

        // mass 2, 9 J -> 3 m/s
        rb.transfer_energy(9.0, Vec3::x());
        assert_relative_eq!(rb.velocity.x, 8.0, epsilon = 1e-5);

        rb.transfer_energy(-9.0, Vec3::x());
        assert_relative_eq!(rb.velocity.x, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_energy_transfer_ignores_direction_length() {
        let mut rb = body();
        rb.transfer_energy(9.0, Vec3::new(0.0, 10.0, 0.0));
        assert_relative_eq!(rb.velocity, Vec3::new(0.0, 3.0, 0.0), epsilon = 1e-5);

        rb.transfer_energy(9.0, Vec3::zeros());
        assert_relative_eq!(rb.velocity, Vec3::new(0.0, 3.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_collision_reflects_about_normal() {
        let mut rb = body();
        rb.velocity = Vec3::new(1.0, -2.0, 0.0);
        assert!(rb.handle_collision("other", &Vec3::new(0.0, 5.0, 0.0)));
        assert_relative_eq!(rb.velocity, Vec3::new(1.0, 2.0, 0.0), epsilon = 1e-6);
        assert_eq!(rb.last_collision_partner(), Some("other"));
        assert_eq!(rb.last_collision_time(), 0.0);
    }

    #[test]
    fn test_collision_debounced_for_same_partner() {
        let mut rb = body().with_collision_cooldown(1.0);
        rb.velocity = Vec3::new(0.0, -1.0, 0.0);

        assert!(rb.handle_collision("b", &Vec3::y()));
        rb.update(0.25);
        assert!(!rb.handle_collision("b", &Vec3::y()));
        assert_relative_eq!(rb.velocity.y, 1.0);

        // A different partner is resolved immediately
        assert!(rb.handle_collision("c", &Vec3::y()));
        assert_relative_eq!(rb.velocity.y, -1.0);

        // And the cooldown expiring lets the same partner through again
        rb.update(1.0);
        assert!(rb.handle_collision("c", &Vec3::y()));
    }

    #[test]
    fn test_degenerate_normal_is_ignored() {
        let mut rb = body();
        rb.velocity = Vec3::x();
        assert!(!rb.handle_collision("other", &Vec3::zeros()));
        assert_eq!(rb.velocity, Vec3::x());
    }

    #[test]
    fn test_identity_is_instance_id() {
        let a = body();
        let mut b = body();
        b.position = Vec3::new(9.0, 9.0, 9.0);
        assert_eq!(a, b);
        assert!(a == "aaaaaaab");
        assert!(a != body().with_instance_id("aaaaaaac"));
    }

    #[test]
    fn test_hold_only_advances_cooldown() {
        let mut rb = body().with_dynamic(false);
        rb.velocity = Vec3::x();
        rb.hold(0.5);
        assert_eq!(rb.position, Vec3::zeros());
        assert!(!rb.moved());
        assert!(!rb.is_dynamic());
        assert_relative_eq!(rb.last_collision_time(), COLLISION_THRESHOLD + 0.5);
    }

    proptest! {
        #[test]
        fn constant_velocity_round_trip(
            vx in -50.0f32..50.0,
            vy in -50.0f32..50.0,
            vz in -50.0f32..50.0,
            dt in 0.001f32..0.1,
            steps in 1usize..200,
        ) {
            let mut rb = body();
            let velocity = Vec3::new(vx, vy, vz);
            rb.velocity = velocity;
            for _ in 0..steps {
                rb.update(dt);
            }
            let expected = velocity * dt * steps as f32;
            prop_assert!((rb.position - expected).amax() <= 1e-3 * (1.0 + expected.amax()));
            prop_assert_eq!(rb.velocity, velocity);
        }
    }
}
