//! Debug drawing primitives and system
//!
//! Shapes are either temporary, expiring after a duration in seconds, or
//! persistent under an id until cleared. A temporary shape with a zero
//! duration lives until the next [`DebugDrawSystem::update`].

use crate::foundation::math::{Vec3, Vec4};
use crate::physics::collision::Aabb;
use std::collections::HashMap;

/// Unique identifier for persistent debug shapes
pub type DebugShapeId = String;

/// Debug shape primitives that can be rendered for visualization
#[derive(Clone, Debug, PartialEq)]
pub enum DebugShape {
    /// Line segment from start to end
    Line {
        /// First endpoint
        start: Vec3,
        /// Second endpoint
        end: Vec3,
        /// RGBA color
        color: Vec4,
        /// Seconds left to live
        duration: f32,
    },

    /// Wireframe sphere at center with radius
    Sphere {
        /// World-space center
        center: Vec3,
        /// Sphere radius
        radius: f32,
        /// RGBA color
        color: Vec4,
        /// Seconds left to live
        duration: f32,
    },

    /// Wireframe axis-aligned box at center with half-extents
    Box {
        /// World-space center
        center: Vec3,
        /// Half-extents along each axis
        extents: Vec3,
        /// RGBA color
        color: Vec4,
        /// Seconds left to live
        duration: f32,
    },
}

impl DebugShape {
    /// Decrease duration by delta_time, returns true if expired
    pub fn tick(&mut self, delta_time: f32) -> bool {
        match self {
            DebugShape::Line { duration, .. }
            | DebugShape::Sphere { duration, .. }
            | DebugShape::Box { duration, .. } => {
                *duration -= delta_time;
                *duration <= 0.0
            }
        }
    }
}

/// Debug drawing system collecting shapes for visualization
#[derive(Debug, Clone)]
pub struct DebugDrawSystem {
    temporary_shapes: Vec<DebugShape>,
    persistent_shapes: HashMap<DebugShapeId, DebugShape>,

    /// Master enable/disable flag
    pub enabled: bool,
}

impl DebugDrawSystem {
    /// Create an enabled debug draw system
    pub fn new() -> Self {
        Self {
            temporary_shapes: Vec::new(),
            persistent_shapes: HashMap::new(),
            enabled: true,
        }
    }

    /// Create a system that drops every shape
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Draw a line segment (temporary)
    pub fn draw_line(&mut self, start: Vec3, end: Vec3, color: Vec4, duration: f32) {
        if !self.enabled {
            return;
        }

        self.temporary_shapes.push(DebugShape::Line { start, end, color, duration });
    }

    /// Draw a sphere (temporary)
    pub fn draw_sphere(&mut self, center: Vec3, radius: f32, color: Vec4, duration: f32) {
        if !self.enabled {
            return;
        }

        self.temporary_shapes.push(DebugShape::Sphere { center, radius, color, duration });
    }

    /// Draw a box (temporary)
    pub fn draw_box(&mut self, center: Vec3, extents: Vec3, color: Vec4, duration: f32) {
        if !self.enabled {
            return;
        }

        self.temporary_shapes.push(DebugShape::Box { center, extents, color, duration });
    }

    /// Draw the outline of an axis-aligned box (temporary)
    pub fn draw_aabb(&mut self, bounds: &Aabb, color: Vec4, duration: f32) {
        self.draw_box(bounds.center(), bounds.extents(), color, duration);
    }

    /// Draw a persistent shape that remains until explicitly removed
    pub fn draw_persistent(&mut self, id: impl Into<String>, shape: DebugShape) {
        if !self.enabled {
            return;
        }

        self.persistent_shapes.insert(id.into(), shape);
    }

    /// Remove a persistent shape
    pub fn clear_persistent(&mut self, id: &str) {
        self.persistent_shapes.remove(id);
    }

    /// Update shape lifetimes and remove expired temporary shapes
    pub fn update(&mut self, delta_time: f32) {
        self.temporary_shapes.retain_mut(|shape| !shape.tick(delta_time));
    }

    /// All shapes for rendering (both temporary and persistent)
    pub fn shapes(&self) -> impl Iterator<Item = &DebugShape> {
        self.temporary_shapes.iter().chain(self.persistent_shapes.values())
    }

    /// Number of active shapes
    pub fn shape_count(&self) -> usize {
        self.temporary_shapes.len() + self.persistent_shapes.len()
    }

    /// Clear all shapes (temporary and persistent)
    pub fn clear(&mut self) {
        self.temporary_shapes.clear();
        self.persistent_shapes.clear();
    }
}

impl Default for DebugDrawSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> Vec4 {
        Vec4::new(1.0, 0.0, 0.0, 1.0)
    }

    #[test]
    fn test_temporary_shape_expiration() {
        let mut system = DebugDrawSystem::new();
        system.draw_sphere(Vec3::zeros(), 1.0, red(), 1.0);
        assert_eq!(system.shape_count(), 1);

        system.update(0.5);
        assert_eq!(system.shape_count(), 1);

        system.update(0.6);
        assert_eq!(system.shape_count(), 0);
    }

    #[test]
    fn test_zero_duration_lasts_one_frame() {
        let mut system = DebugDrawSystem::new();
        system.draw_aabb(&Aabb::new(Vec3::zeros(), Vec3::repeat(2.0)), red(), 0.0);

        match system.shapes().next() {
            Some(DebugShape::Box { center, extents, .. }) => {
                assert_eq!(*center, Vec3::repeat(1.0));
                assert_eq!(*extents, Vec3::repeat(1.0));
            }
            other => panic!("expected a box, got {:?}", other),
        }

        system.update(1.0 / 60.0);
        assert_eq!(system.shape_count(), 0);
    }

    #[test]
    fn test_persistent_shapes() {
        let mut system = DebugDrawSystem::new();
        system.draw_persistent(
            "pick",
            DebugShape::Line {
                start: Vec3::zeros(),
                end: Vec3::x(),
                color: red(),
                duration: f32::INFINITY,
            },
        );

        for _ in 0..100 {
            system.update(1.0);
        }
        assert_eq!(system.shape_count(), 1);

        system.clear_persistent("pick");
        assert_eq!(system.shape_count(), 0);
    }

    #[test]
    fn test_disabled_system_drops_shapes() {
        let mut system = DebugDrawSystem::disabled();
        system.draw_line(Vec3::zeros(), Vec3::x(), red(), 1.0);
        assert_eq!(system.shape_count(), 0);
    }
}
