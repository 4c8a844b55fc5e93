//! Models: instance templates shared by many rigid bodies
//!
//! A model owns the model-space bounding region and collision mesh of a
//! shape and caps how many live instances of it may exist at once. The
//! bodies themselves live in the scene's arena; the model only tracks their
//! handles.

use crate::foundation::math::Vec3;
use crate::physics::collision::{Aabb, BoundKind, BoundingRegion, CollisionMesh};
use crate::physics::{BodyArena, BodyHandle, PhysicsError, RigidBody};
use super::SceneError;

/// Template that rigid-body instances are generated from
#[derive(Debug, Clone)]
pub struct Model {
    id: String,
    max_instances: usize,
    region: BoundingRegion,
    mesh: Option<CollisionMesh>,
    dynamic: bool,
    instances: Vec<BodyHandle>,
}

impl Model {
    /// Model with an explicit model-space region and no collision mesh
    pub fn new(id: impl Into<String>, region: BoundingRegion, max_instances: usize) -> Self {
        Self {
            id: id.into(),
            max_instances,
            region,
            mesh: None,
            dynamic: true,
            instances: Vec::new(),
        }
    }

    /// Model built from mesh data
    ///
    /// The region is centered on the midpoint of the vertex bounds. A sphere
    /// reaches the farthest vertex; a box is the vertex bounds themselves.
    pub fn from_mesh(
        id: impl Into<String>,
        vertices: &[Vec3],
        indices: &[u32],
        max_instances: usize,
        kind: BoundKind,
    ) -> Result<Self, SceneError> {
        let id = id.into();
        let Some(bounds) = Aabb::from_points(vertices) else {
            return Err(SceneError::EmptyMesh(id));
        };

        let region = match kind {
            BoundKind::Box => BoundingRegion::aabb(bounds.min, bounds.max)?,
            BoundKind::Sphere => {
                let center = bounds.center();
                let radius = vertices
                    .iter()
                    .map(|v| (v - center).magnitude())
                    .fold(0.0f32, f32::max);
                BoundingRegion::sphere(center, radius)?
            }
        };

        let mesh = CollisionMesh::from_vertices(vertices, indices);
        log::debug!(
            "Built model '{}' ({} triangles, {:?} bound, {} instances max)",
            id,
            mesh.triangle_count(),
            kind,
            max_instances
        );

        Ok(Self {
            mesh: Some(mesh),
            ..Self::new(id, region, max_instances)
        })
    }

    /// Mark whether instances are integrated each frame
    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Unique model id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Instance capacity
    pub fn max_instances(&self) -> usize {
        self.max_instances
    }

    /// Model-space bounding region every instance is posed from
    pub fn bounding_region(&self) -> &BoundingRegion {
        &self.region
    }

    /// Exact geometry for narrow-phase ray tests, if any
    pub fn collision_mesh(&self) -> Option<&CollisionMesh> {
        self.mesh.as_ref()
    }

    /// Whether instances are integrated each frame
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Handles of the live instances
    pub fn instances(&self) -> &[BodyHandle] {
        &self.instances
    }

    /// Number of instances holding a slot, dead ones included until swept
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// True when no further instance can be generated
    pub fn is_full(&self) -> bool {
        self.instances.len() >= self.max_instances
    }

    /// Create a body of this model in `bodies`
    ///
    /// Returns `Ok(None)` when the instance capacity is exhausted.
    pub fn generate_instance(
        &mut self,
        bodies: &mut BodyArena,
        instance_id: String,
        size: Vec3,
        mass: f32,
        position: Vec3,
        rotation: Vec3,
    ) -> Result<Option<BodyHandle>, PhysicsError> {
        if self.is_full() {
            return Ok(None);
        }

        let body = RigidBody::new(self.id.clone(), size, mass, position, rotation)?
            .with_instance_id(instance_id)
            .with_dynamic(self.dynamic);
        let handle = bodies.insert(body);
        self.instances.push(handle);
        Ok(Some(handle))
    }

    /// Release an instance slot; false if the handle is not an instance
    pub fn remove_instance(&mut self, handle: BodyHandle) -> bool {
        match self.instances.iter().position(|h| *h == handle) {
            Some(index) => {
                self.instances.remove(index);
                true
            }
            None => false,
        }
    }

    /// Forget every instance handle
    pub(crate) fn clear_instances(&mut self) {
        self.instances.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tetrahedron() -> (Vec<Vec3>, Vec<u32>) {
        let vertices = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
        ];
        (vertices, vec![0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3])
    }

    #[test]
    fn test_sphere_region_from_vertices() {
        let (vertices, indices) = tetrahedron();
        let model = Model::from_mesh("tetra", &vertices, &indices, 4, BoundKind::Sphere).unwrap();

        assert_eq!(model.bounding_region().center(), Vec3::repeat(1.0));
        match *model.bounding_region() {
            BoundingRegion::Sphere { radius, .. } => assert_relative_eq!(radius, 3.0f32.sqrt()),
            other => panic!("expected a sphere, got {:?}", other),
        }
        assert_eq!(model.collision_mesh().unwrap().triangle_count(), 4);
    }

    #[test]
    fn test_box_region_from_vertices() {
        let (vertices, indices) = tetrahedron();
        let model = Model::from_mesh("tetra", &vertices, &indices, 4, BoundKind::Box).unwrap();
        assert_eq!(model.bounding_region().enclosing_box(), Aabb::new(Vec3::zeros(), Vec3::repeat(2.0)));
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        let result = Model::from_mesh("nothing", &[], &[], 4, BoundKind::Sphere);
        assert!(matches!(result, Err(SceneError::EmptyMesh(id)) if id == "nothing"));
    }

    #[test]
    fn test_capacity_and_release() {
        let mut bodies = BodyArena::with_key();
        let region = BoundingRegion::sphere(Vec3::zeros(), 1.0).unwrap();
        let mut model = Model::new("ball", region, 2).with_dynamic(false);

        let spawn = |model: &mut Model, bodies: &mut BodyArena, id: &str| {
            model.generate_instance(bodies, id.to_string(), Vec3::repeat(1.0), 1.0, Vec3::zeros(), Vec3::zeros())
        };
        let first = spawn(&mut model, &mut bodies, "a").unwrap().unwrap();
        assert!(spawn(&mut model, &mut bodies, "b").unwrap().is_some());
        assert!(spawn(&mut model, &mut bodies, "c").unwrap().is_none());
        assert!(model.is_full());
        assert_eq!(bodies.len(), 2);
        assert!(!bodies[first].is_dynamic());
        assert_eq!(bodies[first].model_id(), "ball");

        assert!(model.remove_instance(first));
        assert!(!model.remove_instance(first));
        assert!(spawn(&mut model, &mut bodies, "d").unwrap().is_some());
    }

    #[test]
    fn test_invalid_mass_is_an_error() {
        let mut bodies = BodyArena::with_key();
        let region = BoundingRegion::sphere(Vec3::zeros(), 1.0).unwrap();
        let mut model = Model::new("ball", region, 2);
        let result = model.generate_instance(&mut bodies, "a".into(), Vec3::repeat(1.0), 0.0, Vec3::zeros(), Vec3::zeros());
        assert_eq!(result, Err(PhysicsError::InvalidMass(0.0)));
        assert_eq!(model.instance_count(), 0);
    }
}
