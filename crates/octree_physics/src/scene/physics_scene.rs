//! Physics scene: the single owner of models, bodies and the octree
//!
//! All structural changes go through the scene. Spawns are queued and
//! placed at the start of the next frame; deletions are marked at any time
//! and swept at the start of the next frame. Between those two points the
//! tree is only read.

use std::collections::HashMap;

use crate::config::PhysicsConfig;
use crate::debug::DebugDrawSystem;
use crate::foundation::math::{Mat3, Mat4, Transform, Vec3};
use crate::physics::collision::{Aabb, BoundsError, Ray};
use crate::physics::{BodyArena, BodyHandle, Lifecycle, PhysicsError, RigidBody};
use crate::spatial::{Octree, UpdateReport};
use super::instance_id::IdAllocator;
use super::model::Model;

/// Errors raised by scene operations
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// No model is registered under the id
    #[error("unknown model '{0}'")]
    UnknownModel(String),

    /// A model with the same id is already registered
    #[error("model '{0}' is already registered")]
    DuplicateModel(String),

    /// The posed bounding region would not fit inside the world extent
    #[error("instance of '{model_id}' at {position:?} does not fit inside the world")]
    OutOfWorld {
        /// Model the instance was spawned from
        model_id: String,
        /// Requested world position
        position: Vec3,
    },

    /// Mesh data without a single vertex
    #[error("model '{0}' has no vertices")]
    EmptyMesh(String),

    /// Invalid bounding region
    #[error(transparent)]
    Bounds(#[from] BoundsError),

    /// Invalid rigid-body parameters
    #[error(transparent)]
    Physics(#[from] PhysicsError),
}

/// Summary of one [`PhysicsScene::new_frame`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Frame number, starting at 1
    pub frame: u64,
    /// Dead instances swept before the frame ran
    pub removed: usize,
    /// Pending bodies placed into the octree
    pub placed: usize,
    /// Pending bodies moved outside the world before placement; marked dead
    /// and swept next frame
    pub rejected: Vec<BodyHandle>,
    /// What the octree update did
    pub update: UpdateReport,
    /// Entries resident in the octree after the frame
    pub resident: usize,
}

/// Nearest instance under a ray
#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    /// Handle of the hit body
    pub handle: BodyHandle,
    /// Instance id of the hit body
    pub instance_id: String,
    /// Model the hit body was generated from
    pub model_id: String,
    /// Distance along the ray to the confirmed hit
    pub t: f32,
}

/// Scene-level owner of every model, rigid body and the octree
#[derive(Debug)]
pub struct PhysicsScene {
    config: PhysicsConfig,
    models: HashMap<String, Model>,
    bodies: BodyArena,
    registry: HashMap<String, BodyHandle>,
    ids: IdAllocator,
    octree: Octree,
    frame: u64,
}

impl PhysicsScene {
    /// Create an empty scene whose world is the cube `[-h, h]^3`
    pub fn new(config: PhysicsConfig) -> Self {
        let half = config.world_half_extent;
        let world = Aabb::new(Vec3::repeat(-half), Vec3::repeat(half));
        log::info!("Creating physics scene with world half extent {}", half);

        Self {
            octree: Octree::new(world, config.octree.clone()),
            config,
            models: HashMap::new(),
            bodies: BodyArena::with_key(),
            registry: HashMap::new(),
            ids: IdAllocator::new(),
            frame: 0,
        }
    }

    /// Configuration the scene was built with
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// The broad-phase tree, read-only
    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// The rigid-body arena, read-only
    pub fn bodies(&self) -> &BodyArena {
        &self.bodies
    }

    /// Body behind a handle, if it is still alive or awaiting removal
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// Mutable access for applying forces and impulses
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    /// Handle registered under an instance id
    pub fn handle_of(&self, instance_id: &str) -> Option<BodyHandle> {
        self.registry.get(instance_id).copied()
    }

    /// Registered model by id
    pub fn model(&self, model_id: &str) -> Option<&Model> {
        self.models.get(model_id)
    }

    /// Number of bodies alive or awaiting removal
    pub fn instance_count(&self) -> usize {
        self.bodies.len()
    }

    /// Frames run so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Register a model; its id must be unique
    pub fn register_model(&mut self, model: Model) -> Result<(), SceneError> {
        if self.models.contains_key(model.id()) {
            return Err(SceneError::DuplicateModel(model.id().to_string()));
        }

        log::debug!("Registered model '{}'", model.id());
        self.models.insert(model.id().to_string(), model);
        Ok(())
    }

    /// Spawn an instance of a model
    ///
    /// The body is queued for the octree and becomes visible to collisions
    /// and picking at the next [`PhysicsScene::new_frame`]. Returns
    /// `Ok(None)` when the model's instance capacity is exhausted.
    pub fn generate_instance(
        &mut self,
        model_id: &str,
        size: Vec3,
        mass: f32,
        position: Vec3,
        rotation: Vec3,
    ) -> Result<Option<BodyHandle>, SceneError> {
        let model = self
            .models
            .get_mut(model_id)
            .ok_or_else(|| SceneError::UnknownModel(model_id.to_string()))?;

        if model.is_full() {
            log::debug!("Model '{}' is at its {} instance limit", model_id, model.max_instances());
            return Ok(None);
        }

        let mut posed = *model.bounding_region();
        posed.update_from_transform(&Transform::new(position, rotation, size));
        if !self.octree.bounds().contains_aabb(&posed.enclosing_box()) {
            return Err(SceneError::OutOfWorld {
                model_id: model_id.to_string(),
                position,
            });
        }

        let instance_id = self.ids.next_id();
        let Some(handle) = model.generate_instance(&mut self.bodies, instance_id.clone(), size, mass, position, rotation)?
        else {
            return Ok(None);
        };

        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_collision_cooldown(self.config.collision_cooldown);
            body.apply_acceleration(self.config.gravity);
        }
        self.octree.add_to_pending(handle, *model.bounding_region());
        self.registry.insert(instance_id.clone(), handle);

        log::debug!("Spawned '{}' instance {} at {:?}", model_id, instance_id, position);
        Ok(Some(handle))
    }

    /// Flag an instance for removal at the next sweep
    ///
    /// Returns false for unknown ids and for instances already marked.
    pub fn mark_for_deletion(&mut self, instance_id: &str) -> bool {
        let Some(body) = self.registry.get(instance_id).and_then(|h| self.bodies.get_mut(*h)) else {
            log::debug!("Ignoring deletion of unknown instance {}", instance_id);
            return false;
        };
        if body.is_dead() {
            return false;
        }

        body.set_lifecycle(Lifecycle::Dead);
        true
    }

    /// Remove every dead instance from the tree, its model, the id registry
    /// and the arena
    pub fn clear_dead_instances(&mut self) -> usize {
        let dead: Vec<BodyHandle> = self
            .bodies
            .iter()
            .filter(|(_, body)| body.is_dead())
            .map(|(handle, _)| handle)
            .collect();

        for &handle in &dead {
            self.octree.remove(handle);
            if let Some(body) = self.bodies.remove(handle) {
                if let Some(model) = self.models.get_mut(body.model_id()) {
                    model.remove_instance(handle);
                }
                self.registry.remove(body.instance_id());
            }
        }

        if !dead.is_empty() {
            log::debug!("Cleared {} dead instances", dead.len());
        }
        dead.len()
    }

    /// Run one frame: sweep dead instances, place pending bodies, then
    /// advance and collide everything in the octree
    ///
    /// Every step always runs. Pending bodies that no longer fit the world
    /// and bodies that leave it are marked dead and swept next frame.
    pub fn new_frame(&mut self, dt: f32, debug: &mut DebugDrawSystem) -> FrameReport {
        debug.update(dt);
        self.frame += 1;

        let removed = self.clear_dead_instances();
        let pending = self.octree.process_pending(&mut self.bodies);
        let update = self.octree.update(&mut self.bodies, dt, debug);

        for &handle in &update.escaped {
            if let Some(body) = self.bodies.get_mut(handle) {
                log::info!("Instance {} left the world", body.instance_id());
                body.set_lifecycle(Lifecycle::Dead);
            }
        }

        let report = FrameReport {
            frame: self.frame,
            removed,
            placed: pending.placed,
            rejected: pending.rejected,
            update,
            resident: self.octree.entry_count(),
        };
        log::trace!("Frame report: {:?}", report);
        report
    }

    /// Nearest instance hit by the ray
    ///
    /// Octree candidates are visited nearest region first. Models with a
    /// collision mesh must confirm the hit on their triangles; the search
    /// stops once no remaining region can beat the best confirmed hit.
    pub fn pick(&self, ray: &Ray) -> Option<PickHit> {
        let mut best: Option<(f32, BodyHandle)> = None;

        for candidate in self.octree.ray_candidates(ray) {
            if matches!(best, Some((t, _)) if candidate.t > t) {
                break;
            }
            let Some(body) = self.bodies.get(candidate.handle) else {
                continue;
            };
            if body.is_dead() {
                continue;
            }

            let mesh = self.models.get(body.model_id()).and_then(Model::collision_mesh);
            let hit_t = match mesh {
                Some(mesh) => ray.intersects_mesh(mesh, body),
                None => Some(candidate.t),
            };
            let Some(t) = hit_t else {
                continue;
            };

            let nearer = match best {
                None => true,
                Some((best_t, best_handle)) => t < best_t || (t == best_t && candidate.handle < best_handle),
            };
            if nearer {
                best = Some((t, candidate.handle));
            }
        }

        let (t, handle) = best?;
        let body = self.bodies.get(handle)?;
        Some(PickHit {
            handle,
            instance_id: body.instance_id().to_string(),
            model_id: body.model_id().to_string(),
            t,
        })
    }

    /// Pick the nearest instance and mark it for deletion
    pub fn delete_picked(&mut self, ray: &Ray) -> Option<PickHit> {
        let hit = self.pick(ray)?;
        self.mark_for_deletion(&hit.instance_id);
        Some(hit)
    }

    /// Model and normal matrices of a model's live instances, for rendering
    pub fn instance_transforms(&self, model_id: &str) -> Vec<(Mat4, Mat3)> {
        let Some(model) = self.models.get(model_id) else {
            return Vec::new();
        };

        model
            .instances()
            .iter()
            .filter_map(|handle| self.bodies.get(*handle))
            .filter(|body| !body.is_dead())
            .map(|body| (*body.model_matrix(), *body.normal_matrix()))
            .collect()
    }

    /// Release the tree and every instance; models stay registered
    pub fn cleanup(&mut self) {
        log::info!("Cleaning up physics scene ({} instances)", self.bodies.len());
        self.octree.destroy();
        self.bodies.clear();
        self.registry.clear();
        for model in self.models.values_mut() {
            model.clear_instances();
        }
    }
}
