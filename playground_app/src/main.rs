//! Headless octree demo
//!
//! Drives the physics scene the way a game loop would:
//! - Registers a dynamic cube model and a static crate model
//! - Spawns bodies with random positions and velocities
//! - Runs fixed-step frames, respawning to keep the population up
//! - Casts a random picking ray every half second and deletes the hit
//!
//! Pass a `.toml` or `.ron` file to override the physics configuration.

use octree_physics::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Simulation settings
const FRAME_DT: f32 = 1.0 / 60.0;
const NUM_FRAMES: u64 = 600;
const PICK_EVERY: u64 = 30;
const REPORT_EVERY: u64 = 120;

// Population
const NUM_CUBES: usize = 48;
const NUM_CRATES: usize = 6;
const CUBE_SPEED: f32 = 4.0;
const SPAWN_RANGE: f32 = 12.0;

fn cube_mesh() -> (Vec<Vec3>, Vec<u32>) {
    let vertices = (0..8)
        .map(|i| {
            let half = |bit: usize| if i & bit != 0 { 0.5 } else { -0.5 };
            Vec3::new(half(1), half(2), half(4))
        })
        .collect();
    let indices = vec![
        0, 2, 1, 1, 2, 3, // -z
        4, 5, 6, 5, 7, 6, // +z
        0, 4, 2, 2, 4, 6, // -x
        1, 3, 5, 3, 7, 5, // +x
        0, 1, 4, 1, 5, 4, // -y
        2, 6, 3, 3, 6, 7, // +y
    ];
    (vertices, indices)
}

fn random_vec(rng: &mut StdRng, range: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-range..range),
        rng.gen_range(-range..range),
        rng.gen_range(-range..range),
    )
}

fn spawn_cube(scene: &mut PhysicsScene, rng: &mut StdRng) -> Result<bool, SceneError> {
    let size = Vec3::repeat(rng.gen_range(0.5..1.5));
    let handle = scene.generate_instance(
        "cube",
        size,
        rng.gen_range(0.5..3.0),
        random_vec(rng, SPAWN_RANGE),
        random_vec(rng, std::f32::consts::PI),
    )?;

    let Some(handle) = handle else {
        return Ok(false);
    };
    if let Some(body) = scene.body_mut(handle) {
        body.velocity = random_vec(rng, CUBE_SPEED);
    }
    Ok(true)
}

fn build_scene(config: PhysicsConfig, rng: &mut StdRng) -> Result<PhysicsScene, SceneError> {
    let mut scene = PhysicsScene::new(config);
    let (vertices, indices) = cube_mesh();

    scene.register_model(Model::from_mesh("cube", &vertices, &indices, NUM_CUBES, BoundKind::Sphere)?)?;
    scene.register_model(
        Model::from_mesh("crate", &vertices, &indices, NUM_CRATES, BoundKind::Box)?.with_dynamic(false),
    )?;

    for _ in 0..NUM_CUBES {
        spawn_cube(&mut scene, rng)?;
    }
    for _ in 0..NUM_CRATES {
        let position = random_vec(rng, SPAWN_RANGE * 0.5);
        scene.generate_instance("crate", Vec3::repeat(2.0), 10.0, position, Vec3::zeros())?;
    }
    Ok(scene)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    octree_physics::foundation::logging::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading physics configuration from {}", path);
            PhysicsConfig::load_from_file(&path)?
        }
        None => PhysicsConfig::default(),
    };

    let mut rng = StdRng::seed_from_u64(42);
    let mut scene = build_scene(config, &mut rng)?;
    let mut debug = DebugDrawSystem::new();

    let mut deleted = 0usize;
    let mut resolved = 0usize;

    for _ in 0..NUM_FRAMES {
        let report = scene.new_frame(FRAME_DT, &mut debug);
        for handle in &report.rejected {
            log::warn!("Pending body {:?} was outside the world and is discarded", handle);
        }
        resolved += report.update.resolved_collisions;

        if report.frame % PICK_EVERY == 0 {
            let origin = random_vec(&mut rng, SPAWN_RANGE);
            let ray = Ray::new(origin, -origin);
            match scene.delete_picked(&ray) {
                Some(hit) => {
                    log::info!("Picked {} ({}) at t = {:.2}", hit.instance_id, hit.model_id, hit.t);
                    deleted += 1;
                }
                None => log::info!("Picking ray from {:?} hit nothing", origin),
            }
        }

        // Refill the population; capacity caps the total
        while spawn_cube(&mut scene, &mut rng)? {}

        if report.frame % REPORT_EVERY == 0 {
            log::info!(
                "frame {}: {} resident, {} nodes, {} relocated, {} overlapping, {} debug shapes",
                report.frame,
                report.resident,
                scene.octree().node_count(),
                report.update.relocated,
                report.update.overlapping_pairs,
                debug.shape_count()
            );
        }
    }

    log::info!(
        "Finished {} frames: {} collisions resolved, {} instances deleted, {} alive",
        scene.frame(),
        resolved,
        deleted,
        scene.instance_count()
    );
    scene.cleanup();
    Ok(())
}
