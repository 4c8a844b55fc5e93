//! Configuration system
//!
//! Simulation parameters are plain serde structs that can be loaded from and
//! saved to `.toml` or `.ron` files.

pub use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;
use crate::physics::rigid_body::COLLISION_THRESHOLD;
use crate::spatial::OctreeConfig;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Top-level simulation settings for a [`crate::scene::PhysicsScene`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Half edge length of the cubic world extent covered by the octree root
    pub world_half_extent: f32,

    /// Seconds that must pass before the same pair of bodies is resolved again
    pub collision_cooldown: f32,

    /// Persistent acceleration applied to every spawned body
    pub gravity: Vec3,

    /// Octree subdivision settings
    pub octree: OctreeConfig,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            world_half_extent: 16.0,
            collision_cooldown: COLLISION_THRESHOLD,
            gravity: Vec3::zeros(),
            octree: OctreeConfig::default(),
        }
    }
}

impl Config for PhysicsConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_round_trip_through_file() {
        let path = std::env::temp_dir().join("octree_physics_config_test.toml");
        let path = path.to_string_lossy().to_string();

        let mut config = PhysicsConfig::default();
        config.world_half_extent = 64.0;
        config.octree.max_entries_per_node = 4;
        config.gravity = Vec3::new(0.0, -9.81, 0.0);

        config.save_to_file(&path).unwrap();
        let loaded = PhysicsConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config: PhysicsConfig = ron::from_str("(world_half_extent: 32.0)").unwrap();
        assert_eq!(config.world_half_extent, 32.0);
        assert_eq!(config.octree, OctreeConfig::default());
        assert_eq!(config.collision_cooldown, COLLISION_THRESHOLD);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = PhysicsConfig::default().save_to_file("settings.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
