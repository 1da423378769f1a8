//! # World Configuration
//!
//! The single configuration surface of the world. Loaded once at startup from
//! TOML; any later change is applied as a whole and triggers a full world
//! regeneration (edits are kept).
//!
//! Every table is `#[serde(default)]`, so a document only needs the keys it
//! overrides:
//!
//! ```toml
//! seed = 1234
//! draw_distance = 3
//!
//! [terrain]
//! magnitude = 12.0
//!
//! [[resources]]
//! id = 4
//! scarcity = 0.75
//! scale = { x = 20.0, y = 20.0, z = 20.0 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Upper bound for `chunk_height`; local Y is stored as `u16`.
pub const MAX_CHUNK_HEIGHT: u32 = u16::MAX as u32;

/// Upper bound for `chunk_width`; local X/Z are stored as `u16`.
pub const MAX_CHUNK_WIDTH: u32 = u16::MAX as u32;

/// Height-field terrain parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    /// Horizontal noise scale in blocks (larger = smoother).
    pub scale: f64,
    /// Height amplitude in blocks.
    pub magnitude: f64,
    /// Base height in blocks.
    pub offset: f64,
    /// Filled cells below this Y (at or under the surface) are sand instead
    /// of grass or dirt.
    pub water_offset: u32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            scale: 30.0,
            magnitude: 8.0,
            offset: 10.0,
            water_offset: 6,
        }
    }
}

/// Trunk height range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrunkParams {
    /// Minimum trunk height in blocks.
    pub min_height: u32,
    /// Maximum trunk height in blocks.
    pub max_height: u32,
}

impl Default for TrunkParams {
    fn default() -> Self {
        Self {
            min_height: 4,
            max_height: 7,
        }
    }
}

/// Spherical canopy parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanopyParams {
    /// Minimum canopy radius in blocks.
    pub min_radius: u32,
    /// Maximum canopy radius in blocks. Also the interior inset used when
    /// placing trees.
    pub max_radius: u32,
    /// Probability that a cell inside the sphere becomes leaves.
    pub density: f64,
}

impl Default for CanopyParams {
    fn default() -> Self {
        Self {
            min_radius: 2,
            max_radius: 4,
            density: 0.5,
        }
    }
}

/// Tree placement parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeParams {
    /// Per-column probability of planting a tree.
    pub frequency: f64,
    /// Trunk shape.
    pub trunk: TrunkParams,
    /// Canopy shape.
    pub canopy: CanopyParams,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            frequency: 0.01,
            trunk: TrunkParams::default(),
            canopy: CanopyParams::default(),
        }
    }
}

/// Cloud layer parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudParams {
    /// Horizontal noise scale in blocks.
    pub scale: f64,
    /// Fraction of the sky covered by clouds.
    pub density: f64,
}

impl Default for CloudParams {
    fn default() -> Self {
        Self {
            scale: 30.0,
            density: 0.3,
        }
    }
}

/// Per-axis noise scale of a resource vein field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseScale3 {
    /// X scale in blocks.
    pub x: f64,
    /// Y scale in blocks.
    pub y: f64,
    /// Z scale in blocks.
    pub z: f64,
}

impl NoiseScale3 {
    /// Same scale on every axis.
    #[must_use]
    pub const fn uniform(s: f64) -> Self {
        Self { x: s, y: s, z: s }
    }
}

/// One ore/resource vein field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceParams {
    /// Block id placed where the field exceeds `scarcity`.
    pub id: u16,
    /// Threshold in `[0, 1]`; higher means rarer.
    pub scarcity: f64,
    /// Noise scale per axis.
    pub scale: NoiseScale3,
}

/// How newly entering chunks are generated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingParams {
    /// Queue new chunks and generate them at idle points instead of inline.
    pub deferred: bool,
    /// Time budget per frame for draining the generation queue.
    pub frame_budget_ms: u64,
    /// A queued chunk older than this is generated regardless of budget.
    pub deferred_timeout_ms: u64,
}

impl Default for StreamingParams {
    fn default() -> Self {
        Self {
            deferred: true,
            frame_budget_ms: 4,
            deferred_timeout_ms: 1000,
        }
    }
}

/// Fixed-timestep simulation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsParams {
    /// Simulation steps per second.
    pub simulation_rate: f32,
    /// Downward acceleration in blocks per second squared.
    pub gravity: f32,
    /// Elapsed time of a single frame is clamped to this many seconds.
    pub max_frame_time: f32,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            simulation_rate: 200.0,
            gravity: 32.0,
            max_frame_time: 0.1,
        }
    }
}

/// Complete world configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World seed; every generator stream derives from it.
    pub seed: u64,
    /// Chunk extent along X and Z.
    pub chunk_width: u32,
    /// Chunk extent along Y.
    pub chunk_height: u32,
    /// Chebyshev radius (in chunks) of the loaded window.
    pub draw_distance: u32,
    /// Height-field terrain.
    pub terrain: TerrainParams,
    /// Vegetation.
    pub trees: TreeParams,
    /// Cloud layer.
    pub clouds: CloudParams,
    /// Ore veins, applied in order.
    pub resources: Vec<ResourceParams>,
    /// Chunk generation scheduling.
    pub streaming: StreamingParams,
    /// Collision simulation.
    pub physics: PhysicsParams,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            chunk_width: 32,
            chunk_height: 32,
            draw_distance: 1,
            terrain: TerrainParams::default(),
            trees: TreeParams::default(),
            clouds: CloudParams::default(),
            resources: vec![
                // stone
                ResourceParams {
                    id: 3,
                    scarcity: 0.5,
                    scale: NoiseScale3::uniform(30.0),
                },
                // coal ore
                ResourceParams {
                    id: 4,
                    scarcity: 0.8,
                    scale: NoiseScale3::uniform(20.0),
                },
                // iron ore
                ResourceParams {
                    id: 5,
                    scarcity: 0.9,
                    scale: NoiseScale3::uniform(40.0),
                },
            ],
            streaming: StreamingParams::default(),
            physics: PhysicsParams::default(),
        }
    }
}

impl WorldConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and any validation
    /// error from [`WorldConfig::validate`].
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`WorldConfig::from_toml_str`].
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Serializes to a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Checks dimensions, ranges, probabilities and scales.
    ///
    /// Resource block ids are checked by the generator, which owns the block
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> ConfigResult<()> {
        check_dimension("chunk_width", self.chunk_width, MAX_CHUNK_WIDTH)?;
        check_dimension("chunk_height", self.chunk_height, MAX_CHUNK_HEIGHT)?;

        check_scale("terrain.scale", self.terrain.scale)?;
        check_scale("clouds.scale", self.clouds.scale)?;
        check_probability("clouds.density", self.clouds.density)?;

        let trees = &self.trees;
        check_probability("trees.frequency", trees.frequency)?;
        check_probability("trees.canopy.density", trees.canopy.density)?;
        check_range(
            "trees.trunk",
            trees.trunk.min_height,
            trees.trunk.max_height,
        )?;
        check_range(
            "trees.canopy",
            trees.canopy.min_radius,
            trees.canopy.max_radius,
        )?;

        for resource in &self.resources {
            check_probability("resources.scarcity", resource.scarcity)?;
            check_scale("resources.scale.x", resource.scale.x)?;
            check_scale("resources.scale.y", resource.scale.y)?;
            check_scale("resources.scale.z", resource.scale.z)?;
        }

        let physics = &self.physics;
        check_scale("physics.simulation_rate", f64::from(physics.simulation_rate))?;
        check_scale("physics.max_frame_time", f64::from(physics.max_frame_time))?;
        if !physics.gravity.is_finite() {
            return Err(ConfigError::InvalidScale {
                field: "physics.gravity",
                value: f64::from(physics.gravity),
            });
        }

        Ok(())
    }
}

fn check_dimension(field: &'static str, value: u32, max: u32) -> ConfigResult<()> {
    if value == 0 || value > max {
        return Err(ConfigError::InvalidDimension { field, value });
    }
    Ok(())
}

fn check_range(field: &'static str, min: u32, max: u32) -> ConfigResult<()> {
    if min > max {
        return Err(ConfigError::InvalidRange { field, min, max });
    }
    Ok(())
}

fn check_probability(field: &'static str, value: f64) -> ConfigResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidProbability { field, value });
    }
    Ok(())
}

fn check_scale(field: &'static str, value: f64) -> ConfigResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidScale { field, value });
    }
    Ok(())
}
