//! # STRATA Shared
//!
//! Types used by every STRATA crate: the world configuration, the error
//! taxonomy and small vector math.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on a GPU, windowing or asset crate. The
//! renderer is an external collaborator.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod math;

pub use config::{
    CanopyParams, CloudParams, NoiseScale3, PhysicsParams, ResourceParams, StreamingParams,
    TerrainParams, TreeParams, TrunkParams, WorldConfig,
};
pub use error::{ConfigError, ConfigResult, WorldError, WorldResult};
pub use math::Vec3;
