//! # Error Types
//!
//! Two families:
//! - [`ConfigError`]: rejected configuration, raised when a config is loaded
//!   or applied.
//! - [`WorldError`]: recoverable world queries and edits. None of these is
//!   fatal; callers are free to ignore them.

use thiserror::Error;

/// Errors raised while loading or validating a [`crate::WorldConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A chunk dimension is zero or too large.
    #[error("invalid chunk dimension `{field}`: {value}")]
    InvalidDimension {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: u32,
    },

    /// A `min`/`max` pair is inverted.
    #[error("invalid range `{field}`: min {min} > max {max}")]
    InvalidRange {
        /// Name of the offending field.
        field: &'static str,
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },

    /// A probability lies outside `[0, 1]`.
    #[error("`{field}` must be within [0, 1], got {value}")]
    InvalidProbability {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A noise scale is zero, negative or not finite.
    #[error("`{field}` must be a positive finite scale, got {value}")]
    InvalidScale {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A resource references a block id that cannot be placed.
    #[error("resource references unknown or empty block id {0}")]
    UnknownResource(u16),

    /// The TOML document could not be parsed.
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized.
    #[error("config serialization failed: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

/// Recoverable failures of world queries and edits.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldError {
    /// Coordinate lies outside the vertical range of the world.
    #[error("coordinate ({x}, {y}, {z}) is out of bounds")]
    OutOfBounds {
        /// World X.
        x: i32,
        /// World Y.
        y: i32,
        /// World Z.
        z: i32,
    },

    /// Adding into a filled cell, removing from an empty one, or placing
    /// the empty block.
    #[error("edit at ({x}, {y}, {z}) would not change the world")]
    InvalidMutation {
        /// World X.
        x: i32,
        /// World Y.
        y: i32,
        /// World Z.
        z: i32,
    },

    /// The chunk owning the coordinate is not loaded (or still generating).
    #[error("chunk ({cx}, {cz}) is not loaded")]
    UnloadedChunk {
        /// Chunk X.
        cx: i32,
        /// Chunk Z.
        cz: i32,
    },
}

/// Result type for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for world edits.
pub type WorldResult<T> = Result<T, WorldError>;
