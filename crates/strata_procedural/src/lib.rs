//! # STRATA Procedural
//!
//! Voxel data model and deterministic world generation.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: same seed and parameters always produce the same chunk
//! 2. **Chunked**: the world is a grid of fixed-size column chunks
//! 3. **Draw-ready**: a generated chunk already knows which blocks are visible
//!
//! ## Core Components
//!
//! - `Block`: fixed registry of block types
//! - `SimplexNoise`: 2D/3D noise generation
//! - `VoxelGrid` / `InstanceIndex`: cells and packed visible-instance slots
//! - `Chunk`: one column of the world with its occlusion bookkeeping
//! - `EditOverlay`: player edits replayed over procedural terrain
//! - `TerrainGenerator`: resources, height field, trees, clouds, edits
//!
//! ## Example
//!
//! ```rust
//! use strata_procedural::{ChunkCoord, EditOverlay, TerrainGenerator};
//! use strata_shared::WorldConfig;
//!
//! let generator = TerrainGenerator::new(&WorldConfig::default()).unwrap();
//! let chunk = generator.generate(ChunkCoord::new(0, 0), &EditOverlay::new());
//! assert!(chunk.loaded);
//! assert!(chunk.instances_consistent());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod block;
pub mod chunk;
pub mod edit_overlay;
pub mod generator;
pub mod grid;
pub mod instance;
pub mod noise;

pub use block::{Block, BlockId, MaterialHandle};
pub use chunk::{Chunk, ChunkCoord, DrawHandle};
pub use edit_overlay::{EditKey, EditOverlay, EditRecord};
pub use generator::TerrainGenerator;
pub use grid::{LocalPos, VoxelCell, VoxelGrid, FACE_NEIGHBORS};
pub use instance::{InstanceBatch, InstanceData, InstanceIndex, SlotMove};
pub use noise::{SimplexNoise, WorldSeed};
