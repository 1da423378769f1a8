//! # STRATA
//!
//! Runtime of a streamed, editable voxel world.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            GameLoop                              │
//! │                               │                                  │
//! │                             World                                │
//! │        ┌──────────────────────┼─────────────────────┐            │
//! │        ▼                      ▼                     ▼            │
//! │   ChunkStore ──────► GenerationQueue        CollisionSystem      │
//! │   • window diff         • frame budget        • fixed timestep   │
//! │   • edits + overlay     • forced timeout      • broad/narrow     │
//! │        │                                            │            │
//! │        ▼                                            │            │
//! │   TerrainGenerator (strata_procedural) ◄── BlockQuery ┘          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `chunk_store`: streaming window, coordinate translation, edits
//! - `scheduler`: deferred generation queue
//! - `physics`: collision system and voxel raycast
//! - `movement`: movement models
//! - `world`: the world context
//! - `game_loop`: frame orchestration and timing

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod chunk_store;
pub mod game_loop;
pub mod movement;
pub mod physics;
pub mod scheduler;
pub mod world;

// Re-export the lower crates
pub use strata_procedural as procedural;
pub use strata_shared as shared;

// Re-export commonly used types
pub use chunk_store::{BlockQuery, ChunkEvent, ChunkLocal, ChunkStore, StreamStats, WindowChange};
pub use game_loop::{FrameStats, GameLoop};
pub use movement::{Ballistic, InputIntent, MovementModel, WalkController};
pub use physics::{
    raycast, CollisionReport, CollisionSystem, Contact, KinematicState, RaycastHit,
};
pub use scheduler::GenerationQueue;
pub use world::{TickStats, World};
