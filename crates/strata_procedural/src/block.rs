//! # Block Registry
//!
//! The fixed catalog of block types. Loaded once (it is `const` data) and
//! treated as a read-only lookup table from id to properties.
//!
//! Block id `0` is the empty block: passable, never drawn.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Small integer identifying a block type.
#[repr(transparent)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable,
    Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockId(pub u16);

impl BlockId {
    /// The empty block.
    pub const EMPTY: Self = Self(0);
    /// Grass (column surface above water).
    pub const GRASS: Self = Self(1);
    /// Dirt (column fill).
    pub const DIRT: Self = Self(2);
    /// Stone.
    pub const STONE: Self = Self(3);
    /// Coal ore.
    pub const COAL_ORE: Self = Self(4);
    /// Iron ore.
    pub const IRON_ORE: Self = Self(5);
    /// Tree trunk.
    pub const TREE: Self = Self(6);
    /// Tree canopy.
    pub const LEAVES: Self = Self(7);
    /// Sand (column surface and fill below water).
    pub const SAND: Self = Self(8);
    /// Cloud (top layer of a chunk).
    pub const CLOUD: Self = Self(9);

    /// Returns true if this is the empty block.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Block::lookup(*self) {
            Some(block) => write!(f, "{}#{}", block.name, self.0),
            None => write!(f, "unknown#{}", self.0),
        }
    }
}

/// Renderer-side material handle. Opaque to the core; the renderer maps it
/// to an actual material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u32);

/// Catalog entry for one block type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    /// Unique id.
    pub id: BlockId,
    /// Human-readable name.
    pub name: &'static str,
    /// Whether the block obstructs movement.
    pub solid: bool,
    /// Material used to draw instances of this block.
    pub material: MaterialHandle,
}

impl Block {
    const fn entry(id: u16, name: &'static str, solid: bool) -> Self {
        Self {
            id: BlockId(id),
            name,
            solid,
            material: MaterialHandle(id as u32),
        }
    }

    /// All registered block types, indexed by id.
    pub const REGISTRY: [Self; 10] = [
        Self::entry(0, "empty", false),
        Self::entry(1, "grass", true),
        Self::entry(2, "dirt", true),
        Self::entry(3, "stone", true),
        Self::entry(4, "coal_ore", true),
        Self::entry(5, "iron_ore", true),
        Self::entry(6, "tree", true),
        Self::entry(7, "leaves", true),
        Self::entry(8, "sand", true),
        Self::entry(9, "cloud", true),
    ];

    /// Looks up a block type by id.
    #[inline]
    #[must_use]
    pub fn lookup(id: BlockId) -> Option<&'static Self> {
        Self::REGISTRY.get(usize::from(id.0))
    }

    /// Looks up a block type by name.
    #[must_use]
    pub fn by_name(name: &str) -> Option<&'static Self> {
        Self::REGISTRY.iter().find(|block| block.name == name)
    }

    /// Returns true if `id` names a registered, non-empty block.
    #[inline]
    #[must_use]
    pub fn is_placeable(id: BlockId) -> bool {
        !id.is_empty() && Self::lookup(id).is_some()
    }

    /// Returns true if `id` obstructs movement. Unknown ids are passable.
    #[inline]
    #[must_use]
    pub fn is_solid(id: BlockId) -> bool {
        Self::lookup(id).is_some_and(|block| block.solid)
    }
}
