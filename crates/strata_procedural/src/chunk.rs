//! # Chunk
//!
//! World data is organized into fixed-size column chunks of
//! `width × height × width` blocks. Chunks are not stacked vertically, so a
//! chunk is identified by its horizontal [`ChunkCoord`] alone.
//!
//! A chunk exclusively owns:
//! - its [`VoxelGrid`],
//! - one [`InstanceIndex`] per block type,
//! - the renderer-opaque [`DrawHandle`]s attached to it.
//!
//! ## Occlusion
//!
//! A block is obscured iff all six face neighbors are non-empty. Neighbors
//! outside the chunk count as empty, so boundary blocks are always visible.

use std::collections::BTreeMap;

use crate::block::{Block, BlockId, MaterialHandle};
use crate::grid::{LocalPos, VoxelCell, VoxelGrid, FACE_NEIGHBORS};
use crate::instance::{InstanceBatch, InstanceData, InstanceIndex};

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not blocks).
    pub x: i32,
    /// Z coordinate (in chunks, not blocks).
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing world block `(block_x, block_z)`.
    #[inline]
    #[must_use]
    pub const fn from_block_pos(block_x: i32, block_z: i32, width: i32) -> Self {
        Self {
            x: block_x.div_euclid(width),
            z: block_z.div_euclid(width),
        }
    }

    /// World coordinates `(x, z)` of the chunk's origin corner.
    #[inline]
    #[must_use]
    pub const fn origin(self, width: i32) -> (i32, i32) {
        (self.x * width, self.z * width)
    }

    /// Chebyshev distance in chunks.
    #[inline]
    #[must_use]
    pub fn chebyshev(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.z.abs_diff(other.z))
    }
}

/// Renderer-owned resource attached to a chunk (e.g. an instanced mesh).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DrawHandle(pub u64);

/// A chunk of world data.
#[derive(Clone, Debug)]
pub struct Chunk {
    /// Chunk position in the world.
    pub coord: ChunkCoord,
    grid: VoxelGrid,
    instances: BTreeMap<BlockId, InstanceIndex>,
    draw_handles: BTreeMap<BlockId, DrawHandle>,
    /// Set once generation finished; queries must ignore the chunk until then.
    pub loaded: bool,
}

impl Chunk {
    /// Creates an empty, not-yet-loaded chunk.
    #[must_use]
    pub fn new(coord: ChunkCoord, width: u16, height: u16) -> Self {
        Self {
            coord,
            grid: VoxelGrid::new(width, height),
            instances: BTreeMap::new(),
            draw_handles: BTreeMap::new(),
            loaded: false,
        }
    }

    /// Read access to the grid.
    #[inline]
    #[must_use]
    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    /// Write access to the grid for the generator.
    ///
    /// Instance slots are not maintained through this; call
    /// [`Chunk::rebuild_instances`] afterwards.
    #[inline]
    pub(crate) fn grid_mut(&mut self) -> &mut VoxelGrid {
        &mut self.grid
    }

    /// World `(x, z)` of the chunk's origin corner.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> (i32, i32) {
        self.coord.origin(self.grid.width() as i32)
    }

    /// Block id at a local position (empty when out of bounds).
    #[inline]
    #[must_use]
    pub fn block(&self, pos: LocalPos) -> BlockId {
        self.grid.cell(pos).block
    }

    /// Cell at a local position.
    #[inline]
    #[must_use]
    pub fn cell(&self, pos: LocalPos) -> VoxelCell {
        self.grid.cell(pos)
    }

    /// Returns true if all six neighbors of `pos` are non-empty.
    #[must_use]
    pub fn is_obscured(&self, pos: LocalPos) -> bool {
        FACE_NEIGHBORS.iter().all(|&(dx, dy, dz)| {
            let (x, y, z) = pos.offset(dx, dy, dz);
            !self.grid.get(x, y, z).is_empty()
        })
    }

    /// Discards all slots and recomputes them from the occlusion rule.
    pub fn rebuild_instances(&mut self) {
        for index in self.instances.values_mut() {
            index.clear();
        }
        let positions: Vec<LocalPos> = self.grid.positions().collect();
        for &pos in &positions {
            self.grid.set_instance_slot(pos, None);
        }
        for pos in positions {
            let cell = self.grid.cell(pos);
            if !cell.is_empty() && !self.is_obscured(pos) {
                self.reveal(pos, cell.block);
            }
        }
    }

    /// Brings the slot of `pos` in line with the occlusion rule.
    ///
    /// Returns true if a slot was added or removed.
    pub fn refresh_visibility(&mut self, pos: LocalPos) -> bool {
        if !self.grid.in_bounds(i32::from(pos.x), i32::from(pos.y), i32::from(pos.z)) {
            return false;
        }
        let cell = self.grid.cell(pos);
        let visible = !cell.is_empty() && !self.is_obscured(pos);
        match (visible, cell.instance_slot) {
            (true, None) => {
                self.reveal(pos, cell.block);
                true
            }
            (false, Some(_)) => {
                self.hide(pos);
                true
            }
            _ => false,
        }
    }

    fn reveal(&mut self, pos: LocalPos, block: BlockId) {
        let slot = self.instances.entry(block).or_default().insert(pos);
        self.grid.set_instance_slot(pos, Some(slot));
    }

    fn hide(&mut self, pos: LocalPos) {
        let cell = self.grid.cell(pos);
        let Some(slot) = cell.instance_slot else {
            return;
        };
        let moved = self
            .instances
            .get_mut(&cell.block)
            .and_then(|index| index.remove(slot));
        if let Some(moved) = moved {
            self.grid.set_instance_slot(moved.pos, Some(moved.slot));
        }
        self.grid.set_instance_slot(pos, None);
    }

    /// Places `block` into an empty cell and updates its own visibility.
    ///
    /// Neighbor visibility is the caller's job since neighbors may live in
    /// other chunks. Returns false (and changes nothing) if the cell is out
    /// of bounds or occupied, or `block` is empty.
    pub fn add_block(&mut self, pos: LocalPos, block: BlockId) -> bool {
        let in_bounds = self.grid.in_bounds(i32::from(pos.x), i32::from(pos.y), i32::from(pos.z));
        if !in_bounds || block.is_empty() || !self.grid.cell(pos).is_empty() {
            return false;
        }
        self.grid.set_block_id(pos, block);
        self.refresh_visibility(pos);
        true
    }

    /// Empties an occupied cell, releasing its slot.
    ///
    /// Returns the removed block id, or `None` if the cell was already empty.
    pub fn remove_block(&mut self, pos: LocalPos) -> Option<BlockId> {
        let cell = self.grid.cell(pos);
        if cell.is_empty() {
            return None;
        }
        self.hide(pos);
        self.grid.set_block_id(pos, BlockId::EMPTY);
        Some(cell.block)
    }

    /// Visible-instance index of a block type.
    #[must_use]
    pub fn instance_index(&self, block: BlockId) -> Option<&InstanceIndex> {
        self.instances.get(&block)
    }

    /// Total visible instances over all block types.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.instances.values().map(InstanceIndex::len).sum()
    }

    /// Renderer feed for one block type.
    #[must_use]
    pub fn instance_batch(&self, block: BlockId) -> Option<InstanceBatch> {
        let index = self.instances.get(&block)?;
        let material = Block::lookup(block).map_or(MaterialHandle(u32::from(block.raw())), |b| b.material);
        let (ox, oz) = self.origin();
        let instances = index
            .positions()
            .iter()
            .map(|pos| InstanceData {
                position: [
                    (ox + i32::from(pos.x)) as f32,
                    f32::from(pos.y),
                    (oz + i32::from(pos.z)) as f32,
                ],
                material: material.0,
            })
            .collect();
        Some(InstanceBatch {
            block,
            material,
            instances,
        })
    }

    /// Renderer feed for every block type with at least one visible instance.
    #[must_use]
    pub fn instance_batches(&self) -> Vec<InstanceBatch> {
        self.instances
            .iter()
            .filter(|(_, index)| !index.is_empty())
            .filter_map(|(&block, _)| self.instance_batch(block))
            .collect()
    }

    /// Attaches a renderer handle for a block type, returning the one it
    /// replaces.
    pub fn attach_draw_handle(&mut self, block: BlockId, handle: DrawHandle) -> Option<DrawHandle> {
        self.draw_handles.insert(block, handle)
    }

    /// Renderer handle attached for a block type.
    #[must_use]
    pub fn draw_handle(&self, block: BlockId) -> Option<DrawHandle> {
        self.draw_handles.get(&block).copied()
    }

    /// Releases instance buffers and hands back every draw handle.
    pub fn dispose(&mut self) -> Vec<DrawHandle> {
        self.loaded = false;
        self.instances.clear();
        std::mem::take(&mut self.draw_handles).into_values().collect()
    }

    /// Checks the slot bookkeeping against the occlusion rule.
    ///
    /// True iff every visible block has exactly one slot, no obscured or
    /// empty cell has one, and each index is gap-free and points back at
    /// cells holding its block type.
    #[must_use]
    pub fn instances_consistent(&self) -> bool {
        let cells_ok = self.grid.positions().all(|pos| {
            let cell = self.grid.cell(pos);
            let visible = !cell.is_empty() && !self.is_obscured(pos);
            match cell.instance_slot {
                Some(slot) => {
                    visible
                        && self
                            .instances
                            .get(&cell.block)
                            .and_then(|index| index.position(slot))
                            == Some(pos)
                }
                None => !visible,
            }
        });

        let indices_ok = self.instances.iter().all(|(&block, index)| {
            index.positions().iter().enumerate().all(|(slot, &pos)| {
                let cell = self.grid.cell(pos);
                cell.block == block && cell.instance_slot == Some(slot as u32)
            })
        });

        cells_ok && indices_ok
    }
}
