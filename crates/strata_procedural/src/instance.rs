//! # Instance Index
//!
//! Per-block-type packed list of visible cells. Slot index equals draw
//! order. The list never has gaps:
//!
//! - insertion appends (`slot = len`),
//! - removal moves the last entry into the freed slot and pops.
//!
//! Slots map to cells through `positions`, and cells map back through
//! [`crate::grid::VoxelCell::instance_slot`], so the entry moved by a removal
//! is found by coordinate in O(1).

use bytemuck::{Pod, Zeroable};

use crate::block::{BlockId, MaterialHandle};
use crate::grid::LocalPos;

/// GPU-ready record for one visible block instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct InstanceData {
    /// World-space center of the block.
    pub position: [f32; 3],
    /// Raw material handle.
    pub material: u32,
}

/// Result of removing a slot whose hole was filled by the last entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotMove {
    /// Cell whose entry moved.
    pub pos: LocalPos,
    /// The slot it now occupies.
    pub slot: u32,
}

/// Packed visible-instance list for one block type within one chunk.
#[derive(Clone, Debug, Default)]
pub struct InstanceIndex {
    positions: Vec<LocalPos>,
}

impl InstanceIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied slots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if no slot is occupied.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Appends a cell and returns its slot.
    pub fn insert(&mut self, pos: LocalPos) -> u32 {
        let slot = self.positions.len() as u32;
        self.positions.push(pos);
        slot
    }

    /// Frees `slot` by swapping in the last entry.
    ///
    /// Returns the entry that moved, if any (none when `slot` was the last
    /// one or out of range).
    pub fn remove(&mut self, slot: u32) -> Option<SlotMove> {
        let index = slot as usize;
        if index >= self.positions.len() {
            return None;
        }
        self.positions.swap_remove(index);
        self.positions
            .get(index)
            .map(|&pos| SlotMove { pos, slot })
    }

    /// Cell occupying `slot`.
    #[inline]
    #[must_use]
    pub fn position(&self, slot: u32) -> Option<LocalPos> {
        self.positions.get(slot as usize).copied()
    }

    /// Cells in slot order.
    #[inline]
    #[must_use]
    pub fn positions(&self) -> &[LocalPos] {
        &self.positions
    }

    /// Drops every slot.
    pub fn clear(&mut self) {
        self.positions.clear();
    }
}

/// Renderer feed for one block type of one chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceBatch {
    /// Block type drawn by this batch.
    pub block: BlockId,
    /// Material to draw it with.
    pub material: MaterialHandle,
    /// Instances in slot order.
    pub instances: Vec<InstanceData>,
}

impl InstanceBatch {
    /// Raw bytes of the instance records for upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: u16) -> LocalPos {
        LocalPos::new(x, 0, 0)
    }

    #[test]
    fn test_insert_appends() {
        let mut index = InstanceIndex::new();
        assert_eq!(index.insert(pos(0)), 0);
        assert_eq!(index.insert(pos(1)), 1);
        assert_eq!(index.insert(pos(2)), 2);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_remove_swaps_last_into_hole() {
        let mut index = InstanceIndex::new();
        for x in 0..4 {
            index.insert(pos(x));
        }

        let moved = index.remove(1);
        assert_eq!(moved, Some(SlotMove { pos: pos(3), slot: 1 }));
        assert_eq!(index.positions(), &[pos(0), pos(3), pos(2)]);
    }

    #[test]
    fn test_remove_last_moves_nothing() {
        let mut index = InstanceIndex::new();
        index.insert(pos(0));
        index.insert(pos(1));
        assert_eq!(index.remove(1), None);
        assert_eq!(index.len(), 1);
        assert_eq!(index.remove(7), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_instance_data_is_16_bytes() {
        assert_eq!(std::mem::size_of::<InstanceData>(), 16);
        let batch = InstanceBatch {
            block: BlockId::STONE,
            material: MaterialHandle(3),
            instances: vec![InstanceData::default(); 2],
        };
        assert_eq!(batch.as_bytes().len(), 32);
    }
}
