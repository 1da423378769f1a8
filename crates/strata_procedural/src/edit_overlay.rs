//! # Edit Overlay
//!
//! Sparse record of player edits, keyed by chunk origin plus local cell.
//! Replayed into a chunk right after procedural generation, so a
//! regenerated chunk reproduces every edit.
//!
//! Keys are never removed by the world: removing a block records an explicit
//! [`BlockId::EMPTY`] entry. Only [`EditOverlay::clear`] drops entries.
//!
//! Entries are grouped per chunk origin so replay touches only the edits of
//! the chunk being generated.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::block::BlockId;
use crate::grid::LocalPos;

/// Absolute identity of an edited cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditKey {
    /// World X of the owning chunk's origin.
    pub origin_x: i32,
    /// World Z of the owning chunk's origin.
    pub origin_z: i32,
    /// Cell within the chunk.
    pub local: LocalPos,
}

impl EditKey {
    /// Creates a key.
    #[inline]
    #[must_use]
    pub const fn new(origin_x: i32, origin_z: i32, local: LocalPos) -> Self {
        Self {
            origin_x,
            origin_z,
            local,
        }
    }
}

/// Flat persisted row: `(chunkOriginX, chunkOriginZ, localX, localY, localZ) → blockId`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
    /// World X of the owning chunk's origin.
    pub origin_x: i32,
    /// World Z of the owning chunk's origin.
    pub origin_z: i32,
    /// Local X.
    pub x: u16,
    /// Y.
    pub y: u16,
    /// Local Z.
    pub z: u16,
    /// Block id written by the edit (0 = removed).
    pub block: BlockId,
}

impl From<(EditKey, BlockId)> for EditRecord {
    fn from((key, block): (EditKey, BlockId)) -> Self {
        Self {
            origin_x: key.origin_x,
            origin_z: key.origin_z,
            x: key.local.x,
            y: key.local.y,
            z: key.local.z,
            block,
        }
    }
}

impl From<EditRecord> for (EditKey, BlockId) {
    fn from(record: EditRecord) -> Self {
        (
            EditKey::new(
                record.origin_x,
                record.origin_z,
                LocalPos::new(record.x, record.y, record.z),
            ),
            record.block,
        )
    }
}

/// In-memory edit table.
#[derive(Clone, Debug, Default)]
pub struct EditOverlay {
    chunks: HashMap<(i32, i32), HashMap<LocalPos, BlockId>>,
    len: usize,
}

impl EditOverlay {
    /// Creates an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the cell has ever been edited.
    #[must_use]
    pub fn contains(&self, key: &EditKey) -> bool {
        self.get(key).is_some()
    }

    /// Block id recorded for the cell.
    #[must_use]
    pub fn get(&self, key: &EditKey) -> Option<BlockId> {
        self.chunks
            .get(&(key.origin_x, key.origin_z))
            .and_then(|cells| cells.get(&key.local))
            .copied()
    }

    /// Records (or overwrites) the block id of a cell.
    pub fn set(&mut self, key: EditKey, block: BlockId) {
        let previous = self
            .chunks
            .entry((key.origin_x, key.origin_z))
            .or_default()
            .insert(key.local, block);
        if previous.is_none() {
            self.len += 1;
        }
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.len = 0;
    }

    /// Number of edited cells.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing has been edited.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Edits recorded for the chunk whose origin is `(origin_x, origin_z)`.
    pub fn chunk_edits(
        &self,
        origin_x: i32,
        origin_z: i32,
    ) -> impl Iterator<Item = (LocalPos, BlockId)> + '_ {
        self.chunks
            .get(&(origin_x, origin_z))
            .into_iter()
            .flat_map(|cells| cells.iter().map(|(&pos, &block)| (pos, block)))
    }

    /// Every entry, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = (EditKey, BlockId)> + '_ {
        self.chunks.iter().flat_map(|(&(ox, oz), cells)| {
            cells
                .iter()
                .map(move |(&local, &block)| (EditKey::new(ox, oz, local), block))
        })
    }

    /// Every entry as a persistable row, sorted by key.
    #[must_use]
    pub fn records(&self) -> Vec<EditRecord> {
        let mut entries: Vec<(EditKey, BlockId)> = self.entries().collect();
        entries.sort_unstable_by_key(|(key, _)| *key);
        entries.into_iter().map(EditRecord::from).collect()
    }
}

impl Extend<(EditKey, BlockId)> for EditOverlay {
    fn extend<T: IntoIterator<Item = (EditKey, BlockId)>>(&mut self, iter: T) {
        for (key, block) in iter {
            self.set(key, block);
        }
    }
}

impl Extend<EditRecord> for EditOverlay {
    fn extend<T: IntoIterator<Item = EditRecord>>(&mut self, iter: T) {
        self.extend(iter.into_iter().map(<(EditKey, BlockId)>::from));
    }
}

impl FromIterator<EditRecord> for EditOverlay {
    fn from_iter<T: IntoIterator<Item = EditRecord>>(iter: T) -> Self {
        let mut overlay = Self::new();
        overlay.extend(iter);
        overlay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(ox: i32, x: u16) -> EditKey {
        EditKey::new(ox, 0, LocalPos::new(x, 1, 2))
    }

    #[test]
    fn test_set_get_contains() {
        let mut overlay = EditOverlay::new();
        assert!(!overlay.contains(&key(0, 0)));

        overlay.set(key(0, 0), BlockId::STONE);
        overlay.set(key(32, 0), BlockId::EMPTY);

        assert_eq!(overlay.get(&key(0, 0)), Some(BlockId::STONE));
        // Removal is an explicit entry, not an absent key
        assert!(overlay.contains(&key(32, 0)));
        assert_eq!(overlay.get(&key(32, 0)), Some(BlockId::EMPTY));
        assert_eq!(overlay.len(), 2);
    }

    #[test]
    fn test_overwrite_keeps_len() {
        let mut overlay = EditOverlay::new();
        overlay.set(key(0, 3), BlockId::DIRT);
        overlay.set(key(0, 3), BlockId::EMPTY);
        assert_eq!(overlay.len(), 1);
        assert_eq!(overlay.get(&key(0, 3)), Some(BlockId::EMPTY));
    }

    #[test]
    fn test_chunk_edits_are_scoped() {
        let mut overlay = EditOverlay::new();
        overlay.set(key(0, 1), BlockId::DIRT);
        overlay.set(key(0, 2), BlockId::SAND);
        overlay.set(key(-32, 1), BlockId::GRASS);

        assert_eq!(overlay.chunk_edits(0, 0).count(), 2);
        assert_eq!(overlay.chunk_edits(-32, 0).count(), 1);
        assert_eq!(overlay.chunk_edits(64, 0).count(), 0);
    }

    #[test]
    fn test_clear() {
        let mut overlay = EditOverlay::new();
        overlay.set(key(0, 1), BlockId::DIRT);
        overlay.clear();
        assert!(overlay.is_empty());
        assert!(!overlay.contains(&key(0, 1)));
    }

    #[test]
    fn test_records_restore_overlay() {
        let mut overlay = EditOverlay::new();
        overlay.set(key(0, 1), BlockId::DIRT);
        overlay.set(key(-32, 4), BlockId::EMPTY);

        let records = overlay.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].origin_x, -32);

        let restored: EditOverlay = records.into_iter().collect();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get(&key(0, 1)), Some(BlockId::DIRT));
        assert_eq!(restored.get(&key(-32, 4)), Some(BlockId::EMPTY));
    }
}
