//! # Voxel Grid
//!
//! Dense per-chunk storage of [`VoxelCell`]s, `width × height × width`,
//! indexed as `[y][z][x]` in a single flat allocation.
//!
//! Reads outside the grid return [`VoxelCell::VOID`] instead of failing, so
//! boundary logic can treat missing neighbors as empty space.

use crate::block::BlockId;

/// Position of a cell inside a chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalPos {
    /// Local X in `[0, width)`.
    pub x: u16,
    /// Y in `[0, height)`.
    pub y: u16,
    /// Local Z in `[0, width)`.
    pub z: u16,
}

impl LocalPos {
    /// Creates a new local position.
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16, z: u16) -> Self {
        Self { x, y, z }
    }

    /// Offsets this position, returning signed coordinates that may fall
    /// outside the chunk.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> (i32, i32, i32) {
        (
            self.x as i32 + dx,
            self.y as i32 + dy,
            self.z as i32 + dz,
        )
    }
}

/// The six face-adjacent offsets (±X, ±Y, ±Z).
pub const FACE_NEIGHBORS: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// One cell of the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoxelCell {
    /// Block type occupying the cell.
    pub block: BlockId,
    /// Index into the visible-instance list of `block`, present iff the
    /// block is non-empty and not fully occluded.
    pub instance_slot: Option<u32>,
}

impl VoxelCell {
    /// Sentinel returned for out-of-bounds reads.
    pub const VOID: Self = Self {
        block: BlockId::EMPTY,
        instance_slot: None,
    };

    /// Returns true if the cell holds no block.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.block.is_empty()
    }
}

/// Dense 3D array of cells owned by exactly one chunk.
#[derive(Clone, Debug)]
pub struct VoxelGrid {
    width: usize,
    height: usize,
    cells: Vec<VoxelCell>,
}

impl VoxelGrid {
    /// Creates an all-empty grid.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        let width = usize::from(width);
        let height = usize::from(height);
        Self {
            width,
            height,
            cells: vec![VoxelCell::VOID; width * width * height],
        }
    }

    /// Horizontal extent (X and Z).
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Vertical extent.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Returns true if the signed local coordinate lies inside the grid.
    #[inline]
    #[must_use]
    pub fn in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        self.index(x, y, z).is_some()
    }

    #[inline]
    fn index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        let z = usize::try_from(z).ok()?;
        if x < self.width && y < self.height && z < self.width {
            Some((y * self.width + z) * self.width + x)
        } else {
            None
        }
    }

    #[inline]
    fn local_index(&self, pos: LocalPos) -> Option<usize> {
        self.index(i32::from(pos.x), i32::from(pos.y), i32::from(pos.z))
    }

    /// Reads a cell, or [`VoxelCell::VOID`] when out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, x: i32, y: i32, z: i32) -> VoxelCell {
        self.index(x, y, z)
            .map_or(VoxelCell::VOID, |index| self.cells[index])
    }

    /// Reads a cell by local position.
    #[inline]
    #[must_use]
    pub fn cell(&self, pos: LocalPos) -> VoxelCell {
        self.local_index(pos)
            .map_or(VoxelCell::VOID, |index| self.cells[index])
    }

    /// Writes a block id. Out-of-bounds writes are ignored; returns whether
    /// the write landed.
    #[inline]
    pub fn set_block_id(&mut self, pos: LocalPos, block: BlockId) -> bool {
        match self.local_index(pos) {
            Some(index) => {
                self.cells[index].block = block;
                true
            }
            None => false,
        }
    }

    /// Writes (or clears) the instance slot of a cell.
    #[inline]
    pub fn set_instance_slot(&mut self, pos: LocalPos, slot: Option<u32>) -> bool {
        match self.local_index(pos) {
            Some(index) => {
                self.cells[index].instance_slot = slot;
                true
            }
            None => false,
        }
    }

    /// Converts signed local coordinates into a [`LocalPos`] if in bounds.
    #[inline]
    #[must_use]
    pub fn local(&self, x: i32, y: i32, z: i32) -> Option<LocalPos> {
        self.index(x, y, z)?;
        Some(LocalPos::new(x as u16, y as u16, z as u16))
    }

    /// Iterates every position in `[y][z][x]` order.
    pub fn positions(&self) -> impl Iterator<Item = LocalPos> {
        let (width, height) = (self.width as u16, self.height as u16);
        (0..height).flat_map(move |y| {
            (0..width).flat_map(move |z| (0..width).map(move |x| LocalPos::new(x, y, z)))
        })
    }

    /// Topmost non-empty Y of a column, if any.
    #[must_use]
    pub fn top_solid(&self, x: u16, z: u16) -> Option<u16> {
        (0..self.height as u16)
            .rev()
            .find(|&y| !self.cell(LocalPos::new(x, y, z)).is_empty())
    }

    /// Copies the block ids out, in `[y][z][x]` order.
    #[must_use]
    pub fn block_ids(&self) -> Vec<BlockId> {
        self.cells.iter().map(|cell| cell.block).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_is_empty() {
        let grid = VoxelGrid::new(4, 8);
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.height(), 8);
        assert_eq!(grid.positions().count(), 4 * 4 * 8);
        assert!(grid.positions().all(|p| grid.cell(p) == VoxelCell::VOID));
    }

    #[test]
    fn test_out_of_bounds_reads_return_void() {
        let mut grid = VoxelGrid::new(4, 4);
        grid.set_block_id(LocalPos::new(0, 0, 0), BlockId::STONE);

        assert_eq!(grid.get(-1, 0, 0), VoxelCell::VOID);
        assert_eq!(grid.get(0, 4, 0), VoxelCell::VOID);
        assert_eq!(grid.get(0, 0, 4), VoxelCell::VOID);
        assert_eq!(grid.get(0, 0, 0).block, BlockId::STONE);
    }

    #[test]
    fn test_out_of_bounds_writes_are_ignored() {
        let mut grid = VoxelGrid::new(2, 2);
        assert!(!grid.set_block_id(LocalPos::new(2, 0, 0), BlockId::DIRT));
        assert!(!grid.set_instance_slot(LocalPos::new(0, 2, 0), Some(0)));
        assert!(grid.block_ids().iter().all(|id| id.is_empty()));
    }

    #[test]
    fn test_axes_are_distinct() {
        let mut grid = VoxelGrid::new(3, 5);
        grid.set_block_id(LocalPos::new(1, 2, 0), BlockId::GRASS);
        assert_eq!(grid.get(1, 2, 0).block, BlockId::GRASS);
        assert!(grid.get(0, 2, 1).is_empty());
        assert!(grid.get(2, 1, 0).is_empty());
    }

    #[test]
    fn test_top_solid() {
        let mut grid = VoxelGrid::new(2, 6);
        assert_eq!(grid.top_solid(0, 0), None);
        grid.set_block_id(LocalPos::new(0, 1, 0), BlockId::DIRT);
        grid.set_block_id(LocalPos::new(0, 3, 0), BlockId::GRASS);
        assert_eq!(grid.top_solid(0, 0), Some(3));
    }

    #[test]
    fn test_local_conversion() {
        let grid = VoxelGrid::new(4, 4);
        assert_eq!(grid.local(3, 3, 3), Some(LocalPos::new(3, 3, 3)));
        assert_eq!(grid.local(-1, 0, 0), None);
        assert_eq!(LocalPos::new(0, 0, 0).offset(-1, 2, 0), (-1, 2, 0));
    }
}
