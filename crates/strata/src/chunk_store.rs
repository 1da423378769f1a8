//! # Chunk Store
//!
//! Keeps exactly the square window of chunks within `draw_distance`
//! (Chebyshev) of the observer's chunk. Every [`ChunkStore::update`]:
//!
//! 1. computes the target window,
//! 2. disposes chunks that left it,
//! 3. generates (or queues) chunks that entered it.
//!
//! A queued chunk is a member of the window but is not `loaded`; every query
//! treats it as absent until generation completes.
//!
//! ## Edits
//!
//! Block edits mutate the owning chunk, re-evaluate the six face neighbors
//! (which may live in other chunks) and record the result in the
//! [`EditOverlay`], so regeneration reproduces them.
//!
//! ## Events
//!
//! The queue only holds what the renderer still has to act on. A chunk that
//! is disposed before its `Loaded` event was drained leaves no trace, and
//! `InstancesChanged` is queued at most once per chunk until drained.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use strata_procedural::{
    Block, BlockId, Chunk, ChunkCoord, DrawHandle, EditKey, EditOverlay, InstanceBatch, LocalPos,
    TerrainGenerator, FACE_NEIGHBORS,
};
use strata_shared::{StreamingParams, Vec3, WorldError, WorldResult};

use crate::scheduler::GenerationQueue;

/// Read access to world blocks by world coordinate.
///
/// Blocks are unit cubes centered on integer coordinates.
pub trait BlockQuery {
    /// Block at the cell, or `None` if the cell is out of range or its
    /// chunk is not loaded.
    fn block_at(&self, x: i32, y: i32, z: i32) -> Option<BlockId>;

    /// Returns true if the cell holds a known, non-empty block.
    fn is_occupied(&self, x: i32, y: i32, z: i32) -> bool {
        self.block_at(x, y, z).is_some_and(|id| !id.is_empty())
    }
}

/// Notification for the external renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkEvent {
    /// Chunk finished generating and can be drawn.
    Loaded(ChunkCoord),
    /// Visible instances of the chunk changed after an edit.
    InstancesChanged(ChunkCoord),
    /// Chunk left the window; release the returned handles.
    Disposed {
        /// The disposed chunk.
        coord: ChunkCoord,
        /// Renderer handles that were attached to it.
        handles: Vec<DrawHandle>,
    },
}

impl ChunkEvent {
    /// Chunk the event is about.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        match self {
            Self::Loaded(coord) | Self::InstancesChanged(coord) | Self::Disposed { coord, .. } => {
                *coord
            }
        }
    }
}

/// Streaming counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Chunks generated this session.
    pub generated: u64,
    /// Chunks disposed this session.
    pub disposed: u64,
    /// Deferred generations forced past their timeout.
    pub forced: u64,
    /// Chunks currently waiting for generation.
    pub pending: usize,
}

/// Result of one window update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowChange {
    /// Chunks that entered the window.
    pub entered: Vec<ChunkCoord>,
    /// Chunks that left the window.
    pub left: Vec<ChunkCoord>,
}

/// World cell resolved to its owning chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkLocal {
    /// Owning chunk.
    pub coord: ChunkCoord,
    /// X relative to the chunk origin, in `[0, width)`.
    pub x: i32,
    /// Y, unchanged.
    pub y: i32,
    /// Z relative to the chunk origin, in `[0, width)`.
    pub z: i32,
}

/// The set of chunks in the streaming window.
pub struct ChunkStore {
    generator: TerrainGenerator,
    chunks: HashMap<ChunkCoord, Chunk>,
    queue: GenerationQueue,
    edits: EditOverlay,
    events: VecDeque<ChunkEvent>,
    stats: StreamStats,
    streaming: StreamingParams,
    draw_distance: u32,
    width: i32,
    last_observer: Option<Vec3>,
}

impl ChunkStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(generator: TerrainGenerator) -> Self {
        let streaming = generator.config().streaming.clone();
        let draw_distance = generator.config().draw_distance;
        let width = i32::from(generator.width());
        Self {
            queue: GenerationQueue::new(Duration::from_millis(streaming.deferred_timeout_ms)),
            generator,
            chunks: HashMap::new(),
            edits: EditOverlay::new(),
            events: VecDeque::new(),
            stats: StreamStats::default(),
            streaming,
            draw_distance,
            width,
            last_observer: None,
        }
    }

    /// Chunk width in blocks.
    #[inline]
    #[must_use]
    pub const fn chunk_width(&self) -> i32 {
        self.width
    }

    /// Generator currently in use.
    #[must_use]
    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    /// Resolves a world cell to `(chunk, local)`. `y` passes through.
    #[must_use]
    pub fn world_to_chunk_coords(&self, x: i32, y: i32, z: i32) -> ChunkLocal {
        let coord = ChunkCoord::from_block_pos(x, z, self.width);
        let (origin_x, origin_z) = coord.origin(self.width);
        ChunkLocal {
            coord,
            x: x - origin_x,
            y,
            z: z - origin_z,
        }
    }

    /// Chunk containing a world-space point.
    #[must_use]
    pub fn chunk_at(&self, position: Vec3) -> ChunkCoord {
        ChunkCoord::from_block_pos(
            position.x.floor() as i32,
            position.z.floor() as i32,
            self.width,
        )
    }

    /// Every coordinate within `draw_distance` of `center`.
    #[must_use]
    pub fn window(&self, center: ChunkCoord) -> Vec<ChunkCoord> {
        let d = self.draw_distance as i32;
        (-d..=d)
            .flat_map(|dz| (-d..=d).map(move |dx| ChunkCoord::new(center.x + dx, center.z + dz)))
            .collect()
    }

    /// Recomputes the window around the observer, disposing chunks that
    /// left it and generating (or queueing) chunks that entered it.
    pub fn update(&mut self, observer: Vec3) -> WindowChange {
        self.last_observer = Some(observer);
        let center = self.chunk_at(observer);
        let target: HashSet<ChunkCoord> = self.window(center).into_iter().collect();

        let mut left: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .filter(|coord| !target.contains(coord))
            .copied()
            .collect();
        left.sort_unstable();
        for &coord in &left {
            self.dispose(coord);
        }

        let mut entered: Vec<ChunkCoord> = target
            .into_iter()
            .filter(|coord| !self.chunks.contains_key(coord))
            .collect();
        // Nearest first
        entered.sort_unstable_by_key(|&coord| (coord.chebyshev(center), coord));

        let now = Instant::now();
        for &coord in &entered {
            if self.streaming.deferred {
                let placeholder = Chunk::new(coord, self.generator.width(), self.generator.height());
                self.chunks.insert(coord, placeholder);
                self.queue.push(coord, now);
            } else {
                self.generate(coord);
            }
        }

        if !entered.is_empty() || !left.is_empty() {
            tracing::debug!(
                cx = center.x,
                cz = center.z,
                entered = entered.len(),
                left = left.len(),
                "streaming window changed"
            );
        }

        WindowChange { entered, left }
    }

    /// Generates queued chunks within `budget`; chunks queued longer than
    /// the timeout are generated regardless. Returns how many were generated.
    pub fn drain_pending(&mut self, budget: Duration) -> usize {
        self.drain_pending_at(Instant::now(), budget)
    }

    /// [`ChunkStore::drain_pending`] with an explicit clock for task ages.
    pub fn drain_pending_at(&mut self, now: Instant, budget: Duration) -> usize {
        let start = Instant::now();
        let mut generated = 0;
        while let Some(due) = self.queue.next_due(now, start.elapsed() < budget) {
            if due.forced {
                tracing::warn!(
                    cx = due.coord.x,
                    cz = due.coord.z,
                    timeout_ms = self.queue.timeout().as_millis() as u64,
                    "deferred generation forced past timeout"
                );
                self.stats.forced += 1;
            }
            if self.chunks.contains_key(&due.coord) {
                self.generate(due.coord);
                generated += 1;
            }
        }
        generated
    }

    /// Generates every queued chunk now.
    pub fn flush_pending(&mut self) -> usize {
        let mut generated = 0;
        while let Some(due) = self.queue.next_due(Instant::now(), true) {
            if self.chunks.contains_key(&due.coord) {
                self.generate(due.coord);
                generated += 1;
            }
        }
        generated
    }

    fn generate(&mut self, coord: ChunkCoord) {
        let chunk = self.generator.generate(coord, &self.edits);
        self.chunks.insert(coord, chunk);
        self.stats.generated += 1;
        self.events.push_back(ChunkEvent::Loaded(coord));
    }

    fn dispose(&mut self, coord: ChunkCoord) {
        let Some(mut chunk) = self.chunks.remove(&coord) else {
            return;
        };
        self.queue.cancel(coord);
        let announced = chunk.loaded;
        let handles = chunk.dispose();
        self.stats.disposed += 1;
        tracing::debug!(cx = coord.x, cz = coord.z, handles = handles.len(), "chunk disposed");
        if announced {
            self.announce_disposal(coord, handles);
        }
    }

    fn announce_disposal(&mut self, coord: ChunkCoord, handles: Vec<DrawHandle>) {
        if handles.is_empty() {
            let last = self.events.iter().rposition(|event| event.coord() == coord);
            if let Some(index) = last {
                if self.events[index] == ChunkEvent::Loaded(coord) {
                    // Never seen by the renderer
                    self.events.remove(index);
                    return;
                }
            }
        }
        self.events.push_back(ChunkEvent::Disposed { coord, handles });
    }

    fn announce_change(&mut self, coord: ChunkCoord) {
        let pending = self.events.iter().rev().find(|event| event.coord() == coord);
        if !matches!(
            pending,
            Some(ChunkEvent::Loaded(_) | ChunkEvent::InstancesChanged(_))
        ) {
            self.events.push_back(ChunkEvent::InstancesChanged(coord));
        }
    }

    /// Disposes every chunk and drops pending generations.
    pub fn dispose_all(&mut self) {
        let mut coords: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        coords.sort_unstable();
        for coord in coords {
            self.dispose(coord);
        }
        self.queue.clear();
    }

    /// Swaps in a new generator and regenerates the window around the last
    /// observer position. The edit overlay is kept.
    pub fn reconfigure(&mut self, generator: TerrainGenerator) {
        self.dispose_all();
        self.streaming = generator.config().streaming.clone();
        self.draw_distance = generator.config().draw_distance;
        self.width = i32::from(generator.width());
        self.queue
            .set_timeout(Duration::from_millis(self.streaming.deferred_timeout_ms));
        self.generator = generator;
        if let Some(observer) = self.last_observer {
            self.update(observer);
        }
    }

    /// Coordinates in the window (loaded or pending), sorted.
    #[must_use]
    pub fn coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// Returns true if `coord` is generated and queryable.
    #[must_use]
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.chunks.get(&coord).is_some_and(|chunk| chunk.loaded)
    }

    /// A loaded chunk.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord).filter(|chunk| chunk.loaded)
    }

    /// Every loaded chunk.
    pub fn loaded_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values().filter(|chunk| chunk.loaded)
    }

    /// Renderer feed of a loaded chunk.
    #[must_use]
    pub fn instance_batches(&self, coord: ChunkCoord) -> Vec<InstanceBatch> {
        self.chunk(coord)
            .map(Chunk::instance_batches)
            .unwrap_or_default()
    }

    /// Attaches a renderer handle to a loaded chunk. Returns false if the
    /// chunk is not loaded.
    pub fn attach_draw_handle(&mut self, coord: ChunkCoord, block: BlockId, handle: DrawHandle) -> bool {
        match self.chunks.get_mut(&coord).filter(|chunk| chunk.loaded) {
            Some(chunk) => {
                chunk.attach_draw_handle(block, handle);
                true
            }
            None => false,
        }
    }

    /// Drains queued renderer events. Call once per frame; undrained
    /// events are coalesced but only released here.
    pub fn drain_events(&mut self) -> impl Iterator<Item = ChunkEvent> + '_ {
        self.events.drain(..)
    }

    /// Streaming counters.
    #[must_use]
    pub fn stats(&self) -> StreamStats {
        StreamStats {
            pending: self.queue.len(),
            ..self.stats
        }
    }

    /// Recorded player edits.
    #[must_use]
    pub fn edits(&self) -> &EditOverlay {
        &self.edits
    }

    /// Mutable edit overlay, e.g. to restore persisted edits. Loaded chunks
    /// only pick changes up when regenerated.
    pub fn edits_mut(&mut self) -> &mut EditOverlay {
        &mut self.edits
    }

    /// Resolves a world cell to a loaded chunk and an in-bounds local
    /// position.
    fn locate(&self, x: i32, y: i32, z: i32) -> WorldResult<(ChunkCoord, LocalPos)> {
        let local = self.world_to_chunk_coords(x, y, z);
        let chunk = self
            .chunk(local.coord)
            .ok_or(WorldError::UnloadedChunk {
                cx: local.coord.x,
                cz: local.coord.z,
            })?;
        let pos = chunk
            .grid()
            .local(local.x, local.y, local.z)
            .ok_or(WorldError::OutOfBounds { x, y, z })?;
        Ok((local.coord, pos))
    }

    /// Block at a world cell.
    ///
    /// # Errors
    ///
    /// [`WorldError::UnloadedChunk`] or [`WorldError::OutOfBounds`].
    pub fn block(&self, x: i32, y: i32, z: i32) -> WorldResult<BlockId> {
        let (coord, pos) = self.locate(x, y, z)?;
        Ok(self.chunks.get(&coord).map_or(BlockId::EMPTY, |chunk| chunk.block(pos)))
    }

    /// Places `block` into an empty world cell.
    ///
    /// # Errors
    ///
    /// [`WorldError::InvalidMutation`] if the cell is occupied or `block`
    /// is empty or unregistered, otherwise as [`ChunkStore::block`].
    pub fn add_block(&mut self, x: i32, y: i32, z: i32, block: BlockId) -> WorldResult<()> {
        let result = self.try_add_block(x, y, z, block);
        if let Err(err) = result {
            tracing::trace!(x, y, z, %block, %err, "add rejected");
        }
        result
    }

    fn try_add_block(&mut self, x: i32, y: i32, z: i32, block: BlockId) -> WorldResult<()> {
        let (coord, pos) = self.locate(x, y, z)?;
        if !Block::is_placeable(block) {
            return Err(WorldError::InvalidMutation { x, y, z });
        }
        let added = self
            .chunks
            .get_mut(&coord)
            .is_some_and(|chunk| chunk.add_block(pos, block));
        if !added {
            return Err(WorldError::InvalidMutation { x, y, z });
        }
        self.record_edit(coord, pos, block);
        self.propagate(coord, x, y, z);
        Ok(())
    }

    /// Empties a world cell, returning the removed block.
    ///
    /// # Errors
    ///
    /// [`WorldError::InvalidMutation`] if the cell is already empty,
    /// otherwise as [`ChunkStore::block`].
    pub fn remove_block(&mut self, x: i32, y: i32, z: i32) -> WorldResult<BlockId> {
        let result = self.try_remove_block(x, y, z);
        if let Err(err) = result {
            tracing::trace!(x, y, z, %err, "remove rejected");
        }
        result
    }

    fn try_remove_block(&mut self, x: i32, y: i32, z: i32) -> WorldResult<BlockId> {
        let (coord, pos) = self.locate(x, y, z)?;
        let removed = self
            .chunks
            .get_mut(&coord)
            .and_then(|chunk| chunk.remove_block(pos))
            .ok_or(WorldError::InvalidMutation { x, y, z })?;
        self.record_edit(coord, pos, BlockId::EMPTY);
        self.propagate(coord, x, y, z);
        Ok(removed)
    }

    fn record_edit(&mut self, coord: ChunkCoord, pos: LocalPos, block: BlockId) {
        let (origin_x, origin_z) = coord.origin(self.width);
        self.edits.set(EditKey::new(origin_x, origin_z, pos), block);
    }

    /// Re-evaluates the six neighbors of an edited cell and reports every
    /// chunk whose instances changed.
    fn propagate(&mut self, edited: ChunkCoord, x: i32, y: i32, z: i32) {
        let mut touched = BTreeSet::from([edited]);
        for (dx, dy, dz) in FACE_NEIGHBORS {
            let Ok((coord, pos)) = self.locate(x + dx, y + dy, z + dz) else {
                continue;
            };
            let changed = self
                .chunks
                .get_mut(&coord)
                .is_some_and(|chunk| chunk.refresh_visibility(pos));
            if changed {
                touched.insert(coord);
            }
        }
        for coord in touched {
            self.announce_change(coord);
        }
    }
}

impl BlockQuery for ChunkStore {
    fn block_at(&self, x: i32, y: i32, z: i32) -> Option<BlockId> {
        self.block(x, y, z).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_shared::WorldConfig;

    fn store(deferred: bool) -> ChunkStore {
        let mut config = WorldConfig {
            chunk_width: 8,
            chunk_height: 16,
            ..WorldConfig::default()
        };
        config.streaming.deferred = deferred;
        ChunkStore::new(TerrainGenerator::new(&config).unwrap())
    }

    #[test]
    fn test_world_to_chunk_coords() {
        let store = store(false);
        assert_eq!(
            store.world_to_chunk_coords(9, 5, -1),
            ChunkLocal {
                coord: ChunkCoord::new(1, -1),
                x: 1,
                y: 5,
                z: 7
            }
        );
        assert_eq!(store.world_to_chunk_coords(-8, 0, 0).coord, ChunkCoord::new(-1, 0));
        assert_eq!(store.world_to_chunk_coords(-8, 0, 0).x, 0);
    }

    #[test]
    fn test_chunk_at_floors_negative_positions() {
        let store = store(false);
        assert_eq!(store.chunk_at(Vec3::new(-0.2, 3.0, 7.9)), ChunkCoord::new(-1, 0));
        assert_eq!(store.chunk_at(Vec3::new(8.0, 0.0, -8.1)), ChunkCoord::new(1, -2));
    }

    #[test]
    fn test_deferred_chunks_are_not_queryable() {
        let mut store = store(true);
        store.update(Vec3::new(1.0, 10.0, 1.0));

        assert_eq!(store.coords().len(), 9);
        assert!(!store.is_loaded(ChunkCoord::new(0, 0)));
        assert_eq!(store.block_at(1, 0, 1), None);
        assert_eq!(
            store.block(1, 0, 1),
            Err(WorldError::UnloadedChunk { cx: 0, cz: 0 })
        );
        assert_eq!(store.stats().pending, 9);

        assert_eq!(store.flush_pending(), 9);
        assert!(store.is_loaded(ChunkCoord::new(0, 0)));
        assert!(store.block_at(1, 0, 1).is_some());
        assert_eq!(store.stats().pending, 0);
    }

    #[test]
    fn test_zero_budget_forces_after_timeout() {
        let mut store = store(true);
        store.update(Vec3::new(1.0, 10.0, 1.0));

        assert_eq!(store.drain_pending_at(Instant::now(), Duration::ZERO), 0);
        let later = Instant::now() + Duration::from_secs(5);
        assert_eq!(store.drain_pending_at(later, Duration::ZERO), 9);
        assert_eq!(store.stats().forced, 9);
    }

    #[test]
    fn test_out_of_range_queries() {
        let mut store = store(false);
        store.update(Vec3::new(1.0, 10.0, 1.0));
        assert_eq!(
            store.block(0, -1, 0),
            Err(WorldError::OutOfBounds { x: 0, y: -1, z: 0 })
        );
        assert_eq!(store.block_at(0, 16, 0), None);
        assert_eq!(store.block_at(100, 0, 0), None);
    }

    #[test]
    fn test_edit_rejections() {
        let mut store = store(false);
        store.update(Vec3::new(1.0, 10.0, 1.0));

        // Column bottom is always filled
        assert_eq!(
            store.add_block(2, 0, 2, BlockId::STONE),
            Err(WorldError::InvalidMutation { x: 2, y: 0, z: 2 })
        );
        assert_eq!(
            store.add_block(2, 15, 2, BlockId::EMPTY),
            Err(WorldError::InvalidMutation { x: 2, y: 15, z: 2 })
        );
        assert!(store.remove_block(2, 0, 2).is_ok());
        assert_eq!(
            store.remove_block(2, 0, 2),
            Err(WorldError::InvalidMutation { x: 2, y: 0, z: 2 })
        );
        assert!(matches!(
            store.remove_block(500, 0, 0),
            Err(WorldError::UnloadedChunk { .. })
        ));
    }

    #[test]
    fn test_edit_is_recorded_and_reported() {
        let mut store = store(false);
        store.update(Vec3::new(1.0, 10.0, 1.0));
        let _ = store.drain_events().count();

        store.remove_block(0, 0, 0).unwrap();
        let key = EditKey::new(0, 0, LocalPos::new(0, 0, 0));
        assert_eq!(store.edits().get(&key), Some(BlockId::EMPTY));

        let events: Vec<ChunkEvent> = store.drain_events().collect();
        assert!(events.contains(&ChunkEvent::InstancesChanged(ChunkCoord::new(0, 0))));
    }

    #[test]
    fn test_changes_coalesce_until_drained() {
        let mut store = store(false);
        store.update(Vec3::new(1.0, 10.0, 1.0));

        // Loaded already tells the renderer to read everything
        store.remove_block(2, 0, 2).unwrap();
        let events: Vec<ChunkEvent> = store.drain_events().collect();
        assert_eq!(events.len(), 9);
        assert!(events.iter().all(|e| matches!(e, ChunkEvent::Loaded(_))));

        store.remove_block(3, 0, 3).unwrap();
        store.remove_block(4, 0, 4).unwrap();
        let events: Vec<ChunkEvent> = store.drain_events().collect();
        assert_eq!(events, vec![ChunkEvent::InstancesChanged(ChunkCoord::new(0, 0))]);
    }

    #[test]
    fn test_undrained_events_stay_bounded() {
        let mut store = store(false);
        for step in 0..200 {
            store.update(Vec3::new(step as f32 * 3.0, 10.0, 1.0));
            let _ = store.remove_block(step * 3, 0, 1);
        }
        assert!(store.stats().disposed > 100);
        let events: Vec<ChunkEvent> = store.drain_events().collect();
        assert!(events.len() <= 9, "{} events queued", events.len());
        assert!(events.iter().all(|e| matches!(e, ChunkEvent::Loaded(_))));
    }

    #[test]
    fn test_pending_chunks_leave_no_disposal_event() {
        let mut store = store(true);
        store.update(Vec3::new(1.0, 10.0, 1.0));
        store.update(Vec3::new(100.0, 10.0, 1.0));
        assert_eq!(store.stats().disposed, 9);
        assert_eq!(store.drain_events().count(), 0);
    }
}
