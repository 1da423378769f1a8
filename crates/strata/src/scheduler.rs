//! # Generation Scheduler
//!
//! FIFO task queue for chunks that entered the streaming window but are not
//! generated yet. The store drains it once per frame:
//!
//! - while the frame budget lasts, tasks are taken in order,
//! - past the budget, only tasks older than the timeout are taken (forced).
//!
//! Tasks are whole chunks; nothing is ever generated halfway.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use strata_procedural::ChunkCoord;

/// A chunk waiting for generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingChunk {
    /// Chunk to generate.
    pub coord: ChunkCoord,
    /// When it entered the queue.
    pub enqueued: Instant,
}

/// A task handed out by [`GenerationQueue::next_due`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DueChunk {
    /// Chunk to generate.
    pub coord: ChunkCoord,
    /// True if the task waited past the timeout.
    pub forced: bool,
}

/// Budgeted FIFO of pending generations.
#[derive(Clone, Debug)]
pub struct GenerationQueue {
    tasks: VecDeque<PendingChunk>,
    timeout: Duration,
}

impl GenerationQueue {
    /// Creates an empty queue with the given forcing timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            tasks: VecDeque::new(),
            timeout,
        }
    }

    /// Timeout after which a task is forced.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Changes the forcing timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Enqueues a chunk unless it is already pending.
    pub fn push(&mut self, coord: ChunkCoord, now: Instant) {
        if !self.contains(coord) {
            self.tasks.push_back(PendingChunk {
                coord,
                enqueued: now,
            });
        }
    }

    /// Drops a pending chunk (it left the window before generation).
    pub fn cancel(&mut self, coord: ChunkCoord) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.coord != coord);
        before != self.tasks.len()
    }

    /// Returns true if `coord` is pending.
    #[must_use]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.tasks.iter().any(|task| task.coord == coord)
    }

    /// Number of pending chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Discards every pending chunk.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Takes the next task to run.
    ///
    /// With budget left the oldest task is returned. Without budget, only a
    /// task that waited at least the timeout is returned.
    pub fn next_due(&mut self, now: Instant, has_budget: bool) -> Option<DueChunk> {
        let front = self.tasks.front()?;
        let forced = now.saturating_duration_since(front.enqueued) >= self.timeout;
        if !has_budget && !forced {
            return None;
        }
        let task = self.tasks.pop_front()?;
        Some(DueChunk {
            coord: task.coord,
            forced,
        })
    }
}
