//! # Game Loop
//!
//! Drives a [`World`] from a wall clock:
//! ```text
//! Frame N:
//! ┌──────────────────────────────────────────────────────────┐
//! │ 1. MEASURE    delta since last frame, clamped            │
//! │ 2. STREAM     window update around the observer          │
//! │ 3. GENERATE   drain pending chunks within frame budget   │
//! │ 4. PHYSICS    fixed steps, collision against the store   │
//! │ 5. REPORT     FrameStats                                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//! Rendering is external: the caller drains chunk events between frames.

use std::time::Instant;

use crate::world::World;

/// Frame timing statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// Frame number.
    pub frame: u64,
    /// Delta time fed to the world (seconds, after clamping).
    pub delta_time: f32,
    /// Physics steps run this frame.
    pub physics_steps: u32,
    /// Chunks generated this frame.
    pub chunks_generated: usize,
    /// Chunks that entered the window this frame.
    pub chunks_entered: usize,
    /// Chunks that left the window this frame.
    pub chunks_left: usize,
    /// Wall time spent in the frame, in microseconds.
    pub frame_us: u64,
}

/// The main loop orchestrator. Owns the world.
pub struct GameLoop {
    world: World,
    frame_count: u64,
    last_frame_time: Instant,
}

impl GameLoop {
    /// Creates a loop around `world`.
    #[must_use]
    pub fn new(world: World) -> Self {
        Self {
            world,
            frame_count: 0,
            last_frame_time: Instant::now(),
        }
    }

    /// Runs one frame using the time elapsed since the previous one.
    pub fn run_frame(&mut self) -> FrameStats {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame_time);
        self.last_frame_time = now;
        self.run_frame_with(delta.as_secs_f32())
    }

    /// Runs one frame with an explicit delta (seconds).
    pub fn run_frame_with(&mut self, delta_time: f32) -> FrameStats {
        let start = Instant::now();
        // Clamp delta time to prevent physics explosion after a pause
        let delta_time = if delta_time.is_finite() {
            delta_time.clamp(0.0, self.world.config().physics.max_frame_time)
        } else {
            0.0
        };

        let tick = self.world.tick(delta_time);
        let stats = FrameStats {
            frame: self.frame_count,
            delta_time,
            physics_steps: tick.physics_steps,
            chunks_generated: tick.generated,
            chunks_entered: tick.window.entered.len(),
            chunks_left: tick.window.left.len(),
            frame_us: start.elapsed().as_micros() as u64,
        };
        self.frame_count += 1;

        tracing::trace!(
            frame = stats.frame,
            steps = stats.physics_steps,
            generated = stats.chunks_generated,
            frame_us = stats.frame_us,
            "frame"
        );
        stats
    }

    /// Frames run so far.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world (edits, config changes, event draining).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Gives the world back.
    #[must_use]
    pub fn into_world(self) -> World {
        self.world
    }
}
