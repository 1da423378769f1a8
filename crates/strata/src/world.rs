//! # World
//!
//! The explicit context that ties streaming, generation scheduling, physics
//! and the observer together. Everything is created in [`World::new`] and
//! released by [`World::shutdown`]; there is no global state.

use std::time::Duration;

use strata_procedural::{BlockId, TerrainGenerator};
use strata_shared::{ConfigResult, Vec3, WorldConfig, WorldResult};

use crate::chunk_store::{ChunkEvent, ChunkStore, WindowChange};
use crate::movement::{Ballistic, MovementModel};
use crate::physics::{raycast, CollisionSystem, KinematicState, RaycastHit};

/// What one [`World::tick`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Window changes from streaming.
    pub window: WindowChange,
    /// Chunks generated from the pending queue.
    pub generated: usize,
    /// Physics steps run.
    pub physics_steps: u32,
}

/// A voxel world with one observer.
///
/// Renderer events accumulate in the store until drained with
/// `world.store_mut().drain_events()`, normally once per frame.
pub struct World {
    config: WorldConfig,
    store: ChunkStore,
    physics: CollisionSystem,
    observer: KinematicState,
    movement: Box<dyn MovementModel>,
}

impl World {
    /// Creates a world and loads (or queues) the window around `observer`.
    ///
    /// # Errors
    ///
    /// Any [`strata_shared::ConfigError`] raised by the generator.
    pub fn new(config: WorldConfig, observer: KinematicState) -> ConfigResult<Self> {
        let generator = TerrainGenerator::new(&config)?;
        let mut store = ChunkStore::new(generator);
        store.update(observer.position);

        tracing::info!(
            seed = config.seed,
            chunk_width = config.chunk_width,
            chunk_height = config.chunk_height,
            draw_distance = config.draw_distance,
            "world created"
        );

        Ok(Self {
            physics: CollisionSystem::new(&config.physics),
            config,
            store,
            observer,
            movement: Box::new(Ballistic),
        })
    }

    /// Replaces the movement model.
    #[must_use]
    pub fn with_movement(mut self, movement: Box<dyn MovementModel>) -> Self {
        self.movement = movement;
        self
    }

    /// Replaces the movement model in place.
    pub fn set_movement(&mut self, movement: Box<dyn MovementModel>) {
        self.movement = movement;
    }

    /// Advances one frame: streaming, pending generation within the frame
    /// budget, then physics.
    pub fn tick(&mut self, dt: f32) -> TickStats {
        let window = self.store.update(self.observer.position);
        let budget = Duration::from_millis(self.config.streaming.frame_budget_ms);
        let generated = self.store.drain_pending(budget);
        let physics_steps = self.physics.update(
            dt,
            &mut self.observer,
            self.movement.as_mut(),
            &self.store,
        );
        TickStats {
            window,
            generated,
            physics_steps,
        }
    }

    /// Generates every pending chunk immediately.
    pub fn flush_pending(&mut self) -> usize {
        self.store.flush_pending()
    }

    /// Places a block at world coordinates.
    ///
    /// # Errors
    ///
    /// See [`ChunkStore::add_block`].
    pub fn add_block(&mut self, x: i32, y: i32, z: i32, block: BlockId) -> WorldResult<()> {
        self.store.add_block(x, y, z, block)
    }

    /// Removes the block at world coordinates.
    ///
    /// # Errors
    ///
    /// See [`ChunkStore::remove_block`].
    pub fn remove_block(&mut self, x: i32, y: i32, z: i32) -> WorldResult<BlockId> {
        self.store.remove_block(x, y, z)
    }

    /// Casts a ray against loaded chunks.
    #[must_use]
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RaycastHit> {
        raycast(origin, direction, max_distance, &self.store)
    }

    /// Applies a new configuration: every chunk is disposed and the window
    /// regenerated with the new parameters. Edits are kept and replayed.
    ///
    /// # Errors
    ///
    /// The config is rejected as a whole; on error the world is unchanged.
    pub fn apply_config(&mut self, config: WorldConfig) -> ConfigResult<()> {
        let generator = TerrainGenerator::new(&config)?;
        tracing::info!(
            seed = config.seed,
            edits = self.store.edits().len(),
            "configuration changed, regenerating world"
        );
        self.physics = CollisionSystem::new(&config.physics);
        self.store.reconfigure(generator);
        self.config = config;
        Ok(())
    }

    /// Disposes every chunk and returns the final renderer events.
    #[must_use]
    pub fn shutdown(mut self) -> Vec<ChunkEvent> {
        self.store.dispose_all();
        tracing::info!(
            generated = self.store.stats().generated,
            disposed = self.store.stats().disposed,
            "world shut down"
        );
        self.store.drain_events().collect()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The chunk store.
    #[must_use]
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Mutable chunk store (renderer handles, event draining).
    pub fn store_mut(&mut self) -> &mut ChunkStore {
        &mut self.store
    }

    /// The observer.
    #[must_use]
    pub fn observer(&self) -> &KinematicState {
        &self.observer
    }

    /// Mutable observer, e.g. to teleport.
    pub fn observer_mut(&mut self) -> &mut KinematicState {
        &mut self.observer
    }

    /// The collision system (debug reports).
    pub fn physics_mut(&mut self) -> &mut CollisionSystem {
        &mut self.physics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{OBSERVER_HEIGHT, OBSERVER_RADIUS};
    use strata_procedural::ChunkCoord;

    fn config() -> WorldConfig {
        let mut config = WorldConfig {
            chunk_width: 8,
            chunk_height: 24,
            ..WorldConfig::default()
        };
        config.streaming.deferred = false;
        config
    }

    fn observer() -> KinematicState {
        KinematicState::standing_at(Vec3::new(4.0, 30.0, 4.0), OBSERVER_RADIUS, OBSERVER_HEIGHT)
    }

    #[test]
    fn test_new_loads_window() {
        let world = World::new(config(), observer()).unwrap();
        assert_eq!(world.store().coords().len(), 9);
        assert!(world.store().is_loaded(ChunkCoord::new(0, 0)));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut bad = config();
        bad.chunk_height = 0;
        assert!(World::new(bad, observer()).is_err());

        let mut world = World::new(config(), observer()).unwrap();
        let mut bad = config();
        bad.trees.frequency = 2.0;
        assert!(world.apply_config(bad).is_err());
        assert_eq!(world.config().trees.frequency, config().trees.frequency);
    }

    #[test]
    fn test_tick_runs_physics() {
        let mut world = World::new(config(), observer()).unwrap();
        let stats = world.tick(0.0525);
        assert_eq!(stats.physics_steps, 10);
        assert!(world.observer().velocity.y < 0.0);
    }

    #[test]
    fn test_shutdown_disposes_everything() {
        let mut world = World::new(config(), observer()).unwrap();
        let _ = world.store_mut().drain_events().count();
        let events = world.shutdown();
        let disposed = events
            .iter()
            .filter(|e| matches!(e, ChunkEvent::Disposed { .. }))
            .count();
        assert_eq!(disposed, 9);
    }
}
