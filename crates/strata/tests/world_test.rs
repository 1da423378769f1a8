//! # World Integration Tests
//!
//! Streaming window, collision against real chunks and edit persistence
//! across disposal and regeneration.

use strata::physics::{OBSERVER_HEIGHT, OBSERVER_RADIUS};
use strata::procedural::{BlockId, ChunkCoord, TerrainGenerator};
use strata::shared::{Vec3, WorldConfig};
use strata::{
    Ballistic, BlockQuery, ChunkEvent, ChunkStore, CollisionSystem, GameLoop, InputIntent,
    KinematicState, WalkController, World,
};

/// Grass surface at y = 8 everywhere, nothing else.
fn flat_config() -> WorldConfig {
    let mut config = WorldConfig {
        seed: 5,
        chunk_width: 8,
        chunk_height: 16,
        draw_distance: 1,
        resources: Vec::new(),
        ..WorldConfig::default()
    };
    config.terrain.magnitude = 0.0;
    config.terrain.offset = 8.0;
    config.trees.frequency = 0.0;
    config.clouds.density = 0.0;
    config.streaming.deferred = false;
    config
}

fn flat_store() -> ChunkStore {
    ChunkStore::new(TerrainGenerator::new(&flat_config()).unwrap())
}

fn window(xs: std::ops::RangeInclusive<i32>, zs: std::ops::RangeInclusive<i32>) -> Vec<ChunkCoord> {
    let mut coords: Vec<ChunkCoord> = zs
        .flat_map(|z| xs.clone().map(move |x| ChunkCoord::new(x, z)))
        .collect();
    coords.sort_unstable();
    coords
}

// ============================================================================
// STREAMING
// ============================================================================

#[test]
fn test_window_follows_observer() {
    let mut store = flat_store();
    store.update(Vec3::new(1.0, 12.0, 1.0));
    assert_eq!(store.coords(), window(-1..=1, -1..=1));
    let loaded: Vec<ChunkEvent> = store.drain_events().collect();
    assert_eq!(loaded.len(), 9);

    // One chunk east
    let change = store.update(Vec3::new(9.0, 12.0, 1.0));
    assert_eq!(store.coords(), window(0..=2, -1..=1));
    assert_eq!(change.entered.len(), 3);
    assert_eq!(change.left.len(), 3);
    assert!(change.entered.iter().all(|c| c.x == 2));
    assert!(change.left.iter().all(|c| c.x == -1));

    let events: Vec<ChunkEvent> = store.drain_events().collect();
    for z in -1..=1 {
        assert!(events.contains(&ChunkEvent::Loaded(ChunkCoord::new(2, z))));
        assert!(events
            .iter()
            .any(|e| matches!(e, ChunkEvent::Disposed { coord, .. } if *coord == ChunkCoord::new(-1, z))));
    }
    assert_eq!(store.stats().disposed, 3);
}

#[test]
fn test_staying_inside_a_chunk_changes_nothing() {
    let mut store = flat_store();
    store.update(Vec3::new(1.0, 12.0, 1.0));
    let _ = store.drain_events().count();

    let change = store.update(Vec3::new(7.9, 3.0, 0.1));
    assert!(change.entered.is_empty() && change.left.is_empty());
    assert_eq!(store.drain_events().count(), 0);
    assert_eq!(store.stats().generated, 9);
}

#[test]
fn test_disposal_returns_draw_handles() {
    use strata::procedural::DrawHandle;

    let mut store = flat_store();
    store.update(Vec3::new(1.0, 12.0, 1.0));
    assert!(store.attach_draw_handle(ChunkCoord::new(-1, 0), BlockId::GRASS, DrawHandle(77)));
    assert!(!store.attach_draw_handle(ChunkCoord::new(5, 5), BlockId::GRASS, DrawHandle(78)));
    let _ = store.drain_events().count();

    store.update(Vec3::new(9.0, 12.0, 1.0));
    let handles: Vec<DrawHandle> = store
        .drain_events()
        .filter_map(|e| match e {
            ChunkEvent::Disposed { coord, handles } if coord == ChunkCoord::new(-1, 0) => Some(handles),
            _ => None,
        })
        .flatten()
        .collect();
    assert_eq!(handles, vec![DrawHandle(77)]);
}

// ============================================================================
// COLLISION
// ============================================================================

/// Infinite floor: every cell at y <= 0 is stone.
struct Floor;

impl BlockQuery for Floor {
    fn block_at(&self, _x: i32, y: i32, _z: i32) -> Option<BlockId> {
        Some(if y <= 0 { BlockId::STONE } else { BlockId::EMPTY })
    }
}

#[test]
fn test_observer_falls_and_rests_on_floor() {
    let config = WorldConfig::default();
    let mut physics = CollisionSystem::new(&config.physics);
    let mut state = KinematicState::standing_at(
        Vec3::new(0.0, 3.0, 0.0),
        OBSERVER_RADIUS,
        OBSERVER_HEIGHT,
    );

    for _ in 0..120 {
        physics.update(1.0 / 60.0, &mut state, &mut Ballistic, &Floor);
    }

    assert!(state.grounded);
    assert!((state.feet() - 0.5).abs() < 0.01, "feet at {}", state.feet());
    assert_eq!(state.velocity.y, 0.0);
}

#[test]
fn test_unloaded_chunks_do_not_collide() {
    let mut config = flat_config();
    config.streaming.deferred = true;
    let mut store = ChunkStore::new(TerrainGenerator::new(&config).unwrap());
    store.update(Vec3::new(4.0, 12.0, 4.0));

    let mut physics = CollisionSystem::new(&config.physics);
    let mut state =
        KinematicState::standing_at(Vec3::new(4.0, 9.0, 4.0), OBSERVER_RADIUS, OBSERVER_HEIGHT);
    physics.update(0.1, &mut state, &mut Ballistic, &store);
    assert!(!state.grounded);
    assert!(state.feet() < 9.0);
}

#[test]
fn test_walker_lands_and_crosses_chunks() {
    let observer =
        KinematicState::standing_at(Vec3::new(4.0, 10.0, 4.0), OBSERVER_RADIUS, OBSERVER_HEIGHT);
    let walker = WalkController {
        intent: InputIntent {
            forward: 1.0,
            ..InputIntent::default()
        },
        ..WalkController::default()
    };
    let world = World::new(flat_config(), observer)
        .unwrap()
        .with_movement(Box::new(walker));
    let mut game = GameLoop::new(world);

    for _ in 0..90 {
        game.run_frame_with(1.0 / 60.0);
    }

    let observer = *game.world().observer();
    assert!(observer.grounded);
    assert!((observer.feet() - 8.5).abs() < 0.01, "feet at {}", observer.feet());
    assert!(observer.position.z < 0.0, "z at {}", observer.position.z);
    assert!((observer.position.x - 4.0).abs() < 0.05);
    assert!(game.world().store().is_loaded(ChunkCoord::new(0, -2)));
}

// ============================================================================
// EDITS
// ============================================================================

#[test]
fn test_edits_survive_disposal() {
    let mut store = flat_store();
    store.update(Vec3::new(1.0, 12.0, 1.0));

    store.add_block(2, 12, 2, BlockId::STONE).unwrap();
    assert_eq!(store.remove_block(3, 8, 3), Ok(BlockId::GRASS));
    assert_eq!(store.edits().len(), 2);

    // Far away, then back
    store.update(Vec3::new(100.0, 12.0, 1.0));
    assert!(!store.is_loaded(ChunkCoord::new(0, 0)));
    store.update(Vec3::new(1.0, 12.0, 1.0));

    assert_eq!(store.block(2, 12, 2), Ok(BlockId::STONE));
    assert_eq!(store.block(3, 8, 3), Ok(BlockId::EMPTY));
    assert_eq!(store.block(4, 8, 4), Ok(BlockId::GRASS));
    let chunk = store.chunk(ChunkCoord::new(0, 0)).unwrap();
    assert!(chunk.instances_consistent());
}

#[test]
fn test_edits_across_chunk_border_keep_instances_consistent() {
    let mut store = flat_store();
    store.update(Vec3::new(1.0, 12.0, 1.0));
    let _ = store.drain_events().count();

    // Dig a trench along x = 7 | 8 and refill part of it
    for z in -3..6 {
        for x in [6, 7, 8, 9] {
            store.remove_block(x, 8, z).unwrap();
            store.remove_block(x, 7, z).unwrap();
        }
    }
    for z in 0..3 {
        store.add_block(7, 7, z, BlockId::COAL_ORE).unwrap();
        store.add_block(8, 7, z, BlockId::IRON_ORE).unwrap();
        assert!(store.add_block(8, 7, z, BlockId::STONE).is_err());
    }

    for chunk in store.loaded_chunks() {
        assert!(chunk.instances_consistent(), "chunk {:?}", chunk.coord);
    }
    let events: Vec<ChunkEvent> = store.drain_events().collect();
    assert!(events.contains(&ChunkEvent::InstancesChanged(ChunkCoord::new(1, 0))));
    assert!(events.contains(&ChunkEvent::InstancesChanged(ChunkCoord::new(0, -1))));
}

#[test]
fn test_apply_config_keeps_edits() {
    let observer =
        KinematicState::standing_at(Vec3::new(4.0, 12.0, 4.0), OBSERVER_RADIUS, OBSERVER_HEIGHT);
    let mut world = World::new(flat_config(), observer).unwrap();
    world.add_block(2, 12, 2, BlockId::COAL_ORE).unwrap();
    world.remove_block(5, 8, 5).unwrap();

    let mut config = flat_config();
    config.seed = 99;
    config.terrain.offset = 6.0;
    world.apply_config(config).unwrap();

    assert_eq!(world.store().block(2, 12, 2), Ok(BlockId::COAL_ORE));
    assert_eq!(world.store().block(5, 8, 5), Ok(BlockId::EMPTY));
    assert_eq!(world.store().block(4, 6, 4), Ok(BlockId::GRASS));
    assert_eq!(world.store().edits().len(), 2);
}
