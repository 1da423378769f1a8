//! Headless walk through a generated world.
//!
//! ```text
//! strata_walk [config.toml] [frames] [block]
//! ```
//!
//! Logs go to stdout; `RUST_LOG` is appended to the default filter.

use std::{backtrace::Backtrace, env, error::Error, panic, path::Path};

use strata::{
    physics::{look_direction, OBSERVER_HEIGHT, OBSERVER_RADIUS},
    procedural::{Block, BlockId},
    shared::{Vec3, WorldConfig},
    GameLoop, InputIntent, KinematicState, WalkController, World,
};
use tracing_subscriber::{
    fmt::{self, time::uptime},
    prelude::*,
    EnvFilter, Registry,
};

/// Our crates are debug, everything else is warn.
const DEFAULT_FILTER: &str = "warn,strata=debug,strata_procedural=debug,strata_shared=debug";

const DEFAULT_FRAMES: u32 = 600;
const FRAME_DT: f32 = 1.0 / 60.0;

fn init_logging() -> Result<(), Box<dyn Error>> {
    let format = fmt::format()
        .compact()
        .with_timer(uptime())
        .with_line_number(true);
    let stdout_log = fmt::layer().event_format(format);

    let mut filter = DEFAULT_FILTER.to_owned();
    if let Ok(env_filter) = env::var(EnvFilter::DEFAULT_ENV) {
        filter.push(',');
        filter.push_str(&env_filter);
    }

    let subscriber = Registry::default()
        .with(EnvFilter::new(filter))
        .with(stdout_log);
    tracing::subscriber::set_global_default(subscriber)?;

    // make panic messages go through logging
    panic::set_hook(Box::new(|info| {
        tracing::error!("{}", info);
        if env::var("RUST_BACKTRACE").is_ok_and(|val| val == "1") {
            tracing::error!("{}", Backtrace::force_capture());
        }
    }));
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging()?;

    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(path) => WorldConfig::load(Path::new(&path))?,
        None => WorldConfig::default(),
    };
    let frames = match args.next() {
        Some(frames) => frames.parse()?,
        None => DEFAULT_FRAMES,
    };
    let place = match args.next() {
        Some(name) => Block::by_name(&name)
            .filter(|block| Block::is_placeable(block.id))
            .ok_or_else(|| format!("unknown or unplaceable block `{name}`"))?
            .id,
        None => BlockId::STONE,
    };

    // Spawn above the tallest possible terrain column
    let spawn_y = config.chunk_height as f32 + 2.0;
    let observer = KinematicState::standing_at(
        Vec3::new(0.0, spawn_y, 0.0),
        OBSERVER_RADIUS,
        OBSERVER_HEIGHT,
    );
    let walker = WalkController {
        intent: InputIntent {
            forward: 1.0,
            yaw: 30.0,
            ..InputIntent::default()
        },
        ..WalkController::default()
    };
    let mut world = World::new(config, observer)?.with_movement(Box::new(walker));
    world.flush_pending();

    let mut game = GameLoop::new(world);
    let mut generated = 0;
    for _ in 0..frames {
        let stats = game.run_frame_with(FRAME_DT);
        generated += stats.chunks_generated;
        if stats.frame % 60 == 0 {
            let observer = game.world().observer();
            tracing::info!(
                frame = stats.frame,
                x = observer.position.x,
                feet = observer.feet(),
                z = observer.position.z,
                grounded = observer.grounded,
                "walking"
            );
        }
        // Renderer side: consume events and measure the upload size
        let coords: Vec<_> = game
            .world_mut()
            .store_mut()
            .drain_events()
            .filter_map(|event| match event {
                strata::ChunkEvent::Loaded(coord) | strata::ChunkEvent::InstancesChanged(coord) => {
                    Some(coord)
                }
                strata::ChunkEvent::Disposed { .. } => None,
            })
            .collect();
        for coord in coords {
            let bytes: usize = game
                .world()
                .store()
                .instance_batches(coord)
                .iter()
                .map(|batch| batch.as_bytes().len())
                .sum();
            tracing::trace!(cx = coord.x, cz = coord.z, bytes, "instance upload");
        }
    }

    // Dig out the block in front of the feet and fill the hole
    let mut world = game.into_world();
    let eye = world.observer().position;
    let direction = look_direction(30.0, -60.0);
    if let Some(hit) = world.raycast(eye, direction, 6.0) {
        let [x, y, z] = hit.block;
        let removed = world.remove_block(x, y, z)?;
        tracing::info!(x, y, z, %removed, "dug block");
        world.add_block(x, y, z, place)?;
        tracing::info!(x, y, z, %place, "placed block");
    }

    let events = world.shutdown();
    tracing::info!(frames, generated, events = events.len(), "done");
    Ok(())
}
