//! Headless driver: loads configuration, builds a [`voxen_world::World`],
//! and steps it tick-by-tick. There is no renderer, window, input, or audio
//! here — those are external collaborators this crate hands its tick
//! outputs to — but this binary proves the engine runs standalone end to
//! end, the way the upstream project's own headless mode exercises its
//! world crate without a GPU context attached.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use voxen_world::{ChunkPos, EngineConfig, World, WorldParams};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("voxen.toml"));
    let config = EngineConfig::load_from_path(&config_path);
    info!(?config_path, world_seed = config.world_seed, "starting voxen");

    let params = WorldParams {
        world_seed: config.world_seed,
        worker_threads: config.worker_threads,
        activation_range: config.activation_range,
        light_budget: config.light_budget,
        save_dir: PathBuf::from(&config.save_dir),
    };
    let mut world = World::new(params);
    world.set_observer(ChunkPos::new(0, 0));

    const TICK_PERIOD: Duration = Duration::from_millis(50);
    const REPORT_EVERY_TICKS: u64 = 100;

    loop {
        let started = std::time::Instant::now();
        world.tick();

        if world.current_tick().0 % REPORT_EVERY_TICKS == 0 {
            info!(
                tick = world.current_tick().0,
                active_chunks = world.active_chunk_count(),
                "world tick"
            );
        }

        if let Some(remaining) = TICK_PERIOD.checked_sub(started.elapsed()) {
            std::thread::sleep(remaining);
        }
    }
}
