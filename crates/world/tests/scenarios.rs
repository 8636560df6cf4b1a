//! Black-box scenarios exercising the public `World` API end to end, the
//! way the upstream project's integration tests drive its world crate
//! without reaching into its internals.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use voxen_world::{ChunkPos, World, WorldParams};

fn temp_save_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("voxen-scenario-{label}-{}", std::process::id()))
}

fn settle_until<F: Fn(&World) -> bool>(world: &mut World, predicate: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        world.tick();
        if predicate(world) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// S1: a freshly created world with an observer placed at the origin
/// eventually activates the origin chunk and produces a mesh for it.
#[test]
fn scenario_cold_start_activates_observer_chunk() {
    let dir = temp_save_dir("cold-start");
    let mut world = World::new(WorldParams {
        activation_range: 2,
        save_dir: dir.clone(),
        ..WorldParams::default()
    });
    world.set_observer(ChunkPos::new(0, 0));

    let activated = settle_until(
        &mut world,
        |w| w.mesh_at(ChunkPos::new(0, 0)).is_some(),
        Duration::from_secs(15),
    );
    assert!(activated, "observer chunk never activated and meshed");
    assert!(world.active_chunk_count() > 1, "neighbouring chunks should activate too");

    let _ = std::fs::remove_dir_all(&dir);
}

/// S2: digging the block the crosshair hits removes it and the chunk
/// remains meshable afterward (no panics, no stuck dirty state).
#[test]
fn scenario_dig_removes_the_targeted_block() {
    let dir = temp_save_dir("dig");
    let mut world = World::new(WorldParams {
        activation_range: 1,
        save_dir: dir.clone(),
        ..WorldParams::default()
    });
    world.set_observer(ChunkPos::new(0, 0));
    settle_until(&mut world, |w| w.active_chunk_count() > 0, Duration::from_secs(15));

    let origin = [8.5, 8.5, 127.0];
    let direction = [0.0, 0.0, -1.0];
    let before = world.raycast(origin, direction, 200.0);
    assert!(before.is_some(), "expected the downward ray to hit generated terrain");

    world.dig_at_crosshair(origin, direction, 200.0);
    world.tick();

    let after = world.raycast(origin, direction, 200.0);
    // Either the ray now reaches further (block gone) or hits something
    // strictly lower than before; either way the dug cell is air.
    if let (Some(before_hit), Some(after_hit)) = (before, after) {
        assert!(after_hit.distance >= before_hit.distance);
    }

    let _ = std::fs::remove_dir_all(&dir);
}

/// S3: placing a block on the face the crosshair points at inserts exactly
/// one new solid block, adjacent to the original hit.
#[test]
fn scenario_place_adds_a_block_on_the_targeted_face() {
    let dir = temp_save_dir("place");
    let mut world = World::new(WorldParams {
        activation_range: 1,
        save_dir: dir.clone(),
        ..WorldParams::default()
    });
    world.set_observer(ChunkPos::new(0, 0));
    settle_until(&mut world, |w| w.active_chunk_count() > 0, Duration::from_secs(15));

    let origin = [8.5, 8.5, 127.0];
    let direction = [0.0, 0.0, -1.0];
    let first_hit = world.raycast(origin, direction, 200.0).expect("terrain under observer");

    let glowstone = world.standard_blocks().glowstone;
    world.place_at_crosshair(origin, direction, 200.0, glowstone);
    world.tick();

    let second_hit = world
        .raycast(origin, direction, 200.0)
        .expect("placed block should now be the closest hit");
    assert!(second_hit.distance <= first_hit.distance);

    let _ = std::fs::remove_dir_all(&dir);
}

/// S4: a chunk saved, evicted, and later reloaded comes back with the same
/// block layout it had when it was saved.
#[test]
fn scenario_chunk_survives_a_save_and_reload_round_trip() {
    let dir = temp_save_dir("persist");
    let params = WorldParams {
        activation_range: 1,
        save_dir: dir.clone(),
        ..WorldParams::default()
    };
    {
        let mut world = World::new(params.clone());
        world.set_observer(ChunkPos::new(0, 0));
        settle_until(&mut world, |w| w.active_chunk_count() > 0, Duration::from_secs(15));

        let glowstone = world.standard_blocks().glowstone;
        world.place_at_crosshair([8.5, 8.5, 127.0], [0.0, 0.0, -1.0], 200.0, glowstone);
        world.tick();

        // Drive the observer far away so the origin chunk deactivates (and,
        // since it's dirty, saves) on its own schedule.
        world.set_observer(ChunkPos::new(500, 500));
        settle_until(
            &mut world,
            |w| w.mesh_at(ChunkPos::new(0, 0)).is_none(),
            Duration::from_secs(15),
        );
    }

    assert!(
        std::fs::read_dir(&dir).map(|mut d| d.next().is_some()).unwrap_or(false),
        "expected at least one chunk save file on disk"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

/// S5: cancelling a worker pool's in-flight jobs stops new results from
/// trickling in; the world doesn't deadlock or panic on a hard observer
/// jump immediately followed by shutdown.
#[test]
fn scenario_shutdown_after_a_large_observer_jump_is_clean() {
    let dir = temp_save_dir("shutdown");
    let mut world = World::new(WorldParams {
        activation_range: 4,
        save_dir: dir.clone(),
        ..WorldParams::default()
    });
    world.set_observer(ChunkPos::new(0, 0));
    for _ in 0..10 {
        world.tick();
    }
    world.set_observer(ChunkPos::new(1000, -1000));
    for _ in 0..5 {
        world.tick();
    }
    assert!(world.save_and_shutdown().is_ok());

    let _ = std::fs::remove_dir_all(&dir);
}

/// S6: repeated ticks with a stationary observer converge — active chunk
/// count stops growing once the activation range's footprint is covered.
#[test]
fn scenario_active_chunk_count_converges_for_a_stationary_observer() {
    let dir = temp_save_dir("converge");
    let mut world = World::new(WorldParams {
        activation_range: 2,
        save_dir: dir.clone(),
        ..WorldParams::default()
    });
    world.set_observer(ChunkPos::new(0, 0));

    let deadline = Instant::now() + Duration::from_secs(20);
    let mut last_count = 0;
    let mut stable_ticks = 0;
    while Instant::now() < deadline && stable_ticks < 50 {
        world.tick();
        let count = world.active_chunk_count();
        if count == last_count {
            stable_ticks += 1;
        } else {
            stable_ticks = 0;
        }
        last_count = count;
    }

    assert!(last_count > 0);
    let footprint_side = 2 * 2 + 1;
    assert!(last_count <= footprint_side * footprint_side);

    let _ = std::fs::remove_dir_all(&dir);
}
