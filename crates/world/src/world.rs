//! The per-tick orchestrator: owns the arena, worker pool, activation and
//! lighting systems, and per-chunk meshes, and exposes the handful of
//! operations an external collaborator (input handling, a dev console, a
//! renderer) drives the engine through.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::instrument;
use voxen_core::SimTick;

use crate::activation::{ActivationConfig, ActivationSystem};
use crate::block::{standard_registry, BlockCatalog, BlockRegistry, BlockTypeIndex, StandardBlocks};
use crate::chunk::{ChunkArena, ChunkId, ChunkLifecycle, ChunkPos, DirtyFlags};
use crate::lighting::{LightEngine, DEFAULT_LIGHT_BUDGET};
use crate::mesher::{build_mesh, MeshBuffers};
use crate::persist::ChunkStore;
use crate::raycast::{cast_ray, HitFace, RaycastHit};
use crate::worker::WorkerPool;
use crate::Block;

/// Engine-level tuning a [`World`] is built with; mirrors the keys in
/// [`crate::config::EngineConfig`] that actually govern this crate's
/// behaviour.
#[derive(Debug, Clone)]
pub struct WorldParams {
    pub world_seed: u64,
    pub worker_threads: usize,
    pub activation_range: i32,
    pub light_budget: usize,
    pub save_dir: PathBuf,
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            world_seed: 0,
            worker_threads: 2,
            activation_range: 6,
            light_budget: DEFAULT_LIGHT_BUDGET,
            save_dir: PathBuf::from("Saves"),
        }
    }
}

/// The live world: every active chunk, its lighting, its mesh, and the
/// machinery that keeps them current around a moving observer.
pub struct World {
    arena: ChunkArena,
    registry: Arc<BlockRegistry>,
    standard_blocks: StandardBlocks,
    worker_pool: WorkerPool,
    activation: ActivationSystem,
    lighting: LightEngine,
    meshes: HashMap<ChunkId, MeshBuffers>,
    tick: SimTick,
    observer: ChunkPos,
    light_budget: usize,
}

impl World {
    pub fn new(params: WorldParams) -> Self {
        let (registry, standard_blocks) = standard_registry();
        let registry = Arc::new(registry);
        let worker_pool = WorkerPool::new(
            params.worker_threads,
            params.world_seed,
            Arc::clone(&registry),
            standard_blocks,
        );
        let activation_config = ActivationConfig::with_activation_range(params.activation_range);
        let activation = ActivationSystem::new(activation_config, ChunkStore::new(params.save_dir));

        Self {
            arena: ChunkArena::new(),
            registry,
            standard_blocks,
            worker_pool,
            activation,
            lighting: LightEngine::new(),
            meshes: HashMap::new(),
            tick: SimTick::ZERO,
            observer: ChunkPos::new(0, 0),
            light_budget: params.light_budget,
        }
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn standard_blocks(&self) -> StandardBlocks {
        self.standard_blocks
    }

    pub fn current_tick(&self) -> SimTick {
        self.tick
    }

    pub fn active_chunk_count(&self) -> usize {
        self.arena
            .iter()
            .filter(|(_, chunk)| chunk.lifecycle == ChunkLifecycle::Active)
            .count()
    }

    /// Move the point chunk activation/deactivation orbits around.
    pub fn set_observer(&mut self, position: ChunkPos) {
        self.observer = position;
    }

    /// Advance the world by one simulation tick: absorb finished generation,
    /// instantiate/activate/deactivate at most one chunk each, drain the
    /// lighting queue's per-tick budget, and remesh whatever's left dirty.
    #[instrument(skip(self))]
    pub fn tick(&mut self) {
        self.tick = self.tick.advance(1);
        self.activation.tick(
            &mut self.arena,
            &self.worker_pool,
            &mut self.lighting,
            self.registry.as_ref(),
            self.observer,
        );
        self.lighting.drain_tick(&mut self.arena, self.registry.as_ref(), self.light_budget);
        self.remesh_dirty_chunks();
        self.prune_stale_meshes();
    }

    fn remesh_dirty_chunks(&mut self) {
        let dirty_ids: Vec<ChunkId> = self
            .arena
            .iter()
            .filter(|(_, chunk)| {
                chunk.lifecycle == ChunkLifecycle::Active && chunk.dirty.contains(DirtyFlags::MESH)
            })
            .map(|(id, _)| id)
            .collect();

        for id in dirty_ids {
            let mesh = {
                let chunk = self.arena.get(id).expect("id came from a live iteration over the arena");
                build_mesh(chunk, id, &self.arena, &self.registry, self.standard_blocks.water)
            };
            self.meshes.insert(id, mesh);
            if let Some(chunk) = self.arena.get_mut(id) {
                chunk.dirty.remove(DirtyFlags::MESH);
            }
        }
    }

    fn prune_stale_meshes(&mut self) {
        self.meshes.retain(|id, _| self.arena.get(*id).is_some());
    }

    pub fn mesh_at(&self, position: ChunkPos) -> Option<&MeshBuffers> {
        self.arena.id_at(position).and_then(|id| self.meshes.get(&id))
    }

    /// Raycast without mutating anything.
    pub fn raycast(&self, origin: [f64; 3], direction: [f64; 3], max_distance: f64) -> Option<RaycastHit> {
        cast_ray(&self.arena, self.registry.as_ref(), origin, direction, max_distance)
    }

    /// Advance the crack overlay on the block under the crosshair; once its
    /// dig-state exceeds the registry's overlay stage count, the block is
    /// removed entirely rather than gaining another crack stage.
    pub fn dig_at_crosshair(&mut self, origin: [f64; 3], direction: [f64; 3], max_distance: f64) -> Option<()> {
        let hit = self.raycast(origin, direction, max_distance)?;
        let chunk_id = hit.block.chunk_id()?;
        let local = hit.block.local_pos()?;
        let chunk = self.arena.get_mut(chunk_id)?;
        let mut block = chunk.block(local);
        let max_stage = self.registry.dig_crack_uvs().len() as u8;
        let next_stage = block.dig_state() + 1;
        if next_stage > max_stage {
            chunk.set_block(local, Block::AIR);
        } else {
            block.set_dig_state(next_stage);
            chunk.set_block(local, block);
        }
        self.lighting.on_block_changed(&mut self.arena, self.registry.as_ref(), hit.block);
        Some(())
    }

    /// Place `block_type` on the face of whatever the crosshair is pointed
    /// at, if the raycast connects.
    pub fn place_at_crosshair(
        &mut self,
        origin: [f64; 3],
        direction: [f64; 3],
        max_distance: f64,
        block_type: BlockTypeIndex,
    ) -> Option<()> {
        let hit = self.raycast(origin, direction, max_distance)?;
        let placement = match hit.entered_face {
            HitFace::Top => hit.block.above(&self.arena),
            HitFace::Bottom => hit.block.below(&self.arena),
            HitFace::North => hit.block.north(&self.arena),
            HitFace::South => hit.block.south(&self.arena),
            HitFace::East => hit.block.east(&self.arena),
            HitFace::West => hit.block.west(&self.arena),
        };
        let chunk_id = placement.chunk_id()?;
        let local = placement.local_pos()?;
        if let Some(chunk) = self.arena.get_mut(chunk_id) {
            chunk.set_block(local, Block::of_type(block_type));
        }
        self.lighting.on_block_changed(&mut self.arena, self.registry.as_ref(), placement);
        Some(())
    }

    /// Flush every dirty active chunk to disk and stop accepting new
    /// generation jobs. Cancels the worker pool first (unstarted jobs are
    /// dropped, in-flight ones run to completion but their results are
    /// discarded unlinked), then saves every active chunk that still has
    /// unsaved edits, then frees the arena.
    pub fn save_and_shutdown(&mut self) -> anyhow::Result<()> {
        self.worker_pool.cancel_all();
        let _ = self.worker_pool.retrieve_finished();
        self.activation.save_all_dirty(&self.arena)?;
        self.arena = ChunkArena::new();
        self.meshes.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn settle(world: &mut World, ticks: usize) {
        let deadline = Instant::now() + Duration::from_secs(10);
        for _ in 0..ticks {
            world.tick();
        }
        while world.active_chunk_count() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            world.tick();
        }
    }

    #[test]
    fn observer_chunk_eventually_activates_and_meshes() {
        let dir = std::env::temp_dir().join(format!("voxen-world-test-{}", std::process::id()));
        let mut params = WorldParams::default();
        params.save_dir = dir.clone();
        params.activation_range = 1;
        let mut world = World::new(params);
        world.set_observer(ChunkPos::new(0, 0));

        settle(&mut world, 200);

        assert!(world.active_chunk_count() > 0);
        assert!(world.mesh_at(ChunkPos::new(0, 0)).is_some());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn digging_a_block_clears_it() {
        let dir = std::env::temp_dir().join(format!("voxen-world-test-dig-{}", std::process::id()));
        let mut params = WorldParams::default();
        params.save_dir = dir.clone();
        params.activation_range = 1;
        let mut world = World::new(params);
        world.set_observer(ChunkPos::new(0, 0));
        settle(&mut world, 200);

        let hit = world.raycast([8.5, 8.5, 127.0], [0.0, 0.0, -1.0], 200.0);
        if let Some(hit) = hit {
            let local = hit.block.local_pos().unwrap();
            world.dig_at_crosshair([8.5, 8.5, 127.0], [0.0, 0.0, -1.0], 200.0);
            let chunk = world.mesh_at(ChunkPos::new(0, 0));
            assert!(chunk.is_some());
            let _ = local;
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}
