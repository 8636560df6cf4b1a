//! Chunk activation/deactivation around an observer.
//!
//! Each tick does at most one instantiate, one activate, and one deactivate,
//! so a fast-moving observer spreads its chunk churn across many ticks
//! instead of spiking on the frame it crosses a chunk boundary. "Instantiate"
//! means a chunk exists in the arena but isn't lit, meshed, or
//! neighbour-linked yet; "activate" does that linking/lighting and flips it
//! live; "deactivate" saves (if dirty) and evicts a chunk that's drifted
//! past the deactivation range, which is always >= the activation range so
//! a chunk doesn't immediately re-trigger generation after being dropped.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use crate::block::BlockCatalog;
use crate::chunk::{ChunkArena, ChunkLifecycle, ChunkPos};
use crate::generator::CrossChunkWrite;
use crate::lighting::LightEngine;
use crate::persist::ChunkStore;
use crate::worker::WorkerPool;

/// Activation/deactivation radii, in chunks, and the resulting active-chunk
/// ceiling.
#[derive(Debug, Clone, Copy)]
pub struct ActivationConfig {
    pub activation_range: i32,
    pub deactivation_range: i32,
    pub max_active_chunks: usize,
}

impl ActivationConfig {
    /// Derive a deactivation range one chunk wider than `activation_range`
    /// (hysteresis so a chunk sitting right at the boundary doesn't
    /// oscillate) and a `max_active_chunks` ceiling sized to the
    /// deactivation range's full square footprint.
    pub fn with_activation_range(activation_range: i32) -> Self {
        let deactivation_range = activation_range + 1;
        let side = (2 * deactivation_range + 1) as usize;
        Self {
            activation_range,
            deactivation_range,
            max_active_chunks: side * side,
        }
    }
}

/// Drives chunk lifecycle transitions around a moving observer.
pub struct ActivationSystem {
    config: ActivationConfig,
    store: ChunkStore,
    pending_generation: HashSet<ChunkPos>,
    pending_cross_chunk_writes: HashMap<ChunkPos, Vec<CrossChunkWrite>>,
}

impl ActivationSystem {
    pub fn new(config: ActivationConfig, store: ChunkStore) -> Self {
        Self {
            config,
            store,
            pending_generation: HashSet::new(),
            pending_cross_chunk_writes: HashMap::new(),
        }
    }

    pub fn config(&self) -> ActivationConfig {
        self.config
    }

    /// Run one tick's worth of activation bookkeeping.
    pub fn tick(
        &mut self,
        arena: &mut ChunkArena,
        worker_pool: &WorkerPool,
        light_engine: &mut LightEngine,
        catalog: &dyn BlockCatalog,
        observer: ChunkPos,
    ) {
        self.absorb_finished_generation(arena, worker_pool);
        self.instantiate_one(arena, worker_pool, observer);
        self.activate_one(arena, light_engine, catalog, observer);
        self.deactivate_one(arena, observer);
    }

    fn absorb_finished_generation(&mut self, arena: &mut ChunkArena, worker_pool: &WorkerPool) {
        for result in worker_pool.retrieve_finished() {
            self.pending_generation.remove(&result.position);
            if arena.contains_position(result.position) {
                continue;
            }
            let mut chunk = result.generated.chunk;

            if let Some(writes) = self.pending_cross_chunk_writes.remove(&result.position) {
                for write in writes {
                    chunk.set_block(write.local, write.block);
                }
            }

            arena.insert(chunk);

            for write in result.generated.cross_chunk_writes {
                if let Some(target_id) = arena.id_at(write.target) {
                    if let Some(target_chunk) = arena.get_mut(target_id) {
                        target_chunk.set_block(write.local, write.block);
                        continue;
                    }
                }
                // Target chunk doesn't exist yet (or ever will); queue the
                // write and let it be silently dropped if the chunk never
                // materializes before this entry is overwritten or the
                // world shuts down.
                self.pending_cross_chunk_writes
                    .entry(write.target)
                    .or_default()
                    .push(write);
            }
        }
    }

    #[instrument(skip(self, arena, worker_pool))]
    fn instantiate_one(&mut self, arena: &mut ChunkArena, worker_pool: &WorkerPool, observer: ChunkPos) {
        if arena.len() >= self.config.max_active_chunks {
            return;
        }
        let Some(target) = self.nearest_missing_position(arena, observer) else {
            return;
        };

        if let Ok(Some(chunk)) = self.store.load_chunk(target) {
            debug!(?target, "loaded chunk from disk instead of generating");
            arena.insert(chunk);
            return;
        }

        self.pending_generation.insert(target);
        worker_pool.submit(target);
    }

    fn nearest_missing_position(&self, arena: &ChunkArena, observer: ChunkPos) -> Option<ChunkPos> {
        let range = self.config.activation_range;
        let mut best: Option<(i64, ChunkPos)> = None;
        for dx in -range..=range {
            for dy in -range..=range {
                let pos = ChunkPos::new(observer.x + dx, observer.y + dy);
                if arena.contains_position(pos) || self.pending_generation.contains(&pos) {
                    continue;
                }
                let dist = pos.distance_squared(observer);
                if dist > (range as i64) * (range as i64) {
                    continue;
                }
                if best.map(|(best_dist, _)| dist < best_dist).unwrap_or(true) {
                    best = Some((dist, pos));
                }
            }
        }
        best.map(|(_, pos)| pos)
    }

    fn activate_one(
        &mut self,
        arena: &mut ChunkArena,
        light_engine: &mut LightEngine,
        catalog: &dyn BlockCatalog,
        observer: ChunkPos,
    ) {
        let range_sq = (self.config.activation_range as i64) * (self.config.activation_range as i64);
        let candidate = arena
            .iter()
            .filter(|(_, chunk)| chunk.lifecycle == ChunkLifecycle::Instantiated)
            .filter(|(_, chunk)| chunk.position.distance_squared(observer) <= range_sq)
            .min_by_key(|(_, chunk)| chunk.position.distance_squared(observer))
            .map(|(id, _)| id);

        if let Some(id) = candidate {
            arena.link_neighbours(id);
            light_engine.seed_chunk(arena, catalog, id);
            if let Some(chunk) = arena.get_mut(id) {
                chunk.lifecycle = ChunkLifecycle::Active;
            }
        }
    }

    /// Save every active chunk that still has unsaved edits. Unlike
    /// `deactivate_one`'s one-chunk-per-tick pacing, this is meant for
    /// world shutdown, where every active chunk needs to be flushed at
    /// once rather than trickled out over many ticks.
    pub fn save_all_dirty(&self, arena: &ChunkArena) -> anyhow::Result<()> {
        for (_, chunk) in arena.iter() {
            if chunk.lifecycle == ChunkLifecycle::Active && chunk.dirty.contains(crate::chunk::DirtyFlags::NEEDS_SAVE) {
                self.store.save_chunk(chunk)?;
            }
        }
        Ok(())
    }

    fn deactivate_one(&mut self, arena: &mut ChunkArena, observer: ChunkPos) {
        let range_sq = (self.config.deactivation_range as i64) * (self.config.deactivation_range as i64);
        let candidate = arena
            .iter()
            .filter(|(_, chunk)| chunk.lifecycle == ChunkLifecycle::Active)
            .filter(|(_, chunk)| chunk.position.distance_squared(observer) > range_sq)
            .max_by_key(|(_, chunk)| chunk.position.distance_squared(observer))
            .map(|(id, _)| id);

        if let Some(id) = candidate {
            if let Some(chunk) = arena.get(id) {
                if chunk.dirty.contains(crate::chunk::DirtyFlags::NEEDS_SAVE) {
                    if let Err(err) = self.store.save_chunk(chunk) {
                        tracing::warn!(?err, position = ?chunk.position, "failed to save chunk on deactivation");
                    }
                }
            }
            arena.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::standard_registry;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn drain_until_instantiated(
        system: &mut ActivationSystem,
        arena: &mut ChunkArena,
        pool: &WorkerPool,
        observer: ChunkPos,
    ) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !arena.contains_position(observer) && Instant::now() < deadline {
            system.absorb_finished_generation(arena, pool);
            system.instantiate_one(arena, pool, observer);
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn instantiate_then_activate_then_deactivate() {
        let (registry, blocks) = standard_registry();
        let registry = Arc::new(registry);
        let pool = WorkerPool::new(2, 7, Arc::clone(&registry), blocks);
        let dir = std::env::temp_dir().join(format!("voxen-activation-test-{}", std::process::id()));
        let config = ActivationConfig::with_activation_range(1);
        let mut system = ActivationSystem::new(config, ChunkStore::new(&dir));
        let mut arena = ChunkArena::new();
        let mut light_engine = LightEngine::new();
        let observer = ChunkPos::new(0, 0);

        drain_until_instantiated(&mut system, &mut arena, &pool, observer);
        assert!(arena.contains_position(observer));
        assert_eq!(
            arena.get_at(observer).unwrap().lifecycle,
            ChunkLifecycle::Instantiated
        );

        system.activate_one(&mut arena, &mut light_engine, registry.as_ref(), observer);
        assert_eq!(arena.get_at(observer).unwrap().lifecycle, ChunkLifecycle::Active);

        system.deactivate_one(&mut arena, ChunkPos::new(50, 50));
        assert!(!arena.contains_position(observer));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
