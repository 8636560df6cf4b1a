//! Dirty-queue lighting propagation: indoor (emitter-fed) and outdoor
//! (sky-fed) light, each a 4-bit channel packed into [`crate::block::Block`].
//!
//! Unlike a level-bucketed BFS, this engine keeps one FIFO of
//! [`BlockIterator`]s whose light may be stale. Each tick drains up to a
//! budget of entries; draining a block recomputes its indoor/outdoor level
//! from its live neighbours (`own_emission.max(neighbour - 1)` for indoor,
//! `15` while flagged sky or `neighbour - 1` otherwise for outdoor) and, if
//! the result changed, re-enqueues its neighbours. A per-block dirty flag
//! prevents the same position piling up multiple times in the queue.

use std::collections::VecDeque;

use crate::block::BlockCatalog;
use crate::chunk::{Chunk, ChunkArena, ChunkId, LocalPos, CHUNK_BLOCK_COUNT, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z};
use crate::iterator::BlockIterator;

/// Per-tick drain budget for [`LightEngine::drain_tick`] when the caller
/// doesn't have a more specific figure (see `EngineConfig::light_budget`).
pub const DEFAULT_LIGHT_BUDGET: usize = 4096;

/// FIFO of positions whose light value may no longer match their
/// neighbours.
#[derive(Default)]
pub struct LightEngine {
    queue: VecDeque<BlockIterator>,
}

impl LightEngine {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Enqueue `iter` for relaxation unless it's already queued or off-world.
    pub fn enqueue(&mut self, arena: &mut ChunkArena, iter: BlockIterator) {
        let (Some(chunk_id), Some(local)) = (iter.chunk_id(), iter.local_pos()) else {
            return;
        };
        let Some(chunk) = arena.get_mut(chunk_id) else {
            return;
        };
        let block = chunk.block_mut(local);
        if block.is_light_dirty() {
            return;
        }
        block.set_light_dirty(true);
        self.queue.push_back(iter);
    }

    /// Drain up to `budget` entries, recomputing and propagating light.
    /// Returns the number of entries processed (`< budget` means the queue
    /// ran dry this tick).
    pub fn drain_tick(&mut self, arena: &mut ChunkArena, catalog: &dyn BlockCatalog, budget: usize) -> usize {
        let mut processed = 0;
        while processed < budget {
            let Some(iter) = self.queue.pop_front() else {
                break;
            };
            self.relax_one(arena, catalog, iter);
            processed += 1;
        }
        processed
    }

    fn relax_one(&mut self, arena: &mut ChunkArena, catalog: &dyn BlockCatalog, iter: BlockIterator) {
        let (Some(chunk_id), Some(local)) = (iter.chunk_id(), iter.local_pos()) else {
            return;
        };
        let Some(mut block) = arena.get(chunk_id).map(|c| c.block(local)) else {
            return;
        };

        let opaque = catalog.is_opaque(block.type_index);
        let own_emission = catalog.emission(block.type_index);
        let neighbours = iter.all_neighbours(arena);

        let mut max_indoor = 0u8;
        let mut max_outdoor = 0u8;
        for n in &neighbours {
            if let Some(nb) = n.block(arena) {
                max_indoor = max_indoor.max(nb.indoor());
                max_outdoor = max_outdoor.max(nb.outdoor());
            }
        }

        let new_indoor = if opaque {
            own_emission
        } else {
            own_emission.max(max_indoor.saturating_sub(1))
        };
        let new_outdoor = if opaque {
            0
        } else if block.is_sky() {
            15
        } else {
            max_outdoor.saturating_sub(1)
        };

        let changed = new_indoor != block.indoor() || new_outdoor != block.outdoor();
        block.set_indoor(new_indoor);
        block.set_outdoor(new_outdoor);
        block.set_light_dirty(false);

        if let Some(chunk) = arena.get_mut(chunk_id) {
            if changed {
                chunk.set_block(local, block);
            } else {
                *chunk.block_mut(local) = block;
            }
        }

        if changed {
            for n in neighbours {
                self.enqueue(arena, n);
            }
        }
    }

    /// Seed a freshly-instantiated chunk's sky column and enqueue every
    /// block in it for relaxation. Called once, when a chunk transitions
    /// into the active set.
    pub fn seed_chunk(&mut self, arena: &mut ChunkArena, catalog: &dyn BlockCatalog, chunk_id: ChunkId) {
        {
            let Some(chunk) = arena.get_mut(chunk_id) else {
                return;
            };
            seed_sky_column(chunk, catalog);
        }
        for index in 0..CHUNK_BLOCK_COUNT {
            let local = LocalPos::from_index(index);
            self.enqueue(arena, BlockIterator::new(chunk_id, local));
        }
    }

    /// Re-derive the sky flag strictly downward from an edited block and
    /// enqueue the edited block, its six neighbours, and every position
    /// whose sky flag changed, for relaxation. Stops descending once an
    /// opaque block is reached (nothing below it can be sky-lit) or the
    /// chunk floor is reached.
    pub fn on_block_changed(&mut self, arena: &mut ChunkArena, catalog: &dyn BlockCatalog, iter: BlockIterator) {
        self.enqueue(arena, iter);
        for n in iter.all_neighbours(arena) {
            self.enqueue(arena, n);
        }

        let (Some(chunk_id), Some(start)) = (iter.chunk_id(), iter.local_pos()) else {
            return;
        };

        let mut sky = if start.z as usize == CHUNK_SIZE_Z - 1 {
            true
        } else {
            let above = BlockIterator::new(chunk_id, LocalPos::new(start.x, start.y, start.z + 1));
            above
                .block(arena)
                .map(|b| b.is_sky() && !catalog.is_opaque(b.type_index))
                .unwrap_or(false)
        };

        let mut z = start.z;
        loop {
            let local = LocalPos::new(start.x, start.y, z);
            let Some(mut block) = arena.get(chunk_id).map(|c| c.block(local)) else {
                break;
            };
            let opaque = catalog.is_opaque(block.type_index);
            let new_sky = !opaque && sky;
            if new_sky != block.is_sky() {
                block.set_sky(new_sky);
                if let Some(chunk) = arena.get_mut(chunk_id) {
                    chunk.set_block(local, block);
                }
                self.enqueue(arena, BlockIterator::new(chunk_id, local));
            }
            sky = new_sky;
            if opaque || z == 0 {
                break;
            }
            z -= 1;
        }
    }
}

fn seed_sky_column(chunk: &mut Chunk, catalog: &dyn BlockCatalog) {
    for x in 0..CHUNK_SIZE_X as u8 {
        for y in 0..CHUNK_SIZE_Y as u8 {
            let mut sky = true;
            for z in (0..CHUNK_SIZE_Z as u8).rev() {
                let local = LocalPos::new(x, y, z);
                let mut block = chunk.block(local);
                let opaque = catalog.is_opaque(block.type_index);
                sky = sky && !opaque;
                block.set_sky(sky);
                if sky {
                    block.set_outdoor(15);
                }
                chunk.set_block(local, block);
            }
        }
    }
}
