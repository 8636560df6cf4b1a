//! Chunk storage, coordinates, and the arena that owns active chunks.
//!
//! Chunks are fixed at `16 x 16 x 128` blocks (`X`, `Y` horizontal, `Z`
//! vertical), each dimension a power of two so that local-position math is
//! shift/mask rather than multiply/divide. Chunks never hold pointers to
//! their neighbours directly; instead a [`Chunk`] stores the four horizontal
//! neighbours' [`ChunkId`]s, which index into a [`ChunkArena`]. Lookups
//! through a stale `ChunkId` (one whose generation no longer matches) return
//! `None` rather than dangling, which is what lets deactivation drop a chunk
//! without walking the world to scrub raw pointers first.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::block::Block;

/// log2(16).
pub const CHUNK_BITS_X: u32 = 4;
/// log2(16).
pub const CHUNK_BITS_Y: u32 = 4;
/// log2(128).
pub const CHUNK_BITS_Z: u32 = 7;

pub const CHUNK_SIZE_X: usize = 1 << CHUNK_BITS_X;
pub const CHUNK_SIZE_Y: usize = 1 << CHUNK_BITS_Y;
pub const CHUNK_SIZE_Z: usize = 1 << CHUNK_BITS_Z;
pub const CHUNK_BLOCK_COUNT: usize = CHUNK_SIZE_X * CHUNK_SIZE_Y * CHUNK_SIZE_Z;

const MASK_X: i64 = (CHUNK_SIZE_X as i64) - 1;
const MASK_Y: i64 = (CHUNK_SIZE_Y as i64) - 1;

/// World-space coordinate of a chunk (in chunk units, not blocks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
}

impl ChunkPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The chunk containing the given world-block coordinate.
    pub fn containing(world_x: i64, world_y: i64) -> Self {
        Self {
            x: world_x.div_euclid(CHUNK_SIZE_X as i64) as i32,
            y: world_y.div_euclid(CHUNK_SIZE_Y as i64) as i32,
        }
    }

    pub fn north(self) -> Self {
        Self::new(self.x, self.y + 1)
    }

    pub fn south(self) -> Self {
        Self::new(self.x, self.y - 1)
    }

    pub fn east(self) -> Self {
        Self::new(self.x + 1, self.y)
    }

    pub fn west(self) -> Self {
        Self::new(self.x - 1, self.y)
    }

    /// Squared chessboard-free Euclidean distance to another chunk, used by
    /// activation-range checks.
    pub fn distance_squared(self, other: ChunkPos) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// A stable hash usable as the chunk-scoped domain of [`voxen_core::scoped_rng`].
    pub fn stable_hash(self) -> u64 {
        let x = self.x as u32 as u64;
        let y = self.y as u32 as u64;
        x.wrapping_mul(0x9E3779B97F4A7C15) ^ y.wrapping_mul(0xC2B2AE3D27D4EB4F)
    }
}

/// A chunk's world-space axis-aligned bounding box, in block units. Cached
/// on construction since it's a pure function of `position` and the fixed
/// chunk dimensions, and consulted often enough (frustum/AABB queries) that
/// recomputing it each time would be wasteful.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl WorldBounds {
    fn for_chunk(position: ChunkPos) -> Self {
        let min_x = position.x as f64 * CHUNK_SIZE_X as f64;
        let min_y = position.y as f64 * CHUNK_SIZE_Y as f64;
        Self {
            min: [min_x, min_y, 0.0],
            max: [min_x + CHUNK_SIZE_X as f64, min_y + CHUNK_SIZE_Y as f64, CHUNK_SIZE_Z as f64],
        }
    }
}

/// Position of a block within a chunk, each axis already known to be in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl LocalPos {
    pub fn new(x: u8, y: u8, z: u8) -> Self {
        debug_assert!((x as usize) < CHUNK_SIZE_X);
        debug_assert!((y as usize) < CHUNK_SIZE_Y);
        debug_assert!((z as usize) < CHUNK_SIZE_Z);
        Self { x, y, z }
    }

    /// `x | y << 4 | z << 8` linear index into the chunk's flat block array.
    #[inline]
    pub fn index(self) -> usize {
        (self.x as usize) | ((self.y as usize) << CHUNK_BITS_X) | ((self.z as usize) << (CHUNK_BITS_X + CHUNK_BITS_Y))
    }

    #[inline]
    pub fn from_index(index: usize) -> Self {
        let x = (index & MASK_X as usize) as u8;
        let y = ((index >> CHUNK_BITS_X) & MASK_Y as usize) as u8;
        let z = (index >> (CHUNK_BITS_X + CHUNK_BITS_Y)) as u8;
        Self { x, y, z }
    }
}

bitflags! {
    /// Coarse work-pending flags for a chunk, independent of per-block
    /// lighting dirtiness (tracked per-voxel in [`Block`]).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DirtyFlags: u8 {
        /// The GPU-facing mesh no longer reflects block state.
        const MESH = 0b0000_0001;
        /// The chunk has unsaved edits since it was loaded/generated.
        const NEEDS_SAVE = 0b0000_0010;
    }
}

/// Lifecycle stage of a chunk as tracked by the world orchestrator. See
/// [`crate::worker`] for the generation-side counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLifecycle {
    /// Queued for generation, not yet returned by a worker.
    QueuedForGeneration,
    /// Generated and present in the arena, but not yet lit or meshed.
    Instantiated,
    /// Fully active: lit, meshed, neighbour-linked.
    Active,
}

/// A generational arena index. Stale ids (wrong generation, or an index
/// whose slot has been reused) resolve to `None` rather than a dangling
/// reference, so a horizontal-neighbour link surviving past a deactivation
/// can never alias a newer chunk occupying the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId {
    index: u32,
    generation: u32,
}

/// One chunk's data: blocks, lifecycle, neighbour links, and dirty flags.
pub struct Chunk {
    pub position: ChunkPos,
    pub lifecycle: ChunkLifecycle,
    pub dirty: DirtyFlags,
    bounds: WorldBounds,
    blocks: Box<[Block; CHUNK_BLOCK_COUNT]>,
    /// Horizontal neighbour links. Vertical neighbours don't exist: Z is
    /// bounded within a single chunk, so "above"/"below" navigation only
    /// ever moves within `blocks` (see [`crate::iterator::BlockIterator`]).
    pub north: Option<ChunkId>,
    pub south: Option<ChunkId>,
    pub east: Option<ChunkId>,
    pub west: Option<ChunkId>,
}

impl Chunk {
    /// A freshly-instantiated, all-air chunk at the given position.
    pub fn new(position: ChunkPos) -> Self {
        Self {
            position,
            lifecycle: ChunkLifecycle::Instantiated,
            dirty: DirtyFlags::MESH,
            bounds: WorldBounds::for_chunk(position),
            blocks: Box::new([Block::AIR; CHUNK_BLOCK_COUNT]),
            north: None,
            south: None,
            east: None,
            west: None,
        }
    }

    /// This chunk's cached world-space bounding box.
    #[inline]
    pub fn world_bounds(&self) -> WorldBounds {
        self.bounds
    }

    #[inline]
    pub fn block(&self, pos: LocalPos) -> Block {
        self.blocks[pos.index()]
    }

    #[inline]
    pub fn block_mut(&mut self, pos: LocalPos) -> &mut Block {
        &mut self.blocks[pos.index()]
    }

    /// Overwrite a block, marking the chunk's mesh and save-pending flags
    /// dirty only if the stored value actually changed.
    pub fn set_block(&mut self, pos: LocalPos, block: Block) {
        let slot = &mut self.blocks[pos.index()];
        if *slot != block {
            *slot = block;
            self.dirty |= DirtyFlags::MESH | DirtyFlags::NEEDS_SAVE;
        }
    }

    /// Direct slice access for bulk generation and RLE (de)serialization.
    pub fn blocks(&self) -> &[Block; CHUNK_BLOCK_COUNT] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [Block; CHUNK_BLOCK_COUNT] {
        &mut self.blocks
    }

    pub fn neighbour(&self, dir: Direction) -> Option<ChunkId> {
        match dir {
            Direction::North => self.north,
            Direction::South => self.south,
            Direction::East => self.east,
            Direction::West => self.west,
        }
    }

    fn set_neighbour(&mut self, dir: Direction, id: Option<ChunkId>) {
        match dir {
            Direction::North => self.north = id,
            Direction::South => self.south = id,
            Direction::East => self.east = id,
            Direction::West => self.west = id,
        }
    }
}

/// The four horizontal directions a chunk can link to a neighbour along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    pub fn offset(self, pos: ChunkPos) -> ChunkPos {
        match self {
            Direction::North => pos.north(),
            Direction::South => pos.south(),
            Direction::East => pos.east(),
            Direction::West => pos.west(),
        }
    }

    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];
}

struct Slot {
    chunk: Option<Chunk>,
    generation: u32,
}

/// Owns every active chunk. Chunks are addressed by [`ChunkId`], never by
/// raw reference, so activation/deactivation never needs an `unsafe` pointer
/// dance to keep neighbour links valid.
#[derive(Default)]
pub struct ChunkArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_position: std::collections::HashMap<ChunkPos, ChunkId>,
}

impl ChunkArena {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            by_position: std::collections::HashMap::new(),
        }
    }

    /// Insert a chunk, returning its id. Panics if a chunk already occupies
    /// `chunk.position` (callers must check [`ChunkArena::id_at`] first).
    pub fn insert(&mut self, chunk: Chunk) -> ChunkId {
        assert!(
            !self.by_position.contains_key(&chunk.position),
            "duplicate chunk at {:?}",
            chunk.position
        );
        let position = chunk.position;
        let id = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.chunk = Some(chunk);
            ChunkId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                chunk: Some(chunk),
                generation: 0,
            });
            ChunkId {
                index,
                generation: 0,
            }
        };
        self.by_position.insert(position, id);
        id
    }

    /// Remove a chunk, unlinking it from any neighbours that still point to
    /// it. Returns the removed chunk so the caller can persist it.
    pub fn remove(&mut self, id: ChunkId) -> Option<Chunk> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let chunk = slot.chunk.take()?;
        self.free.push(id.index);
        self.by_position.remove(&chunk.position);
        for dir in Direction::ALL {
            if let Some(neighbour_id) = chunk.neighbour(dir) {
                if let Some(neighbour) = self.get_mut(neighbour_id) {
                    neighbour.set_neighbour(dir.opposite(), None);
                }
            }
        }
        Some(chunk)
    }

    pub fn get(&self, id: ChunkId) -> Option<&Chunk> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.chunk.as_ref())
    }

    pub fn get_mut(&mut self, id: ChunkId) -> Option<&mut Chunk> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.chunk.as_mut())
    }

    pub fn id_at(&self, position: ChunkPos) -> Option<ChunkId> {
        self.by_position.get(&position).copied()
    }

    pub fn get_at(&self, position: ChunkPos) -> Option<&Chunk> {
        self.id_at(position).and_then(|id| self.get(id))
    }

    pub fn contains_position(&self, position: ChunkPos) -> bool {
        self.by_position.contains_key(&position)
    }

    pub fn len(&self) -> usize {
        self.by_position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_position.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkId, &Chunk)> {
        self.by_position.values().filter_map(move |&id| {
            self.get(id).map(|chunk| (id, chunk))
        })
    }

    /// Link `id` to whichever of its four horizontal neighbours are present
    /// in the arena, symmetrically (both sides of each link are set).
    pub fn link_neighbours(&mut self, id: ChunkId) {
        let Some(position) = self.get(id).map(|c| c.position) else {
            return;
        };
        for dir in Direction::ALL {
            let neighbour_pos = dir.offset(position);
            if let Some(neighbour_id) = self.id_at(neighbour_pos) {
                if let Some(chunk) = self.get_mut(id) {
                    chunk.set_neighbour(dir, Some(neighbour_id));
                }
                if let Some(neighbour) = self.get_mut(neighbour_id) {
                    neighbour.set_neighbour(dir.opposite(), Some(id));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_pos_index_roundtrips() {
        for x in [0u8, 1, 15] {
            for y in [0u8, 1, 15] {
                for z in [0u8, 1, 64, 127] {
                    let pos = LocalPos::new(x, y, z);
                    assert_eq!(LocalPos::from_index(pos.index()), pos);
                }
            }
        }
    }

    #[test]
    fn set_block_only_dirties_on_change() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        chunk.dirty = DirtyFlags::empty();
        let pos = LocalPos::new(1, 1, 1);
        chunk.set_block(pos, Block::AIR);
        assert!(chunk.dirty.is_empty());
        chunk.set_block(pos, Block::of_type(3));
        assert!(chunk.dirty.contains(DirtyFlags::MESH));
    }

    #[test]
    fn arena_links_are_symmetric_and_invalidated_on_removal() {
        let mut arena = ChunkArena::new();
        let a = arena.insert(Chunk::new(ChunkPos::new(0, 0)));
        let b = arena.insert(Chunk::new(ChunkPos::new(1, 0)));
        arena.link_neighbours(a);
        arena.link_neighbours(b);

        assert_eq!(arena.get(a).unwrap().east, Some(b));
        assert_eq!(arena.get(b).unwrap().west, Some(a));

        arena.remove(a);
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b).unwrap().west, None);
    }

    #[test]
    fn stale_chunk_id_does_not_alias_reused_slot() {
        let mut arena = ChunkArena::new();
        let a = arena.insert(Chunk::new(ChunkPos::new(0, 0)));
        arena.remove(a);
        let b = arena.insert(Chunk::new(ChunkPos::new(0, 0)));
        assert_ne!(a, b);
        assert!(arena.get(a).is_none());
        assert!(arena.get(b).is_some());
    }

    #[test]
    fn world_bounds_track_chunk_position() {
        let chunk = Chunk::new(ChunkPos::new(2, -1));
        let bounds = chunk.world_bounds();
        assert_eq!(bounds.min, [32.0, -16.0, 0.0]);
        assert_eq!(bounds.max, [48.0, 0.0, 128.0]);
    }

    #[test]
    fn chunk_pos_containing_handles_negative_world_coords() {
        assert_eq!(ChunkPos::containing(-1, -1), ChunkPos::new(-1, -1));
        assert_eq!(ChunkPos::containing(0, 0), ChunkPos::new(0, 0));
        assert_eq!(
            ChunkPos::containing(-(CHUNK_SIZE_X as i64) - 1, 0),
            ChunkPos::new(-2, 0)
        );
    }
}
