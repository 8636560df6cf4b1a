//! Cheap by-value block references that navigate across chunk boundaries.
//!
//! A [`BlockIterator`] is `{chunk_id, local_index}` — no heap allocation, no
//! borrow held across calls. Horizontal steps follow the current chunk's
//! neighbour links and may land "off world" if no chunk is loaded there;
//! vertical steps never leave the chunk, since Z is fully contained within
//! one chunk's `CHUNK_SIZE_Z` extent. An off-world iterator is represented as
//! `chunk_id: None` and carries no position; every navigation method is a
//! no-op from off-world.

use crate::chunk::{Chunk, ChunkArena, ChunkId, Direction, LocalPos, CHUNK_SIZE_Z};

/// A `{chunk, index}` pair that can step to adjacent blocks, including across
/// chunk boundaries, without the caller tracking world coordinates by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockIterator {
    chunk_id: Option<ChunkId>,
    local_index: usize,
}

impl BlockIterator {
    pub fn new(chunk_id: ChunkId, local: LocalPos) -> Self {
        Self {
            chunk_id: Some(chunk_id),
            local_index: local.index(),
        }
    }

    /// The off-world sentinel: no chunk, no position.
    pub fn off_world() -> Self {
        Self {
            chunk_id: None,
            local_index: 0,
        }
    }

    pub fn is_off_world(&self) -> bool {
        self.chunk_id.is_none()
    }

    pub fn chunk_id(&self) -> Option<ChunkId> {
        self.chunk_id
    }

    pub fn local_pos(&self) -> Option<LocalPos> {
        self.chunk_id.map(|_| LocalPos::from_index(self.local_index))
    }

    fn with_chunk<'a>(&self, arena: &'a ChunkArena) -> Option<&'a Chunk> {
        self.chunk_id.and_then(|id| arena.get(id))
    }

    pub fn block(&self, arena: &ChunkArena) -> Option<crate::block::Block> {
        self.with_chunk(arena)
            .map(|chunk| chunk.block(LocalPos::from_index(self.local_index)))
    }

    /// Step one block up (+Z). Stays in place (returns a copy of `self`) at
    /// the top of the chunk — there is no vertical cross-chunk link.
    pub fn above(&self, arena: &ChunkArena) -> Self {
        let Some(local) = self.local_pos() else {
            return *self;
        };
        if (local.z as usize) + 1 >= CHUNK_SIZE_Z {
            return *self;
        }
        let Some(chunk_id) = self.chunk_id else {
            return *self;
        };
        let _ = arena;
        Self::new(chunk_id, LocalPos::new(local.x, local.y, local.z + 1))
    }

    /// Step one block down (-Z). Stays in place at the bottom of the chunk.
    pub fn below(&self, arena: &ChunkArena) -> Self {
        let Some(local) = self.local_pos() else {
            return *self;
        };
        if local.z == 0 {
            return *self;
        }
        let Some(chunk_id) = self.chunk_id else {
            return *self;
        };
        let _ = arena;
        Self::new(chunk_id, LocalPos::new(local.x, local.y, local.z - 1))
    }

    fn step_horizontal(&self, arena: &ChunkArena, dir: Direction) -> Self {
        let Some(local) = self.local_pos() else {
            return Self::off_world();
        };
        let Some(chunk_id) = self.chunk_id else {
            return Self::off_world();
        };
        let Some(chunk) = arena.get(chunk_id) else {
            return Self::off_world();
        };

        let at_edge = match dir {
            Direction::North => local.y as usize + 1 >= crate::chunk::CHUNK_SIZE_Y,
            Direction::South => local.y == 0,
            Direction::East => local.x as usize + 1 >= crate::chunk::CHUNK_SIZE_X,
            Direction::West => local.x == 0,
        };

        if !at_edge {
            let next = match dir {
                Direction::North => LocalPos::new(local.x, local.y + 1, local.z),
                Direction::South => LocalPos::new(local.x, local.y - 1, local.z),
                Direction::East => LocalPos::new(local.x + 1, local.y, local.z),
                Direction::West => LocalPos::new(local.x - 1, local.y, local.z),
            };
            return Self::new(chunk_id, next);
        }

        let Some(neighbour_id) = chunk.neighbour(dir) else {
            return Self::off_world();
        };
        let wrapped = match dir {
            Direction::North => LocalPos::new(local.x, 0, local.z),
            Direction::South => LocalPos::new(local.x, (crate::chunk::CHUNK_SIZE_Y - 1) as u8, local.z),
            Direction::East => LocalPos::new(0, local.y, local.z),
            Direction::West => LocalPos::new((crate::chunk::CHUNK_SIZE_X - 1) as u8, local.y, local.z),
        };
        Self::new(neighbour_id, wrapped)
    }

    pub fn north(&self, arena: &ChunkArena) -> Self {
        self.step_horizontal(arena, Direction::North)
    }

    pub fn south(&self, arena: &ChunkArena) -> Self {
        self.step_horizontal(arena, Direction::South)
    }

    pub fn east(&self, arena: &ChunkArena) -> Self {
        self.step_horizontal(arena, Direction::East)
    }

    pub fn west(&self, arena: &ChunkArena) -> Self {
        self.step_horizontal(arena, Direction::West)
    }

    /// All six face-adjacent neighbours, in `North, South, East, West,
    /// Above, Below` order, each possibly off-world.
    pub fn all_neighbours(&self, arena: &ChunkArena) -> [Self; 6] {
        [
            self.north(arena),
            self.south(arena),
            self.east(arena),
            self.west(arena),
            self.above(arena),
            self.below(arena),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Chunk, ChunkPos, CHUNK_SIZE_X, CHUNK_SIZE_Y};

    fn two_chunk_arena() -> (ChunkArena, ChunkId, ChunkId) {
        let mut arena = ChunkArena::new();
        let a = arena.insert(Chunk::new(ChunkPos::new(0, 0)));
        let b = arena.insert(Chunk::new(ChunkPos::new(1, 0)));
        arena.link_neighbours(a);
        arena.link_neighbours(b);
        (arena, a, b)
    }

    #[test]
    fn vertical_step_clamps_at_top_and_bottom() {
        let mut arena = ChunkArena::new();
        let a = arena.insert(Chunk::new(ChunkPos::new(0, 0)));
        let bottom = BlockIterator::new(a, LocalPos::new(0, 0, 0));
        assert_eq!(bottom.below(&arena), bottom);

        let top = BlockIterator::new(a, LocalPos::new(0, 0, (CHUNK_SIZE_Z - 1) as u8));
        assert_eq!(top.above(&arena), top);
    }

    #[test]
    fn horizontal_step_crosses_chunk_boundary() {
        let (arena, a, b) = two_chunk_arena();
        let edge = BlockIterator::new(a, LocalPos::new((CHUNK_SIZE_X - 1) as u8, 5, 10));
        let crossed = edge.east(&arena);
        assert_eq!(crossed.chunk_id(), Some(b));
        assert_eq!(crossed.local_pos(), Some(LocalPos::new(0, 5, 10)));
    }

    #[test]
    fn horizontal_step_goes_off_world_without_neighbour() {
        let mut arena = ChunkArena::new();
        let a = arena.insert(Chunk::new(ChunkPos::new(0, 0)));
        let edge = BlockIterator::new(a, LocalPos::new((CHUNK_SIZE_X - 1) as u8, 0, 0));
        assert!(edge.east(&arena).is_off_world());
    }

    #[test]
    fn off_world_iterator_is_inert() {
        let arena = ChunkArena::new();
        let off = BlockIterator::off_world();
        assert!(off.north(&arena).is_off_world());
        assert!(off.above(&arena).is_off_world());
        assert!(off.block(&arena).is_none());
    }

    #[test]
    fn north_south_roundtrip_returns_to_start() {
        let mut arena = ChunkArena::new();
        let a = arena.insert(Chunk::new(ChunkPos::new(0, 0)));
        let start = BlockIterator::new(a, LocalPos::new(3, 3, 3));
        let back = start.north(&arena).south(&arena);
        assert_eq!(back, start);
        let _ = CHUNK_SIZE_Y;
    }
}
