//! Test helpers shared across `voxen-world`'s property and integration
//! tests: quick arena/chunk builders plus `proptest` strategies for the
//! coordinate and seed types tests generate most often.

use proptest::prelude::*;
use voxen_world::{Chunk, ChunkArena, ChunkId, ChunkPos, LocalPos};

/// Build an arena containing one freshly-instantiated chunk per position in
/// `positions`, with every pair of adjacent positions already
/// neighbour-linked — the steady-state an [`voxen_world::activation`] system
/// would eventually reach on its own, without waiting out the one-per-tick
/// pacing in a test.
pub fn arena_with_chunks(positions: &[ChunkPos]) -> (ChunkArena, Vec<ChunkId>) {
    let mut arena = ChunkArena::new();
    let mut ids = Vec::with_capacity(positions.len());
    for &position in positions {
        ids.push(arena.insert(Chunk::new(position)));
    }
    for &id in &ids {
        arena.link_neighbours(id);
    }
    (arena, ids)
}

/// A `3x3` block of chunks centered on `(0, 0)`, fully linked.
pub fn arena_with_3x3_block() -> (ChunkArena, Vec<ChunkId>) {
    let mut positions = Vec::with_capacity(9);
    for x in -1..=1 {
        for y in -1..=1 {
            positions.push(ChunkPos::new(x, y));
        }
    }
    arena_with_chunks(&positions)
}

/// `proptest` strategy for a chunk position within a modest world radius,
/// wide enough to exercise cross-chunk boundaries without ranging so far
/// that shrinking gets expensive.
pub fn arb_chunk_pos() -> impl Strategy<Value = ChunkPos> {
    (-64i32..64, -64i32..64).prop_map(|(x, y)| ChunkPos::new(x, y))
}

/// `proptest` strategy for a local position within a single chunk.
pub fn arb_local_pos() -> impl Strategy<Value = LocalPos> {
    (0u8..16, 0u8..16, 0u8..128).prop_map(|(x, y, z)| LocalPos::new(x, y, z))
}

/// `proptest` strategy for a world seed, including the zero and max edges.
pub fn arb_world_seed() -> impl Strategy<Value = u64> {
    prop_oneof![Just(0u64), Just(u64::MAX), any::<u64>()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_by_three_block_links_the_center_to_all_four_neighbours() {
        let (arena, ids) = arena_with_3x3_block();
        let center_id = arena.id_at(ChunkPos::new(0, 0)).unwrap();
        assert_eq!(center_id, ids[4]);
        let center = arena.get(center_id).unwrap();
        assert!(center.north.is_some());
        assert!(center.south.is_some());
        assert!(center.east.is_some());
        assert!(center.west.is_some());
    }
}
