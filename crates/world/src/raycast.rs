//! Amanatides-Woo voxel raycasting.
//!
//! Walks a ray through the block grid one cell at a time, always stepping
//! into whichever of the three axes reaches its next grid boundary soonest,
//! so it visits every block the ray actually passes through and none it
//! doesn't. Chunk-boundary crossings fall out of reusing
//! [`crate::iterator::BlockIterator`]'s own neighbour-stepping rather than
//! tracking chunk coordinates by hand.

use crate::block::BlockCatalog;
use crate::chunk::{ChunkArena, ChunkPos, LocalPos, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z};
use crate::iterator::BlockIterator;

/// Which face of the hit block the ray entered through, useful for
/// deciding where a placed block should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitFace {
    Top,
    Bottom,
    North,
    South,
    East,
    West,
}

/// A solid block the ray reached.
#[derive(Debug, Clone, Copy)]
pub struct RaycastHit {
    pub block: BlockIterator,
    pub distance: f64,
    pub entered_face: HitFace,
}

/// Cast a ray from `origin` (world-space block coordinates, fractional)
/// along `direction` (need not be normalized) for up to `max_distance`
/// world units. Returns the first solid block struck, if any.
pub fn cast_ray(
    arena: &ChunkArena,
    catalog: &dyn BlockCatalog,
    origin: [f64; 3],
    direction: [f64; 3],
    max_distance: f64,
) -> Option<RaycastHit> {
    let len = (direction[0] * direction[0] + direction[1] * direction[1] + direction[2] * direction[2]).sqrt();
    if len < 1e-9 {
        return None;
    }
    let dir = [direction[0] / len, direction[1] / len, direction[2] / len];

    let mut ix = origin[0].floor() as i64;
    let mut iy = origin[1].floor() as i64;
    let mut iz = origin[2].floor() as i64;
    if iz < 0 || iz >= CHUNK_SIZE_Z as i64 {
        return None;
    }

    let chunk_pos = ChunkPos::containing(ix, iy);
    let Some(chunk_id) = arena.id_at(chunk_pos) else {
        return None;
    };
    let local = LocalPos::new(
        ix.rem_euclid(CHUNK_SIZE_X as i64) as u8,
        iy.rem_euclid(CHUNK_SIZE_Y as i64) as u8,
        iz as u8,
    );
    let mut current = BlockIterator::new(chunk_id, local);
    let mut entered_face = HitFace::Top;

    let (step_x, mut t_max_x, t_delta_x) = init_axis(origin[0], dir[0], ix);
    let (step_y, mut t_max_y, t_delta_y) = init_axis(origin[1], dir[1], iy);
    let (step_z, mut t_max_z, t_delta_z) = init_axis(origin[2], dir[2], iz);

    let mut t = 0.0;
    loop {
        if current.is_off_world() {
            return None;
        }
        match current.block(arena) {
            Some(block) if catalog.is_solid(block.type_index) => {
                return Some(RaycastHit {
                    block: current,
                    distance: t,
                    entered_face,
                });
            }
            Some(_) => {}
            None => return None,
        }

        if t_max_x <= t_max_y && t_max_x <= t_max_z {
            t = t_max_x;
            t_max_x += t_delta_x;
            ix += step_x;
            current = if step_x > 0 { current.east(arena) } else { current.west(arena) };
            entered_face = if step_x > 0 { HitFace::West } else { HitFace::East };
        } else if t_max_y <= t_max_z {
            t = t_max_y;
            t_max_y += t_delta_y;
            iy += step_y;
            current = if step_y > 0 { current.north(arena) } else { current.south(arena) };
            entered_face = if step_y > 0 { HitFace::South } else { HitFace::North };
        } else {
            t = t_max_z;
            t_max_z += t_delta_z;
            iz += step_z;
            if iz < 0 || iz >= CHUNK_SIZE_Z as i64 {
                return None;
            }
            current = if step_z > 0 { current.above(arena) } else { current.below(arena) };
            entered_face = if step_z > 0 { HitFace::Bottom } else { HitFace::Top };
        }

        if t > max_distance {
            return None;
        }
    }
}

fn init_axis(origin: f64, dir: f64, icoord: i64) -> (i64, f64, f64) {
    if dir > 0.0 {
        (1, ((icoord as f64 + 1.0) - origin) / dir, 1.0 / dir)
    } else if dir < 0.0 {
        (-1, ((icoord as f64) - origin) / dir, -1.0 / dir)
    } else {
        (0, f64::INFINITY, f64::INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{standard_registry, Block};
    use crate::chunk::Chunk;

    #[test]
    fn ray_straight_down_hits_the_surface() {
        let (registry, blocks) = standard_registry();
        let mut arena = ChunkArena::new();
        let id = arena.insert(Chunk::new(ChunkPos::new(0, 0)));
        {
            let chunk = arena.get_mut(id).unwrap();
            chunk.set_block(LocalPos::new(8, 8, 10), Block::of_type(blocks.stone));
        }
        let hit = cast_ray(&arena, &registry, [8.5, 8.5, 20.0], [0.0, 0.0, -1.0], 100.0).unwrap();
        assert_eq!(hit.block.local_pos(), Some(LocalPos::new(8, 8, 10)));
        assert_eq!(hit.entered_face, HitFace::Top);
    }

    #[test]
    fn ray_beyond_max_distance_misses() {
        let (registry, _blocks) = standard_registry();
        let mut arena = ChunkArena::new();
        arena.insert(Chunk::new(ChunkPos::new(0, 0)));
        let hit = cast_ray(&arena, &registry, [0.5, 0.5, 127.0], [0.0, 0.0, -1.0], 1.0);
        assert!(hit.is_none());
    }

    #[test]
    fn ray_through_empty_chunk_exits_off_world() {
        let (registry, _blocks) = standard_registry();
        let mut arena = ChunkArena::new();
        arena.insert(Chunk::new(ChunkPos::new(0, 0)));
        let hit = cast_ray(&arena, &registry, [8.0, 8.0, 64.0], [1.0, 0.0, 0.0], 1000.0);
        assert!(hit.is_none());
    }

    #[test]
    fn horizontal_ray_crosses_into_neighbour_chunk() {
        let (registry, blocks) = standard_registry();
        let mut arena = ChunkArena::new();
        let a = arena.insert(Chunk::new(ChunkPos::new(0, 0)));
        let b = arena.insert(Chunk::new(ChunkPos::new(1, 0)));
        arena.link_neighbours(a);
        arena.link_neighbours(b);
        {
            let chunk = arena.get_mut(b).unwrap();
            chunk.set_block(LocalPos::new(2, 8, 64), Block::of_type(blocks.stone));
        }
        let hit = cast_ray(&arena, &registry, [10.5, 8.5, 64.5], [1.0, 0.0, 0.0], 100.0).unwrap();
        assert_eq!(hit.block.chunk_id(), Some(b));
        assert_eq!(hit.block.local_pos(), Some(LocalPos::new(2, 8, 64)));
    }
}
