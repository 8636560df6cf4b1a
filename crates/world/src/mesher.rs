//! Incremental mesh regeneration.
//!
//! Produces two vertex/index buffers per chunk — opaque and translucent —
//! the way a forward-rendered voxel game separates its draw passes. A face
//! is culled when the neighbouring block (possibly in an adjacent chunk,
//! via [`crate::iterator::BlockIterator`]) is opaque; water only ever emits
//! its top face and is pushed to the translucent pass with a lowered alpha,
//! carrying a blue-channel tell at exactly sea level the way the original
//! water shading did. Vertex color is lighting, not albedo: `r`/`g` encode
//! outdoor/indoor light scaled from 4-bit to 8-bit (`level * 17`, so 15 maps
//! to 255 exactly); texture UVs carry the block's own appearance. A block
//! mid-dig gets its visible faces duplicated into the translucent pass with
//! the crack overlay UV for its current [`crate::block::Block::dig_state`].

use crate::block::{BlockCatalog, BlockRegistry, BlockTypeIndex, UvRect};
use crate::chunk::{Chunk, ChunkArena, ChunkId, LocalPos};
use crate::generator::SEA_LEVEL;
use crate::iterator::BlockIterator;
use crate::Block;

/// One mesh vertex: position, texture coordinate, and packed light color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub color: [u8; 4],
}

/// Opaque and translucent draw buffers for one chunk.
#[derive(Debug, Default, Clone)]
pub struct MeshBuffers {
    pub opaque_vertices: Vec<Vertex>,
    pub opaque_indices: Vec<u32>,
    pub translucent_vertices: Vec<Vertex>,
    pub translucent_indices: Vec<u32>,
}

impl MeshBuffers {
    fn push_quad(vertices: &mut Vec<Vertex>, indices: &mut Vec<u32>, quad: [Vertex; 4]) {
        let base = vertices.len() as u32;
        vertices.extend_from_slice(&quad);
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

#[derive(Debug, Clone, Copy)]
enum Face {
    Top,
    Bottom,
    North,
    South,
    East,
    West,
}

const ALL_FACES: [Face; 6] = [Face::Top, Face::Bottom, Face::North, Face::South, Face::East, Face::West];

impl Face {
    fn corners(self, x: f32, y: f32, z: f32) -> [[f32; 3]; 4] {
        match self {
            Face::Top => [
                [x, y, z + 1.0],
                [x + 1.0, y, z + 1.0],
                [x + 1.0, y + 1.0, z + 1.0],
                [x, y + 1.0, z + 1.0],
            ],
            Face::Bottom => [
                [x, y + 1.0, z],
                [x + 1.0, y + 1.0, z],
                [x + 1.0, y, z],
                [x, y, z],
            ],
            Face::North => [
                [x + 1.0, y + 1.0, z],
                [x, y + 1.0, z],
                [x, y + 1.0, z + 1.0],
                [x + 1.0, y + 1.0, z + 1.0],
            ],
            Face::South => [
                [x, y, z],
                [x + 1.0, y, z],
                [x + 1.0, y, z + 1.0],
                [x, y, z + 1.0],
            ],
            Face::East => [
                [x + 1.0, y, z],
                [x + 1.0, y + 1.0, z],
                [x + 1.0, y + 1.0, z + 1.0],
                [x + 1.0, y, z + 1.0],
            ],
            Face::West => [
                [x, y + 1.0, z],
                [x, y, z],
                [x, y, z + 1.0],
                [x, y + 1.0, z + 1.0],
            ],
        }
    }

    fn step(self, iter: BlockIterator, arena: &ChunkArena) -> BlockIterator {
        match self {
            Face::Top => iter.above(arena),
            Face::Bottom => iter.below(arena),
            Face::North => iter.north(arena),
            Face::South => iter.south(arena),
            Face::East => iter.east(arena),
            Face::West => iter.west(arena),
        }
    }

    fn uv_rect(self, top: UvRect, bottom: UvRect, side: UvRect) -> UvRect {
        match self {
            Face::Top => top,
            Face::Bottom => bottom,
            _ => side,
        }
    }

    fn normal(self) -> [f32; 3] {
        match self {
            Face::Top => [0.0, 0.0, 1.0],
            Face::Bottom => [0.0, 0.0, -1.0],
            Face::North => [0.0, 1.0, 0.0],
            Face::South => [0.0, -1.0, 0.0],
            Face::East => [1.0, 0.0, 0.0],
            Face::West => [-1.0, 0.0, 0.0],
        }
    }
}

/// Dig-crack overlays sit this far outward from the base face along its
/// normal, so they don't z-fight against it.
const DIG_CRACK_OFFSET: f32 = 0.01;

fn light_color(block: &Block) -> [u8; 4] {
    [block.outdoor() * 17, block.indoor() * 17, 0, 255]
}

fn water_color(block: &Block, world_z: u8) -> [u8; 4] {
    let blue = if world_z as i32 == SEA_LEVEL { 255 } else { 0 };
    [block.outdoor() * 17, block.indoor() * 17, blue, 127]
}

fn uv_corners(uv: UvRect) -> [[f32; 2]; 4] {
    [[uv.u0, uv.v1], [uv.u1, uv.v1], [uv.u1, uv.v0], [uv.u0, uv.v0]]
}

/// Rebuild a chunk's full mesh from scratch. Incremental in the *activation*
/// sense — only chunks with [`crate::chunk::DirtyFlags::MESH`] set are
/// candidates for a call — but each call recomputes the whole chunk; there
/// is no greedy meshing or per-face patching.
pub fn build_mesh(
    chunk: &Chunk,
    chunk_id: ChunkId,
    arena: &ChunkArena,
    registry: &BlockRegistry,
    water_type: BlockTypeIndex,
) -> MeshBuffers {
    let mut buffers = MeshBuffers::default();

    for index in 0..crate::chunk::CHUNK_BLOCK_COUNT {
        let local = LocalPos::from_index(index);
        let block = chunk.block(local);
        if block.is_air() || !registry.is_visible(block.type_index) {
            continue;
        }
        let def = registry.lookup_by_index(block.type_index);
        let is_water = block.type_index == water_type;
        let iter = BlockIterator::new(chunk_id, local);

        let faces_to_emit: &[Face] = if is_water { &[Face::Top] } else { &ALL_FACES };

        for &face in faces_to_emit {
            let neighbour = face.step(iter, arena);
            let neighbour_type = neighbour.block(arena).map(|b| b.type_index);

            let culled = match neighbour_type {
                None => false, // off-world: always render (no neighbour to hide behind)
                Some(nt) if registry.is_opaque(nt) => true,
                Some(nt) if !def.opaque && nt == block.type_index => true, // merge same-fluid/leaf interior faces
                _ => false,
            };
            if culled {
                continue;
            }

            let uv = face.uv_rect(def.top_uv, def.bottom_uv, def.side_uv);
            let uvs = uv_corners(uv);
            let corners = face.corners(local.x as f32, local.y as f32, local.z as f32);
            let color = if is_water {
                water_color(&block, local.z)
            } else {
                light_color(&block)
            };
            let quad = [
                Vertex {
                    position: corners[0],
                    uv: uvs[0],
                    color,
                },
                Vertex {
                    position: corners[1],
                    uv: uvs[1],
                    color,
                },
                Vertex {
                    position: corners[2],
                    uv: uvs[2],
                    color,
                },
                Vertex {
                    position: corners[3],
                    uv: uvs[3],
                    color,
                },
            ];

            if def.opaque {
                MeshBuffers::push_quad(&mut buffers.opaque_vertices, &mut buffers.opaque_indices, quad);
            } else {
                MeshBuffers::push_quad(&mut buffers.translucent_vertices, &mut buffers.translucent_indices, quad);
            }

            if block.dig_state() > 0 {
                let crack_uv = registry.dig_crack_uvs()[(block.dig_state() - 1) as usize];
                let crack_uvs = uv_corners(crack_uv);
                let overlay_color = [255, 255, 255, 255];
                let normal = face.normal();
                let overlay_corners = corners.map(|c| {
                    [
                        c[0] + normal[0] * DIG_CRACK_OFFSET,
                        c[1] + normal[1] * DIG_CRACK_OFFSET,
                        c[2] + normal[2] * DIG_CRACK_OFFSET,
                    ]
                });
                let overlay = [
                    Vertex {
                        position: overlay_corners[0],
                        uv: crack_uvs[0],
                        color: overlay_color,
                    },
                    Vertex {
                        position: overlay_corners[1],
                        uv: crack_uvs[1],
                        color: overlay_color,
                    },
                    Vertex {
                        position: overlay_corners[2],
                        uv: crack_uvs[2],
                        color: overlay_color,
                    },
                    Vertex {
                        position: overlay_corners[3],
                        uv: crack_uvs[3],
                        color: overlay_color,
                    },
                ];
                MeshBuffers::push_quad(
                    &mut buffers.translucent_vertices,
                    &mut buffers.translucent_indices,
                    overlay,
                );
            }
        }
    }

    buffers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::standard_registry;
    use crate::chunk::ChunkPos;

    #[test]
    fn a_single_exposed_block_emits_six_faces() {
        let (registry, blocks) = standard_registry();
        let mut arena = ChunkArena::new();
        let id = arena.insert(Chunk::new(ChunkPos::new(0, 0)));
        {
            let chunk = arena.get_mut(id).unwrap();
            chunk.set_block(LocalPos::new(8, 8, 8), Block::of_type(blocks.stone));
        }
        let chunk = arena.get(id).unwrap();
        let mesh = build_mesh(chunk, id, &arena, &registry, blocks.water);
        assert_eq!(mesh.opaque_indices.len(), 6 * 6);
    }

    #[test]
    fn two_adjacent_opaque_blocks_cull_their_shared_face() {
        let (registry, blocks) = standard_registry();
        let mut arena = ChunkArena::new();
        let id = arena.insert(Chunk::new(ChunkPos::new(0, 0)));
        {
            let chunk = arena.get_mut(id).unwrap();
            chunk.set_block(LocalPos::new(8, 8, 8), Block::of_type(blocks.stone));
            chunk.set_block(LocalPos::new(9, 8, 8), Block::of_type(blocks.stone));
        }
        let chunk = arena.get(id).unwrap();
        let mesh = build_mesh(chunk, id, &arena, &registry, blocks.water);
        // 12 faces total minus the 2 culled at the shared boundary.
        assert_eq!(mesh.opaque_indices.len(), 10 * 6);
    }

    #[test]
    fn water_only_emits_its_top_face_and_goes_to_translucent() {
        let (registry, blocks) = standard_registry();
        let mut arena = ChunkArena::new();
        let id = arena.insert(Chunk::new(ChunkPos::new(0, 0)));
        {
            let chunk = arena.get_mut(id).unwrap();
            chunk.set_block(LocalPos::new(8, 8, 8), Block::of_type(blocks.water));
        }
        let chunk = arena.get(id).unwrap();
        let mesh = build_mesh(chunk, id, &arena, &registry, blocks.water);
        assert_eq!(mesh.opaque_indices.len(), 0);
        assert_eq!(mesh.translucent_indices.len(), 6);
    }

    #[test]
    fn dig_progress_adds_a_crack_overlay_quad_per_visible_face() {
        let (registry, blocks) = standard_registry();
        let mut arena = ChunkArena::new();
        let id = arena.insert(Chunk::new(ChunkPos::new(0, 0)));
        {
            let chunk = arena.get_mut(id).unwrap();
            let mut block = Block::of_type(blocks.stone);
            block.set_dig_state(2);
            chunk.set_block(LocalPos::new(8, 8, 8), block);
        }
        let chunk = arena.get(id).unwrap();
        let mesh = build_mesh(chunk, id, &arena, &registry, blocks.water);
        // 6 cube faces plus 6 crack overlays, each 2 triangles.
        assert_eq!(mesh.translucent_indices.len(), 6 * 6);
    }
}
