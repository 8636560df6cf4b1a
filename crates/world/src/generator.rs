//! Deterministic procedural chunk generation from `(chunk position, world
//! seed)` alone, run off the main thread by [`crate::worker::WorkerPool`].
//!
//! Six named 2-D noise fields drive the pass: `temperature`, `humidity`,
//! `height`, `hilliness`, `oceaness`, and `cloudness`, each a multi-octave
//! Perlin field seeded from the world seed offset by a fixed per-field
//! constant so the fields are decorrelated. A tree pass then scans a 5x5
//! neighbourhood of *world columns* (not neighbouring chunks — the height
//! field is itself a pure function of world coordinates, so no chunk access
//! is needed to find local maxima) for trunk placements, and may emit writes
//! that land in an as-yet-ungenerated neighbour chunk; those are returned
//! separately rather than applied directly, since a chunk generated on a
//! worker thread has no safe way to reach into a neighbour's live state.

use crate::block::{BlockRegistry, StandardBlocks};
use crate::chunk::{Chunk, ChunkPos, LocalPos, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z};
use crate::Block;
use noise::{NoiseFn, Perlin};
use voxen_core::scoped_rng;

/// World Z level below which a column is water rather than air.
pub const SEA_LEVEL: i32 = 64;
/// Flat floor every ocean column bottoms out at.
const OCEAN_FLOOR: i32 = 55;
/// Lower bound of the land-height range a column's base terrain resolves to
/// before any ocean blending is applied.
const LAND_BASE: i32 = 63;
/// Upper bound of the land-height range (one below the chunk ceiling).
const MAX_LAND_HEIGHT: i32 = CHUNK_SIZE_Z as i32 - 1;
const SNOW_TEMPERATURE: f64 = 0.2;
const DESERT_TEMPERATURE: f64 = 0.75;
const DESERT_HUMIDITY: f64 = 0.3;
/// Pass (i): humidity below this replaces the top few surface blocks with sand.
const SAND_HUMIDITY: f64 = 0.4;
/// Pass (ii): temperature below this freezes the top of an underwater column to ice.
const FREEZE_TEMPERATURE: f64 = 0.4;
/// Pass (iii): columns whose surface sits above this altitude are alpine
/// snowcaps regardless of the temperature field.
const SNOW_ALTITUDE: i32 = SEA_LEVEL + 40;
/// Pass (iv): humidity below this turns a sea-level column's grass to a beach.
const BEACH_HUMIDITY: f64 = 0.65;
/// Pass (v): fixed world Z the cloud layer sits at.
const CLOUD_LEVEL: i32 = CHUNK_SIZE_Z as i32 - 20;
const CLOUD_THRESHOLD: f64 = 0.7;

/// A single named multi-octave Perlin field.
struct NoiseField {
    perlin: Perlin,
    octaves: u32,
    lacunarity: f64,
    persistence: f64,
    frequency: f64,
}

impl NoiseField {
    fn new(world_seed: u64, offset: u32, octaves: u32, lacunarity: f64, persistence: f64, frequency: f64) -> Self {
        let seed = (world_seed as u32).wrapping_add(offset);
        Self {
            perlin: Perlin::new(seed),
            octaves,
            lacunarity,
            persistence,
            frequency,
        }
    }

    /// Normalized fractal Brownian motion sample in `[0, 1]`.
    fn sample01(&self, x: f64, y: f64) -> f64 {
        let mut amplitude = 1.0;
        let mut frequency = self.frequency;
        let mut sum = 0.0;
        let mut max = 0.0;
        for _ in 0..self.octaves {
            sum += self.perlin.get([x * frequency, y * frequency]) * amplitude;
            max += amplitude;
            amplitude *= self.persistence;
            frequency *= self.lacunarity;
        }
        ((sum / max) + 1.0) * 0.5
    }
}

/// The six named terrain fields, seeded once per world.
pub struct TerrainFields {
    temperature: NoiseField,
    humidity: NoiseField,
    height: NoiseField,
    hilliness: NoiseField,
    oceaness: NoiseField,
    cloudness: NoiseField,
}

impl TerrainFields {
    pub fn new(world_seed: u64) -> Self {
        Self {
            temperature: NoiseField::new(world_seed, 1, 3, 2.0, 0.5, 0.0020),
            humidity: NoiseField::new(world_seed, 2, 3, 2.0, 0.5, 0.0021),
            height: NoiseField::new(world_seed, 3, 4, 2.0, 0.5, 0.0015),
            hilliness: NoiseField::new(world_seed, 4, 3, 2.0, 0.5, 0.0040),
            oceaness: NoiseField::new(world_seed, 5, 2, 2.0, 0.5, 0.0009),
            cloudness: NoiseField::new(world_seed, 6, 3, 2.0, 0.5, 0.0100),
        }
    }

    /// Cloud cover sample in `[0, 1]` at a world column; columns above the
    /// pass's threshold get a `cloud` block placed at `CLOUD_LEVEL`.
    pub fn cloudness(&self, world_x: f64, world_y: f64) -> f64 {
        self.cloudness.sample01(world_x, world_y)
    }

    fn column_height(&self, world_x: f64, world_y: f64) -> i32 {
        let terrain_noise = self.height.sample01(world_x, world_y);
        let hilliness = self.hilliness.sample01(world_x, world_y);
        let hilliness_s = smoothstep(hilliness * terrain_noise, 0.0, 1.0);
        let land_height = LAND_BASE as f64 + hilliness_s * (MAX_LAND_HEIGHT - LAND_BASE) as f64;

        let oceaness = self.oceaness.sample01(world_x, world_y);
        let height = if oceaness > 0.5 {
            OCEAN_FLOOR as f64
        } else if oceaness > 0.0 {
            lerp(land_height, OCEAN_FLOOR as f64, oceaness / 0.5)
        } else {
            land_height
        };

        height.round().clamp(OCEAN_FLOOR as f64, MAX_LAND_HEIGHT as f64) as i32
    }
}

fn smoothstep(x: f64, edge0: f64, edge1: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Biome {
    Ocean,
    Desert,
    Grassland,
    Snow,
}

fn classify_biome(temperature: f64, humidity: f64, is_underwater: bool) -> Biome {
    if is_underwater {
        Biome::Ocean
    } else if temperature <= SNOW_TEMPERATURE {
        Biome::Snow
    } else if temperature >= DESERT_TEMPERATURE && humidity <= DESERT_HUMIDITY {
        Biome::Desert
    } else {
        Biome::Grassland
    }
}

/// A block write that lands outside the chunk being generated, deferred
/// until (and only if) that neighbour chunk later gets generated itself.
#[derive(Debug, Clone, Copy)]
pub struct CrossChunkWrite {
    pub target: ChunkPos,
    pub local: LocalPos,
    pub block: Block,
}

/// Output of [`generate_chunk`]: the chunk itself plus any writes that
/// overhang into a neighbour.
pub struct GeneratedChunk {
    pub chunk: Chunk,
    pub cross_chunk_writes: Vec<CrossChunkWrite>,
}

/// Generate one chunk's terrain, ores, and trees. Pure in `(position,
/// world_seed)` — calling it twice with the same arguments always produces
/// byte-identical output, which is what lets generation run on any worker
/// thread in any order.
pub fn generate_chunk(
    position: ChunkPos,
    world_seed: u64,
    fields: &TerrainFields,
    registry: &BlockRegistry,
    blocks: &StandardBlocks,
) -> GeneratedChunk {
    let _ = registry;
    let mut chunk = Chunk::new(position);
    let mut cross_chunk_writes = Vec::new();

    let base_x = position.x as i64 * CHUNK_SIZE_X as i64;
    let base_y = position.y as i64 * CHUNK_SIZE_Y as i64;

    for lx in 0..CHUNK_SIZE_X as u8 {
        for ly in 0..CHUNK_SIZE_Y as u8 {
            let world_x = base_x + lx as i64;
            let world_y = base_y + ly as i64;
            let wxf = world_x as f64;
            let wyf = world_y as f64;

            let surface_z = fields.column_height(wxf, wyf);
            let temperature = fields.temperature.sample01(wxf, wyf);
            let humidity = fields.humidity.sample01(wxf, wyf);
            let cloudness = fields.cloudness(wxf, wyf);
            let underwater = surface_z < SEA_LEVEL;
            let biome = classify_biome(temperature, humidity, underwater);

            fill_column(
                &mut chunk,
                world_seed,
                position,
                lx,
                ly,
                surface_z,
                temperature,
                humidity,
                underwater,
                cloudness,
                blocks,
            );
            place_ore_bands(&mut chunk, world_seed, position, lx, ly, surface_z, blocks);

            if !underwater && is_local_height_maximum(fields, wxf, wyf, surface_z) {
                let mut rng = scoped_rng(world_seed, position.stable_hash(), voxen_core::SimTick::ZERO.advance(world_x as u64 ^ world_y as u64));
                let density = lerp(0.015, 0.08, humidity);
                if should_spawn_tree(&mut rng, density, biome) {
                    place_tree(
                        &mut chunk,
                        &mut cross_chunk_writes,
                        position,
                        lx,
                        ly,
                        surface_z,
                        blocks,
                    );
                }
            }
        }
    }

    GeneratedChunk {
        chunk,
        cross_chunk_writes,
    }
}

/// Fill one column's terrain and run the biome passes over it, in the
/// order they're documented: sand-for-dry-surface, ice-for-frozen-ocean,
/// alpine snowcap, beach fringe, then the floating cloud layer.
#[allow(clippy::too_many_arguments)]
fn fill_column(
    chunk: &mut Chunk,
    world_seed: u64,
    position: ChunkPos,
    lx: u8,
    ly: u8,
    surface_z: i32,
    temperature: f64,
    humidity: f64,
    underwater: bool,
    cloudness: f64,
    blocks: &StandardBlocks,
) {
    use rand::Rng;

    let surface_z = surface_z.clamp(0, (CHUNK_SIZE_Z - 1) as i32) as u8;
    let mut rng = scoped_rng(
        world_seed,
        position.stable_hash() ^ 0xD1_u64 ^ ((lx as u64) << 8 | ly as u64),
        voxen_core::SimTick::ZERO,
    );
    let dirt_depth: u8 = rng.gen_range(3..=4);

    for z in 0..=surface_z {
        let depth_below_surface = surface_z - z;
        let block_type = if z == surface_z {
            blocks.grass
        } else if depth_below_surface <= dirt_depth {
            blocks.dirt
        } else {
            blocks.stone
        };
        chunk.set_block(LocalPos::new(lx, ly, z), Block::of_type(block_type));
    }

    if (surface_z as i32) < SEA_LEVEL {
        for z in (surface_z + 1)..=(SEA_LEVEL as u8).min((CHUNK_SIZE_Z - 1) as u8) {
            chunk.set_block(LocalPos::new(lx, ly, z), Block::of_type(blocks.water));
        }
    }

    // (i) dry surfaces turn to sand.
    if humidity < SAND_HUMIDITY {
        for i in 0..4u8 {
            if let Some(z) = surface_z.checked_sub(i) {
                chunk.set_block(LocalPos::new(lx, ly, z), Block::of_type(blocks.sand));
            }
        }
    }

    // (ii) cold oceans freeze their top few blocks to ice.
    if underwater && temperature < FREEZE_TEMPERATURE {
        let water_top = (SEA_LEVEL as u8).min((CHUNK_SIZE_Z - 1) as u8);
        for i in 0..4u8 {
            if let Some(z) = water_top.checked_sub(i) {
                if z > surface_z {
                    chunk.set_block(LocalPos::new(lx, ly, z), Block::of_type(blocks.ice));
                }
            }
        }
    }

    // (iii) alpine snowcap above the freezing-level altitude, independent
    // of the temperature field.
    if surface_z as i32 >= SNOW_ALTITUDE {
        chunk.set_block(LocalPos::new(lx, ly, surface_z), Block::of_type(blocks.snowgrass));
        for i in 1..=3u8 {
            if let Some(z) = surface_z.checked_sub(i) {
                chunk.set_block(LocalPos::new(lx, ly, z), Block::of_type(blocks.ice));
            }
        }
    }

    // (iv) beach fringe: dry, near-sea-level grass becomes sand.
    if !underwater && humidity < BEACH_HUMIDITY && (surface_z as i32 - SEA_LEVEL).abs() <= 1 {
        chunk.set_block(LocalPos::new(lx, ly, surface_z), Block::of_type(blocks.sand));
    }

    // (v) floating cloud layer.
    if cloudness > CLOUD_THRESHOLD && CLOUD_LEVEL >= 0 && (CLOUD_LEVEL as usize) < CHUNK_SIZE_Z {
        chunk.set_block(LocalPos::new(lx, ly, CLOUD_LEVEL as u8), Block::of_type(blocks.cloud));
    }
}

fn place_ore_bands(
    chunk: &mut Chunk,
    world_seed: u64,
    position: ChunkPos,
    lx: u8,
    ly: u8,
    surface_z: i32,
    blocks: &StandardBlocks,
) {
    let mut rng = scoped_rng(
        world_seed,
        position.stable_hash() ^ ((lx as u64) << 8 | ly as u64),
        voxen_core::SimTick::ZERO,
    );
    use rand::Rng;

    let deep_limit = (surface_z - 4).max(0);
    for z in 0..deep_limit {
        let depth = deep_limit - z;
        let roll: f64 = rng.gen();
        let ore = if depth > 24 && roll < 0.004 {
            Some(blocks.diamond_ore)
        } else if depth > 16 && roll < 0.012 {
            Some(blocks.gold_ore)
        } else if depth > 8 && roll < 0.03 {
            Some(blocks.iron_ore)
        } else if roll < 0.05 {
            Some(blocks.coal_ore)
        } else {
            None
        };
        if let Some(ore_type) = ore {
            chunk.set_block(LocalPos::new(lx, ly, z as u8), Block::of_type(ore_type));
        }
    }
}

/// `true` if `(wx, wy)`'s surface height is at least as high as every one of
/// its 5x5 world-column neighbours. Pure: samples the height field directly
/// rather than touching any chunk, so it works identically regardless of
/// which neighbouring chunks have been generated yet.
fn is_local_height_maximum(fields: &TerrainFields, wx: f64, wy: f64, surface_z: i32) -> bool {
    for dx in -2..=2i64 {
        for dy in -2..=2i64 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let neighbour = fields.column_height(wx + dx as f64, wy + dy as f64);
            if neighbour > surface_z {
                return false;
            }
        }
    }
    true
}

fn should_spawn_tree(rng: &mut impl rand::RngCore, density: f64, biome: Biome) -> bool {
    use rand::Rng;
    if !matches!(biome, Biome::Grassland | Biome::Snow) {
        return false;
    }
    rng.gen::<f64>() < density
}

fn place_tree(
    chunk: &mut Chunk,
    cross_chunk_writes: &mut Vec<CrossChunkWrite>,
    position: ChunkPos,
    lx: u8,
    ly: u8,
    surface_z: i32,
    blocks: &StandardBlocks,
) {
    let trunk_height = 4u8;
    let base_x = position.x as i64 * CHUNK_SIZE_X as i64 + lx as i64;
    let base_y = position.y as i64 * CHUNK_SIZE_Y as i64 + ly as i64;

    for i in 1..=trunk_height {
        let z = surface_z + i as i32;
        if z >= 0 && (z as usize) < CHUNK_SIZE_Z {
            chunk.set_block(LocalPos::new(lx, ly, z as u8), Block::of_type(blocks.oak_log));
        }
    }

    let canopy_z = surface_z + trunk_height as i32;
    for dx in -2i64..=2 {
        for dy in -2i64..=2 {
            for dz in 0..=2i32 {
                if dx == 0 && dy == 0 && dz == 0 {
                    continue;
                }
                if dx.abs() == 2 && dy.abs() == 2 {
                    continue;
                }
                let world_x = base_x + dx;
                let world_y = base_y + dy;
                let z = canopy_z + dz;
                if z < 0 || (z as usize) >= CHUNK_SIZE_Z {
                    continue;
                }
                write_world_block(
                    chunk,
                    cross_chunk_writes,
                    position,
                    world_x,
                    world_y,
                    z as u8,
                    Block::of_type(blocks.oak_leaves),
                );
            }
        }
    }
}

fn write_world_block(
    chunk: &mut Chunk,
    cross_chunk_writes: &mut Vec<CrossChunkWrite>,
    this_position: ChunkPos,
    world_x: i64,
    world_y: i64,
    z: u8,
    block: Block,
) {
    let target = ChunkPos::containing(world_x, world_y);
    let local_x = world_x.rem_euclid(CHUNK_SIZE_X as i64) as u8;
    let local_y = world_y.rem_euclid(CHUNK_SIZE_Y as i64) as u8;
    let local = LocalPos::new(local_x, local_y, z);

    if target == this_position {
        chunk.set_block(local, block);
    } else {
        cross_chunk_writes.push(CrossChunkWrite {
            target,
            local,
            block,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::standard_registry;

    #[test]
    fn generation_is_deterministic_for_same_seed_and_position() {
        let (registry, blocks) = standard_registry();
        let fields = TerrainFields::new(1234);
        let a = generate_chunk(ChunkPos::new(3, -2), 1234, &fields, &registry, &blocks);
        let b = generate_chunk(ChunkPos::new(3, -2), 1234, &fields, &registry, &blocks);
        for i in 0..CHUNK_SIZE_X as usize * CHUNK_SIZE_Y as usize * CHUNK_SIZE_Z {
            assert_eq!(a.chunk.blocks()[i].type_index, b.chunk.blocks()[i].type_index);
        }
    }

    #[test]
    fn different_seeds_produce_different_terrain_somewhere() {
        let (registry, blocks) = standard_registry();
        let fields_a = TerrainFields::new(1);
        let fields_b = TerrainFields::new(2);
        let a = generate_chunk(ChunkPos::new(0, 0), 1, &fields_a, &registry, &blocks);
        let b = generate_chunk(ChunkPos::new(0, 0), 2, &fields_b, &registry, &blocks);
        let differs = a
            .chunk
            .blocks()
            .iter()
            .zip(b.chunk.blocks().iter())
            .any(|(x, y)| x.type_index != y.type_index);
        assert!(differs);
    }

    #[test]
    fn generated_columns_stay_within_chunk_bounds() {
        let (registry, blocks) = standard_registry();
        let fields = TerrainFields::new(42);
        let generated = generate_chunk(ChunkPos::new(0, 0), 42, &fields, &registry, &blocks);
        assert_eq!(generated.chunk.blocks().len(), CHUNK_SIZE_X * CHUNK_SIZE_Y * CHUNK_SIZE_Z);
    }

    #[test]
    fn smoothstep_is_monotonic_between_edges() {
        assert_eq!(smoothstep(0.0, 0.0, 1.0), 0.0);
        assert_eq!(smoothstep(1.0, 0.0, 1.0), 1.0);
        assert!(smoothstep(0.5, 0.0, 1.0) > 0.0 && smoothstep(0.5, 0.0, 1.0) < 1.0);
    }
}
