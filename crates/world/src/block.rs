//! Per-block packed state and the block-definition registry.
//!
//! A [`Block`] is the 3-byte value stored per voxel in a [`crate::chunk::Chunk`]:
//! a type index into the [`BlockRegistry`], a packed light nibble pair, and a
//! flags byte (sky/dirty/dig-state). The registry itself is append-only after
//! startup; its indices are the on-disk identifiers persisted by
//! [`crate::persist`].

use std::collections::HashMap;

use voxen_core::EngineError;

/// Index into the [`BlockRegistry`] table. `0` is always air.
pub type BlockTypeIndex = u8;

/// Reserved registry index for air.
pub const BLOCK_AIR: BlockTypeIndex = 0;

const INDOOR_MASK: u8 = 0x0F;
const OUTDOOR_SHIFT: u32 = 4;

const FLAG_IS_SKY: u8 = 0b0000_0001;
const FLAG_LIGHT_DIRTY: u8 = 0b0000_0010;
const DIG_STATE_SHIFT: u32 = 2;
const DIG_STATE_MASK: u8 = 0b0001_1100;
const DIG_STATE_MAX: u8 = 7;

/// Per-voxel packed state (3 bytes): type index, light nibbles, flags.
///
/// Invariants (maintained by callers, checked in `debug_assert!`s):
/// `indoor()`/`outdoor()` are always `<= 15`; `is_light_dirty()` is true iff
/// the block is currently enqueued in the lighting engine's dirty queue;
/// `is_sky()` implies the block's type is non-opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Block {
    /// Registry index of this block's type.
    pub type_index: BlockTypeIndex,
    light: u8,
    flags: u8,
}

impl Block {
    /// An air block with no light and no flags set.
    pub const AIR: Block = Block {
        type_index: BLOCK_AIR,
        light: 0,
        flags: 0,
    };

    /// Construct a block of the given type with default (dark) lighting.
    pub fn of_type(type_index: BlockTypeIndex) -> Self {
        Self {
            type_index,
            light: 0,
            flags: 0,
        }
    }

    /// `true` iff this block's type index is air.
    #[inline]
    pub fn is_air(&self) -> bool {
        self.type_index == BLOCK_AIR
    }

    /// Indoor (emitter-fed) light influence, 0-15.
    #[inline]
    pub fn indoor(&self) -> u8 {
        self.light & INDOOR_MASK
    }

    /// Set indoor light influence. `level` must be `<= 15`.
    #[inline]
    pub fn set_indoor(&mut self, level: u8) {
        debug_assert!(level <= 15, "indoor light level out of range: {level}");
        self.light = (self.light & !INDOOR_MASK) | (level & INDOOR_MASK);
    }

    /// Outdoor (sky-fed) light influence, 0-15.
    #[inline]
    pub fn outdoor(&self) -> u8 {
        (self.light >> OUTDOOR_SHIFT) & INDOOR_MASK
    }

    /// Set outdoor light influence. `level` must be `<= 15`.
    #[inline]
    pub fn set_outdoor(&mut self, level: u8) {
        debug_assert!(level <= 15, "outdoor light level out of range: {level}");
        self.light = (self.light & INDOOR_MASK) | ((level & INDOOR_MASK) << OUTDOOR_SHIFT);
    }

    /// Whether this block is reachable from the world top along a
    /// contiguous non-opaque column ("sky block").
    #[inline]
    pub fn is_sky(&self) -> bool {
        self.flags & FLAG_IS_SKY != 0
    }

    /// Set the sky flag.
    #[inline]
    pub fn set_sky(&mut self, is_sky: bool) {
        if is_sky {
            self.flags |= FLAG_IS_SKY;
        } else {
            self.flags &= !FLAG_IS_SKY;
        }
    }

    /// Whether this block is currently queued for light recomputation.
    #[inline]
    pub fn is_light_dirty(&self) -> bool {
        self.flags & FLAG_LIGHT_DIRTY != 0
    }

    /// Set the light-dirty flag. Must track queue membership exactly.
    #[inline]
    pub fn set_light_dirty(&mut self, dirty: bool) {
        if dirty {
            self.flags |= FLAG_LIGHT_DIRTY;
        } else {
            self.flags &= !FLAG_LIGHT_DIRTY;
        }
    }

    /// Cosmetic dig-progress stage, 0-7 (0 = undamaged).
    #[inline]
    pub fn dig_state(&self) -> u8 {
        (self.flags & DIG_STATE_MASK) >> DIG_STATE_SHIFT
    }

    /// Set the dig-progress stage. `state` must be `<= 7`.
    #[inline]
    pub fn set_dig_state(&mut self, state: u8) {
        debug_assert!(state <= DIG_STATE_MAX, "dig state out of range: {state}");
        self.flags = (self.flags & !DIG_STATE_MASK) | ((state << DIG_STATE_SHIFT) & DIG_STATE_MASK);
    }
}

/// A UV rectangle pre-resolved from integer sprite-sheet cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

/// Integer-celled sprite sheet used to resolve [`UvRect`]s at registration time.
#[derive(Debug, Clone, Copy)]
pub struct SpriteSheet {
    pub columns: u32,
    pub rows: u32,
}

impl SpriteSheet {
    /// Resolve the UV rectangle for the given integer cell coordinate.
    pub fn cell_uv(&self, col: u32, row: u32) -> UvRect {
        debug_assert!(col < self.columns && row < self.rows);
        let w = 1.0 / self.columns as f32;
        let h = 1.0 / self.rows as f32;
        UvRect {
            u0: col as f32 * w,
            v0: row as f32 * h,
            u1: (col + 1) as f32 * w,
            v1: (row + 1) as f32 * h,
        }
    }
}

/// Immutable, registry-indexed block type metadata.
#[derive(Debug, Clone)]
pub struct BlockDefinition {
    pub name: String,
    pub visible: bool,
    pub solid: bool,
    pub opaque: bool,
    pub indoor_light_emission: u8,
    pub top_uv: UvRect,
    pub bottom_uv: UvRect,
    pub side_uv: UvRect,
}

/// Per-block-type metadata, queried by [`crate::lighting`] and [`crate::mesher`]
/// without needing the full [`BlockRegistry`] type.
pub trait BlockCatalog {
    fn is_opaque(&self, type_index: BlockTypeIndex) -> bool;
    fn is_solid(&self, type_index: BlockTypeIndex) -> bool;
    fn is_visible(&self, type_index: BlockTypeIndex) -> bool;
    fn emission(&self, type_index: BlockTypeIndex) -> u8;
}

/// Append-only table of [`BlockDefinition`]s, indexed by [`BlockTypeIndex`].
///
/// Populated once at startup via [`BlockRegistry::register`]; a failed
/// [`BlockRegistry::lookup_by_name`] is a fatal configuration error (see
/// spec §7), so callers resolving well-known names at startup should
/// propagate it with `?` up to `main`.
pub struct BlockRegistry {
    definitions: Vec<BlockDefinition>,
    by_name: HashMap<String, BlockTypeIndex>,
    dig_crack_uvs: [UvRect; 6],
}

const BLANK_UV: UvRect = UvRect {
    u0: 0.0,
    v0: 0.0,
    u1: 0.0,
    v1: 0.0,
};

impl BlockRegistry {
    /// Create an empty registry (no block types registered yet).
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            by_name: HashMap::new(),
            dig_crack_uvs: [BLANK_UV; 6],
        }
    }

    /// Register a new block type, pre-resolving its three face UVs from
    /// integer sprite-sheet cell coordinates. Returns the assigned index.
    #[allow(clippy::too_many_arguments)]
    pub fn register(
        &mut self,
        name: &str,
        visible: bool,
        solid: bool,
        opaque: bool,
        indoor_emission: u8,
        sheet: &SpriteSheet,
        top_xy: (u32, u32),
        bot_xy: (u32, u32),
        side_xy: (u32, u32),
    ) -> BlockTypeIndex {
        debug_assert!(indoor_emission <= 15);
        let index = self.definitions.len() as BlockTypeIndex;
        self.definitions.push(BlockDefinition {
            name: name.to_string(),
            visible,
            solid,
            opaque,
            indoor_light_emission: indoor_emission,
            top_uv: sheet.cell_uv(top_xy.0, top_xy.1),
            bottom_uv: sheet.cell_uv(bot_xy.0, bot_xy.1),
            side_uv: sheet.cell_uv(side_xy.0, side_xy.1),
        });
        self.by_name.insert(name.to_string(), index);
        index
    }

    /// Register the dig-crack overlay table from 6 consecutive sheet cells
    /// starting at `first_cell`, read row-major.
    pub fn register_dig_crack_uvs(&mut self, sheet: &SpriteSheet, first_cell: (u32, u32)) {
        let (start_col, row) = first_cell;
        for (stage, uv) in self.dig_crack_uvs.iter_mut().enumerate() {
            *uv = sheet.cell_uv(start_col + stage as u32, row);
        }
    }

    /// Dig-crack overlay UVs, indexed by `dig_state - 1` (stages 1-6).
    pub fn dig_crack_uvs(&self) -> &[UvRect; 6] {
        &self.dig_crack_uvs
    }

    /// Look up a block type index by name. Fatal (returns `Err`) on a miss;
    /// callers at startup should propagate with `?`, never silently recover.
    pub fn lookup_by_name(&self, name: &str) -> Result<BlockTypeIndex, EngineError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::UnknownBlockName(name.to_string()))
    }

    /// Look up a block definition by index. Panics on an invalid index,
    /// since indices only ever originate from this same registry or from
    /// on-disk data that was written by it.
    pub fn lookup_by_index(&self, index: BlockTypeIndex) -> &BlockDefinition {
        &self.definitions[index as usize]
    }

    /// Number of registered block types.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockCatalog for BlockRegistry {
    fn is_opaque(&self, type_index: BlockTypeIndex) -> bool {
        type_index != BLOCK_AIR && self.lookup_by_index(type_index).opaque
    }

    fn is_solid(&self, type_index: BlockTypeIndex) -> bool {
        type_index != BLOCK_AIR && self.lookup_by_index(type_index).solid
    }

    fn is_visible(&self, type_index: BlockTypeIndex) -> bool {
        type_index != BLOCK_AIR && self.lookup_by_index(type_index).visible
    }

    fn emission(&self, type_index: BlockTypeIndex) -> u8 {
        if type_index == BLOCK_AIR {
            0
        } else {
            self.lookup_by_index(type_index).indoor_light_emission
        }
    }
}

/// Resolved indices of the block types every generator/test needs by name,
/// so call sites never hardcode a registry index.
#[derive(Debug, Clone, Copy)]
pub struct StandardBlocks {
    pub air: BlockTypeIndex,
    pub stone: BlockTypeIndex,
    pub dirt: BlockTypeIndex,
    pub grass: BlockTypeIndex,
    pub sand: BlockTypeIndex,
    pub water: BlockTypeIndex,
    pub ice: BlockTypeIndex,
    pub snow: BlockTypeIndex,
    pub snowgrass: BlockTypeIndex,
    pub coal_ore: BlockTypeIndex,
    pub iron_ore: BlockTypeIndex,
    pub gold_ore: BlockTypeIndex,
    pub diamond_ore: BlockTypeIndex,
    pub oak_log: BlockTypeIndex,
    pub oak_leaves: BlockTypeIndex,
    pub cloud: BlockTypeIndex,
    pub glowstone: BlockTypeIndex,
}

/// Build the standard registry used by generation, lighting, and mesher
/// tests, returning both the registry and the resolved well-known indices.
pub fn standard_registry() -> (BlockRegistry, StandardBlocks) {
    let sheet = SpriteSheet {
        columns: 16,
        rows: 16,
    };
    let mut reg = BlockRegistry::new();

    let air = reg.register("air", false, false, false, 0, &sheet, (0, 0), (0, 0), (0, 0));
    let stone = reg.register("stone", true, true, true, 0, &sheet, (1, 0), (1, 0), (1, 0));
    let dirt = reg.register("dirt", true, true, true, 0, &sheet, (2, 0), (2, 0), (2, 0));
    let grass = reg.register(
        "grass", true, true, true, 0, &sheet, (3, 0), (2, 0), (4, 0),
    );
    let sand = reg.register("sand", true, true, true, 0, &sheet, (5, 0), (5, 0), (5, 0));
    let water = reg.register(
        "water", true, false, false, 0, &sheet, (6, 0), (6, 0), (6, 0),
    );
    let ice = reg.register("ice", true, true, true, 0, &sheet, (7, 0), (7, 0), (7, 0));
    let snow = reg.register("snow", true, true, true, 0, &sheet, (8, 0), (8, 0), (8, 0));
    let snowgrass = reg.register(
        "snowgrass", true, true, true, 0, &sheet, (9, 0), (2, 0), (10, 0),
    );
    let coal_ore = reg.register(
        "coal_ore", true, true, true, 0, &sheet, (11, 0), (11, 0), (11, 0),
    );
    let iron_ore = reg.register(
        "iron_ore", true, true, true, 0, &sheet, (12, 0), (12, 0), (12, 0),
    );
    let gold_ore = reg.register(
        "gold_ore", true, true, true, 0, &sheet, (13, 0), (13, 0), (13, 0),
    );
    let diamond_ore = reg.register(
        "diamond_ore", true, true, true, 0, &sheet, (14, 0), (14, 0), (14, 0),
    );
    let oak_log = reg.register(
        "oak_log", true, true, true, 0, &sheet, (0, 1), (0, 1), (1, 1),
    );
    let oak_leaves = reg.register(
        "oak_leaves", true, false, false, 0, &sheet, (2, 1), (2, 1), (2, 1),
    );
    let cloud = reg.register(
        "cloud", true, false, false, 0, &sheet, (3, 1), (3, 1), (3, 1),
    );
    let glowstone = reg.register(
        "glowstone", true, true, true, 15, &sheet, (4, 1), (4, 1), (4, 1),
    );

    reg.register_dig_crack_uvs(&sheet, (0, 15));

    (
        reg,
        StandardBlocks {
            air,
            stone,
            dirt,
            grass,
            sand,
            water,
            ice,
            snow,
            snowgrass,
            coal_ore,
            iron_ore,
            gold_ore,
            diamond_ore,
            oak_log,
            oak_leaves,
            cloud,
            glowstone,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_packs_indoor_outdoor_independently() {
        let mut b = Block::AIR;
        b.set_indoor(5);
        b.set_outdoor(12);
        assert_eq!(b.indoor(), 5);
        assert_eq!(b.outdoor(), 12);
        b.set_indoor(0);
        assert_eq!(b.outdoor(), 12);
    }

    #[test]
    fn block_flags_are_independent_of_light() {
        let mut b = Block::AIR;
        b.set_indoor(15);
        b.set_outdoor(15);
        b.set_sky(true);
        b.set_light_dirty(true);
        b.set_dig_state(3);
        assert_eq!(b.indoor(), 15);
        assert_eq!(b.outdoor(), 15);
        assert!(b.is_sky());
        assert!(b.is_light_dirty());
        assert_eq!(b.dig_state(), 3);
    }

    #[test]
    fn dig_state_rolls_through_full_range() {
        let mut b = Block::AIR;
        for state in 0..=7 {
            b.set_dig_state(state);
            assert_eq!(b.dig_state(), state);
        }
    }

    #[test]
    fn lookup_by_name_is_fatal_on_miss() {
        let (reg, _) = standard_registry();
        assert!(reg.lookup_by_name("stone").is_ok());
        assert!(reg.lookup_by_name("unobtainium").is_err());
    }

    #[test]
    fn standard_registry_marks_air_non_opaque_non_solid() {
        let (reg, std_blocks) = standard_registry();
        assert!(!reg.is_opaque(std_blocks.air));
        assert!(!reg.is_solid(std_blocks.air));
        assert!(reg.is_opaque(std_blocks.stone));
        assert!(!reg.is_opaque(std_blocks.water));
        assert_eq!(reg.emission(std_blocks.glowstone), 15);
    }

    #[test]
    fn sprite_sheet_cells_are_disjoint() {
        let sheet = SpriteSheet {
            columns: 16,
            rows: 16,
        };
        let a = sheet.cell_uv(0, 0);
        let b = sheet.cell_uv(1, 0);
        assert!(a.u1 <= b.u0 + f32::EPSILON);
    }
}
