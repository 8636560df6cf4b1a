//! Run-length-encoded on-disk chunk persistence.
//!
//! Each chunk is one file: an 8-byte header (`"GCHK"`, a version byte, and
//! the chunk's dimension exponents) followed by `(type_index: u8, run: u8)`
//! pairs covering every block in the chunk in linear-index order. Runs are
//! capped at 255 blocks; a run that would otherwise continue is flushed and
//! a new one started. Light and flag state are not persisted — they're
//! rederived by [`crate::lighting`] once the chunk reactivates, the same way
//! the original game recomputed lighting after a load rather than storing
//! it.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use tracing::{debug, info, instrument};

use crate::block::Block;
use crate::chunk::{Chunk, ChunkPos, CHUNK_BITS_X, CHUNK_BITS_Y, CHUNK_BITS_Z, CHUNK_BLOCK_COUNT};

const MAGIC: &[u8; 4] = b"GCHK";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = 8;

/// Encode a chunk's block-type array as an RLE byte stream with header.
pub fn serialize_chunk(chunk: &Chunk) -> Vec<u8> {
    let blocks = chunk.blocks();
    let mut out = Vec::with_capacity(HEADER_LEN + CHUNK_BLOCK_COUNT / 4);
    out.extend_from_slice(MAGIC);
    out.push(FORMAT_VERSION);
    out.push(CHUNK_BITS_X as u8);
    out.push(CHUNK_BITS_Y as u8);
    out.push(CHUNK_BITS_Z as u8);

    let mut i = 0usize;
    while i < CHUNK_BLOCK_COUNT {
        let current = blocks[i].type_index;
        let mut run: u8 = 1;
        while i + (run as usize) < CHUNK_BLOCK_COUNT
            && blocks[i + run as usize].type_index == current
            && run < 255
        {
            run += 1;
        }
        out.push(current);
        out.push(run);
        i += run as usize;
    }
    out
}

/// Decode an RLE byte stream back into a fresh chunk at `position`.
///
/// Header mismatches (bad magic, unsupported version, or a dimension
/// exponent that doesn't match this build's chunk size) are fatal: a chunk
/// file written by an incompatible build must never be silently
/// misinterpreted.
pub fn deserialize_chunk(position: ChunkPos, bytes: &[u8]) -> Result<Chunk> {
    ensure!(bytes.len() >= HEADER_LEN, "chunk file truncated before header");
    ensure!(&bytes[0..4] == MAGIC, "chunk file has bad magic (not a GCHK file)");

    let version = bytes[4];
    ensure!(
        version == FORMAT_VERSION,
        "chunk file format version {version} is not supported (expected {FORMAT_VERSION})"
    );

    let (bits_x, bits_y, bits_z) = (bytes[5], bytes[6], bytes[7]);
    ensure!(
        bits_x as u32 == CHUNK_BITS_X && bits_y as u32 == CHUNK_BITS_Y && bits_z as u32 == CHUNK_BITS_Z,
        "chunk file dimension exponents ({bits_x}, {bits_y}, {bits_z}) don't match this build's chunk size"
    );

    let mut chunk = Chunk::new(position);
    let mut index = 0usize;
    let mut cursor = HEADER_LEN;
    while cursor + 1 < bytes.len() && index < CHUNK_BLOCK_COUNT {
        let type_index = bytes[cursor];
        let run = bytes[cursor + 1] as usize;
        cursor += 2;
        for _ in 0..run {
            if index >= CHUNK_BLOCK_COUNT {
                break;
            }
            chunk.blocks_mut()[index] = Block::of_type(type_index);
            index += 1;
        }
    }

    ensure!(
        index == CHUNK_BLOCK_COUNT,
        "chunk file body decoded {index} blocks, expected {CHUNK_BLOCK_COUNT}"
    );

    Ok(chunk)
}

/// One file per chunk under a root save directory, named
/// `Chunk(<x>,<y>).chunk`.
pub struct ChunkStore {
    root: PathBuf,
}

impl ChunkStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, position: ChunkPos) -> PathBuf {
        self.root.join(format!("Chunk({},{}).chunk", position.x, position.y))
    }

    /// Write a chunk's blocks to disk, creating the save directory if needed.
    #[instrument(skip(self, chunk), fields(chunk_pos = ?chunk.position))]
    pub fn save_chunk(&self, chunk: &Chunk) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("creating save directory {}", self.root.display()))?;
        let bytes = serialize_chunk(chunk);
        let path = self.path_for(chunk.position);
        std::fs::write(&path, &bytes).with_context(|| format!("writing chunk save file {}", path.display()))?;
        debug!(path = %path.display(), bytes = bytes.len(), "saved chunk");
        Ok(())
    }

    /// Load a chunk from disk, if a save file exists for `position`.
    #[instrument(skip(self))]
    pub fn load_chunk(&self, position: ChunkPos) -> Result<Option<Chunk>> {
        let path = self.path_for(position);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path).with_context(|| format!("reading chunk save file {}", path.display()))?;
        let chunk = deserialize_chunk(position, &bytes)
            .with_context(|| format!("decoding chunk save file {}", path.display()))?;
        info!(path = %path.display(), "loaded chunk");
        Ok(Some(chunk))
    }

    /// Whether a save file exists for `position`, without reading it.
    pub fn has_save(&self, position: ChunkPos) -> bool {
        self.path_for(position).exists()
    }
}
