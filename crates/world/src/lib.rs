//! The voxel world engine: chunk storage, procedural generation, lighting,
//! meshing, raycasting, persistence, and the per-tick orchestrator that
//! ties them together around a moving observer.

pub mod activation;
pub mod block;
pub mod chunk;
pub mod config;
pub mod generator;
pub mod iterator;
pub mod lighting;
pub mod mesher;
pub mod persist;
pub mod raycast;
pub mod worker;
pub mod world;

pub use block::{Block, BlockCatalog, BlockRegistry, BlockTypeIndex, StandardBlocks};
pub use chunk::{Chunk, ChunkArena, ChunkId, ChunkLifecycle, ChunkPos, DirtyFlags, LocalPos, WorldBounds};
pub use config::EngineConfig;
pub use iterator::BlockIterator;
pub use lighting::LightEngine;
pub use mesher::{MeshBuffers, Vertex};
pub use persist::ChunkStore;
pub use raycast::{HitFace, RaycastHit};
pub use world::{World, WorldParams};
