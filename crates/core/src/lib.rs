#![warn(missing_docs)]
//! Core primitives shared across the voxen workspace.
//!
//! Kept intentionally small: a fixed-rate simulation tick, a scoped RNG
//! helper for deterministic per-chunk randomness, and the handful of typed
//! errors that can be raised without touching the filesystem.

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Fixed tick type (20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

/// Helper to derive a reproducible RNG seeded by world + chunk + tick domains.
///
/// Used by procedural generation so that a given `(world_seed, chunk_coord)`
/// always produces the same stochastic decisions (ore bands, dirt depth,
/// tree placement jitter), independent of generation order.
pub fn scoped_rng(world_seed: u64, chunk_hash: u64, tick: SimTick) -> StdRng {
    let seed = world_seed ^ chunk_hash ^ tick.0;
    StdRng::seed_from_u64(seed)
}

/// Errors that can be constructed without any I/O.
///
/// Errors that originate from the filesystem (corrupt save, missing file)
/// are modeled with `anyhow` in `voxen-world` instead, per the fatal-error
/// disposition table in the specification.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A local chunk coordinate fell outside `[0, CHUNK_SIZE)` on some axis.
    #[error("local coordinate ({x}, {y}, {z}) is out of chunk bounds")]
    LocalCoordOutOfBounds {
        /// Offending X coordinate.
        x: i64,
        /// Offending Y coordinate.
        y: i64,
        /// Offending Z coordinate.
        z: i64,
    },

    /// A block name was not present in the registry.
    #[error("unknown block name: {0}")]
    UnknownBlockName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_tick_advances() {
        assert_eq!(SimTick::ZERO.advance(5), SimTick(5));
    }

    #[test]
    fn scoped_rng_is_deterministic() {
        use rand::RngCore;
        let mut a = scoped_rng(42, 7, SimTick(3));
        let mut b = scoped_rng(42, 7, SimTick(3));
        assert_eq!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn scoped_rng_differs_by_chunk() {
        use rand::RngCore;
        let mut a = scoped_rng(42, 7, SimTick(3));
        let mut b = scoped_rng(42, 8, SimTick(3));
        assert_ne!(a.next_u64(), b.next_u64());
    }
}
