//! Layered TOML configuration, loaded the way the engine's ambient stack
//! treats every other non-fatal input: a missing file or a parse error logs
//! a warning and falls back to defaults rather than aborting startup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::lighting::DEFAULT_LIGHT_BUDGET;

/// Every tunable knob the engine and its (out-of-scope) renderer/shading
/// collaborators read from one shared file. Fields this crate doesn't
/// consume (fog, sky/indoor colors, a debug all-white-block override) are
/// still parsed and carried on the struct unchanged, since dropping them
/// would silently break the contract with whatever reads them downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub world_seed: u64,
    pub worker_threads: usize,
    pub activation_range: i32,
    pub light_budget: usize,
    pub save_dir: String,

    /// Not read by this crate; forwarded to the shading collaborator.
    pub fog_density: f32,
    /// Not read by this crate; forwarded to the shading collaborator.
    pub sky_color: [f32; 3],
    /// Not read by this crate; forwarded to the shading collaborator.
    pub indoor_light_color: [f32; 3],
    /// Debug override forwarded to the (out-of-scope) renderer: render every
    /// block as plain white, ignoring texture UVs.
    pub debug_white_blocks: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world_seed: 0,
            worker_threads: 2,
            activation_range: 6,
            light_budget: DEFAULT_LIGHT_BUDGET,
            save_dir: "Saves".to_string(),
            fog_density: 0.02,
            sky_color: [0.53, 0.81, 0.92],
            indoor_light_color: [1.0, 0.85, 0.6],
            debug_white_blocks: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `path`. A missing file or a TOML parse error
    /// is logged at `warn!` and answered with [`EngineConfig::default`] —
    /// configuration is not one of the engine's fatal-error kinds.
    pub fn load_from_path(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(path = %path.display(), %err, "no engine config found, using defaults");
                return Self::default();
            }
        };

        match toml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), %err, "engine config failed to parse, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = EngineConfig::load_from_path(Path::new("/nonexistent/voxen-config-test.toml"));
        assert_eq!(config.world_seed, EngineConfig::default().world_seed);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join(format!("voxen-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "this is not valid = = toml").unwrap();

        let config = EngineConfig::load_from_path(&path);
        assert_eq!(config.activation_range, EngineConfig::default().activation_range);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn well_formed_file_overrides_fields() {
        let dir = std::env::temp_dir().join(format!("voxen-config-test-ok-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("good.toml");
        std::fs::write(&path, "world_seed = 42\nactivation_range = 10\n").unwrap();

        let config = EngineConfig::load_from_path(&path);
        assert_eq!(config.world_seed, 42);
        assert_eq!(config.activation_range, 10);
        assert_eq!(config.fog_density, EngineConfig::default().fog_density);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
