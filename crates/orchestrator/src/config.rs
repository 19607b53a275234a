use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::benchmark::BenchmarkConfig;
use crate::core::PacingConfig;

/// Settings for the demo orchestrator, loaded from the `[keys]`,
/// `[benchmarks]` and `[pacing]` sections of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub keys: KeysConfig,
    pub benchmarks: BenchmarkConfig,
    pub pacing: PacingConfig,
}

impl OrchestratorConfig {
    pub fn with_keys_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.keys.dir = dir.into();
        self
    }

    /// Disable all presentation delays.
    pub fn without_pacing(mut self) -> Self {
        self.pacing.scale = 0.0;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub dir: PathBuf,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("keys"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Pacing;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.keys.dir, PathBuf::from("keys"));
        assert_eq!(config.benchmarks.iterations, 50);
        assert_eq!(config.pacing.scale, 1.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: OrchestratorConfig =
            serde_json::from_str(r#"{"keys": {"dir": "/etc/demo/keys"}, "pacing": {"scale": 0.5}}"#)
                .unwrap();

        assert_eq!(config.keys.dir, PathBuf::from("/etc/demo/keys"));
        assert_eq!(config.pacing.scale, 0.5);
        assert_eq!(config.benchmarks, BenchmarkConfig::default());
    }

    #[test]
    fn test_without_pacing() {
        let config = OrchestratorConfig::default().without_pacing();
        assert_eq!(config.pacing.pacing(), Pacing::instant());
    }
}
