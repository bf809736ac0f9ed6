use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LabError;

/// Settings shared by the CLI and the studio.
///
/// Read from a JSON file with `LabConfig::load`; missing keys take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Directory holding one sub-directory per dataset (`mnist/`, `cifar10/`).
    pub data_dir: PathBuf,
    /// Where trained model records and label files are written.
    pub artifacts_dir: PathBuf,
    /// Address the studio listens on.
    pub bind: String,
    /// Seeds the shuffle order, weight init and dropout.
    pub seed: u64,
}

impl Default for LabConfig {
    fn default() -> Self {
        LabConfig {
            data_dir: PathBuf::from("datasets"),
            artifacts_dir: PathBuf::from("trained_models"),
            bind: "127.0.0.1:7878".to_string(),
            seed: 42,
        }
    }
}

impl LabConfig {
    pub fn load(path: &Path) -> Result<Self, LabError> {
        let text = fs::read_to_string(path).map_err(|source| LabError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text)
            .map_err(|e| LabError::Config(format!("'{}': {}", path.display(), e)))
    }

    /// `LabConfig::load` when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, LabError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Data directory of one dataset, e.g. `datasets/mnist`.
    pub fn dataset_dir(&self, dataset: &str) -> PathBuf {
        self.data_dir.join(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let config: LabConfig = serde_json::from_str(r#"{ "seed": 7 }"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.data_dir, PathBuf::from("datasets"));
        assert_eq!(config.bind, "127.0.0.1:7878");
    }

    #[test]
    fn load_reads_file_and_reports_bad_json() {
        let dir = std::env::temp_dir().join(format!("ferrite_vision_config_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let good = dir.join("lab.json");
        fs::write(&good, r#"{ "data_dir": "/data", "bind": "0.0.0.0:9000" }"#).unwrap();
        let config = LabConfig::load(&good).unwrap();
        assert_eq!(config.dataset_dir("mnist"), PathBuf::from("/data/mnist"));
        assert_eq!(config.bind, "0.0.0.0:9000");

        let bad = dir.join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(LabConfig::load(&bad), Err(LabError::Config(_))));
        assert!(matches!(
            LabConfig::load(&dir.join("missing.json")),
            Err(LabError::Io { .. })
        ));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn no_path_means_defaults() {
        assert_eq!(LabConfig::load_or_default(None).unwrap(), LabConfig::default());
    }
}
