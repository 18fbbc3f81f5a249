use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Storage slot used by the bridge script shipped with SCORM packages.
pub const DEFAULT_STORAGE_KEY: &str = "scormData";

/// Name of the tool config file looked up by the CLI.
pub const CONFIG_FILE_NAME: &str = "imscp.json";

/// Configuration for the persistence bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Key the CMI blob is stored under.
    pub storage_key: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

/// Tool configuration (`imscp.json`).
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub bridge: BridgeConfig,
    /// File backing the session store. Defaults to the platform data dir.
    pub store_path: Option<PathBuf>,
    /// `scormAPI.js` to ship next to the bridge script in SCO packages.
    pub scorm_api_js: Option<PathBuf>,
}

impl ToolConfig {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = fs::read_to_string(path).map_err(|e| CoreError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| CoreError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load `path` if given, else `./imscp.json` if it exists, else defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, CoreError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let local = Path::new(CONFIG_FILE_NAME);
                if local.is_file() {
                    Self::load(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// The configured store path, or `<data dir>/imscp/storage.json`.
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("imscp")
                .join("storage.json")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ToolConfig::default();
        assert_eq!(config.bridge.storage_key, "scormData");
        assert!(config.scorm_api_js.is_none());
        assert!(config.resolved_store_path().ends_with("imscp/storage.json"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: ToolConfig = serde_json::from_str(r#"{ "store_path": "/tmp/s.json" }"#).unwrap();
        assert_eq!(config.bridge, BridgeConfig::default());
        assert_eq!(config.resolved_store_path(), PathBuf::from("/tmp/s.json"));
    }

    #[test]
    fn custom_key() {
        let config: ToolConfig = serde_json::from_str(r#"{ "bridge": { "storage_key": "k" } }"#).unwrap();
        assert_eq!(config.bridge.storage_key, "k");
    }

    #[test]
    fn load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imscp.json");
        fs::write(&path, "{ nope").unwrap();
        let err = ToolConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("imscp.json"));
    }
}
