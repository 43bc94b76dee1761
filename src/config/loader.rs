// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Locating and parsing the configuration layers.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ConfigError;

use super::types::WorkspaceConfig;

/// Workspace files checked in order; the first one present is used.
pub const CONFIG_FILES: &[&str] = &[
    ".obscode.json",
    ".obscode/config.json",
    "obscode.config.yaml",
];

/// Per-developer overrides, kept out of version control.
pub const LOCAL_CONFIG_FILE: &str = ".obscode.local.json";

pub const GLOBAL_CONFIG_DIR: &str = ".obscode";
pub const GLOBAL_CONFIG_FILE: &str = "config.json";

/// One source of configuration. Later layers override earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    Global,
    Workspace,
    Local,
}

impl ConfigLayer {
    /// Layers in merge order.
    pub const ALL: [ConfigLayer; 3] = [Self::Global, Self::Workspace, Self::Local];

    /// Paths this layer may be read from, most preferred first.
    pub fn candidates(self, workspace_root: &Path) -> Vec<PathBuf> {
        match self {
            Self::Global => get_global_config_path().into_iter().collect(),
            Self::Workspace => CONFIG_FILES.iter().map(|f| workspace_root.join(f)).collect(),
            Self::Local => vec![workspace_root.join(LOCAL_CONFIG_FILE)],
        }
    }

    /// Parse the first candidate that exists, or `None` when the layer is absent.
    pub fn load(self, workspace_root: &Path) -> Result<Option<WorkspaceConfig>, ConfigError> {
        let Some(path) = self
            .candidates(workspace_root)
            .into_iter()
            .find(|p| p.is_file())
        else {
            return Ok(None);
        };
        debug!(layer = ?self, path = %path.display(), "loading config layer");
        load_config_file(&path).map(Some)
    }
}

/// `~/.obscode/config.json`, when a home directory is known.
pub fn get_global_config_path() -> Option<PathBuf> {
    Some(dirs::home_dir()?.join(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILE))
}

/// Parse one file. `.yaml`/`.yml` is read as YAML, anything else as JSON.
pub fn load_config_file(path: &Path) -> Result<WorkspaceConfig, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    if is_yaml {
        Ok(serde_yaml::from_str(&text)?)
    } else {
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_global_candidate() {
        let temp = TempDir::new().unwrap();
        let candidates = ConfigLayer::Global.candidates(temp.path());
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].ends_with(".obscode/config.json"));
    }

    #[test]
    fn test_missing_layers_are_none() {
        let temp = TempDir::new().unwrap();
        assert!(ConfigLayer::Workspace.load(temp.path()).unwrap().is_none());
        assert!(ConfigLayer::Local.load(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_workspace_json() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".obscode.json"),
            r#"{"environment": "PROD", "resolverHookTimeoutMs": 750}"#,
        )
        .unwrap();

        let config = ConfigLayer::Workspace.load(temp.path()).unwrap().unwrap();
        assert_eq!(config.environment.as_deref(), Some("PROD"));
        assert_eq!(config.resolver_hook_timeout_ms, Some(750));
    }

    #[test]
    fn test_workspace_yaml() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("obscode.config.yaml"),
            "environment: STAGING-EU\nbackendRetry:\n  maxAttempts: 3\n  delayMs: 100\n",
        )
        .unwrap();

        let config = ConfigLayer::Workspace.load(temp.path()).unwrap().unwrap();
        assert_eq!(config.environment.as_deref(), Some("STAGING-EU"));
        assert_eq!(config.backend_retry.unwrap().max_attempts, 3);
    }

    #[test]
    fn test_first_workspace_file_wins() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".obscode.json"), r#"{"environment": "A"}"#).unwrap();
        std::fs::write(temp.path().join("obscode.config.yaml"), "environment: B\n").unwrap();

        let config = ConfigLayer::Workspace.load(temp.path()).unwrap().unwrap();
        assert_eq!(config.environment.as_deref(), Some("A"));
    }

    #[test]
    fn test_invalid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".obscode.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_config_file(&path), Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn test_local_overrides_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(LOCAL_CONFIG_FILE),
            r#"{"warmUpOnEnvironmentChange": false}"#,
        )
        .unwrap();
        let config = ConfigLayer::Local.load(temp.path()).unwrap().unwrap();
        assert_eq!(config.warm_up_on_environment_change, Some(false));
    }
}
