// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration module.
//!
//! Handles loading and merging configuration from multiple sources:
//! - Global config: ~/.obscode/config.json
//! - Workspace config: .obscode.json, .obscode/config.json, or obscode.config.yaml
//! - Local config: .obscode.local.json (gitignored, for personal overrides)
//!
//! Configuration is merged with precedence (local > workspace > global > defaults).

mod loader;
mod merger;
mod types;

pub use loader::{
    get_global_config_path, load_config_file, ConfigLayer, CONFIG_FILES, GLOBAL_CONFIG_DIR,
    GLOBAL_CONFIG_FILE, LOCAL_CONFIG_FILE,
};
pub use merger::{default_config, merge_config};
pub use types::{ResolvedConfig, RetryConfig, WorkspaceConfig, DEFAULT_ENVIRONMENT};

use crate::error::ConfigError;
use std::path::Path;

/// Load and merge all configuration sources for a workspace.
pub fn load_config(workspace_root: &Path) -> Result<ResolvedConfig, ConfigError> {
    let [global, workspace, local] = ConfigLayer::ALL;
    Ok(merge_config(
        global.load(workspace_root)?,
        workspace.load(workspace_root)?,
        local.load(workspace_root)?,
    ))
}
