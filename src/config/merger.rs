// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Handles merging configurations from different sources with proper precedence.

use super::types::{ResolvedConfig, WorkspaceConfig};

/// Default configuration values.
pub fn default_config() -> ResolvedConfig {
    ResolvedConfig::default()
}

/// Merge configurations with precedence.
///
/// Precedence (highest to lowest):
/// 1. Local config (.obscode.local.json)
/// 2. Workspace config (.obscode.json)
/// 3. Global config (~/.obscode/config.json)
/// 4. Default values
pub fn merge_config(
    global: Option<WorkspaceConfig>,
    workspace: Option<WorkspaceConfig>,
    local: Option<WorkspaceConfig>,
) -> ResolvedConfig {
    let mut result = default_config();

    for config in [global, workspace, local].into_iter().flatten() {
        apply_workspace_config(&mut result, &config);
    }

    result
}

fn apply_workspace_config(result: &mut ResolvedConfig, config: &WorkspaceConfig) {
    if let Some(ref environment) = config.environment {
        result.environment = environment.clone();
    }

    if let Some(retry) = config.backend_retry {
        result.backend_retry = retry;
    }

    if let Some(retry) = config.summaries_retry {
        result.summaries_retry = retry;
    }

    if let Some(timeout) = config.resolver_hook_timeout_ms {
        result.resolver_hook_timeout_ms = timeout;
    }

    if let Some(warm_up) = config.warm_up_on_environment_change {
        result.warm_up_on_environment_change = warm_up;
    }

    if let Some(ref languages) = config.disabled_languages {
        // Disabled lists accumulate across layers
        for lang in languages {
            if !result.disabled_languages.contains(lang) {
                result.disabled_languages.push(lang.clone());
            }
        }
    }
}
