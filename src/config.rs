//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/cattree/cattree.toml`
//! 3. Local config: `<project_dir>/.cattree.toml`
//! 4. Environment variables: `CATTREE_*` prefix
//! 5. Command line flags (applied by the CLI through `with_overrides`)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{OrphanPolicy, PATH_SEPARATOR};

/// Unified configuration for cattree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Breadcrumb separator for flattened paths (default: " > ")
    pub path_separator: String,
    /// Handling of categories whose parent id is missing
    pub orphan_policy: OrphanPolicy,
    /// Indentation unit per level in the parent selector
    pub indent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            path_separator: PATH_SEPARATOR.to_string(),
            orphan_policy: OrphanPolicy::default(),
            indent: "  ".to_string(),
        }
    }
}

/// Raw settings for intermediate parsing (`None` = not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub path_separator: Option<String>,
    pub orphan_policy: Option<OrphanPolicy>,
    pub indent: Option<String>,
}

/// Get the XDG config directory for cattree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cattree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("cattree.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".cattree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Merge overlay config onto self (base): overlay wins where it is set.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            path_separator: overlay
                .path_separator
                .clone()
                .unwrap_or_else(|| self.path_separator.clone()),
            orphan_policy: overlay.orphan_policy.unwrap_or(self.orphan_policy),
            indent: overlay.indent.clone().unwrap_or_else(|| self.indent.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional project directory for local config
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path();
        Self::load_from(global.as_deref(), project_dir)
    }

    /// Load settings from an explicit global config file and project directory.
    ///
    /// Missing files are skipped; unreadable or malformed files are errors.
    pub fn load_from(
        global_path: Option<&Path>,
        project_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_path {
            if global_path.exists() {
                let raw = load_raw_settings(global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Local config
        if let Some(project) = project_dir {
            let local_path = local_config_path(project);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Environment variables (explicit override)
        Self::apply_env_overrides(current)
    }

    /// Apply CATTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("CATTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("path_separator") {
            settings.path_separator = val;
        }
        if let Ok(val) = config.get_string("orphan_policy") {
            settings.orphan_policy = val.parse().map_err(|message| ApplicationError::Config {
                message: format!("CATTREE_ORPHAN_POLICY: {}", message),
            })?;
        }
        if let Ok(val) = config.get_string("indent") {
            settings.indent = val;
        }

        Ok(settings)
    }

    /// Apply command line flags on top of the loaded layers.
    pub fn with_overrides(
        mut self,
        orphan_policy: Option<OrphanPolicy>,
        path_separator: Option<&str>,
    ) -> Self {
        if let Some(policy) = orphan_policy {
            self.orphan_policy = policy;
        }
        if let Some(sep) = path_separator {
            self.path_separator = sep.to_string();
        }
        self
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# cattree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/cattree/cattree.toml
#   Local:  <project_dir>/.cattree.toml
#   Env:    CATTREE_* environment variables (e.g. CATTREE_ORPHAN_POLICY=reject)

# Breadcrumb separator used in flattened paths
# path_separator = " > "

# Categories whose parent id does not exist:
#   drop    - leave them (and their descendants) out, report them
#   promote - show them as root categories
#   reject  - fail
# orphan_policy = "drop"

# Indentation per level in the parent selector
# indent = "  "
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
