//! # Configuration
//!
//! Optional TOML settings for the CLI.
//!
//! ```toml
//! [resolver]
//! wildcard_types = ["*", "ANY", "ANYTHING"]
//!
//! [output]
//! pretty = false
//!
//! [limits]
//! max_workflow_bytes = 8388608
//! max_batch_operations = 500
//! ```
//!
//! Every section and key is optional. Lookup order: `--config`, then
//! `NODEWIRE_CONFIG`, then `nodewire.toml` in the working directory.

use nodewire_core::{NodewireError, ResolverOptions, primitives};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "NODEWIRE_CONFIG";

/// Config file picked up from the working directory when nothing else is set.
pub const DEFAULT_CONFIG_FILE: &str = "nodewire.toml";

/// Largest config file accepted (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub resolver: ResolverOptions,
    pub output: OutputConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Indent saved workflow JSON.
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_workflow_bytes: usize,
    pub max_batch_operations: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_workflow_bytes: primitives::MAX_WORKFLOW_BYTES,
            max_batch_operations: primitives::MAX_BATCH_OPERATIONS,
        }
    }
}

impl AppConfig {
    /// Parse a config document.
    pub fn from_toml(text: &str) -> Result<Self, NodewireError> {
        toml::from_str(text)
            .map_err(|e| NodewireError::DeserializationError(format!("Invalid config: {}", e)))
    }

    /// Load the config named by `explicit`, the environment, or the working
    /// directory. Defaults when none of them names a file.
    pub fn load(explicit: Option<&Path>) -> Result<Self, NodewireError> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        match resolve_config_path(explicit, env_path) {
            Some(path) => Self::load_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load a specific config file.
    pub fn load_file(path: &Path) -> Result<Self, NodewireError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            NodewireError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(NodewireError::DeserializationError(format!(
                "Config size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            NodewireError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        tracing::debug!("Loaded config from {:?}", path);
        Self::from_toml(&text)
    }
}

/// Pick the config file to load, if any.
///
/// An explicit path or an environment path is returned even if it does not
/// exist, so a typo surfaces as an error. The working-directory default is
/// only used when present.
pub fn resolve_config_path(explicit: Option<&Path>, env_path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env_path.filter(|path| !path.as_os_str().is_empty()) {
        return Some(path);
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.is_file().then_some(local)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = AppConfig::from_toml("").expect("parse");

        assert_eq!(config, AppConfig::default());
        assert!(config.output.pretty);
        assert_eq!(config.resolver.wildcard_types, vec!["*", "ANY"]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [resolver]
            wildcard_types = ["*"]

            [limits]
            max_batch_operations = 5
            "#,
        )
        .expect("parse");

        assert_eq!(config.resolver.wildcard_types, vec!["*"]);
        assert_eq!(config.limits.max_batch_operations, 5);
        assert_eq!(
            config.limits.max_workflow_bytes,
            primitives::MAX_WORKFLOW_BYTES
        );
        assert!(config.output.pretty);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = AppConfig::from_toml("[output]\nprety = true\n");
        assert!(matches!(
            result,
            Err(NodewireError::DeserializationError(_))
        ));
    }

    #[test]
    fn explicit_path_wins() {
        let explicit = PathBuf::from("/tmp/a.toml");
        let env = Some(PathBuf::from("/tmp/b.toml"));

        assert_eq!(
            resolve_config_path(Some(&explicit), env.clone()),
            Some(explicit)
        );
        assert_eq!(resolve_config_path(None, env.clone()), env);
    }

    #[test]
    fn load_file_reads_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nodewire.toml");
        std::fs::write(&path, "[output]\npretty = false\n").expect("write");

        let config = AppConfig::load_file(&path).expect("load");
        assert!(!config.output.pretty);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            AppConfig::load_file(&missing),
            Err(NodewireError::IoError(_))
        ));
    }
}
