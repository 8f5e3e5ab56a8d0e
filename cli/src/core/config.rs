//! # Tarball Configuration System
//!
//! File: cli/src/core/config.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module loads the defaults that `tarball create` and `tarball extract`
//! fall back to when a flag is not given on the command line. Configuration is
//! optional: with no files present every setting has a built-in default.
//!
//! ## Architecture
//!
//! Configuration sources (in order of precedence):
//! 1. An explicit file passed with `--config` (or `TARBALL_CONFIG`). When given,
//!    it is the *only* file read.
//! 2. Project-specific `.tarball.toml` in the current directory or its ancestors
//!    (the search stops at a directory containing `.git`).
//! 3. User-specific `config.toml` in the platform config directory
//!    (e.g. `~/.config/tarball/config.toml`).
//! 4. Default values defined in the code.
//!
//! Command-line flags always win over anything loaded here.
//!
//! ## Examples
//!
//! ```toml
//! [create]
//! compress = false
//! filter_mode = "photos"
//!
//! [extract]
//! overwrite = false
//! ```
//!
//! ```rust
//! let cfg = config::load_config(cli.config.as_deref())?;
//! let level = args.level.unwrap_or(cfg.create.compression_level);
//! ```
//!
use crate::common::archive::FilterMode;
use crate::core::error::{Result, TarballError};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub create: CreateDefaults,
    #[serde(default)]
    pub extract: ExtractDefaults,
}

/// Defaults for `tarball create`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CreateDefaults {
    /// Gzip the archive (defaults to true).
    #[serde(default = "default_compress")]
    pub compress: bool,
    /// Gzip level, 0 (store) to 9 (best).
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
    /// Descend into subdirectories (defaults to true).
    #[serde(default = "default_recursive")]
    pub recursive: bool,
    /// Which files to include.
    #[serde(default)]
    pub filter_mode: FilterMode,
    /// Allowed file extensions (without the dot). Only honoured with `filter_mode = "all"`.
    #[serde(default)]
    pub file_types: Vec<String>,
    /// Write every modification time as 0 so identical trees give identical archives.
    #[serde(default)]
    pub normalize_mtime: bool,
}

impl Default for CreateDefaults {
    fn default() -> Self {
        Self {
            compress: default_compress(),
            compression_level: default_compression_level(),
            recursive: default_recursive(),
            filter_mode: FilterMode::default(),
            file_types: Vec::new(),
            normalize_mtime: false,
        }
    }
}

/// Defaults for `tarball extract`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExtractDefaults {
    /// Replace files that already exist at the destination (defaults to true).
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
}

impl Default for ExtractDefaults {
    fn default() -> Self {
        Self {
            overwrite: default_overwrite(),
        }
    }
}

fn default_compress() -> bool {
    true
}
fn default_compression_level() -> u32 {
    crate::common::archive::compression::DEFAULT_LEVEL
}
fn default_recursive() -> bool {
    true
}
fn default_overwrite() -> bool {
    true
}

const PROJECT_CONFIG_FILENAME: &str = ".tarball.toml";

/// Loads, merges and validates the configuration.
///
/// `explicit` is the value of `--config` / `TARBALL_CONFIG`; when present the
/// discovery of user and project files is skipped entirely.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let config = match explicit {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            load_config_from_path(path)?
        }
        None => {
            let user_config = load_user_config()?;
            let project_config = load_project_config()?;
            merge_configs(user_config.unwrap_or_default(), project_config)
        }
    };
    validate_config(&config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", config);
    Ok(config)
}

fn load_user_config() -> Result<Option<Config>> {
    if let Some(proj_dirs) = ProjectDirs::from("com", "Tarball", "tarball") {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.exists() {
            info!("Loading user configuration from: {}", config_path.display());
            load_config_from_path(&config_path).map(Some)
        } else {
            debug!(
                "User configuration file not found at {}",
                config_path.display()
            );
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

fn load_project_config() -> Result<Option<Config>> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    if let Some(project_config_path) = find_project_config_path(&current_dir) {
        info!(
            "Loading project configuration from: {}",
            project_config_path.display()
        );
        load_config_from_path(&project_config_path).map(Some)
    } else {
        debug!("No project configuration file (.tarball.toml) found in current directory or ancestors.");
        Ok(None)
    }
}

fn find_project_config_path(start: &Path) -> Option<PathBuf> {
    let mut path = start;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Some(project_config);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

/// Project values win wherever they differ from the built-in default.
fn merge_configs(user: Config, project: Option<Config>) -> Config {
    let project_cfg = match project {
        Some(p) => p,
        None => return user,
    };
    let defaults = Config::default();
    let mut merged = Config::default();

    macro_rules! pick {
        ($section:ident . $field:ident) => {
            merged.$section.$field = if project_cfg.$section.$field != defaults.$section.$field {
                project_cfg.$section.$field.clone()
            } else {
                user.$section.$field.clone()
            };
        };
    }

    pick!(create.compress);
    pick!(create.compression_level);
    pick!(create.recursive);
    pick!(create.filter_mode);
    pick!(create.file_types);
    pick!(create.normalize_mtime);
    pick!(extract.overwrite);
    merged
}

fn validate_config(config: &Config) -> Result<()> {
    if config.create.compression_level > 9 {
        return Err(anyhow!(TarballError::Config(format!(
            "compression_level must be between 0 and 9, got {}",
            config.create.compression_level
        ))));
    }
    for file_type in &config.create.file_types {
        if file_type.is_empty() || file_type.contains('.') || file_type.contains('/') {
            return Err(anyhow!(TarballError::Config(format!(
                "Invalid file type '{}': use a bare extension such as \"jpg\".",
                file_type
            ))));
        }
    }
    if !config.create.file_types.is_empty() && config.create.filter_mode != FilterMode::All {
        warn!(
            "file_types is only honoured with filter_mode = \"all\"; ignoring it for \"{}\".",
            config.create.filter_mode
        );
    }
    Ok(())
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_deserialize_basic_toml() {
        let toml_content = r#"
            [create]
            compress = false
            filter_mode = "photos"
            file_types = ["jpg"]

            [extract]
            overwrite = false
        "#;

        let config: Config = toml::from_str(toml_content).expect("Failed to parse TOML");

        assert!(!config.create.compress);
        assert_eq!(config.create.filter_mode, FilterMode::Photos);
        assert_eq!(config.create.file_types, vec!["jpg"]);
        assert_eq!(config.create.compression_level, 6); // Default
        assert!(config.create.recursive); // Default
        assert!(!config.extract.overwrite);
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.create.compress);
        assert!(config.extract.overwrite);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[create]\nzstd = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_prefers_non_default_project_values() {
        let mut user = Config::default();
        user.create.compression_level = 9;
        user.extract.overwrite = false;

        let mut project = Config::default();
        project.create.compress = false;

        let merged = merge_configs(user, Some(project));
        assert!(!merged.create.compress); // From project
        assert_eq!(merged.create.compression_level, 9); // From user
        assert!(!merged.extract.overwrite); // From user
    }

    #[test]
    fn test_validate_config_rejects_bad_level() {
        let mut config = Config::default();
        config.create.compression_level = 12;
        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("compression_level must be between 0 and 9"));
    }

    #[test]
    fn test_validate_config_rejects_dotted_file_type() {
        let mut config = Config::default();
        config.create.file_types = vec![".jpg".to_string()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_find_project_config_stops_at_git() -> Result<()> {
        let root = tempdir()?;
        fs::write(root.path().join(PROJECT_CONFIG_FILENAME), "")?;
        let repo = root.path().join("repo");
        fs::create_dir_all(repo.join(".git"))?;
        let nested = repo.join("src/deep");
        fs::create_dir_all(&nested)?;

        // The .tarball.toml above the repository must not be picked up.
        assert_eq!(find_project_config_path(&nested), None);

        fs::write(repo.join(PROJECT_CONFIG_FILENAME), "")?;
        assert_eq!(
            find_project_config_path(&nested),
            Some(repo.join(PROJECT_CONFIG_FILENAME))
        );
        Ok(())
    }

    #[test]
    fn test_load_explicit_config_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[create]\ncompression_level = 1\nrecursive = false\n")?;
        let config = load_config(Some(&path))?;
        assert_eq!(config.create.compression_level, 1);
        assert!(!config.create.recursive);
        Ok(())
    }
}
