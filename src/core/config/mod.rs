//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Baker has two configuration scopes:
//! - **Global**: User-level defaults (compiler, flags, directory names)
//! - **Project**: The bakerfile, which also declares targets
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project bakerfile
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$BAKER_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/baker/config.toml`
//! 3. `~/.baker/config.toml`
//!
//! # Project Config Locations
//!
//! Searched in order:
//! 1. `bakerfile.toml` (canonical)
//! 2. `bakerfile` (legacy JSON format, warns)
//!
//! # Example
//!
//! ```no_run
//! use baker::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Path::new("/path/to/project")).unwrap();
//! let config = result.config;
//!
//! println!("Compiler: {}", config.compiler());
//! for (target, sources) in config.targets() {
//!     println!("{target}: {} sources", sources.len());
//! }
//! ```

pub mod schema;

pub use schema::{DirsConfig, FlagsConfig, GlobalConfig, OptionsConfig, ProjectConfig};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::TargetName;

/// Canonical project config file name.
pub const BAKERFILE: &str = "bakerfile.toml";

/// Legacy project config file name (JSON).
pub const LEGACY_BAKERFILE: &str = "bakerfile";

const DEFAULT_SOURCE_DIR: &str = "src";
const DEFAULT_BUILD_DIR: &str = "build";
const DEFAULT_OBJECT_DIR: &str = "obj";
const DEFAULT_HEADER_UNIT_DIR: &str = "header_units";
const DEFAULT_COMPILER: &str = "clang++";
const DEFAULT_BASE_FLAGS: &[&str] = &["-std=c++23"];
const DEFAULT_DEBUG_FLAGS: &[&str] = &["-g", "-DDEBUG"];
const DEFAULT_RELEASE_FLAGS: &[&str] = &["-O3", "-DNDEBUG"];

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("missing bakerfile: no bakerfile.toml in '{dir}'")]
    MissingBakerfile { dir: PathBuf },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("failed to serialize config: {0}")]
    SerializeError(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Output format for configuration dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpFormat {
    #[default]
    Toml,
    Json,
}

/// Merged configuration from all sources.
///
/// This struct provides accessor methods that apply precedence rules
/// automatically. Project config overrides global config, which overrides
/// the built-in defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Project configuration
    pub project: ProjectConfig,
    /// Validated targets, in name order
    targets: BTreeMap<TargetName, Vec<String>>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the project config file
    project_path: PathBuf,
}

impl Config {
    /// Load configuration for the project rooted at `project_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if no bakerfile exists, or if any config file
    /// cannot be read, parsed or validated. A missing global config is not
    /// an error (defaults are used).
    pub fn load(project_dir: &Path) -> Result<ConfigLoadResult, ConfigError> {
        let (global, global_path) = Self::load_global()?;
        Self::load_with_global(project_dir, global, global_path)
    }

    pub(crate) fn load_with_global(
        project_dir: &Path,
        global: GlobalConfig,
        global_path: Option<PathBuf>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();
        let (project, project_path) = Self::load_project(project_dir, &mut warnings)?;

        global.validate()?;
        project.validate()?;

        let targets = project
            .targets
            .iter()
            .flatten()
            .map(|(name, sources)| {
                TargetName::new(name.as_str())
                    .map(|name| (name, sources.clone()))
                    .map_err(|e| ConfigError::InvalidValue(e.to_string()))
            })
            .collect::<Result<_, _>>()?;

        Ok(ConfigLoadResult {
            config: Config {
                global,
                project,
                targets,
                global_path,
                project_path,
            },
            warnings,
        })
    }

    /// Load global configuration from standard locations.
    fn load_global() -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        // 1. Check $BAKER_CONFIG
        if let Ok(path) = std::env::var("BAKER_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 2. Check $XDG_CONFIG_HOME/baker/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("baker/config.toml");
            if path.exists() {
                let config = Self::read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 3. Check ~/.baker/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".baker/config.toml");
            if path.exists() {
                let config = Self::read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    /// Load the project bakerfile.
    fn load_project(
        project_dir: &Path,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(ProjectConfig, PathBuf), ConfigError> {
        // 1. Check bakerfile.toml (canonical)
        let canonical = project_dir.join(BAKERFILE);
        if canonical.exists() {
            let config = Self::read_toml(&canonical)?;
            return Ok((config, canonical));
        }

        // 2. Check bakerfile (legacy JSON)
        let legacy = project_dir.join(LEGACY_BAKERFILE);
        if legacy.is_file() {
            warnings.push(ConfigWarning {
                message: format!(
                    "Using legacy JSON bakerfile. Convert it with `baker config > {BAKERFILE}`"
                ),
                path: legacy.clone(),
            });
            let contents = Self::read_file(&legacy)?;
            let config =
                serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
                    path: legacy.clone(),
                    message: e.to_string(),
                })?;
            return Ok((config, legacy));
        }

        Err(ConfigError::MissingBakerfile {
            dir: project_dir.to_path_buf(),
        })
    }

    fn read_file(path: &Path) -> Result<String, ConfigError> {
        fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Read and parse a TOML config file.
    fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = Self::read_file(path)?;
        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// The built-in defaults, as a complete bakerfile without targets.
    pub fn defaults() -> ProjectConfig {
        let owned = |flags: &[&str]| Some(flags.iter().map(|f| f.to_string()).collect());
        ProjectConfig {
            dirs: Some(DirsConfig {
                source: Some(DEFAULT_SOURCE_DIR.to_string()),
                build: Some(DEFAULT_BUILD_DIR.to_string()),
                object: Some(DEFAULT_OBJECT_DIR.to_string()),
                header_units: Some(DEFAULT_HEADER_UNIT_DIR.to_string()),
            }),
            flags: Some(FlagsConfig {
                base: owned(DEFAULT_BASE_FLAGS),
                debug: owned(DEFAULT_DEBUG_FLAGS),
                release: owned(DEFAULT_RELEASE_FLAGS),
            }),
            options: Some(OptionsConfig {
                compiler: Some(DEFAULT_COMPILER.to_string()),
            }),
            targets: None,
        }
    }

    /// The effective configuration with every value resolved.
    pub fn effective(&self) -> ProjectConfig {
        ProjectConfig {
            dirs: Some(DirsConfig {
                source: Some(self.source_dir().to_string()),
                build: Some(self.build_dir().to_string()),
                object: Some(self.object_dir().to_string()),
                header_units: Some(self.header_unit_dir().to_string()),
            }),
            flags: Some(FlagsConfig {
                base: Some(self.base_flags()),
                debug: Some(self.debug_flags()),
                release: Some(self.release_flags()),
            }),
            options: Some(OptionsConfig {
                compiler: Some(self.compiler().to_string()),
            }),
            targets: self.project.targets.clone(),
        }
    }

    /// Serialize a configuration in the given format.
    pub fn dump(config: &ProjectConfig, format: DumpFormat) -> Result<String, ConfigError> {
        match format {
            DumpFormat::Toml => toml::to_string_pretty(config)
                .map_err(|e| ConfigError::SerializeError(e.to_string())),
            DumpFormat::Json => serde_json::to_string_pretty(config)
                .map_err(|e| ConfigError::SerializeError(e.to_string())),
        }
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    fn dir<'a>(&'a self, pick: fn(&DirsConfig) -> &Option<String>, default: &'a str) -> &'a str {
        self.project
            .dirs
            .as_ref()
            .and_then(|d| pick(d).as_deref())
            .or_else(|| self.global.dirs.as_ref().and_then(|d| pick(d).as_deref()))
            .unwrap_or(default)
    }

    fn flags(&self, pick: fn(&FlagsConfig) -> &Option<Vec<String>>, default: &[&str]) -> Vec<String> {
        self.project
            .flags
            .as_ref()
            .and_then(|f| pick(f).clone())
            .or_else(|| self.global.flags.as_ref().and_then(|f| pick(f).clone()))
            .unwrap_or_else(|| default.iter().map(|f| f.to_string()).collect())
    }

    /// Source directory, relative to the project root.
    ///
    /// Defaults to "src".
    pub fn source_dir(&self) -> &str {
        self.dir(|d| &d.source, DEFAULT_SOURCE_DIR)
    }

    /// Build directory, relative to the project root.
    ///
    /// Defaults to "build".
    pub fn build_dir(&self) -> &str {
        self.dir(|d| &d.build, DEFAULT_BUILD_DIR)
    }

    /// Object directory, relative to the build directory.
    ///
    /// Defaults to "obj".
    pub fn object_dir(&self) -> &str {
        self.dir(|d| &d.object, DEFAULT_OBJECT_DIR)
    }

    /// Header-unit directory, relative to the build directory.
    ///
    /// Defaults to "header_units".
    pub fn header_unit_dir(&self) -> &str {
        self.dir(|d| &d.header_units, DEFAULT_HEADER_UNIT_DIR)
    }

    /// Flags passed to every compiler invocation.
    pub fn base_flags(&self) -> Vec<String> {
        self.flags(|f| &f.base, DEFAULT_BASE_FLAGS)
    }

    /// Flags for debug builds.
    pub fn debug_flags(&self) -> Vec<String> {
        self.flags(|f| &f.debug, DEFAULT_DEBUG_FLAGS)
    }

    /// Flags for release builds.
    pub fn release_flags(&self) -> Vec<String> {
        self.flags(|f| &f.release, DEFAULT_RELEASE_FLAGS)
    }

    /// Compiler executable.
    ///
    /// Defaults to "clang++".
    pub fn compiler(&self) -> &str {
        self.project
            .options
            .as_ref()
            .and_then(|o| o.compiler.as_deref())
            .or_else(|| {
                self.global
                    .options
                    .as_ref()
                    .and_then(|o| o.compiler.as_deref())
            })
            .unwrap_or(DEFAULT_COMPILER)
    }

    /// Declared targets in name order.
    pub fn targets(&self) -> &BTreeMap<TargetName, Vec<String>> {
        &self.targets
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded bakerfile.
    pub fn project_config_loaded_from(&self) -> &Path {
        &self.project_path
    }
}
