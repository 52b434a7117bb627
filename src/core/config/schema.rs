//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Project Config
//!
//! Located at `<project>/bakerfile.toml`. It is the only file that may
//! declare targets.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$BAKER_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/baker/config.toml`
//! 3. `~/.baker/config.toml`
//!
//! It may set directories, flags and options, but not targets.
//!
//! # Validation
//!
//! Value types are enforced while parsing (a string where a list is expected
//! is a parse error). Values are validated after parsing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::TargetName;

/// Project configuration (`bakerfile.toml`).
///
/// # Example
///
/// ```toml
/// [dirs]
/// source = "src"
/// build = "build"
///
/// [flags]
/// base = ["-std=c++23", "-Wall"]
///
/// [options]
/// compiler = "clang++"
///
/// [targets]
/// main = ["main.cpp", "image.cppm", "logger.cppm"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Directory layout
    pub dirs: Option<DirsConfig>,

    /// Compiler flag sets
    pub flags: Option<FlagsConfig>,

    /// Tool options
    pub options: Option<OptionsConfig>,

    /// Build targets: name -> ordered sources, the first being the entry point
    pub targets: Option<BTreeMap<String, Vec<String>>>,
}

impl ProjectConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_shared(self.dirs.as_ref(), self.options.as_ref())?;

        let targets = self
            .targets
            .as_ref()
            .ok_or_else(|| ConfigError::InvalidValue("no targets specified".to_string()))?;
        if targets.is_empty() {
            return Err(ConfigError::InvalidValue(
                "targets cannot be empty".to_string(),
            ));
        }

        for (name, sources) in targets {
            TargetName::new(name.as_str())
                .map_err(|e| ConfigError::InvalidValue(format!("targets > {name}: {e}")))?;
            if sources.is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "targets > {name}: source list cannot be empty"
                )));
            }
            if let Some(empty) = sources.iter().position(|s| s.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(format!(
                    "targets > {name}: source #{} is empty",
                    empty + 1
                )));
            }
        }

        Ok(())
    }
}

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// [options]
/// compiler = "clang++-19"
///
/// [flags]
/// debug = ["-g", "-O0", "-DDEBUG"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Directory layout
    pub dirs: Option<DirsConfig>,

    /// Compiler flag sets
    pub flags: Option<FlagsConfig>,

    /// Tool options
    pub options: Option<OptionsConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_shared(self.dirs.as_ref(), self.options.as_ref())
    }
}

/// Directory names.
///
/// `source` and `build` are relative to the project root; `object` and
/// `header_units` are relative to the build directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DirsConfig {
    pub source: Option<String>,
    pub build: Option<String>,
    pub object: Option<String>,
    pub header_units: Option<String>,
}

impl DirsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let entries = [
            ("source", &self.source),
            ("build", &self.build),
            ("object", &self.object),
            ("header_units", &self.header_units),
        ];
        for (key, value) in entries {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(format!(
                    "dirs > {key} cannot be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Compiler flag sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FlagsConfig {
    /// Flags passed to every compiler invocation
    pub base: Option<Vec<String>>,

    /// Flags for debug builds (the default build type)
    pub debug: Option<Vec<String>>,

    /// Flags for `--release` builds
    pub release: Option<Vec<String>>,
}

/// Tool options.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsConfig {
    /// Compiler executable
    pub compiler: Option<String>,
}

fn validate_shared(
    dirs: Option<&DirsConfig>,
    options: Option<&OptionsConfig>,
) -> Result<(), ConfigError> {
    if let Some(dirs) = dirs {
        dirs.validate()?;
    }
    if let Some(compiler) = options.and_then(|o| o.compiler.as_deref()) {
        if compiler.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "options > compiler cannot be empty".to_string(),
            ));
        }
    }
    Ok(())
}
