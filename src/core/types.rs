//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`TargetName`] - Validated build target name
//! - [`SourceKind`] - The two accepted source file extensions
//! - [`Role`] - Module role of a translation unit
//! - [`NodeId`] - Stable index of a node in a target's graph arena
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use baker::core::types::{SourceKind, TargetName};
//!
//! let target = TargetName::new("main").unwrap();
//! assert_eq!(target.as_str(), "main");
//!
//! assert_eq!(SourceKind::from_filename("main.cpp"), Some(SourceKind::Primary));
//! assert_eq!(SourceKind::from_filename("image.cppm"), Some(SourceKind::ModuleInterface));
//! assert_eq!(SourceKind::from_filename("legacy.cc"), None);
//!
//! assert!(TargetName::new("").is_err());
//! assert!(TargetName::new("bin/app").is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid target name: {0}")]
    InvalidTargetName(String),
}

/// A validated build target name.
///
/// Target names become file names under the build directory, so they:
/// - Cannot be empty
/// - Cannot contain path separators (`/` or `\`)
/// - Cannot be `.` or `..`
/// - Cannot contain ASCII control characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetName(String);

impl TargetName {
    /// Create a new validated target name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidTargetName` if the name cannot be used as a file name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidTargetName(
                "target name cannot be empty".into(),
            ));
        }
        if name == "." || name == ".." {
            return Err(TypeError::InvalidTargetName(format!(
                "target name cannot be '{name}'"
            )));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(TypeError::InvalidTargetName(format!(
                "target name '{name}' cannot contain a path separator"
            )));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return Err(TypeError::InvalidTargetName(
                "target name cannot contain control characters".into(),
            ));
        }
        Ok(())
    }

    /// Get the target name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TargetName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TargetName> for String {
    fn from(name: TargetName) -> Self {
        name.0
    }
}

impl AsRef<str> for TargetName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for TargetName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of a source file, decided by its extension.
///
/// Only two extensions are accepted as target sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `.cpp` - ordinary translation units and implementation units.
    Primary,
    /// `.cppm` - module interface and partition units.
    ModuleInterface,
}

impl SourceKind {
    /// Extension of primary sources (without the dot).
    pub const PRIMARY_EXTENSION: &'static str = "cpp";
    /// Extension of module interface sources (without the dot).
    pub const MODULE_EXTENSION: &'static str = "cppm";

    /// Classify a file name by its extension.
    ///
    /// Returns `None` for any other extension.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext {
            Self::PRIMARY_EXTENSION => Some(Self::Primary),
            Self::MODULE_EXTENSION => Some(Self::ModuleInterface),
            _ => None,
        }
    }
}

/// Module role of a translation unit, as declared by its preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// No module declaration.
    #[default]
    Plain,
    /// `export module Name;`
    ModuleInterface,
    /// `export module Name:Part;`
    ModulePartition,
    /// `module Name;`
    ModuleImplementation,
}

impl Role {
    /// Whether compiling a unit with this role also emits a precompiled module.
    pub fn emits_module(self) -> bool {
        matches!(self, Role::ModuleInterface | Role::ModulePartition)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Plain => "plain",
            Role::ModuleInterface => "module interface",
            Role::ModulePartition => "module partition",
            Role::ModuleImplementation => "module implementation",
        };
        f.write_str(s)
    }
}

/// Stable identity of a node in one target's graph.
///
/// Node ids are indices into the graph arena. Equality is index equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod target_name {
        use super::*;

        #[test]
        fn valid_target_names() {
            assert!(TargetName::new("main").is_ok());
            assert!(TargetName::new("image-tool").is_ok());
            assert!(TargetName::new("app.v2").is_ok());
        }

        #[test]
        fn empty_name_rejected() {
            assert!(TargetName::new("").is_err());
        }

        #[test]
        fn separators_rejected() {
            assert!(TargetName::new("bin/app").is_err());
            assert!(TargetName::new("bin\\app").is_err());
        }

        #[test]
        fn dot_names_rejected() {
            assert!(TargetName::new(".").is_err());
            assert!(TargetName::new("..").is_err());
        }

        #[test]
        fn serde_rejects_invalid() {
            let result: Result<TargetName, _> = serde_json::from_str("\"a/b\"");
            assert!(result.is_err());
        }
    }

    mod source_kind {
        use super::*;

        #[test]
        fn recognizes_both_extensions() {
            assert_eq!(
                SourceKind::from_filename("main/main.cpp"),
                Some(SourceKind::Primary)
            );
            assert_eq!(
                SourceKind::from_filename("image/netpbm.cppm"),
                Some(SourceKind::ModuleInterface)
            );
        }

        #[test]
        fn rejects_other_extensions() {
            assert_eq!(SourceKind::from_filename("util.cc"), None);
            assert_eq!(SourceKind::from_filename("util.hpp"), None);
            assert_eq!(SourceKind::from_filename("Makefile"), None);
            assert_eq!(SourceKind::from_filename("main.cpp.bak"), None);
        }
    }

    mod role {
        use super::*;

        #[test]
        fn only_interfaces_and_partitions_emit_modules() {
            assert!(!Role::Plain.emits_module());
            assert!(Role::ModuleInterface.emits_module());
            assert!(Role::ModulePartition.emits_module());
            assert!(!Role::ModuleImplementation.emits_module());
        }

        #[test]
        fn default_is_plain() {
            assert_eq!(Role::default(), Role::Plain);
        }
    }
}
