//! core::paths
//!
//! Centralized path routing for build inputs and artifacts.
//!
//! # Architecture
//!
//! Every file baker reads or writes is located through [`BuildPaths`].
//! No other code joins configured directory names onto the project root.
//!
//! # Layout
//!
//! Relative to the project root:
//! - `<source>/<file>` - Sources
//! - `<build>/<object>/<file>.o` - Object files (extension replaced)
//! - `<build>/<object>/<file>.pcm` - Precompiled modules (extension replaced)
//! - `<build>/<header_units>/<header>.pcm` - Header-unit artifacts
//! - `<build>/<target>` - Linked binaries
//! - `<build>/.baker.lock` - Exclusive build lock
//!
//! # Example
//!
//! ```
//! use baker::core::paths::BuildPaths;
//! use std::path::PathBuf;
//!
//! let paths = BuildPaths::new("/proj", "src", "build", "obj", "header_units");
//!
//! assert_eq!(paths.source_path("image/netpbm.cppm"), PathBuf::from("/proj/src/image/netpbm.cppm"));
//! assert_eq!(paths.object_path("image/netpbm.cppm"), PathBuf::from("/proj/build/obj/image/netpbm.o"));
//! assert_eq!(paths.module_path("image/netpbm.cppm"), PathBuf::from("/proj/build/obj/image/netpbm.pcm"));
//! assert_eq!(paths.header_unit_path("vector"), PathBuf::from("/proj/build/header_units/vector.pcm"));
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::core::config::Config;

/// Lock file name inside the build directory.
pub const LOCK_FILE: &str = ".baker.lock";

/// Centralized path routing for one project.
///
/// # Invariants
///
/// - All artifact paths live under `build_dir`
/// - Object and module paths of one source differ only in extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    root: PathBuf,
    source_dir: PathBuf,
    build_dir: PathBuf,
    object_dir: PathBuf,
    header_unit_dir: PathBuf,
}

impl BuildPaths {
    /// Create paths from a project root and directory names.
    ///
    /// `build` and `source` are relative to `root`; `object` and
    /// `header_units` are relative to the build directory.
    pub fn new(
        root: impl Into<PathBuf>,
        source: &str,
        build: &str,
        object: &str,
        header_units: &str,
    ) -> Self {
        let root = root.into();
        let build_dir = root.join(build);
        Self {
            source_dir: root.join(source),
            object_dir: build_dir.join(object),
            header_unit_dir: build_dir.join(header_units),
            build_dir,
            root,
        }
    }

    /// Create paths from the effective configuration.
    pub fn from_config(root: &Path, config: &Config) -> Self {
        Self::new(
            root,
            config.source_dir(),
            config.build_dir(),
            config.object_dir(),
            config.header_unit_dir(),
        )
    }

    // =========================================================================
    // Directories
    // =========================================================================

    /// Project root (where the bakerfile lives).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Source directory.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Build directory; `baker clean` removes it.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Directory holding object files and precompiled modules.
    pub fn object_dir(&self) -> &Path {
        &self.object_dir
    }

    /// Directory holding header-unit artifacts.
    pub fn header_unit_dir(&self) -> &Path {
        &self.header_unit_dir
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Path of a source file.
    pub fn source_path(&self, filename: &str) -> PathBuf {
        self.source_dir.join(filename)
    }

    /// Object file of a source: `<object>/<file>.o`.
    pub fn object_path(&self, filename: &str) -> PathBuf {
        self.object_dir.join(filename).with_extension("o")
    }

    /// Precompiled module of a source: `<object>/<file>.pcm`.
    pub fn module_path(&self, filename: &str) -> PathBuf {
        self.object_dir.join(filename).with_extension("pcm")
    }

    /// Header-unit artifact: `<header_units>/<header>.pcm`.
    ///
    /// The header's own extension (if any) is kept, so `stdio.h` maps to
    /// `stdio.h.pcm`.
    pub fn header_unit_path(&self, header: &str) -> PathBuf {
        let mut name = OsString::from(self.header_unit_dir.join(header));
        name.push(".pcm");
        PathBuf::from(name)
    }

    /// Linked binary of a target.
    pub fn binary_path(&self, target: &str) -> PathBuf {
        self.build_dir.join(target)
    }

    /// Build lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.build_dir.join(LOCK_FILE)
    }
}
