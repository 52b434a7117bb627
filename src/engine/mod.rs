//! engine
//!
//! Orchestrates the build lifecycle: Scan -> Plan -> Execute.
//!
//! # Architecture
//!
//! The engine is the central coordinator of every build. Each target goes
//! through the same lifecycle:
//!
//! 1. **Scan**: Classify the target's sources and build its dependency tree
//!    ([`crate::core::graph::build_tree`])
//! 2. **Plan**: Decide what recompiles and whether to link ([`plan::plan`])
//! 3. **Execute**: Invoke the toolchain ([`exec::Executor`])
//!
//! Scan and plan never start the compiler. Any error there aborts the target
//! before the first invocation.
//!
//! # Invariants
//!
//! - The [`BuildContext`] is immutable for the duration of a run
//! - Only the executor invokes the toolchain
//! - The build lock is held while any target executes
//!
//! # Example
//!
//! ```no_run
//! use baker::core::config::Config;
//! use baker::core::paths::BuildPaths;
//! use baker::engine::{self, BuildContext, BuildOptions};
//! use baker::toolchain::ProcessToolchain;
//! use baker::ui::output::Verbosity;
//! use std::path::Path;
//!
//! let root = Path::new("/path/to/project");
//! let config = Config::load(root).unwrap().config;
//! let ctx = BuildContext::new(
//!     &config,
//!     BuildPaths::from_config(root, &config),
//!     BuildOptions::default(),
//!     Verbosity::Normal,
//! );
//!
//! let reports = engine::build(&ctx, &ProcessToolchain::new(), config.targets()).unwrap();
//! for report in reports {
//!     println!("{}: {} recompiled", report.target, report.recompiled);
//! }
//! ```

pub mod exec;
pub mod plan;

pub use exec::{BuildReport, ExecuteError, Executor};
pub use plan::{BuildPlan, PlanError};

use std::path::PathBuf;

use crate::core::config::Config;
use crate::core::graph::{self, GraphError};
use crate::core::lock::{BuildLock, LockError};
use crate::core::paths::BuildPaths;
use crate::core::types::TargetName;
use crate::toolchain::Toolchain;
use crate::ui::output::{self, Verbosity};

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
}

impl Context {
    /// The project root: `--cwd` if given, else the process working directory.
    pub fn project_root(&self) -> std::io::Result<PathBuf> {
        match &self.cwd {
            Some(cwd) => Ok(cwd.clone()),
            None => std::env::current_dir(),
        }
    }

    /// Output verbosity derived from the flags.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }
}

/// Per-run build switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Use release flags instead of debug flags.
    pub release: bool,
    /// Recompile every unit regardless of timestamps.
    pub rebuild: bool,
    /// Echo every compiler command before running it.
    pub show: bool,
    /// Maximum number of concurrent compiler processes.
    pub jobs: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            release: false,
            rebuild: false,
            show: false,
            jobs: 1,
        }
    }
}

/// Everything a build reads, resolved once per run.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub compiler: String,
    pub base_flags: Vec<String>,
    /// Debug or release flags.
    pub type_flags: Vec<String>,
    pub paths: BuildPaths,
    pub options: BuildOptions,
    pub verbosity: Verbosity,
}

impl BuildContext {
    /// Resolve a context from the effective configuration.
    pub fn new(
        config: &Config,
        paths: BuildPaths,
        options: BuildOptions,
        verbosity: Verbosity,
    ) -> Self {
        let type_flags = if options.release {
            config.release_flags()
        } else {
            config.debug_flags()
        };
        Self {
            compiler: config.compiler().to_string(),
            base_flags: config.base_flags(),
            type_flags,
            paths,
            options,
            verbosity,
        }
    }
}

/// Errors from engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Graph construction failed.
    #[error("target '{target}': {source}")]
    Graph {
        target: TargetName,
        source: GraphError,
    },

    /// Planning failed.
    #[error("target '{target}': {source}")]
    Plan {
        target: TargetName,
        source: PlanError,
    },

    /// Execution failed.
    #[error("target '{target}': {source}")]
    Execute {
        target: TargetName,
        source: ExecuteError,
    },

    /// The build directory is in use.
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Scan and plan one target without running anything.
pub fn plan_target(
    ctx: &BuildContext,
    target: &TargetName,
    sources: &[String],
) -> Result<BuildPlan, EngineError> {
    let tree = graph::build_tree(sources, ctx.paths.source_dir()).map_err(|source| {
        EngineError::Graph {
            target: target.clone(),
            source,
        }
    })?;
    tracing::debug!(
        build_target = %target,
        nodes = tree.len(),
        reachable = tree.post_order().len(),
        header_units = tree.header_units().len(),
        "dependency tree built"
    );

    plan::plan(ctx, target, &tree).map_err(|source| EngineError::Plan {
        target: target.clone(),
        source,
    })
}

/// Run the full lifecycle for one target.
///
/// The caller must hold the build lock.
pub fn build_target(
    ctx: &BuildContext,
    toolchain: &dyn Toolchain,
    target: &TargetName,
    sources: &[String],
) -> Result<BuildReport, EngineError> {
    let plan = plan_target(ctx, target, sources)?;

    if plan.is_up_to_date() {
        output::debug(format!("{target} is up to date"), ctx.verbosity);
    } else {
        output::print(format!("Building {target}"), ctx.verbosity);
    }

    Executor::new(ctx, toolchain)
        .execute(&plan)
        .map_err(|source| EngineError::Execute {
            target: target.clone(),
            source,
        })
}

/// Build several targets in order under one build lock.
///
/// Stops at the first failing target.
pub fn build<'a, I>(
    ctx: &BuildContext,
    toolchain: &dyn Toolchain,
    targets: I,
) -> Result<Vec<BuildReport>, EngineError>
where
    I: IntoIterator<Item = (&'a TargetName, &'a Vec<String>)>,
{
    let _lock = BuildLock::acquire(&ctx.paths)?;
    targets
        .into_iter()
        .map(|(target, sources)| build_target(ctx, toolchain, target, sources))
        .collect()
}
