//! engine::plan
//!
//! Deterministic build plan generation.
//!
//! # Architecture
//!
//! A plan is the only bridge between a target's [`DependencyTree`] and the
//! compiler. It lists, in execution order:
//!
//! 1. Header units whose artifact is missing
//! 2. One compile step per reachable node, each marked with why it must
//!    recompile (or `None` if it is up to date)
//! 3. The link step and whether it must run
//!
//! # Scheduling
//!
//! Steps follow the tree's build order. An implementation unit waits on the
//! interface it implements and on its own imports; the interface never waits
//! on its implementation units.
//!
//! # Staleness
//!
//! Decided per step, in schedule order:
//!
//! ```text
//! rebuild(n) = force || stale(n) || any(rebuild(d) for d in deps(n))
//! ```
//!
//! where `stale(n)` compares artifact and source modification times and
//! `deps(n)` are the node's build dependencies. The decision never
//! depends on the order in which independent steps later execute.
//!
//! # Invariants
//!
//! - Planner reads file timestamps but writes nothing
//! - Every dependency of a step appears earlier in the plan
//! - No two steps write the same artifact
//!
//! # Example
//!
//! ```no_run
//! use baker::core::graph::build_tree;
//! use baker::engine::plan::plan;
//! # fn demo(ctx: &baker::engine::BuildContext, target: &baker::core::types::TargetName) {
//! let sources = vec!["main.cpp".to_string(), "logger.cppm".to_string()];
//! let tree = build_tree(&sources, ctx.paths.source_dir()).unwrap();
//! let plan = plan(ctx, target, &tree).unwrap();
//! println!("{} of {} units to recompile", plan.recompile_count(), plan.compile.len());
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use thiserror::Error;

use super::BuildContext;
use crate::core::graph::DependencyTree;
use crate::core::types::{NodeId, Role, TargetName};

/// Errors from planning.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("cannot read modification time of '{path}': {source}")]
    Metadata { path: PathBuf, source: io::Error },

    #[error("{first} and {second} would both write '{path}'")]
    ArtifactCollision {
        first: String,
        second: String,
        path: PathBuf,
    },
}

/// Why a compile step must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildReason {
    /// `--rebuild` was requested.
    Forced,
    /// The object file does not exist.
    MissingObject,
    /// The precompiled module does not exist.
    MissingModule,
    /// An artifact is older than the source.
    SourceNewer,
    /// A dependency recompiles in this run.
    Dependency,
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RebuildReason::Forced => "rebuild requested",
            RebuildReason::MissingObject => "object missing",
            RebuildReason::MissingModule => "module missing",
            RebuildReason::SourceNewer => "source changed",
            RebuildReason::Dependency => "dependency changed",
        };
        f.write_str(s)
    }
}

/// Why the link step must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkReason {
    /// At least one unit recompiled.
    Recompiled,
    /// The binary does not exist.
    MissingBinary,
}

/// Precompile one header unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderUnitStep {
    pub header: String,
    pub artifact: PathBuf,
}

/// Compile one translation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileStep {
    pub node: NodeId,
    pub filename: String,
    pub role: Role,
    pub source: PathBuf,
    pub object: PathBuf,
    /// Precompiled module written alongside the object (interfaces and partitions).
    pub module_output: Option<PathBuf>,
    /// Header-unit and module flags, in import order.
    pub module_flags: Vec<String>,
    /// Indices of earlier steps this one must wait for.
    pub deps: Vec<usize>,
    pub reason: Option<RebuildReason>,
}

impl CompileStep {
    /// Whether this step runs.
    pub fn needs_rebuild(&self) -> bool {
        self.reason.is_some()
    }
}

/// Link all objects of the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStep {
    pub objects: Vec<PathBuf>,
    pub binary: PathBuf,
    pub reason: Option<LinkReason>,
}

/// The complete plan for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub target: TargetName,
    pub header_units: Vec<HeaderUnitStep>,
    pub compile: Vec<CompileStep>,
    pub link: LinkStep,
}

impl BuildPlan {
    /// Number of units that recompile.
    pub fn recompile_count(&self) -> usize {
        self.compile.iter().filter(|s| s.needs_rebuild()).count()
    }

    /// Whether running the plan would invoke the compiler at all.
    pub fn is_up_to_date(&self) -> bool {
        self.header_units.is_empty() && self.recompile_count() == 0 && self.link.reason.is_none()
    }

    /// Steps that recompile, grouped into levels.
    ///
    /// A step's level is one more than the highest level among its
    /// recompiling dependencies. Steps within a level are independent;
    /// levels must run in order. Within a level, steps keep plan order.
    pub fn levels(&self) -> Vec<Vec<usize>> {
        let mut level_of: Vec<Option<usize>> = vec![None; self.compile.len()];
        let mut levels: Vec<Vec<usize>> = Vec::new();

        for (i, step) in self.compile.iter().enumerate() {
            if !step.needs_rebuild() {
                continue;
            }
            let level = step
                .deps
                .iter()
                .filter_map(|&d| level_of[d])
                .max()
                .map_or(0, |l| l + 1);
            level_of[i] = Some(level);
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(i);
        }

        levels
    }
}

/// Plan the build of one target.
///
/// # Errors
///
/// Returns an error if a file's timestamp cannot be read, or if two sources
/// map to the same artifact.
pub fn plan(
    ctx: &BuildContext,
    target: &TargetName,
    tree: &DependencyTree,
) -> Result<BuildPlan, PlanError> {
    let paths = &ctx.paths;

    let header_units = tree
        .header_units()
        .iter()
        .map(|header| HeaderUnitStep {
            header: header.clone(),
            artifact: paths.header_unit_path(header),
        })
        .filter(|step| !step.artifact.exists())
        .collect();

    let order = tree.post_order();
    let step_of: HashMap<NodeId, usize> = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut compile: Vec<CompileStep> = Vec::with_capacity(order.len());
    let mut objects_seen: HashMap<PathBuf, String> = HashMap::new();

    for &id in order {
        let record = tree.record(id);
        let source = paths.source_path(&record.filename);
        let object = paths.object_path(&record.filename);
        let module_output = record
            .role
            .emits_module()
            .then(|| paths.module_path(&record.filename));

        if let Some(first) = objects_seen.insert(object.clone(), record.filename.clone()) {
            return Err(PlanError::ArtifactCollision {
                first,
                second: record.filename.clone(),
                path: object,
            });
        }

        let deps: Vec<usize> = tree
            .build_dependencies(id)
            .iter()
            .filter_map(|d| step_of.get(d).copied())
            .collect();

        let reason = if ctx.options.rebuild {
            Some(RebuildReason::Forced)
        } else if let Some(stale) = staleness(&source, &object, module_output.as_deref())? {
            Some(stale)
        } else if deps.iter().any(|&d| compile[d].needs_rebuild()) {
            Some(RebuildReason::Dependency)
        } else {
            None
        };

        if let Some(reason) = reason {
            tracing::debug!(build_target = %target, filename = %record.filename, %reason, "scheduled");
        }

        compile.push(CompileStep {
            node: id,
            filename: record.filename.clone(),
            role: record.role,
            module_flags: module_flags(ctx, tree, id),
            source,
            object,
            module_output,
            deps,
            reason,
        });
    }

    let binary = paths.binary_path(target.as_str());
    let link_reason = if compile.iter().any(CompileStep::needs_rebuild) {
        Some(LinkReason::Recompiled)
    } else if !binary.exists() {
        Some(LinkReason::MissingBinary)
    } else {
        None
    };

    Ok(BuildPlan {
        target: target.clone(),
        header_units,
        link: LinkStep {
            objects: compile.iter().map(|s| s.object.clone()).collect(),
            binary,
            reason: link_reason,
        },
        compile,
    })
}

/// The node `id` implements, if it is an implementation unit.
fn implemented_by(tree: &DependencyTree, id: NodeId) -> Option<NodeId> {
    let record = tree.record(id);
    if record.role != Role::ModuleImplementation {
        return None;
    }
    record
        .owner_module
        .as_deref()
        .and_then(|name| tree.index().lookup(name))
}

/// `-fmodule-file` flags for one unit.
fn module_flags(ctx: &BuildContext, tree: &DependencyTree, id: NodeId) -> Vec<String> {
    let paths = &ctx.paths;
    let record = tree.record(id);
    let mut flags = Vec::new();

    for header in &record.header_units {
        flags.push(format!(
            "-fmodule-file={}",
            paths.header_unit_path(header).display()
        ));
    }

    let implemented = implemented_by(tree, id).and(record.owner_module.as_deref());
    let mut seen = HashSet::new();
    for name in implemented.into_iter().chain(record.imports.iter().map(String::as_str)) {
        if !seen.insert(name) {
            continue;
        }
        if let Some(target) = tree.index().lookup(name) {
            let pcm = paths.module_path(&tree.record(target).filename);
            flags.push(format!("-fmodule-file={}={}", name, pcm.display()));
        }
    }

    flags
}

/// Modification time of `path`, or `None` if it does not exist.
fn modified(path: &Path) -> Result<Option<SystemTime>, PlanError> {
    match path.metadata() {
        Ok(meta) => meta.modified().map(Some).map_err(|source| PlanError::Metadata {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PlanError::Metadata {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Whether a unit's own artifacts are out of date.
fn staleness(
    source: &Path,
    object: &Path,
    module: Option<&Path>,
) -> Result<Option<RebuildReason>, PlanError> {
    let source_time = modified(source)?;

    let Some(object_time) = modified(object)? else {
        return Ok(Some(RebuildReason::MissingObject));
    };
    let module_time = match module {
        Some(module) => match modified(module)? {
            Some(time) => Some(time),
            None => return Ok(Some(RebuildReason::MissingModule)),
        },
        None => None,
    };

    let older = |artifact: SystemTime| source_time.is_some_and(|s| artifact < s);
    if older(object_time) || module_time.is_some_and(older) {
        return Ok(Some(RebuildReason::SourceNewer));
    }
    Ok(None)
}
