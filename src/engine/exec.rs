//! engine::exec
//!
//! Plan executor.
//!
//! # Architecture
//!
//! The executor is the only component that invokes the compiler. It runs a
//! [`BuildPlan`] in three phases:
//!
//! 1. Precompile missing header units, in sorted order
//! 2. Compile the steps marked for rebuild: in plan order with one job, or
//!    level by level on a rayon pool with more
//! 3. Link, if the plan says so
//!
//! # Invariants
//!
//! - Parent directories of every artifact exist before the compiler runs
//! - The first failing invocation aborts the run; no later level starts
//! - Artifacts already written stay on disk after a failure

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;

use super::plan::{BuildPlan, CompileStep, HeaderUnitStep, LinkStep};
use super::BuildContext;
use crate::core::types::TargetName;
use crate::toolchain::{Invocation, InvocationKind, Toolchain, ToolchainError};
use crate::ui::output;

/// Errors from plan execution.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("failed to create directory '{path}': {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("precompiling header unit <{header}> failed: {source}")]
    HeaderUnit {
        header: String,
        source: ToolchainError,
    },

    #[error("compiling {filename} failed: {source}")]
    Compile {
        filename: String,
        source: ToolchainError,
    },

    #[error("linking failed: {source}")]
    Link { source: ToolchainError },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

/// Outcome of building one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub target: TargetName,
    /// Header units precompiled in this run.
    pub header_units: usize,
    /// Translation units recompiled in this run.
    pub recompiled: usize,
    /// Whether the binary was linked in this run.
    pub linked: bool,
    pub binary: PathBuf,
}

impl BuildReport {
    /// Whether nothing had to be done.
    pub fn up_to_date(&self) -> bool {
        self.header_units == 0 && self.recompiled == 0 && !self.linked
    }
}

/// Runs build plans against a toolchain.
pub struct Executor<'a> {
    ctx: &'a BuildContext,
    toolchain: &'a dyn Toolchain,
}

impl<'a> Executor<'a> {
    pub fn new(ctx: &'a BuildContext, toolchain: &'a dyn Toolchain) -> Self {
        Self { ctx, toolchain }
    }

    /// Execute a plan.
    ///
    /// # Errors
    ///
    /// Returns the first failure. Nothing after it is started.
    pub fn execute(&self, plan: &BuildPlan) -> Result<BuildReport, ExecuteError> {
        for step in &plan.header_units {
            self.precompile(step)?;
        }

        let jobs = self.ctx.options.jobs.max(1);
        if jobs == 1 {
            for step in plan.compile.iter().filter(|s| s.needs_rebuild()) {
                self.compile(step)?;
            }
        } else {
            self.compile_parallel(plan, jobs)?;
        }

        let linked = plan.link.reason.is_some();
        if linked {
            self.link(&plan.link)?;
        }

        Ok(BuildReport {
            target: plan.target.clone(),
            header_units: plan.header_units.len(),
            recompiled: plan.recompile_count(),
            linked,
            binary: plan.link.binary.clone(),
        })
    }

    fn compile_parallel(&self, plan: &BuildPlan, jobs: usize) -> Result<(), ExecuteError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| ExecuteError::WorkerPool(e.to_string()))?;

        for (depth, level) in plan.levels().into_iter().enumerate() {
            tracing::debug!(depth, steps = level.len(), "compiling level");
            pool.install(|| {
                level
                    .par_iter()
                    .try_for_each(|&i| self.compile(&plan.compile[i]))
            })?;
        }
        Ok(())
    }

    fn precompile(&self, step: &HeaderUnitStep) -> Result<(), ExecuteError> {
        ensure_parent(&step.artifact)?;
        let invocation = Invocation::new(InvocationKind::HeaderUnit, &self.ctx.compiler)
            .args(self.ctx.base_flags.iter().cloned())
            .args(["--precompile", "-xc++-system-header"])
            .arg(step.header.as_str())
            .arg("-o")
            .path_arg(&step.artifact)
            .output(&step.artifact);

        output::print(format!("Precompiling <{}>", step.header), self.ctx.verbosity);
        self.run(&invocation)
            .map_err(|source| ExecuteError::HeaderUnit {
                header: step.header.clone(),
                source,
            })
    }

    fn compile(&self, step: &CompileStep) -> Result<(), ExecuteError> {
        ensure_parent(&step.object)?;
        let mut invocation = Invocation::new(InvocationKind::Compile, &self.ctx.compiler)
            .args(self.ctx.base_flags.iter().cloned())
            .args(self.ctx.type_flags.iter().cloned())
            .args(step.module_flags.iter().cloned())
            .arg("-c")
            .path_arg(&step.source)
            .arg("-o")
            .path_arg(&step.object)
            .output(&step.object);
        if let Some(module) = &step.module_output {
            ensure_parent(module)?;
            invocation = invocation
                .arg(format!("-fmodule-output={}", module.display()))
                .output(module);
        }

        if let Some(reason) = step.reason {
            tracing::debug!(filename = %step.filename, %reason, "compiling");
        }
        output::print(format!("Compiling {}", step.filename), self.ctx.verbosity);
        self.run(&invocation).map_err(|source| ExecuteError::Compile {
            filename: step.filename.clone(),
            source,
        })
    }

    fn link(&self, step: &LinkStep) -> Result<(), ExecuteError> {
        ensure_parent(&step.binary)?;
        let mut invocation = Invocation::new(InvocationKind::Link, &self.ctx.compiler)
            .args(self.ctx.base_flags.iter().cloned())
            .args(self.ctx.type_flags.iter().cloned());
        for object in &step.objects {
            invocation = invocation.path_arg(object);
        }
        let invocation = invocation
            .arg("-o")
            .path_arg(&step.binary)
            .output(&step.binary);

        output::print(format!("Linking {}", step.binary.display()), self.ctx.verbosity);
        self.run(&invocation)
            .map_err(|source| ExecuteError::Link { source })
    }

    fn run(&self, invocation: &Invocation) -> Result<(), ToolchainError> {
        if self.ctx.options.show {
            output::command(invocation);
        }
        self.toolchain.run(invocation)
    }
}

fn ensure_parent(path: &Path) -> Result<(), ExecuteError> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|source| ExecuteError::CreateDir {
            path: parent.to_path_buf(),
            source,
        }),
        None => Ok(()),
    }
}
