//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads the project configuration (except `completion` and
//!    `config --default`, which need no project)
//! 2. Calls the engine to do the work
//! 3. Formats and displays output
//!
//! Handlers never invoke the compiler directly.

mod build;
mod clean;
mod completion;
mod config_cmd;
mod run;

pub use build::build;
pub use clean::clean;
pub use completion::completion;
pub use config_cmd::config;
pub use run::run;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::cli::args::{BuildFlags, Command};
use crate::core::config::Config;
use crate::engine::{BuildOptions, Context};
use crate::ui::output;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Build {
            flags,
            dry_run,
            targets,
        } => build::build(ctx, &flags, dry_run, &targets),
        Command::Run {
            flags,
            target,
            args,
        } => run::run(ctx, &flags, target.as_deref(), &args),
        Command::Config { default, json } => config_cmd::config(ctx, default, json),
        Command::Clean => clean::clean(ctx),
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// A loaded project: its root and effective configuration.
pub(crate) struct Project {
    pub root: PathBuf,
    pub config: Config,
}

/// Load the project configuration and report config warnings.
pub(crate) fn load_project(ctx: &Context) -> Result<Project> {
    let root = ctx
        .project_root()
        .context("Failed to determine working directory")?;
    let loaded = Config::load(&root).context("Failed to load configuration")?;

    for warning in &loaded.warnings {
        output::warn(
            format!("{}: {}", warning.path.display(), warning.message),
            ctx.verbosity(),
        );
    }
    tracing::debug!(
        project = %loaded.config.project_config_loaded_from().display(),
        global = ?loaded.config.global_config_loaded_from(),
        "configuration loaded"
    );

    Ok(Project {
        root,
        config: loaded.config,
    })
}

impl From<&BuildFlags> for BuildOptions {
    fn from(flags: &BuildFlags) -> Self {
        Self {
            release: flags.release,
            rebuild: flags.rebuild,
            show: flags.show,
            jobs: usize::from(flags.jobs),
        }
    }
}
