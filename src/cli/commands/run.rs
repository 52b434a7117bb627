//! run command - Build one target and run its binary

use std::process::Command;

use anyhow::{bail, Context as _, Result};

use super::build::select_targets;
use super::{load_project, Project};
use crate::cli::args::BuildFlags;
use crate::core::paths::BuildPaths;
use crate::engine::{self, BuildContext, BuildOptions, Context};
use crate::toolchain::ProcessToolchain;

/// Build `target` (or the only target) and run it with `args`.
///
/// Exits the process with the binary's exit code when it is not zero.
pub fn run(ctx: &Context, flags: &BuildFlags, target: Option<&str>, args: &[String]) -> Result<()> {
    let Project { root, config } = load_project(ctx)?;

    let name = match target {
        Some(name) => name.to_string(),
        None => {
            let mut names = config.targets().keys();
            match (names.next(), names.next()) {
                (Some(only), None) => only.to_string(),
                _ => bail!(
                    "This bakerfile declares several targets; choose one with --target"
                ),
            }
        }
    };
    let selected = select_targets(config.targets(), std::slice::from_ref(&name))?;

    let build_ctx = BuildContext::new(
        &config,
        BuildPaths::from_config(&root, &config),
        BuildOptions::from(flags),
        ctx.verbosity(),
    );
    let reports = engine::build(&build_ctx, &ProcessToolchain::new(), selected)
        .context("Build failed")?;
    let Some(report) = reports.first() else {
        bail!("Target '{}' produced no binary", name);
    };

    tracing::debug!(binary = %report.binary.display(), ?args, "running binary");
    let status = Command::new(&report.binary)
        .args(args)
        .current_dir(&root)
        .status()
        .with_context(|| format!("Failed to run {}", report.binary.display()))?;

    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}
