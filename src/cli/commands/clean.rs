//! clean command - Remove the build directory

use std::fs;

use anyhow::{Context as _, Result};

use super::{load_project, Project};
use crate::core::lock::BuildLock;
use crate::core::paths::BuildPaths;
use crate::engine::Context;
use crate::ui::output;

/// Remove the build directory and everything in it.
///
/// Refuses while another baker process holds the build lock.
pub fn clean(ctx: &Context) -> Result<()> {
    let Project { root, config } = load_project(ctx)?;
    let paths = BuildPaths::from_config(&root, &config);
    let build_dir = paths.build_dir();

    if !build_dir.exists() {
        output::print("Nothing to clean", ctx.verbosity());
        return Ok(());
    }

    let lock = BuildLock::acquire(&paths)?;
    fs::remove_dir_all(build_dir)
        .with_context(|| format!("Failed to remove {}", build_dir.display()))?;
    drop(lock);

    output::print(format!("Removed {}", build_dir.display()), ctx.verbosity());
    Ok(())
}
