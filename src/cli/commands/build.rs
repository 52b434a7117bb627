//! build command - Build targets incrementally

use std::collections::BTreeMap;

use anyhow::{bail, Context as _, Result};

use super::{load_project, Project};
use crate::cli::args::BuildFlags;
use crate::core::paths::BuildPaths;
use crate::core::types::TargetName;
use crate::engine::{self, BuildContext, BuildOptions, BuildPlan, Context};
use crate::toolchain::ProcessToolchain;
use crate::ui::output::{self, Verbosity};

/// Build the named targets, or every target when none are named.
pub fn build(ctx: &Context, flags: &BuildFlags, dry_run: bool, names: &[String]) -> Result<()> {
    let Project { root, config } = load_project(ctx)?;
    let selected = select_targets(config.targets(), names)?;

    let build_ctx = BuildContext::new(
        &config,
        BuildPaths::from_config(&root, &config),
        BuildOptions::from(flags),
        ctx.verbosity(),
    );

    if dry_run {
        for (target, sources) in selected {
            let plan = engine::plan_target(&build_ctx, target, sources)?;
            print_plan(&plan, build_ctx.verbosity);
        }
        return Ok(());
    }

    let reports = engine::build(&build_ctx, &ProcessToolchain::new(), selected)
        .context("Build failed")?;

    for report in &reports {
        if report.up_to_date() {
            output::print(format!("{} is up to date", report.target), ctx.verbosity());
        } else {
            output::print(
                format!(
                    "Built {} ({} recompiled) -> {}",
                    report.target,
                    report.recompiled,
                    report.binary.display()
                ),
                ctx.verbosity(),
            );
        }
    }

    Ok(())
}

/// Resolve requested target names against the bakerfile.
///
/// An empty request selects every target in name order. Duplicates are
/// built once, at their first position.
pub(crate) fn select_targets<'a>(
    targets: &'a BTreeMap<TargetName, Vec<String>>,
    names: &[String],
) -> Result<Vec<(&'a TargetName, &'a Vec<String>)>> {
    if names.is_empty() {
        return Ok(targets.iter().collect());
    }

    let mut selected: Vec<(&TargetName, &Vec<String>)> = Vec::with_capacity(names.len());
    for name in names {
        let Some(entry) = targets.get_key_value(name.as_str()) else {
            let known: Vec<&str> = targets.keys().map(TargetName::as_str).collect();
            bail!(
                "Unknown target '{}'. Targets in this bakerfile: {}",
                name,
                known.join(", ")
            );
        };
        if !selected.iter().any(|(t, _)| *t == entry.0) {
            selected.push(entry);
        }
    }
    Ok(selected)
}

/// Describe a plan without running it.
fn print_plan(plan: &BuildPlan, verbosity: Verbosity) {
    if plan.is_up_to_date() {
        output::print(format!("{} is up to date", plan.target), verbosity);
        return;
    }

    output::print(format!("{}:", plan.target), verbosity);
    for step in &plan.header_units {
        output::print(format!("  precompile <{}>", step.header), verbosity);
    }
    for step in &plan.compile {
        if let Some(reason) = step.reason {
            output::print(format!("  compile {} ({})", step.filename, reason), verbosity);
        }
    }
    if plan.link.reason.is_some() {
        output::print(format!("  link {}", plan.link.binary.display()), verbosity);
    }
}
