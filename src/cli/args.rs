//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Baker - a build tool for C++ named modules
#[derive(Parser, Debug)]
#[command(name = "baker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if baker was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Flags shared by `build` and `run`.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildFlags {
    /// Use release flags instead of debug flags
    #[arg(long)]
    pub release: bool,

    /// Recompile every unit, ignoring timestamps
    #[arg(long)]
    pub rebuild: bool,

    /// Print every compiler command before running it
    #[arg(long)]
    pub show: bool,

    /// Number of compiler processes to run at once
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: u16,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build targets
    #[command(
        name = "build",
        long_about = "Build targets declared in the bakerfile.\n\n\
            Scans every source's module preamble, orders units so that each module \
            is compiled before its importers, and recompiles only what changed \
            (plus everything that transitively depends on it). Header units are \
            precompiled once and reused.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Build every target
    baker build

    # Build one target in release mode, 8 compilers at a time
    baker build --release -j 8 main

    # See what would recompile, and why, without compiling
    baker build --dry-run

    # Recompile everything and show the compiler commands
    baker build --rebuild --show"
    )]
    Build {
        #[command(flatten)]
        flags: BuildFlags,

        /// Show the build plan without running the compiler
        #[arg(long)]
        dry_run: bool,

        /// Targets to build (defaults to all, in name order)
        targets: Vec<String>,
    },

    /// Build a target and run it
    #[command(
        name = "run",
        long_about = "Build one target and run the resulting binary.\n\n\
            Arguments after `--` are passed to the binary. Baker exits with the \
            binary's exit code.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Build and run the only target
    baker run

    # Pick a target and pass arguments
    baker run --target convert -- input.ppm output.pgm"
    )]
    Run {
        #[command(flatten)]
        flags: BuildFlags,

        /// Target to run (required when the bakerfile declares several)
        #[arg(long)]
        target: Option<String>,

        /// Arguments passed to the binary
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Print the configuration
    #[command(
        name = "config",
        long_about = "Print the effective configuration.\n\n\
            Shows the merged result of built-in defaults, the global config file and \
            the bakerfile. With --default, shows only the built-in defaults, which \
            makes a good starting bakerfile.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Start a new project
    baker config --default > bakerfile.toml

    # Inspect the merged configuration as JSON
    baker config --json"
    )]
    Config {
        /// Print the built-in defaults instead of the effective configuration
        #[arg(long)]
        default: bool,

        /// Print JSON instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// Remove the build directory
    #[command(name = "clean")]
    Clean,

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell. Add the output \
            to your shell's configuration to enable tab-completion for baker commands.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    baker completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    baker completion zsh >> ~/.zshrc

    # Fish
    baker completion fish > ~/.config/fish/completions/baker.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
