//! Baker - an incremental build tool for C++ named modules
//!
//! Baker reads a project's `bakerfile.toml`, scans the module preamble of each
//! target's sources, orders translation units so every module is compiled
//! before its importers, and recompiles only what changed since the last run.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Orchestrates the Scan → Plan → Execute lifecycle
//! - [`core`] - Domain types, configuration, classification and the dependency graph
//! - [`toolchain`] - Single interface for running the compiler
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. A unit is compiled only after every module it imports
//! 2. Cycles and unknown imports are rejected before the compiler runs
//! 3. A unit is skipped only when it and everything it depends on is fresh
//! 4. One baker process writes to a build directory at a time

pub mod cli;
pub mod core;
pub mod engine;
pub mod toolchain;
pub mod ui;
