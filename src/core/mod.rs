//! core
//!
//! Core domain types, schemas, and graph construction for baker.
//!
//! # Modules
//!
//! - [`types`] - Strong types: TargetName, Role, NodeId, etc.
//! - [`classify`] - Module-preamble scanner
//! - [`graph`] - Dependency graph assembly, resolution and reduction
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for sources and artifacts
//! - [`lock`] - Exclusive build-directory lock
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Graph construction is deterministic and never touches the compiler

pub mod classify;
pub mod config;
pub mod graph;
pub mod lock;
pub mod paths;
pub mod types;
