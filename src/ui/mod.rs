//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All user-facing messages go through this module so that `--quiet` is
//! honored in one place.

pub mod output;
