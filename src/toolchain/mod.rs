//! toolchain
//!
//! Abstraction over the external C++ compiler.
//!
//! # Architecture
//!
//! The engine never spawns processes itself. It describes each compiler call
//! as an [`Invocation`] and hands it to a [`Toolchain`]:
//!
//! - [`ProcessToolchain`]: runs the configured compiler as a child process
//! - [`mock::MockToolchain`]: records invocations and writes placeholder
//!   artifacts, for deterministic tests
//!
//! # Example
//!
//! ```
//! use baker::toolchain::{Invocation, InvocationKind, Toolchain};
//! use baker::toolchain::mock::MockToolchain;
//!
//! let toolchain = MockToolchain::new().without_outputs();
//! let invocation = Invocation::new(InvocationKind::Link, "clang++")
//!     .arg("main.o")
//!     .arg("-o")
//!     .arg("main");
//!
//! toolchain.run(&invocation).unwrap();
//! assert_eq!(toolchain.invocations().len(), 1);
//! assert_eq!(invocation.to_string(), "clang++ main.o -o main");
//! ```

pub mod mock;
mod process;
mod traits;

pub use process::ProcessToolchain;
pub use traits::*;
