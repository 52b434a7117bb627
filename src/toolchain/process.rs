//! toolchain::process
//!
//! Toolchain that spawns the configured compiler.

use std::process::Command;

use super::traits::{Invocation, Toolchain, ToolchainError};

/// Runs each invocation as a child process.
///
/// Standard output and error are inherited, so compiler diagnostics reach
/// the terminal unmodified.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessToolchain;

impl ProcessToolchain {
    pub fn new() -> Self {
        Self
    }
}

impl Toolchain for ProcessToolchain {
    fn run(&self, invocation: &Invocation) -> Result<(), ToolchainError> {
        tracing::debug!(kind = %invocation.kind, command = %invocation, "spawning compiler");

        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .status()
            .map_err(|e| ToolchainError::Spawn {
                program: invocation.program.clone(),
                message: e.to_string(),
            })?;

        if status.success() {
            return Ok(());
        }
        match status.code() {
            Some(code) => Err(ToolchainError::Exit {
                command: invocation.to_string(),
                code,
            }),
            None => Err(ToolchainError::Signal {
                command: invocation.to_string(),
            }),
        }
    }
}
