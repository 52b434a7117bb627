//! toolchain::traits
//!
//! Toolchain trait and invocation types.
//!
//! # Design
//!
//! `Toolchain` is synchronous: every compiler call blocks until the process
//! exits. Implementations must be `Send + Sync` so that independent
//! compile steps can share one toolchain across a thread pool.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from compiler invocations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolchainError {
    /// The compiler could not be started (not found, not executable).
    #[error("failed to run '{program}': {message}")]
    Spawn { program: String, message: String },

    /// The compiler exited with a non-zero status.
    #[error("command failed with exit code {code}: {command}")]
    Exit { command: String, code: i32 },

    /// The compiler was killed before it could exit.
    #[error("command terminated by signal: {command}")]
    Signal { command: String },
}

/// What an invocation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationKind {
    /// Precompile a header unit.
    HeaderUnit,
    /// Compile one translation unit to an object (and a module for interfaces).
    Compile,
    /// Link objects into a binary.
    Link,
}

impl fmt::Display for InvocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationKind::HeaderUnit => write!(f, "header unit"),
            InvocationKind::Compile => write!(f, "compile"),
            InvocationKind::Link => write!(f, "link"),
        }
    }
}

/// One compiler process invocation.
///
/// `outputs` lists the artifacts the invocation is expected to write; it is
/// not passed to the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub kind: InvocationKind,
    pub program: String,
    pub args: Vec<String>,
    pub outputs: Vec<PathBuf>,
}

impl Invocation {
    /// Start an invocation of `program` with no arguments.
    pub fn new(kind: InvocationKind, program: impl Into<String>) -> Self {
        Self {
            kind,
            program: program.into(),
            args: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument.
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    /// Record an artifact this invocation writes.
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs.push(path.into());
        self
    }

    /// Whether any argument equals `needle`.
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Runs compiler invocations.
pub trait Toolchain: Send + Sync {
    /// Run one invocation to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started or does not exit
    /// successfully.
    fn run(&self, invocation: &Invocation) -> Result<(), ToolchainError>;
}
