//! toolchain::mock
//!
//! Mock toolchain for deterministic testing.
//!
//! # Design
//!
//! The mock records every invocation in order and, unless disabled, writes
//! each declared output so that later runs see fresh artifacts. A failure
//! can be configured for invocations mentioning a given argument.
//!
//! # Example
//!
//! ```
//! use baker::toolchain::mock::MockToolchain;
//! use baker::toolchain::{Invocation, InvocationKind, Toolchain, ToolchainError};
//!
//! let toolchain = MockToolchain::new().without_outputs().fail_on("broken.cpp");
//!
//! let ok = Invocation::new(InvocationKind::Compile, "c++").arg("fine.cpp");
//! let bad = Invocation::new(InvocationKind::Compile, "c++").arg("broken.cpp");
//!
//! assert!(toolchain.run(&ok).is_ok());
//! assert!(matches!(toolchain.run(&bad), Err(ToolchainError::Exit { code: 1, .. })));
//! assert_eq!(toolchain.invocations().len(), 2);
//! ```

use std::fs;
use std::sync::{Arc, Mutex};

use super::traits::{Invocation, InvocationKind, Toolchain, ToolchainError};

/// Mock toolchain for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockToolchain {
    inner: Arc<Mutex<MockToolchainInner>>,
}

#[derive(Debug)]
struct MockToolchainInner {
    /// Recorded invocations, in the order they ran.
    invocations: Vec<Invocation>,
    /// Fail any invocation with an argument equal to or ending with this.
    fail_on: Option<String>,
    /// Write declared outputs on success.
    write_outputs: bool,
}

impl MockToolchain {
    /// Create a mock that succeeds and writes every declared output.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockToolchainInner {
                invocations: Vec::new(),
                fail_on: None,
                write_outputs: true,
            })),
        }
    }

    /// Fail invocations that have an argument ending with `pattern`.
    pub fn fail_on(self, pattern: impl Into<String>) -> Self {
        self.inner.lock().unwrap().fail_on = Some(pattern.into());
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.inner.lock().unwrap().fail_on = None;
    }

    /// Do not write declared outputs.
    pub fn without_outputs(self) -> Self {
        self.inner.lock().unwrap().write_outputs = false;
        self
    }

    /// Get all recorded invocations.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.inner.lock().unwrap().invocations.clone()
    }

    /// Get recorded invocations of one kind.
    pub fn invocations_of(&self, kind: InvocationKind) -> Vec<Invocation> {
        self.inner
            .lock()
            .unwrap()
            .invocations
            .iter()
            .filter(|inv| inv.kind == kind)
            .cloned()
            .collect()
    }

    /// Forget all recorded invocations.
    pub fn clear_invocations(&self) {
        self.inner.lock().unwrap().invocations.clear();
    }
}

impl Default for MockToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolchain for MockToolchain {
    fn run(&self, invocation: &Invocation) -> Result<(), ToolchainError> {
        let mut inner = self.inner.lock().unwrap();
        inner.invocations.push(invocation.clone());

        if let Some(pattern) = &inner.fail_on {
            if invocation.args.iter().any(|a| a.ends_with(pattern.as_str())) {
                return Err(ToolchainError::Exit {
                    command: invocation.to_string(),
                    code: 1,
                });
            }
        }

        if inner.write_outputs {
            for output in &invocation.outputs {
                fs::write(output, invocation.to_string()).map_err(|e| ToolchainError::Spawn {
                    program: invocation.program.clone(),
                    message: format!("cannot write {}: {e}", output.display()),
                })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn records_in_order() {
        let toolchain = MockToolchain::new().without_outputs();
        for name in ["a.cpp", "b.cpp"] {
            let inv = Invocation::new(InvocationKind::Compile, "c++").arg(name);
            toolchain.run(&inv).unwrap();
        }

        let recorded = toolchain.invocations();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].args, vec!["a.cpp"]);
        assert_eq!(recorded[1].args, vec!["b.cpp"]);
    }

    #[test]
    fn writes_declared_outputs() {
        let temp = TempDir::new().unwrap();
        let object = temp.path().join("a.o");
        let module = temp.path().join("a.pcm");

        let toolchain = MockToolchain::new();
        let inv = Invocation::new(InvocationKind::Compile, "c++")
            .arg("a.cppm")
            .output(&object)
            .output(&module);
        toolchain.run(&inv).unwrap();

        assert!(object.exists());
        assert!(module.exists());
    }

    #[test]
    fn failure_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let object = temp.path().join("bad.o");

        let toolchain = MockToolchain::new().fail_on("bad.cpp");
        let inv = Invocation::new(InvocationKind::Compile, "c++")
            .arg("/src/bad.cpp")
            .output(&object);

        assert!(toolchain.run(&inv).is_err());
        assert!(!object.exists());
        assert_eq!(toolchain.invocations().len(), 1);
    }

    #[test]
    fn clones_share_state() {
        let toolchain = MockToolchain::new().without_outputs();
        let clone = toolchain.clone();
        clone
            .run(&Invocation::new(InvocationKind::Link, "c++"))
            .unwrap();

        assert_eq!(toolchain.invocations_of(InvocationKind::Link).len(), 1);
        assert!(toolchain.invocations_of(InvocationKind::Compile).is_empty());

        toolchain.clear_invocations();
        assert!(clone.invocations().is_empty());
    }

    #[test]
    fn clear_fail_on() {
        let toolchain = MockToolchain::new().without_outputs().fail_on("x.cpp");
        let inv = Invocation::new(InvocationKind::Compile, "c++").arg("x.cpp");
        assert!(toolchain.run(&inv).is_err());

        toolchain.clear_fail_on();
        assert!(toolchain.run(&inv).is_ok());
    }
}
