//! Integration tests for the build lifecycle.
//!
//! These tests drive the engine end to end (Scan → Plan → Execute) against
//! real source files in a temporary project, with a recording toolchain in
//! place of the compiler.

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use baker::core::graph::GraphError;
use baker::core::lock::{BuildLock, LockError};
use baker::core::paths::BuildPaths;
use baker::core::types::TargetName;
use baker::engine::{self, BuildContext, BuildOptions, EngineError};
use baker::toolchain::mock::MockToolchain;
use baker::toolchain::{Invocation, InvocationKind};
use baker::ui::output::Verbosity;

// =============================================================================
// Test Fixtures
// =============================================================================

/// A temporary project with sources under `src/`.
struct TestProject {
    dir: TempDir,
    paths: BuildPaths,
}

impl TestProject {
    fn new(sources: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let paths = BuildPaths::new(dir.path(), "src", "build", "obj", "header_units");
        fs::create_dir_all(paths.source_dir()).unwrap();
        let project = Self { dir, paths };
        for (name, text) in sources {
            project.write(name, text);
        }
        project
    }

    fn write(&self, name: &str, text: &str) {
        let path = self.paths.source_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }

    /// Move a source's modification time into the future.
    fn touch(&self, name: &str) {
        let later = SystemTime::now() + Duration::from_secs(60);
        File::options()
            .write(true)
            .open(self.paths.source_path(name))
            .unwrap()
            .set_modified(later)
            .unwrap();
    }

    fn context(&self, options: BuildOptions) -> BuildContext {
        BuildContext {
            compiler: "clang++".to_string(),
            base_flags: vec!["-std=c++23".to_string()],
            type_flags: vec!["-g".to_string(), "-DDEBUG".to_string()],
            paths: self.paths.clone(),
            options,
            verbosity: Verbosity::Quiet,
        }
    }

    fn build(
        &self,
        toolchain: &MockToolchain,
        options: BuildOptions,
        sources: &[&str],
    ) -> Result<engine::BuildReport, EngineError> {
        let target = TargetName::new("app").unwrap();
        let sources: Vec<String> = sources.iter().map(|s| s.to_string()).collect();
        let reports = engine::build(
            &self.context(options),
            toolchain,
            [(&target, &sources)],
        )?;
        Ok(reports.into_iter().next().unwrap())
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// The source file (relative to `src/`) each compile invocation compiled.
fn compiled(toolchain: &MockToolchain, project: &TestProject) -> Vec<String> {
    toolchain
        .invocations_of(InvocationKind::Compile)
        .iter()
        .map(|inv| compiled_source(inv, project))
        .collect()
}

fn compiled_source(inv: &Invocation, project: &TestProject) -> String {
    let at = inv.args.iter().position(|a| a == "-c").unwrap();
    Path::new(&inv.args[at + 1])
        .strip_prefix(project.paths.source_dir())
        .unwrap()
        .display()
        .to_string()
}

const DIAMOND: &[(&str, &str)] = &[
    ("main.cpp", "import a;\nimport b;\nint main() { return 0; }\n"),
    ("a.cppm", "export module a;\nimport c;\nexport int a();\n"),
    ("b.cppm", "export module b;\nimport c;\nexport int b();\n"),
    ("c.cppm", "export module c;\nexport int c();\n"),
];
const DIAMOND_SOURCES: &[&str] = &["main.cpp", "a.cppm", "b.cppm", "c.cppm"];

// =============================================================================
// Incremental builds
// =============================================================================

#[test]
fn first_build_compiles_everything_in_dependency_order() {
    let project = TestProject::new(DIAMOND);
    let toolchain = MockToolchain::new();

    let report = project
        .build(&toolchain, BuildOptions::default(), DIAMOND_SOURCES)
        .unwrap();

    assert_eq!(report.recompiled, 4);
    assert!(report.linked);
    assert!(project.paths.binary_path("app").exists());

    let order = compiled(&toolchain, &project);
    let pos = |f: &str| order.iter().position(|c| c == f).unwrap();
    assert!(pos("c.cppm") < pos("a.cppm"));
    assert!(pos("c.cppm") < pos("b.cppm"));
    assert!(pos("a.cppm") < pos("main.cpp"));
    assert!(pos("b.cppm") < pos("main.cpp"));
}

#[test]
fn unchanged_rerun_invokes_nothing() {
    let project = TestProject::new(DIAMOND);
    let toolchain = MockToolchain::new();
    project
        .build(&toolchain, BuildOptions::default(), DIAMOND_SOURCES)
        .unwrap();
    toolchain.clear_invocations();

    let report = project
        .build(&toolchain, BuildOptions::default(), DIAMOND_SOURCES)
        .unwrap();

    assert!(report.up_to_date());
    assert_eq!(report.recompiled, 0);
    assert!(!report.linked);
    assert!(toolchain.invocations().is_empty());
}

#[test]
fn touching_a_leaf_rebuilds_its_dependents() {
    let project = TestProject::new(DIAMOND);
    let toolchain = MockToolchain::new();
    project
        .build(&toolchain, BuildOptions::default(), DIAMOND_SOURCES)
        .unwrap();
    toolchain.clear_invocations();

    project.touch("c.cppm");
    let report = project
        .build(&toolchain, BuildOptions::default(), DIAMOND_SOURCES)
        .unwrap();

    assert_eq!(report.recompiled, 4);
    assert!(report.linked);
    let mut rebuilt = compiled(&toolchain, &project);
    rebuilt.sort();
    assert_eq!(rebuilt, vec!["a.cppm", "b.cppm", "c.cppm", "main.cpp"]);
}

#[test]
fn touching_one_branch_leaves_the_other_alone() {
    let project = TestProject::new(DIAMOND);
    let toolchain = MockToolchain::new();
    project
        .build(&toolchain, BuildOptions::default(), DIAMOND_SOURCES)
        .unwrap();
    toolchain.clear_invocations();

    project.touch("a.cppm");
    let report = project
        .build(&toolchain, BuildOptions::default(), DIAMOND_SOURCES)
        .unwrap();

    assert_eq!(report.recompiled, 2);
    assert_eq!(compiled(&toolchain, &project), vec!["a.cppm", "main.cpp"]);
    assert_eq!(toolchain.invocations_of(InvocationKind::Link).len(), 1);
}

#[test]
fn missing_binary_relinks_without_recompiling() {
    let project = TestProject::new(DIAMOND);
    let toolchain = MockToolchain::new();
    project
        .build(&toolchain, BuildOptions::default(), DIAMOND_SOURCES)
        .unwrap();
    toolchain.clear_invocations();

    fs::remove_file(project.paths.binary_path("app")).unwrap();
    let report = project
        .build(&toolchain, BuildOptions::default(), DIAMOND_SOURCES)
        .unwrap();

    assert_eq!(report.recompiled, 0);
    assert!(report.linked);
    assert!(toolchain.invocations_of(InvocationKind::Compile).is_empty());
    assert_eq!(toolchain.invocations_of(InvocationKind::Link).len(), 1);
}

#[test]
fn rebuild_recompiles_everything_but_keeps_header_units() {
    let sources: &[(&str, &str)] = &[
        ("main.cpp", "import <vector>;\nimport a;\n"),
        ("a.cppm", "export module a;\nimport <vector>;\n"),
    ];
    let project = TestProject::new(sources);
    let toolchain = MockToolchain::new();
    project
        .build(&toolchain, BuildOptions::default(), &["main.cpp", "a.cppm"])
        .unwrap();
    toolchain.clear_invocations();

    let report = project
        .build(
            &toolchain,
            BuildOptions {
                rebuild: true,
                ..Default::default()
            },
            &["main.cpp", "a.cppm"],
        )
        .unwrap();

    assert_eq!(report.recompiled, 2);
    assert_eq!(report.header_units, 0);
    assert!(toolchain.invocations_of(InvocationKind::HeaderUnit).is_empty());
}

// =============================================================================
// Header units and module flags
// =============================================================================

#[test]
fn shared_header_unit_precompiled_once_and_passed_to_every_importer() {
    let sources: &[(&str, &str)] = &[
        ("main.cpp", "import <iostream>;\nimport a;\n"),
        ("a.cppm", "export module a;\nimport <iostream>;\n"),
    ];
    let project = TestProject::new(sources);
    let toolchain = MockToolchain::new();

    let report = project
        .build(&toolchain, BuildOptions::default(), &["main.cpp", "a.cppm"])
        .unwrap();
    assert_eq!(report.header_units, 1);

    let header_units = toolchain.invocations_of(InvocationKind::HeaderUnit);
    assert_eq!(header_units.len(), 1);
    assert!(header_units[0].has_arg("iostream"));

    let artifact = project.paths.header_unit_path("iostream");
    let flag = format!("-fmodule-file={}", artifact.display());
    for inv in toolchain.invocations_of(InvocationKind::Compile) {
        assert!(inv.has_arg(&flag), "missing header-unit flag in: {inv}");
    }
}

#[test]
fn importer_receives_flags_for_direct_imports_only() {
    let project = TestProject::new(DIAMOND);
    let toolchain = MockToolchain::new();
    project
        .build(&toolchain, BuildOptions::default(), DIAMOND_SOURCES)
        .unwrap();

    let compile_of = |filename: &str| {
        toolchain
            .invocations_of(InvocationKind::Compile)
            .into_iter()
            .find(|inv| compiled_source(inv, &project) == filename)
            .unwrap()
    };
    let flag = |module: &str| {
        let pcm = project.paths.module_path(&format!("{module}.cppm"));
        format!("-fmodule-file={module}={}", pcm.display())
    };

    let main = compile_of("main.cpp");
    assert!(main.has_arg(&flag("a")));
    assert!(main.has_arg(&flag("b")));
    assert!(!main.has_arg(&flag("c")));

    let a = compile_of("a.cppm");
    assert!(a.has_arg(&flag("c")));
}

#[test]
fn implementation_unit_importing_a_dependent_module_builds() {
    let sources: &[(&str, &str)] = &[
        ("main.cpp", "import image; // entry\nimport logger;\nint main() {}\n"),
        ("logger_impl.cpp", "module logger;\nimport image;\nvoid log() {}\n"),
        ("image.cppm", "export module image; // uses logger\nimport logger;\n"),
        ("logger.cppm", "export module logger;\n"),
    ];
    let project = TestProject::new(sources);
    let toolchain = MockToolchain::new();
    project
        .build(
            &toolchain,
            BuildOptions::default(),
            &["main.cpp", "logger_impl.cpp", "image.cppm", "logger.cppm"],
        )
        .unwrap();

    assert_eq!(
        compiled(&toolchain, &project),
        vec!["logger.cppm", "image.cppm", "logger_impl.cpp", "main.cpp"]
    );
}

#[test]
fn partitions_and_implementation_units_build() {
    let sources: &[(&str, &str)] = &[
        ("main.cpp", "import shapes;\n"),
        (
            "shapes.cppm",
            "export module shapes;\nexport import :circle;\n",
        ),
        ("shapes-circle.cppm", "export module shapes:circle;\n"),
        ("shapes_impl.cpp", "module shapes;\nint area() { return 0; }\n"),
    ];
    let project = TestProject::new(sources);
    let toolchain = MockToolchain::new();

    let report = project
        .build(
            &toolchain,
            BuildOptions::default(),
            &["main.cpp", "shapes.cppm", "shapes-circle.cppm", "shapes_impl.cpp"],
        )
        .unwrap();

    assert_eq!(report.recompiled, 4);
    let order = compiled(&toolchain, &project);
    let pos = |f: &str| order.iter().position(|c| c == f).unwrap();
    assert!(pos("shapes-circle.cppm") < pos("shapes.cppm"));
    assert!(pos("shapes.cppm") < pos("shapes_impl.cpp"));
    assert!(pos("shapes.cppm") < pos("main.cpp"));

    let link = &toolchain.invocations_of(InvocationKind::Link)[0];
    assert!(link.has_arg(&project.paths.object_path("shapes_impl.cpp").display().to_string()));
}

// =============================================================================
// Errors abort before the compiler runs
// =============================================================================

#[test]
fn undeclared_module_fails_without_invocations() {
    let project = TestProject::new(&[("main.cpp", "import missing;\n")]);
    let toolchain = MockToolchain::new();

    let err = project
        .build(&toolchain, BuildOptions::default(), &["main.cpp"])
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Graph {
            source: GraphError::UnknownModule { ref name, .. },
            ..
        } if name == "missing"
    ));
    assert!(err.to_string().contains("did you forget to include its source?"));
    assert!(toolchain.invocations().is_empty());
}

#[test]
fn import_cycle_fails_without_invocations() {
    let sources: &[(&str, &str)] = &[
        ("main.cpp", "import a;\n"),
        ("a.cppm", "export module a;\nimport b;\n"),
        ("b.cppm", "export module b;\nimport a;\n"),
    ];
    let project = TestProject::new(sources);
    let toolchain = MockToolchain::new();

    let err = project
        .build(
            &toolchain,
            BuildOptions::default(),
            &["main.cpp", "a.cppm", "b.cppm"],
        )
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Graph {
            source: GraphError::Cycle { .. },
            ..
        }
    ));
    assert!(toolchain.invocations().is_empty());
}

#[test]
fn implementation_of_unknown_module_is_rejected() {
    let sources: &[(&str, &str)] = &[
        ("main.cpp", "int main() {}\n"),
        ("impl.cpp", "module ghost;\n"),
    ];
    let project = TestProject::new(sources);
    let toolchain = MockToolchain::new();

    let err = project
        .build(&toolchain, BuildOptions::default(), &["main.cpp", "impl.cpp"])
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Graph {
            source: GraphError::UnknownOwner { ref name, .. },
            ..
        } if name == "ghost"
    ));
    assert!(toolchain.invocations().is_empty());
}

#[test]
fn compiler_failure_stops_the_build() {
    let project = TestProject::new(DIAMOND);
    let toolchain = MockToolchain::new().fail_on("c.cppm");

    let err = project
        .build(&toolchain, BuildOptions::default(), DIAMOND_SOURCES)
        .unwrap_err();

    assert!(matches!(err, EngineError::Execute { .. }));
    assert_eq!(compiled(&toolchain, &project), vec!["c.cppm"]);
    assert!(toolchain.invocations_of(InvocationKind::Link).is_empty());
    assert!(!project.paths.binary_path("app").exists());
}

// =============================================================================
// Parallelism and locking
// =============================================================================

#[test]
fn parallel_build_compiles_the_same_units() {
    let sequential_project = TestProject::new(DIAMOND);
    let sequential = MockToolchain::new();
    sequential_project
        .build(&sequential, BuildOptions::default(), DIAMOND_SOURCES)
        .unwrap();

    let parallel_project = TestProject::new(DIAMOND);
    let parallel = MockToolchain::new();
    parallel_project
        .build(
            &parallel,
            BuildOptions {
                jobs: 4,
                ..Default::default()
            },
            DIAMOND_SOURCES,
        )
        .unwrap();

    let mut a = compiled(&sequential, &sequential_project);
    let mut b = compiled(&parallel, &parallel_project);
    a.sort();
    b.sort();
    assert_eq!(a, b);
    assert!(parallel_project.paths.binary_path("app").exists());
}

#[test]
fn held_lock_blocks_a_second_build() {
    let project = TestProject::new(DIAMOND);
    let _held = BuildLock::acquire(&project.paths).unwrap();
    let toolchain = MockToolchain::new();

    let err = project
        .build(&toolchain, BuildOptions::default(), DIAMOND_SOURCES)
        .unwrap_err();

    assert!(matches!(err, EngineError::Lock(LockError::AlreadyLocked(_))));
    assert!(toolchain.invocations().is_empty());
    assert!(project.root().join("build").exists());
}
