//! Pipeline-level tests for full harness runs.
//!
//! These tests drive `run_harness` against scratch projects with a recording
//! toolchain, verifying compile order, fail-fast behavior, the runtime
//! invocation and the pass/fail decision.

use harness::core::types::{ExecutionResult, ModuleKind};
use harness::error::HarnessError;
use harness::io::config::RunConfig;
use harness::pipeline::run_harness;
use harness::test_support::{RecordingToolchain, TestProject, ToolchainCall};

fn sources_in_pipeline_order(project: &TestProject) -> Vec<std::path::PathBuf> {
    let layout = project.layout();
    ModuleKind::PIPELINE_ORDER
        .iter()
        .map(|kind| layout.source(*kind))
        .collect()
}

/// Scenario A: every module compiles and the test output is clean.
#[test]
fn clean_run_compiles_in_order_and_passes() {
    let project = TestProject::new().expect("project");
    let layout = project.layout();
    let toolchain = RecordingToolchain::passing();

    let summary = run_harness(&toolchain, &layout, &RunConfig::default()).expect("run passes");
    assert_eq!(summary.execution.stdout, "Running lexer tests... OK");

    // memory, keywords, lexer, test, then memory again for the shared store
    let mut expected_sources = sources_in_pipeline_order(&project);
    expected_sources.push(layout.source(ModuleKind::Memory));
    assert_eq!(toolchain.compiled_sources(), expected_sources);

    let calls = toolchain.calls();
    assert_eq!(calls.len(), 6);
    let ToolchainCall::Run {
        artifacts,
        shared_memory,
        mount_point,
        features,
    } = &calls[5]
    else {
        panic!("last call should be the run, got {:?}", calls[5]);
    };
    assert_eq!(
        artifacts,
        &vec![
            layout.artifact(ModuleKind::Memory),
            layout.artifact(ModuleKind::Keywords),
            layout.artifact(ModuleKind::Lexer),
            layout.artifact(ModuleKind::Test),
        ]
    );
    assert_eq!(shared_memory, &layout.shared_memory_unit().destination);
    assert_eq!(mount_point, "/");
    assert_eq!(features, &vec!["multi-memory", "multi-value"]);

    for kind in ModuleKind::PIPELINE_ORDER {
        assert!(layout.artifact(kind).is_file(), "{kind} artifact missing");
    }
    assert!(layout.shared_memory_unit().destination.is_file());
}

#[test]
fn build_dir_exists_before_first_compile() {
    let project = TestProject::new().expect("project");
    let layout = project.layout();
    assert!(!layout.build_dir.exists());
    let toolchain = RecordingToolchain::passing();

    run_harness(&toolchain, &layout, &RunConfig::default()).expect("run passes");

    let calls = toolchain.calls();
    match calls.first() {
        Some(ToolchainCall::Compile {
            build_dir_existed, ..
        }) => assert!(*build_dir_existed),
        other => panic!("expected a compile first, got {other:?}"),
    }
}

/// Scenario B: the lexer source is missing.
#[test]
fn missing_lexer_stops_before_test_module_and_run() {
    let project = TestProject::new().expect("project");
    project.remove_source(ModuleKind::Lexer).expect("remove lexer");
    let layout = project.layout();
    let toolchain = RecordingToolchain::passing();

    let err = run_harness(&toolchain, &layout, &RunConfig::default()).expect_err("lexer fails");
    match &err {
        HarnessError::Compilation {
            source_path,
            diagnostic,
            ..
        } => {
            assert_eq!(source_path, &layout.source(ModuleKind::Lexer));
            assert!(diagnostic.contains("failed to read input file"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(
        toolchain.compiled_sources(),
        vec![
            layout.source(ModuleKind::Memory),
            layout.source(ModuleKind::Keywords),
            layout.source(ModuleKind::Lexer),
        ]
    );
    assert_eq!(toolchain.run_count(), 0);
    assert!(!layout.artifact(ModuleKind::Test).exists());
}

#[test]
fn rerun_after_fix_starts_from_memory() {
    let project = TestProject::new().expect("project");
    project.remove_source(ModuleKind::Keywords).expect("remove keywords");
    let layout = project.layout();

    let first = RecordingToolchain::passing();
    run_harness(&first, &layout, &RunConfig::default()).expect_err("keywords fails");
    assert_eq!(first.compiled_sources().len(), 2);

    project
        .write_source(ModuleKind::Keywords, "(module)\n")
        .expect("restore keywords");
    let second = RecordingToolchain::passing();
    run_harness(&second, &layout, &RunConfig::default()).expect("rerun passes");

    let mut expected_sources = sources_in_pipeline_order(&project);
    expected_sources.push(layout.source(ModuleKind::Memory));
    assert_eq!(second.compiled_sources(), expected_sources);
    assert_eq!(second.run_count(), 1);
}

/// Scenario C: clean stderr, but stdout reports an error.
#[test]
fn error_marker_in_stdout_fails_run() {
    let project = TestProject::new().expect("project");
    let toolchain =
        RecordingToolchain::new(ExecutionResult::exited("3 tests run, 1 Error encountered", ""));

    let err = run_harness(&toolchain, &project.layout(), &RunConfig::default())
        .expect_err("marker fails");
    assert!(matches!(err, HarnessError::AssertedTestFailure { .. }));
    assert_eq!(toolchain.run_count(), 1);
}

#[test]
fn stderr_output_fails_run_without_markers() {
    let project = TestProject::new().expect("project");
    let toolchain = RecordingToolchain::new(ExecutionResult::exited(
        "Running lexer tests... OK",
        "wasm trap: out of bounds memory access\n",
    ));

    let err = run_harness(&toolchain, &project.layout(), &RunConfig::default())
        .expect_err("stderr fails");
    assert!(matches!(err, HarnessError::Execution { .. }));
}

#[test]
fn custom_run_config_reaches_runtime() {
    let project = TestProject::new().expect("project");
    let toolchain = RecordingToolchain::passing();
    let run = RunConfig {
        mount_point: "/project".to_string(),
        features: vec!["multi-memory".to_string()],
    };

    run_harness(&toolchain, &project.layout(), &run).expect("run passes");

    let calls = toolchain.calls();
    let Some(ToolchainCall::Run {
        mount_point,
        features,
        ..
    }) = calls.last()
    else {
        panic!("expected a run call");
    };
    assert_eq!(mount_point, "/project");
    assert_eq!(features, &vec!["multi-memory"]);
}
