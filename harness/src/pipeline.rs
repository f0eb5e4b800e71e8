//! Build-and-run orchestration for `harness run`.
//!
//! A run is a strict sequence: build directory, the four modules in
//! [`ModuleKind::PIPELINE_ORDER`], the shared memory, one runtime invocation,
//! then the verdict. The first failure ends the run; nothing is checkpointed,
//! so the next run starts again from the memory module.

use std::fs;
use std::io::ErrorKind;

use tracing::{debug, error, info, instrument};

use crate::core::command::RunOptions;
use crate::core::layout::HarnessLayout;
use crate::core::types::{
    BuildArtifactSet, CompilationUnit, ExecutionResult, ModuleKind, SharedMemoryHandle,
};
use crate::core::verdict::{TestTally, Verdict, evaluate};
use crate::error::HarnessError;
use crate::io::build_dir::ensure_build_dir;
use crate::io::config::RunConfig;
use crate::io::toolchain::{RunRequest, Toolchain};

/// What a passing run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub artifacts: BuildArtifactSet,
    pub shared_memory: SharedMemoryHandle,
    pub execution: ExecutionResult,
    pub tally: Option<TestTally>,
}

/// Run the whole pipeline against `layout`.
#[instrument(skip_all, fields(root = %layout.root.display()))]
pub fn run_harness<T: Toolchain>(
    toolchain: &T,
    layout: &HarnessLayout,
    run: &RunConfig,
) -> Result<RunSummary, HarnessError> {
    ensure_build_dir(&layout.build_dir)?;
    let artifacts = compile_modules(toolchain, layout)?;
    let shared_memory = provision_shared_memory(toolchain, layout)?;
    let execution = execute(toolchain, layout, run, &shared_memory, &artifacts)?;
    let tally = judge(&execution)?;
    info!("run passed");
    Ok(RunSummary {
        artifacts,
        shared_memory,
        execution,
        tally,
    })
}

/// Compile memory, keywords, lexer and test, in that order, stopping at the
/// first failure.
pub fn compile_modules<T: Toolchain>(
    toolchain: &T,
    layout: &HarnessLayout,
) -> Result<BuildArtifactSet, HarnessError> {
    let [memory, keywords, lexer, test] = ModuleKind::PIPELINE_ORDER.map(|kind| layout.unit(kind));
    for (kind, unit) in ModuleKind::PIPELINE_ORDER
        .iter()
        .zip([&memory, &keywords, &lexer, &test])
    {
        debug!(module = %kind, "compiling");
        compile_unit(toolchain, unit)?;
    }
    Ok(BuildArtifactSet::new(
        memory.destination,
        keywords.destination,
        lexer.destination,
        test.destination,
    ))
}

/// Build the memory module again into the artifact the runtime uses as the
/// shared backing store. Always rebuilt, never reused from an earlier run.
pub fn provision_shared_memory<T: Toolchain>(
    toolchain: &T,
    layout: &HarnessLayout,
) -> Result<SharedMemoryHandle, HarnessError> {
    let unit = layout.shared_memory_unit();
    compile_unit(toolchain, &unit)?;
    Ok(SharedMemoryHandle::new(unit.destination))
}

/// Compile one unit and confirm the artifact landed on disk.
pub fn compile_unit<T: Toolchain>(
    toolchain: &T,
    unit: &CompilationUnit,
) -> Result<(), HarnessError> {
    remove_stale_artifact(unit)?;
    toolchain.compile(unit)?;
    if !unit.destination.is_file() {
        error!(
            source = %unit.source.display(),
            destination = %unit.destination.display(),
            "toolchain reported success but wrote no artifact"
        );
        return Err(HarnessError::Compilation {
            source_path: unit.source.clone(),
            destination: unit.destination.clone(),
            diagnostic: "toolchain reported success but wrote no artifact".to_string(),
        });
    }
    println!(
        "Successfully compiled {} to {}",
        unit.source.display(),
        unit.destination.display()
    );
    Ok(())
}

fn remove_stale_artifact(unit: &CompilationUnit) -> Result<(), HarnessError> {
    match fs::remove_file(&unit.destination) {
        Ok(()) => {
            debug!(destination = %unit.destination.display(), "removed stale artifact");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => {
            error!(
                destination = %unit.destination.display(),
                err = %err,
                "failed to remove stale artifact"
            );
            Err(HarnessError::Compilation {
                source_path: unit.source.clone(),
                destination: unit.destination.clone(),
                diagnostic: format!("cannot replace stale artifact: {err}"),
            })
        }
    }
}

/// Invoke the runtime once with every artifact and echo what it printed.
pub fn execute<T: Toolchain>(
    toolchain: &T,
    layout: &HarnessLayout,
    run: &RunConfig,
    shared_memory: &SharedMemoryHandle,
    artifacts: &BuildArtifactSet,
) -> Result<ExecutionResult, HarnessError> {
    println!("Running lexer tests...");
    let request = RunRequest {
        options: RunOptions {
            root: &layout.root,
            mount_point: &run.mount_point,
            features: &run.features,
        },
        shared_memory,
        artifacts,
    };
    let result = toolchain.run(&request)?;

    if !result.stdout.is_empty() {
        println!("Test output: {}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprintln!("Test errors: {}", result.stderr);
    }
    Ok(result)
}

/// Turn the captured output into a pass, or the matching error.
pub fn judge(result: &ExecutionResult) -> Result<Option<TestTally>, HarnessError> {
    match evaluate(result) {
        Verdict::Pass { tally } => Ok(tally),
        Verdict::ExecutionFailure { reason } => {
            error!(reason = %reason, exit_code = ?result.exit_code, "execution failed");
            Err(HarnessError::Execution { reason })
        }
        Verdict::TestFailure { reason, tally } => {
            error!(reason = %reason, tally = ?tally, "tests failed");
            Err(HarnessError::AssertedTestFailure { reason })
        }
    }
}
