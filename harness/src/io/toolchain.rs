//! Toolchain abstraction for compiling and running modules.
//!
//! The [`Toolchain`] trait decouples the pipeline from the actual compiler and
//! runtime (`wasmtime` by default). Tests use a recording toolchain that never
//! spawns processes.

use std::time::Duration;

use tracing::{error, info, instrument};

use crate::core::command::{CommandLine, RunOptions, compile_command, run_command};
use crate::core::types::{BuildArtifactSet, CompilationUnit, ExecutionResult, SharedMemoryHandle};
use crate::error::HarnessError;
use crate::io::config::HarnessConfig;
use crate::io::process::run_captured;

/// Everything the single runtime invocation needs.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    pub options: RunOptions<'a>,
    pub shared_memory: &'a SharedMemoryHandle,
    pub artifacts: &'a BuildArtifactSet,
}

/// Abstraction over the external compiler/runtime.
///
/// Both calls block until the external process has exited.
pub trait Toolchain {
    /// Compile one unit. On success the artifact has been written to
    /// `unit.destination`.
    fn compile(&self, unit: &CompilationUnit) -> Result<(), HarnessError>;

    /// Instantiate the artifacts in order and capture the run's output.
    ///
    /// Returns `Err` only if the runtime could not be run at all; exit status
    /// and stderr are reported in the [`ExecutionResult`].
    fn run(&self, request: &RunRequest<'_>) -> Result<ExecutionResult, HarnessError>;
}

/// Toolchain backed by an external program such as `wasmtime`.
#[derive(Debug, Clone)]
pub struct ExternalToolchain {
    pub program: String,
    pub compile_timeout: Duration,
    pub run_timeout: Duration,
    pub output_limit_bytes: usize,
}

impl ExternalToolchain {
    pub fn from_config(cfg: &HarnessConfig) -> Self {
        Self {
            program: cfg.toolchain.clone(),
            compile_timeout: cfg.compile_timeout(),
            run_timeout: cfg.run_timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }

    pub fn compile_line(&self, unit: &CompilationUnit) -> CommandLine {
        compile_command(&self.program, unit)
    }

    pub fn run_line(&self, request: &RunRequest<'_>) -> CommandLine {
        run_command(
            &self.program,
            &request.options,
            request.shared_memory,
            request.artifacts,
        )
    }
}

impl Toolchain for ExternalToolchain {
    #[instrument(skip_all, fields(source = %unit.source.display()))]
    fn compile(&self, unit: &CompilationUnit) -> Result<(), HarnessError> {
        let line = self.compile_line(unit);
        info!(command = %line, "compiling module");

        let failure = |diagnostic: String| {
            error!(command = %line, diagnostic = %diagnostic, "compilation failed");
            HarnessError::Compilation {
                source_path: unit.source.clone(),
                destination: unit.destination.clone(),
                diagnostic,
            }
        };

        let output = run_captured(line.to_command(), self.compile_timeout, self.output_limit_bytes)
            .map_err(|err| failure(format!("{err:#}")))?;
        if !output.succeeded() {
            return Err(failure(output.diagnostic()));
        }
        Ok(())
    }

    #[instrument(skip_all)]
    fn run(&self, request: &RunRequest<'_>) -> Result<ExecutionResult, HarnessError> {
        let line = self.run_line(request);
        info!(command = %line, "running modules");

        let output = run_captured(line.to_command(), self.run_timeout, self.output_limit_bytes)
            .map_err(|err| {
                let reason = format!("{err:#}");
                error!(command = %line, err = %reason, "runtime failed to start");
                HarnessError::Execution { reason }
            })?;

        Ok(ExecutionResult {
            stdout: output.stdout_text(),
            stderr: output.stderr_text(),
            exit_code: output.status.code(),
            timed_out: output.timed_out,
            stdout_truncated: output.stdout_truncated,
            stderr_truncated: output.stderr_truncated,
        })
    }
}
