//! Failure taxonomy for a harness run.
//!
//! Every variant is fatal to the run: stages log and propagate, nothing is
//! retried and nothing is resumed.

use std::path::PathBuf;

use thiserror::Error;

use crate::io::report::Outcome;

#[derive(Error, Debug)]
pub enum HarnessError {
    /// The toolchain could not turn a module source into an artifact.
    #[error("failed to compile {}: {diagnostic}", source_path.display())]
    Compilation {
        source_path: PathBuf,
        destination: PathBuf,
        diagnostic: String,
    },

    /// The runtime invocation failed at the process level.
    #[error("test execution failed: {reason}")]
    Execution { reason: String },

    /// The runtime exited cleanly but its output reports failing tests.
    #[error("tests failed: {reason}")]
    AssertedTestFailure { reason: String },

    #[error("failed to prepare build directory {}", path.display())]
    BuildDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HarnessError {
    pub fn outcome(&self) -> Outcome {
        match self {
            HarnessError::Compilation { .. } => Outcome::CompilationFailed,
            HarnessError::Execution { .. } => Outcome::ExecutionFailed,
            HarnessError::AssertedTestFailure { .. } => Outcome::TestsFailed,
            HarnessError::BuildDirectory { .. } => Outcome::HarnessError,
        }
    }
}
