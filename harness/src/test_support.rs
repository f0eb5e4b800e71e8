//! Test-only helpers: a recording toolchain and scratch lexer projects.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::layout::{HarnessLayout, LayoutConfig};
use crate::core::types::{CompilationUnit, ExecutionResult, ModuleKind};
use crate::error::HarnessError;
use crate::io::toolchain::{RunRequest, Toolchain};

/// One call made against a [`RecordingToolchain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainCall {
    Compile {
        unit: CompilationUnit,
        /// Whether the destination directory existed when the call was made.
        build_dir_existed: bool,
    },
    Run {
        artifacts: Vec<PathBuf>,
        shared_memory: PathBuf,
        mount_point: String,
        features: Vec<String>,
    },
}

/// Toolchain fake that records every call instead of spawning processes.
///
/// `compile` fails like a real compiler when the source file is missing and
/// otherwise writes a placeholder artifact. `run` returns a scripted result.
pub struct RecordingToolchain {
    calls: RefCell<Vec<ToolchainCall>>,
    result: ExecutionResult,
    write_artifacts: bool,
}

impl RecordingToolchain {
    pub fn new(result: ExecutionResult) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            result,
            write_artifacts: true,
        }
    }

    /// Runtime prints `Running lexer tests... OK` and nothing on stderr.
    pub fn passing() -> Self {
        Self::new(ExecutionResult::exited("Running lexer tests... OK", ""))
    }

    /// Report compile success without writing anything to disk.
    pub fn without_artifacts(mut self) -> Self {
        self.write_artifacts = false;
        self
    }

    pub fn calls(&self) -> Vec<ToolchainCall> {
        self.calls.borrow().clone()
    }

    pub fn compiled_sources(&self) -> Vec<PathBuf> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                ToolchainCall::Compile { unit, .. } => Some(unit.source.clone()),
                ToolchainCall::Run { .. } => None,
            })
            .collect()
    }

    pub fn run_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, ToolchainCall::Run { .. }))
            .count()
    }
}

impl Toolchain for RecordingToolchain {
    fn compile(&self, unit: &CompilationUnit) -> Result<(), HarnessError> {
        let build_dir_existed = unit.destination.parent().is_some_and(Path::is_dir);
        self.calls.borrow_mut().push(ToolchainCall::Compile {
            unit: unit.clone(),
            build_dir_existed,
        });

        let failure = |diagnostic: String| HarnessError::Compilation {
            source_path: unit.source.clone(),
            destination: unit.destination.clone(),
            diagnostic,
        };
        let source = fs::read(&unit.source).map_err(|err| {
            failure(format!(
                "failed to read input file {}: {err}",
                unit.source.display()
            ))
        })?;
        if self.write_artifacts {
            let mut artifact = b"\0asm".to_vec();
            artifact.extend_from_slice(&source);
            fs::write(&unit.destination, artifact)
                .map_err(|err| failure(format!("failed to write output: {err}")))?;
        }
        Ok(())
    }

    fn run(&self, request: &RunRequest<'_>) -> Result<ExecutionResult, HarnessError> {
        self.calls.borrow_mut().push(ToolchainCall::Run {
            artifacts: request
                .artifacts
                .in_instantiation_order()
                .iter()
                .map(|path| path.to_path_buf())
                .collect(),
            shared_memory: request.shared_memory.path().to_path_buf(),
            mount_point: request.options.mount_point.to_string(),
            features: request.options.features.to_vec(),
        });
        Ok(self.result.clone())
    }
}

/// Scratch project with the stock layout and all four module sources.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp project")?;
        let project = Self { dir };
        for kind in ModuleKind::PIPELINE_ORDER {
            project.write_source(kind, &format!("(module ;; {kind}\n)\n"))?;
        }
        Ok(project)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> HarnessLayout {
        HarnessLayout::new(self.path(), &LayoutConfig::default())
            .expect("default layout is valid")
    }

    pub fn write_source(&self, kind: ModuleKind, contents: &str) -> Result<()> {
        let path = self.layout().source(kind);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn remove_source(&self, kind: ModuleKind) -> Result<()> {
        let path = self.layout().source(kind);
        fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))
    }
}
