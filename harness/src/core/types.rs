//! Values passed between pipeline stages.

use std::fmt;
use std::path::{Path, PathBuf};

/// One independently compiled module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Memory,
    Keywords,
    Lexer,
    Test,
}

impl ModuleKind {
    /// Compilation and instantiation order. Later modules rely on the memory
    /// layout established by earlier ones, so this never changes.
    pub const PIPELINE_ORDER: [ModuleKind; 4] = [
        ModuleKind::Memory,
        ModuleKind::Keywords,
        ModuleKind::Lexer,
        ModuleKind::Test,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleKind::Memory => "memory",
            ModuleKind::Keywords => "keywords",
            ModuleKind::Lexer => "lexer",
            ModuleKind::Test => "test",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source file and where its compiled artifact goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl CompilationUnit {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// The four compiled artifacts of a run.
///
/// Only built once every module has compiled, so a partial set never reaches
/// the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifactSet {
    memory: PathBuf,
    keywords: PathBuf,
    lexer: PathBuf,
    test: PathBuf,
}

impl BuildArtifactSet {
    pub fn new(memory: PathBuf, keywords: PathBuf, lexer: PathBuf, test: PathBuf) -> Self {
        Self {
            memory,
            keywords,
            lexer,
            test,
        }
    }

    pub fn get(&self, kind: ModuleKind) -> &Path {
        match kind {
            ModuleKind::Memory => &self.memory,
            ModuleKind::Keywords => &self.keywords,
            ModuleKind::Lexer => &self.lexer,
            ModuleKind::Test => &self.test,
        }
    }

    /// Artifacts in the order the runtime must instantiate them.
    pub fn in_instantiation_order(&self) -> [&Path; 4] {
        ModuleKind::PIPELINE_ORDER.map(|kind| self.get(kind))
    }
}

/// The compiled memory artifact every module attaches to at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedMemoryHandle {
    path: PathBuf,
}

impl SharedMemoryHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Captured result of the single runtime invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    /// Bytes dropped past the capture limit.
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
}

impl ExecutionResult {
    /// A clean exit with the given output streams.
    pub fn exited(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: Some(0),
            timed_out: false,
            stdout_truncated: 0,
            stderr_truncated: 0,
        }
    }
}
