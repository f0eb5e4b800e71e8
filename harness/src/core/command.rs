//! Command lines for the external toolchain.
//!
//! Building the argument vectors is kept separate from spawning them so that
//! `harness plan` and the tests can inspect exactly what would run.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;
use std::process::Command;

use crate::core::types::{BuildArtifactSet, CompilationUnit, SharedMemoryHandle};

/// A program plus its arguments, not yet spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandLine {
    fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    fn flag(self, name: &str, value: impl AsRef<OsStr>) -> Self {
        let mut joined = OsString::from(name);
        joined.push("=");
        joined.push(value);
        self.arg(joined)
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// `<toolchain> compile <source> -o <destination>`
pub fn compile_command(toolchain: &str, unit: &CompilationUnit) -> CommandLine {
    CommandLine::new(toolchain)
        .arg("compile")
        .arg(&unit.source)
        .arg("-o")
        .arg(&unit.destination)
}

/// Runtime options that do not depend on the build outputs.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions<'a> {
    /// Directory mapped into the runtime's filesystem view.
    pub root: &'a Path,
    /// Guest path the root is mounted at.
    pub mount_point: &'a str,
    pub features: &'a [String],
}

/// `<toolchain> run --mapdir=.. --memory-file=.. --wasm-features=.. <artifacts>`
///
/// Artifacts are passed in instantiation order: memory, keywords, lexer, test.
pub fn run_command(
    toolchain: &str,
    options: &RunOptions<'_>,
    shared_memory: &SharedMemoryHandle,
    artifacts: &BuildArtifactSet,
) -> CommandLine {
    let mut mapdir = OsString::from(options.mount_point);
    mapdir.push("::");
    mapdir.push(options.root);

    let mut line = CommandLine::new(toolchain)
        .arg("run")
        .flag("--mapdir", mapdir)
        .flag("--memory-file", shared_memory.path())
        .flag("--wasm-features", options.features.join(","));
    for artifact in artifacts.in_instantiation_order() {
        line = line.arg(artifact);
    }
    line
}
