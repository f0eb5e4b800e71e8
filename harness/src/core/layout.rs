//! Fixed directory layout of a lexer project and the paths derived from it.
//!
//! All paths are computed once from the project root and passed explicitly
//! into every stage, so tests can point the pipeline at a scratch directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::core::types::{CompilationUnit, ModuleKind};

/// Extension the toolchain expects for compiled artifacts.
pub const ARTIFACT_EXTENSION: &str = "wasm";

/// `[layout]` section of `harness.toml`. All entries are relative to the root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    pub src_dir: PathBuf,
    pub test_dir: PathBuf,
    pub build_dir: PathBuf,
    /// Module source file names; memory, keywords and lexer live in `src_dir`.
    pub memory: String,
    pub keywords: String,
    pub lexer: String,
    /// Test module source file name, in `test_dir`.
    pub test: String,
    /// Artifact name for the shared-memory build, in `build_dir`.
    pub shared_memory: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("src"),
            test_dir: PathBuf::from("tests").join("unit"),
            build_dir: PathBuf::from("build"),
            memory: "memory.wat".to_string(),
            keywords: "keywords.wat".to_string(),
            lexer: "lexer.wat".to_string(),
            test: "lexer_test.wat".to_string(),
            shared_memory: "shared_memory.wasm".to_string(),
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        for kind in ModuleKind::PIPELINE_ORDER {
            if self.source_name(kind).trim().is_empty() {
                return Err(anyhow!("layout.{kind} must be a non-empty file name"));
            }
        }
        if self.shared_memory.trim().is_empty() {
            return Err(anyhow!("layout.shared_memory must be a non-empty file name"));
        }
        Ok(())
    }

    fn source_name(&self, kind: ModuleKind) -> &str {
        match kind {
            ModuleKind::Memory => &self.memory,
            ModuleKind::Keywords => &self.keywords,
            ModuleKind::Lexer => &self.lexer,
            ModuleKind::Test => &self.test,
        }
    }
}

/// Absolute paths for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessLayout {
    pub root: PathBuf,
    pub src_dir: PathBuf,
    pub test_dir: PathBuf,
    pub build_dir: PathBuf,
    config: LayoutConfig,
}

impl HarnessLayout {
    /// Resolve `config` against `root`.
    ///
    /// Fails if two of the five build outputs would land on the same path,
    /// since every compile writes a distinct destination.
    pub fn new(root: &Path, config: &LayoutConfig) -> Result<Self> {
        config.validate()?;
        let layout = Self {
            root: root.to_path_buf(),
            src_dir: root.join(&config.src_dir),
            test_dir: root.join(&config.test_dir),
            build_dir: root.join(&config.build_dir),
            config: config.clone(),
        };

        let mut seen = BTreeSet::new();
        let destinations = ModuleKind::PIPELINE_ORDER
            .iter()
            .map(|kind| layout.unit(*kind).destination)
            .chain(std::iter::once(layout.shared_memory_unit().destination));
        for destination in destinations {
            if !seen.insert(destination.clone()) {
                bail!(
                    "layout maps two build outputs to {}",
                    destination.display()
                );
            }
        }
        Ok(layout)
    }

    pub fn source(&self, kind: ModuleKind) -> PathBuf {
        let dir = match kind {
            ModuleKind::Test => &self.test_dir,
            _ => &self.src_dir,
        };
        dir.join(self.config.source_name(kind))
    }

    pub fn artifact(&self, kind: ModuleKind) -> PathBuf {
        let name = Path::new(self.config.source_name(kind)).with_extension(ARTIFACT_EXTENSION);
        self.build_dir.join(name)
    }

    pub fn unit(&self, kind: ModuleKind) -> CompilationUnit {
        CompilationUnit::new(self.source(kind), self.artifact(kind))
    }

    /// The memory source compiled a second time into the shared-memory artifact.
    pub fn shared_memory_unit(&self) -> CompilationUnit {
        CompilationUnit::new(
            self.source(ModuleKind::Memory),
            self.build_dir.join(&self.config.shared_memory),
        )
    }
}
