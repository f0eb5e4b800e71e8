//! Harness configuration stored in `harness.toml` at the project root.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::layout::LayoutConfig;

pub const CONFIG_FILE_NAME: &str = "harness.toml";

/// Harness configuration (TOML).
///
/// Every field is optional in the file; missing fields take the values that
/// match the stock project layout and a `wasmtime` toolchain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Program used for both `compile` and `run` (e.g. `wasmtime`).
    pub toolchain: String,

    /// Wall-clock budget for a single module compilation, in seconds.
    pub compile_timeout_secs: u64,

    /// Wall-clock budget for the test run, in seconds.
    pub run_timeout_secs: u64,

    /// Keep at most this many bytes of each captured output stream.
    pub output_limit_bytes: usize,

    pub layout: LayoutConfig,

    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    /// Guest path the project root is mapped to.
    pub mount_point: String,

    /// Wasm proposals the modules need (`--wasm-features`).
    pub features: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mount_point: "/".to_string(),
            features: vec!["multi-memory".to_string(), "multi-value".to_string()],
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            toolchain: "wasmtime".to_string(),
            compile_timeout_secs: 5 * 60,
            run_timeout_secs: 10 * 60,
            output_limit_bytes: 1_000_000,
            layout: LayoutConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.toolchain.trim().is_empty() {
            return Err(anyhow!("toolchain must be a non-empty program name"));
        }
        if self.compile_timeout_secs == 0 {
            return Err(anyhow!("compile_timeout_secs must be > 0"));
        }
        if self.run_timeout_secs == 0 {
            return Err(anyhow!("run_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.run.mount_point.trim().is_empty() {
            return Err(anyhow!("run.mount_point must be non-empty"));
        }
        if self.run.features.iter().any(|f| f.trim().is_empty()) {
            return Err(anyhow!("run.features must not contain empty entries"));
        }
        self.layout.validate()
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `HarnessConfig::default()`.
pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    if !path.exists() {
        let cfg = HarnessConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: HarnessConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
