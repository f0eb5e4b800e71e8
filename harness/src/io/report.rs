//! JSON run report written by `harness run --report <file>`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::verdict::TestTally;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    CompilationFailed,
    ExecutionFailed,
    TestsFailed,
    /// Config, layout or filesystem problem before anything ran.
    HarnessError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: Outcome,
    pub exit_code: i32,
    pub toolchain: String,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub tally: Option<TestTally>,
}

/// Serialize `report` to pretty-printed JSON with trailing newline.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create report dir {}", parent.display()))?;
    }
    let mut payload = serde_json::to_string_pretty(report).context("serialize report")?;
    payload.push('\n');
    fs::write(path, payload).with_context(|| format!("write report {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_snake_case_outcome_into_new_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("reports").join("run.json");
        let report = RunReport {
            outcome: Outcome::CompilationFailed,
            exit_code: 1,
            toolchain: "wasmtime".to_string(),
            duration_ms: 42,
            error: Some("failed to compile src/lexer.wat: no such file".to_string()),
            tally: None,
        };
        write_report(&path, &report).expect("write");

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["outcome"], "compilation_failed");
        assert_eq!(value["exit_code"], 1);
        assert!(value["tally"].is_null());
    }
}
