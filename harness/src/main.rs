//! Build-and-test harness for the shared-memory WebAssembly lexer.
//!
//! `harness run` compiles the memory, keywords, lexer and test modules with an
//! external toolchain, then runs them together against one shared memory and
//! exits 0 only if the test output is clean.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use harness::core::command::RunOptions;
use harness::core::layout::HarnessLayout;
use harness::core::types::{BuildArtifactSet, ModuleKind, SharedMemoryHandle};
use harness::exit_codes;
use harness::io::config::{CONFIG_FILE_NAME, HarnessConfig, load_config};
use harness::io::report::{Outcome, RunReport, write_report};
use harness::io::toolchain::{ExternalToolchain, RunRequest};
use harness::logging;
use harness::pipeline::run_harness;

#[derive(Parser)]
#[command(
    name = "harness",
    version,
    about = "Build and test the shared-memory WebAssembly lexer modules"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile every module, run the tests and exit non-zero on failure.
    Run {
        #[command(flatten)]
        project: ProjectArgs,
        /// Write a JSON report of the run to this file.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print the toolchain commands `run` would execute, without running them.
    Plan {
        #[command(flatten)]
        project: ProjectArgs,
    },
}

#[derive(Args)]
struct ProjectArgs {
    /// Project root (defaults to the current directory).
    #[arg(long)]
    root: Option<PathBuf>,
    /// Config file (defaults to `<root>/harness.toml`).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Toolchain program, overriding the config.
    #[arg(long)]
    toolchain: Option<String>,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            std::process::exit(exit_codes::FAILED);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run { project, report } => cmd_run(&project, report.as_deref()),
        Command::Plan { project } => cmd_plan(&project),
    }
}

fn cmd_run(project: &ProjectArgs, report_path: Option<&Path>) -> Result<i32> {
    let started = Instant::now();
    let (cfg, layout) = load_project(project)?;
    let toolchain = ExternalToolchain::from_config(&cfg);

    let result = run_harness(&toolchain, &layout, &cfg.run);
    let (outcome, error, tally) = match result {
        Ok(summary) => {
            println!("All tests passed successfully!");
            (Outcome::Passed, None, summary.tally)
        }
        Err(err) => {
            let outcome = err.outcome();
            let reason = err.to_string();
            let message = format!("{:#}", anyhow::Error::new(err));
            eprintln!("error: {message}");
            eprintln!("Tests failed: {reason}");
            (outcome, Some(message), None)
        }
    };
    let exit_code = if outcome == Outcome::Passed {
        exit_codes::OK
    } else {
        exit_codes::FAILED
    };

    if let Some(path) = report_path {
        let report = RunReport {
            outcome,
            exit_code,
            toolchain: cfg.toolchain.clone(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            error,
            tally,
        };
        write_report(path, &report)?;
    }
    Ok(exit_code)
}

fn cmd_plan(project: &ProjectArgs) -> Result<i32> {
    let (cfg, layout) = load_project(project)?;
    let toolchain = ExternalToolchain::from_config(&cfg);

    for kind in ModuleKind::PIPELINE_ORDER {
        println!("{}", toolchain.compile_line(&layout.unit(kind)));
    }
    let shared_unit = layout.shared_memory_unit();
    println!("{}", toolchain.compile_line(&shared_unit));

    let [memory, keywords, lexer, test] = ModuleKind::PIPELINE_ORDER.map(|kind| layout.artifact(kind));
    let artifacts = BuildArtifactSet::new(memory, keywords, lexer, test);
    let shared_memory = SharedMemoryHandle::new(shared_unit.destination);
    let request = RunRequest {
        options: RunOptions {
            root: &layout.root,
            mount_point: &cfg.run.mount_point,
            features: &cfg.run.features,
        },
        shared_memory: &shared_memory,
        artifacts: &artifacts,
    };
    println!("{}", toolchain.run_line(&request));
    Ok(exit_codes::OK)
}

/// Resolve root, load config, apply CLI overrides and build the layout.
fn load_project(project: &ProjectArgs) -> Result<(HarnessConfig, HarnessLayout)> {
    let root = match &project.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("read current directory")?,
    };
    let root = std::path::absolute(&root)
        .with_context(|| format!("resolve project root {}", root.display()))?;

    // Only the implicit `<root>/harness.toml` may be absent.
    let config_path = match &project.config {
        Some(path) => {
            if !path.is_file() {
                bail!("config file {} not found", path.display());
            }
            path.clone()
        }
        None => root.join(CONFIG_FILE_NAME),
    };
    let mut cfg = load_config(&config_path).context("load config")?;
    if let Some(toolchain) = &project.toolchain {
        cfg.toolchain = toolchain.clone();
        cfg.validate()?;
    }

    let layout = HarnessLayout::new(&root, &cfg.layout).context("resolve layout")?;
    Ok((cfg, layout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_defaults() {
        let cli = Cli::parse_from(["harness", "run"]);
        match cli.command {
            Command::Run { project, report } => {
                assert!(project.root.is_none());
                assert!(project.toolchain.is_none());
                assert!(report.is_none());
            }
            Command::Plan { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn parse_run_with_overrides() {
        let cli = Cli::parse_from([
            "harness",
            "run",
            "--root",
            "/work/lexer",
            "--toolchain",
            "/opt/wasmtime",
            "--report",
            "out/run.json",
        ]);
        match cli.command {
            Command::Run { project, report } => {
                assert_eq!(project.root, Some(PathBuf::from("/work/lexer")));
                assert_eq!(project.toolchain.as_deref(), Some("/opt/wasmtime"));
                assert_eq!(report, Some(PathBuf::from("out/run.json")));
            }
            Command::Plan { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn parse_plan() {
        let cli = Cli::parse_from(["harness", "plan", "--config", "ci/harness.toml"]);
        assert!(matches!(cli.command, Command::Plan { .. }));
    }

    #[test]
    fn load_project_rejects_blank_toolchain_override() {
        let temp = tempfile::tempdir().expect("tempdir");
        let project = ProjectArgs {
            root: Some(temp.path().to_path_buf()),
            config: None,
            toolchain: Some("  ".to_string()),
        };
        assert!(load_project(&project).is_err());
    }

    #[test]
    fn load_project_rejects_missing_explicit_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        let project = ProjectArgs {
            root: Some(temp.path().to_path_buf()),
            config: Some(temp.path().join("ci").join("harnes.toml")),
            toolchain: None,
        };
        let err = load_project(&project).expect_err("missing config");
        assert!(err.to_string().contains("harnes.toml"));
    }

    #[test]
    fn load_project_defaults_without_implicit_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        let project = ProjectArgs {
            root: Some(temp.path().to_path_buf()),
            config: None,
            toolchain: None,
        };
        let (cfg, _layout) = load_project(&project).expect("defaults");
        assert_eq!(cfg, HarnessConfig::default());
    }
}
