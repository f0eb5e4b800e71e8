//! I/O helpers for harness commands.

pub mod build_dir;
pub mod config;
pub mod process;
pub mod report;
pub mod toolchain;
