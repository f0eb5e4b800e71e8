//! Deterministic, pure logic shared by the harness.
//!
//! Core modules must be free of I/O side effects. They operate on paths and
//! captured output and return deterministic values suitable for tests.

pub mod command;
pub mod layout;
pub mod types;
pub mod verdict;
