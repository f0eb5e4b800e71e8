//! Stable exit codes for harness CLI commands.

/// Every module compiled and the test run passed (or `plan` succeeded).
pub const OK: i32 = 0;
/// Compilation, execution or test failure, or an invalid config/layout.
pub const FAILED: i32 = 1;
