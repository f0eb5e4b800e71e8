//! Build-and-test harness for the shared-memory WebAssembly lexer modules.
//!
//! The memory, keywords, lexer and lexer test modules are compiled one at a
//! time by an external toolchain and then instantiated together by a single
//! runtime invocation that backs all of them with one shared linear memory.
//!
//! - **[`core`]**: Pure, deterministic logic (layout, command lines, verdicts).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config files, build directory,
//!   process execution, reports). Isolated behind traits for tests.
//!
//! [`pipeline`] coordinates the two to implement `harness run`.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
