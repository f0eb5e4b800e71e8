//! Pass/fail decision from captured runtime output.
//!
//! The test module prints free-form text, so the primary rule is a substring
//! heuristic: any `error` marker in stdout fails the run. A tally line such as
//! `12 passed, 1 failed` is also recognized when the test module prints one.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::types::ExecutionResult;

const ERROR_MARKER: &str = "error";

static TALLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)\s+passed\s*,\s*(\d+)\s+failed\b").expect("tally regex is valid")
});

/// Assertion counts reported by the test module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestTally {
    pub passed: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass { tally: Option<TestTally> },
    /// The runtime itself failed: bad exit, timeout or anything on stderr.
    ExecutionFailure { reason: String },
    /// The runtime succeeded but the tests report failures.
    TestFailure {
        reason: String,
        tally: Option<TestTally>,
    },
}

/// Decide the outcome of a run.
///
/// Rules, first match wins:
/// 1. timeout or non-zero exit -> execution failure
/// 2. non-empty stderr -> execution failure, whatever stdout says
/// 3. stdout contains `error` in any case -> test failure
/// 4. stdout cut at the capture limit -> execution failure, since a marker
///    may sit in the dropped bytes
/// 5. a tally with failures -> test failure
/// 6. pass
pub fn evaluate(result: &ExecutionResult) -> Verdict {
    if result.timed_out {
        return Verdict::ExecutionFailure {
            reason: "runtime timed out".to_string(),
        };
    }
    match result.exit_code {
        Some(0) => {}
        Some(code) => {
            return Verdict::ExecutionFailure {
                reason: format!("runtime exited with status {code}"),
            };
        }
        None => {
            return Verdict::ExecutionFailure {
                reason: "runtime terminated by signal".to_string(),
            };
        }
    }
    if !result.stderr.is_empty() {
        return Verdict::ExecutionFailure {
            reason: format!("runtime wrote to stderr: {}", result.stderr.trim_end()),
        };
    }

    let tally = parse_tally(&result.stdout);
    if contains_error_marker(&result.stdout) {
        return Verdict::TestFailure {
            reason: "error marker found in test output".to_string(),
            tally,
        };
    }
    if result.stdout_truncated > 0 {
        return Verdict::ExecutionFailure {
            reason: format!(
                "test output exceeded the capture limit, {} bytes unchecked",
                result.stdout_truncated
            ),
        };
    }
    if let Some(counts) = tally
        && counts.failed > 0
    {
        return Verdict::TestFailure {
            reason: format!(
                "{} of {} tests failed",
                counts.failed,
                counts.passed.saturating_add(counts.failed)
            ),
            tally,
        };
    }
    Verdict::Pass { tally }
}

fn contains_error_marker(output: &str) -> bool {
    output.to_ascii_lowercase().contains(ERROR_MARKER)
}

/// Sum every `N passed, M failed` line in the output.
pub fn parse_tally(output: &str) -> Option<TestTally> {
    let mut tally: Option<TestTally> = None;
    for caps in TALLY_RE.captures_iter(output) {
        let (Ok(passed), Ok(failed)) = (caps[1].parse::<u64>(), caps[2].parse::<u64>()) else {
            continue;
        };
        let entry = tally.get_or_insert(TestTally {
            passed: 0,
            failed: 0,
        });
        entry.passed = entry.passed.saturating_add(passed);
        entry.failed = entry.failed.saturating_add(failed);
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_output_passes() {
        let verdict = evaluate(&ExecutionResult::exited("Running lexer tests... OK", ""));
        assert_eq!(verdict, Verdict::Pass { tally: None });
    }

    #[test]
    fn stderr_fails_even_with_clean_stdout() {
        let verdict = evaluate(&ExecutionResult::exited("all good", "warning: trap\n"));
        assert!(matches!(verdict, Verdict::ExecutionFailure { .. }));
    }

    #[test]
    fn stderr_takes_precedence_over_error_marker() {
        let verdict = evaluate(&ExecutionResult::exited("Error in test 2", "trap"));
        assert!(matches!(verdict, Verdict::ExecutionFailure { .. }));
    }

    #[test]
    fn error_marker_fails_in_any_case() {
        for stdout in [
            "3 tests run, 1 Error encountered",
            "lexer: unexpected error at 4",
            "ERROR: token mismatch",
        ] {
            let verdict = evaluate(&ExecutionResult::exited(stdout, ""));
            assert!(
                matches!(verdict, Verdict::TestFailure { .. }),
                "expected failure for {stdout:?}"
            );
        }
    }

    #[test]
    fn non_zero_exit_is_execution_failure() {
        let result = ExecutionResult {
            exit_code: Some(2),
            ..ExecutionResult::exited("Running lexer tests... OK", "")
        };
        let verdict = evaluate(&result);
        assert_eq!(
            verdict,
            Verdict::ExecutionFailure {
                reason: "runtime exited with status 2".to_string()
            }
        );
    }

    #[test]
    fn signal_and_timeout_are_execution_failures() {
        let killed = ExecutionResult {
            exit_code: None,
            ..ExecutionResult::default()
        };
        assert!(matches!(evaluate(&killed), Verdict::ExecutionFailure { .. }));

        let timed_out = ExecutionResult {
            timed_out: true,
            ..ExecutionResult::exited("", "")
        };
        assert_eq!(
            evaluate(&timed_out),
            Verdict::ExecutionFailure {
                reason: "runtime timed out".to_string()
            }
        );
    }

    #[test]
    fn tally_with_failures_fails_without_marker() {
        let verdict = evaluate(&ExecutionResult::exited("keywords: 10 passed, 2 failed\n", ""));
        assert_eq!(
            verdict,
            Verdict::TestFailure {
                reason: "2 of 12 tests failed".to_string(),
                tally: Some(TestTally {
                    passed: 10,
                    failed: 2
                }),
            }
        );
    }

    #[test]
    fn tally_lines_are_summed() {
        let tally = parse_tally("lexer: 5 passed, 0 failed\nkeywords: 3 Passed, 0 Failed\n");
        assert_eq!(
            tally,
            Some(TestTally {
                passed: 8,
                failed: 0
            })
        );
        let verdict = evaluate(&ExecutionResult::exited("lexer: 5 passed, 0 failed", ""));
        assert!(matches!(verdict, Verdict::Pass { .. }));
    }

    #[test]
    fn huge_tallies_saturate_instead_of_overflowing() {
        let stdout = "18446744073709551615 passed, 18446744073709551615 failed\n1 passed, 1 failed\n";
        assert_eq!(
            parse_tally(stdout),
            Some(TestTally {
                passed: u64::MAX,
                failed: u64::MAX
            })
        );
        let verdict = evaluate(&ExecutionResult::exited(stdout, ""));
        assert_eq!(
            verdict,
            Verdict::TestFailure {
                reason: format!("{} of {} tests failed", u64::MAX, u64::MAX),
                tally: Some(TestTally {
                    passed: u64::MAX,
                    failed: u64::MAX
                }),
            }
        );
    }

    #[test]
    fn truncated_stdout_fails_even_when_kept_part_is_clean() {
        let result = ExecutionResult {
            stdout_truncated: 27,
            ..ExecutionResult::exited("x".repeat(4096), "")
        };
        assert_eq!(
            evaluate(&result),
            Verdict::ExecutionFailure {
                reason: "test output exceeded the capture limit, 27 bytes unchecked".to_string()
            }
        );
    }

    #[test]
    fn marker_in_kept_part_still_reports_test_failure_when_truncated() {
        let result = ExecutionResult {
            stdout_truncated: 5,
            ..ExecutionResult::exited("lexer error at 3", "")
        };
        assert!(matches!(evaluate(&result), Verdict::TestFailure { .. }));
    }
}
