//! Isolated code execution (spec.md §4.2): writes a candidate solution
//! to a file and runs it under a real interpreter against a fixed test
//! harness, with wall-clock, no-network isolation.
//!
//! Execution shape mirrors `crates/swarm-agents/src/tools/exec_tool.rs`:
//! spawn the interpreter on a blocking thread, capture combined
//! stdout/stderr, and treat a non-zero exit as data (a failed test) not
//! as an `Err` — only a process that cannot be spawned, or one that
//! outruns the deadline, is an error. The scratch-directory-per-run
//! isolation mirrors `swe/test_generator.rs`'s `tempfile::tempdir()`
//! workspace in the `dataforge` sibling.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::error::ToolError;

/// One test case: the submitted program is run once per case, with
/// `input` piped to stdin and `expected_stdout` compared verbatim after
/// trimming trailing whitespace.
#[derive(Debug, Clone)]
pub struct TestCase {
    pub input: String,
    pub expected_stdout: String,
}

/// Default wall-clock budget for one test case (spec.md: "sandboxed,
/// time/memory bounded, no network").
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SandboxReport {
    pub per_test_pass: Vec<bool>,
    pub stderr: String,
}

impl SandboxReport {
    pub fn all_pass(&self) -> bool {
        !self.per_test_pass.is_empty() && self.per_test_pass.iter().all(|p| *p)
    }
}

/// Writes `program` to a fresh scratch directory and runs it once per
/// `test_case` under `python3` (HumanEval-style submissions, spec.md §8,
/// are Python programs), feeding `input` on stdin, with a `timeout`
/// wall-clock cap per case. The submission is executed by a real
/// interpreter against the file on disk, never interpolated into a
/// shell command line.
pub async fn run_tests(
    program: &str,
    test_cases: &[TestCase],
    timeout: Duration,
) -> Result<SandboxReport, ToolError> {
    let workdir = tempfile::tempdir().map_err(|e| ToolError::SandboxFailure(e.to_string()))?;
    let script_path = workdir.path().join("solution.py");
    std::fs::write(&script_path, program).map_err(|e| ToolError::SandboxFailure(e.to_string()))?;

    let mut per_test_pass = Vec::with_capacity(test_cases.len());
    let mut stderr_log = String::new();

    for case in test_cases {
        let outcome = run_one(&script_path, &case.input, timeout).await?;
        let passed = outcome.stdout.trim_end() == case.expected_stdout.trim_end();
        per_test_pass.push(passed);
        if !outcome.stderr.is_empty() {
            stderr_log.push_str(&outcome.stderr);
            stderr_log.push('\n');
        }
    }

    Ok(SandboxReport {
        per_test_pass,
        stderr: stderr_log,
    })
}

struct ProcessOutcome {
    stdout: String,
    stderr: String,
}

async fn run_one(script_path: &Path, stdin_input: &str, timeout: Duration) -> Result<ProcessOutcome, ToolError> {
    let script_path = script_path.to_path_buf();
    let input = stdin_input.to_string();

    let spawned = tokio::task::spawn_blocking(move || -> std::io::Result<ProcessOutcome> {
        use std::io::Write;
        let mut child = Command::new("python3")
            .arg(&script_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(input.as_bytes());
        }

        let output = child.wait_with_output()?;
        Ok(ProcessOutcome {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    });

    match tokio::time::timeout(timeout, spawned).await {
        Ok(Ok(Ok(outcome))) => Ok(outcome),
        Ok(Ok(Err(io_err))) => Err(ToolError::SandboxFailure(io_err.to_string())),
        Ok(Err(join_err)) => Err(ToolError::SandboxFailure(format!("sandbox task panicked: {join_err}"))),
        Err(_) => Err(ToolError::SandboxFailure(format!(
            "execution exceeded {}s",
            timeout.as_secs()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passing_case_is_detected() {
        let cases = vec![TestCase {
            input: String::new(),
            expected_stdout: "hello".to_string(),
        }];
        let report = run_tests("print('hello')", &cases, DEFAULT_TIMEOUT).await.unwrap();
        assert!(report.all_pass());
    }

    #[tokio::test]
    async fn failing_case_is_data_not_error() {
        let cases = vec![TestCase {
            input: String::new(),
            expected_stdout: "expected".to_string(),
        }];
        let report = run_tests("print('wrong')", &cases, DEFAULT_TIMEOUT).await.unwrap();
        assert!(!report.all_pass());
        assert_eq!(report.per_test_pass, vec![false]);
    }

    #[tokio::test]
    async fn timeout_is_a_typed_error() {
        let cases = vec![TestCase {
            input: String::new(),
            expected_stdout: String::new(),
        }];
        let err = run_tests("import time\ntime.sleep(2)", &cases, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SandboxFailure(_)));
    }

    #[tokio::test]
    async fn stdin_is_forwarded() {
        let cases = vec![TestCase {
            input: "abc".to_string(),
            expected_stdout: "abc".to_string(),
        }];
        let report = run_tests(
            "import sys\nsys.stdout.write(sys.stdin.read())",
            &cases,
            DEFAULT_TIMEOUT,
        )
        .await
        .unwrap();
        assert!(report.all_pass());
    }

    #[tokio::test]
    async fn a_real_function_definition_is_executed_by_the_interpreter_not_a_shell() {
        let program = "def has_close_elements(numbers, threshold):\n    \
            for i in range(len(numbers)):\n        \
                for j in range(len(numbers)):\n            \
                    if i != j and abs(numbers[i] - numbers[j]) < threshold:\n                \
                        return True\n    \
            return False\n\n\
            print(has_close_elements([1.0, 2.0, 3.9, 4.0, 5.0, 2.2], 0.3))";
        let cases = vec![TestCase {
            input: String::new(),
            expected_stdout: "True".to_string(),
        }];
        let report = run_tests(program, &cases, DEFAULT_TIMEOUT).await.unwrap();
        assert!(report.all_pass());
    }
}
