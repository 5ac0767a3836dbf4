// SPDX-License-Identifier: Apache-2.0

//! Correctness oracle interface and a child-process implementation of it.
//!
//! Candidate programs are untrusted. `CommandOracle` runs each check in its
//! own child process, which is killed on timeout or cancellation.

use std::fmt;
use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::results::SolutionType;
use crate::store::Problem;

/// How often a running check looks at its child and its cancel token.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Per-test outcomes (1 = pass) from the base and extended test suites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleReport {
    #[serde(default)]
    pub base: Vec<u8>,
    #[serde(default)]
    pub plus: Vec<u8>,
}

impl OracleReport {
    /// Base results followed by plus results.
    pub fn per_test_pass(&self) -> Vec<u8> {
        self.base.iter().chain(&self.plus).copied().collect()
    }

    pub fn failed_tests(&self) -> Vec<usize> {
        self.per_test_pass()
            .iter()
            .enumerate()
            .filter(|(_, r)| **r != 1)
            .map(|(i, _)| i)
            .collect()
    }

    /// Fraction of tests passed; `None` when no test ran.
    pub fn pass_ratio(&self) -> Option<f64> {
        let total = self.base.len() + self.plus.len();
        if total == 0 {
            return None;
        }
        let passed = total - self.failed_tests().len();
        Some(passed as f64 / total as f64)
    }

    /// No tests at all means the candidate never got far enough to run them.
    pub fn classify(&self) -> SolutionType {
        match self.pass_ratio() {
            None => SolutionType::BadSyntax,
            Some(r) if r >= 1.0 => SolutionType::Passed,
            Some(_) => SolutionType::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    Timeout,
    Cancelled,
    Crash(String),
    Io(String),
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::Timeout => write!(f, "OracleError: check timed out"),
            OracleError::Cancelled => write!(f, "OracleError: check cancelled"),
            OracleError::Crash(msg) => write!(f, "OracleError: oracle crashed: {}", msg),
            OracleError::Io(msg) => write!(f, "OracleError: I/O error: {}", msg),
        }
    }
}

impl std::error::Error for OracleError {}

/// Shared flag that asks running checks to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs a candidate program against a problem's tests.
///
/// Implementations must return within roughly `timeout` and should return
/// `OracleError::Cancelled` soon after `cancel` fires.
pub trait CorrectnessOracle: Send {
    fn check(
        &mut self,
        problem: &Problem,
        candidate: &str,
        base_only: bool,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<OracleReport, OracleError>;
}

/// Builds one oracle per pool worker.
pub trait OracleFactory: Send + Sync + 'static {
    type Oracle: CorrectnessOracle + 'static;

    fn create(&self) -> Result<Self::Oracle, OracleError>;
}

#[derive(Serialize)]
struct OracleRequest<'a> {
    problem: &'a Problem,
    solution: &'a str,
    base_only: bool,
    timeout_secs: f64,
}

/// Checks candidates by running an external command per check.
///
/// The command gets a JSON object with `problem`, `solution`, `base_only`
/// and `timeout_secs` on stdin and must print a JSON object with `base` and
/// `plus` result lists as its last non-empty stdout line.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
}

impl CommandOracle {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

fn terminate_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_reader<R: Read + Send + 'static>(mut stream: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        buf
    })
}

/// Feeds `body` to a child's stdin off the calling thread, so a child that is
/// slow to read cannot hold the caller past its deadline. The pipe is closed
/// once everything is written.
pub(crate) fn spawn_writer<W: Write + Send + 'static>(
    mut stream: W,
    body: Vec<u8>,
) -> JoinHandle<io::Result<()>> {
    std::thread::spawn(move || stream.write_all(&body))
}

/// A child that exits without reading all of its input closes the pipe
/// under the writer; that is judged by the exit status, not here.
pub(crate) fn write_outcome(handle: JoinHandle<io::Result<()>>) -> Result<(), String> {
    match handle.join() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Ok(Err(e)) => Err(format!("writing child stdin: {}", e)),
        Err(_) => Err("stdin writer panicked".to_string()),
    }
}

impl CorrectnessOracle for CommandOracle {
    fn check(
        &mut self,
        problem: &Problem,
        candidate: &str,
        base_only: bool,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<OracleReport, OracleError> {
        let request = OracleRequest {
            problem,
            solution: candidate,
            base_only,
            timeout_secs: timeout.as_secs_f64(),
        };
        let body = serde_json::to_vec(&request).map_err(|e| OracleError::Io(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OracleError::Io(format!("spawning {}: {}", self.program, e)))?;

        let (writer, stdout, stderr) =
            match (child.stdin.take(), child.stdout.take(), child.stderr.take()) {
                (Some(input), Some(out), Some(err)) => (
                    spawn_writer(input, body),
                    spawn_reader(out),
                    spawn_reader(err),
                ),
                _ => {
                    terminate_and_reap(&mut child);
                    return Err(OracleError::Io("child streams unavailable".to_string()));
                }
            };

        let started = Instant::now();
        let status = loop {
            if cancel.is_cancelled() {
                terminate_and_reap(&mut child);
                return Err(OracleError::Cancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    terminate_and_reap(&mut child);
                    return Err(OracleError::Io(e.to_string()));
                }
            }
            if started.elapsed() > timeout {
                terminate_and_reap(&mut child);
                return Err(OracleError::Timeout);
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        write_outcome(writer).map_err(OracleError::Io)?;
        let stdout = stdout
            .join()
            .map_err(|_| OracleError::Io("stdout reader panicked".to_string()))?;
        let stderr = stderr
            .join()
            .map_err(|_| OracleError::Io("stderr reader panicked".to_string()))?;
        if !status.success() {
            return Err(OracleError::Crash(format!(
                "{}: {}",
                status,
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        let stdout = String::from_utf8_lossy(&stdout);
        let line = stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| OracleError::Crash("oracle printed nothing".to_string()))?;
        serde_json::from_str(line)
            .map_err(|e| OracleError::Crash(format!("unreadable oracle output {:?}: {}", line, e)))
    }
}

impl OracleFactory for CommandOracle {
    type Oracle = CommandOracle;

    fn create(&self) -> Result<CommandOracle, OracleError> {
        Ok(self.clone())
    }
}

type CheckFn = dyn Fn(&Problem, &str) -> Result<OracleReport, OracleError> + Send + Sync;

/// In-process oracle backed by a function. It ignores the timeout and cancel
/// token, so the function must return promptly.
#[derive(Clone)]
pub struct FnOracle {
    check: Arc<CheckFn>,
}

impl FnOracle {
    pub fn new(
        check: impl Fn(&Problem, &str) -> Result<OracleReport, OracleError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            check: Arc::new(check),
        }
    }
}

impl fmt::Debug for FnOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOracle").finish_non_exhaustive()
    }
}

impl CorrectnessOracle for FnOracle {
    fn check(
        &mut self,
        problem: &Problem,
        candidate: &str,
        _base_only: bool,
        _timeout: Duration,
        _cancel: &CancelToken,
    ) -> Result<OracleReport, OracleError> {
        (self.check)(problem, candidate)
    }
}

impl OracleFactory for FnOracle {
    type Oracle = FnOracle;

    fn create(&self) -> Result<FnOracle, OracleError> {
        Ok(self.clone())
    }
}
