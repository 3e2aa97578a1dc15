//! Child process lifecycle for one skill invocation.

use super::cancel::CancelToken;
use super::protocol::{SkillRequest, SkillResponse, preview_text};
use crate::error::{Result, StepwiseError};
use crate::skills::SkillEntry;
use serde_json::Value;
use std::io::{ErrorKind, Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

const STDOUT_PREVIEW_CHARS: usize = 200;
const STDERR_PREVIEW_CHARS: usize = 200;
const STDERR_CAPTURE_BYTES: usize = 4 * 1024;
const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Minimum wait for output streams to close after the child exited.
const MIN_DRAIN_WAIT: Duration = Duration::from_millis(100);

/// Resource bounds for one invocation.
#[derive(Debug, Clone, Copy)]
pub struct ExecLimits {
    /// Responses larger than this are malformed.
    pub max_response_bytes: usize,
    /// How often the child is checked for exit, timeout and cancellation.
    pub poll_interval: Duration,
}

impl Default for ExecLimits {
    fn default() -> Self {
        Self {
            max_response_bytes: 64 * 1024,
            poll_interval: Duration::from_millis(25),
        }
    }
}

/// Why an invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Killed after exceeding its time bound.
    Timeout,
    /// Killed because the plan was cancelled.
    Cancelled,
    /// Exited with a non-zero status (stdout is not trusted).
    NonZeroExit,
    /// Exited cleanly but the response was not one conforming JSON object.
    Malformed,
    /// A well-formed response with `success: false`.
    Reported,
}

/// Outcome of one skill invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
    /// `None` when the child was killed.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl ExecutionResult {
    fn succeeded(output: String, exit_code: Option<i32>, elapsed: Duration) -> Self {
        Self {
            success: true,
            output,
            error: None,
            failure: None,
            exit_code,
            elapsed,
        }
    }

    fn failed(
        kind: FailureKind,
        error: impl Into<String>,
        exit_code: Option<i32>,
        elapsed: Duration,
    ) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            failure: Some(kind),
            exit_code,
            elapsed,
        }
    }

    /// The short string worth keeping: output on success, error otherwise.
    pub fn condensed(&self) -> String {
        if self.success {
            self.output.clone()
        } else {
            self.error
                .clone()
                .unwrap_or_else(|| "skill failed".to_string())
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    /// The error taxonomy entry for this failure, if any.
    pub fn to_error(&self, timeout: Duration) -> Option<StepwiseError> {
        match self.failure? {
            FailureKind::Timeout => Some(StepwiseError::Timeout(
                u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            )),
            FailureKind::Malformed => Some(StepwiseError::MalformedResponse(self.condensed())),
            FailureKind::Cancelled | FailureKind::NonZeroExit | FailureKind::Reported => None,
        }
    }
}

/// Bytes captured from one output stream.
struct Captured {
    bytes: Vec<u8>,
    overflowed: bool,
}

/// Run one skill invocation to completion, timeout or cancellation.
///
/// Returns `Err` only when the child could not be started; every other
/// failure is a failed [`ExecutionResult`].
pub fn execute(
    entry: &SkillEntry,
    parameters: &Value,
    timeout: Duration,
    cancel: &CancelToken,
    limits: &ExecLimits,
) -> Result<ExecutionResult> {
    let args = shell_words::split(&entry.entry_point).map_err(|e| {
        StepwiseError::UserError(format!(
            "failed to parse entry point '{}' of skill '{}': {}\n\
             Fix: check for unmatched quotes or invalid escape sequences.",
            entry.entry_point, entry.name, e
        ))
    })?;
    let Some((program, program_args)) = args.split_first() else {
        return Err(StepwiseError::UserError(format!(
            "skill '{}' has an empty entry point",
            entry.name
        )));
    };

    let request = SkillRequest {
        command: entry.command.clone(),
        parameters: parameters.clone(),
    };
    let mut payload = serde_json::to_vec(&request).map_err(|e| {
        StepwiseError::UserError(format!("failed to serialize skill request: {}", e))
    })?;
    payload.push(b'\n');

    let mut command = Command::new(program);
    command
        .args(program_args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &entry.working_dir {
        command.current_dir(dir);
    }
    for (key, value) in &entry.environment {
        command.env(key, value);
    }

    let start = Instant::now();
    let mut child = command.spawn().map_err(|e| {
        StepwiseError::UserError(format!(
            "failed to execute skill '{}' ('{}'): {}\n\
             Fix: ensure the entry point is installed and executable.",
            entry.name, program, e
        ))
    })?;
    tracing::debug!(skill = %entry.name, pid = child.id(), command = %entry.command, "skill started");

    if let Some(stdin) = child.stdin.take() {
        spawn_request_writer(stdin, payload);
    }
    let stdout_rx = child
        .stdout
        .take()
        .map(|out| spawn_reader(out, limits.max_response_bytes));
    let stderr_rx = child
        .stderr
        .take()
        .map(|err| spawn_reader(err, STDERR_CAPTURE_BYTES));

    let status = match wait_for_exit(&mut child, timeout, cancel, limits.poll_interval, start) {
        Wait::Exited(status) => status,
        Wait::TimedOut => {
            kill_process(&mut child);
            tracing::warn!(skill = %entry.name, timeout_ms = timeout.as_millis() as u64, "skill timed out");
            return Ok(ExecutionResult::failed(
                FailureKind::Timeout,
                "timeout",
                None,
                start.elapsed(),
            ));
        }
        Wait::Cancelled => {
            kill_process(&mut child);
            tracing::info!(skill = %entry.name, "skill cancelled");
            return Ok(ExecutionResult::failed(
                FailureKind::Cancelled,
                "cancelled",
                None,
                start.elapsed(),
            ));
        }
        Wait::Failed(e) => {
            kill_process(&mut child);
            return Ok(ExecutionResult::failed(
                FailureKind::NonZeroExit,
                format!("failed to wait for skill process: {}", e),
                None,
                start.elapsed(),
            ));
        }
    };

    // A grandchild may still hold the pipes open; never wait past the deadline.
    let drain_wait = timeout.saturating_sub(start.elapsed()).max(MIN_DRAIN_WAIT);
    let stdout = stdout_rx.and_then(|rx| rx.recv_timeout(drain_wait).ok());
    let stderr = stderr_rx
        .and_then(|rx| rx.recv_timeout(MIN_DRAIN_WAIT).ok())
        .map(|c| String::from_utf8_lossy(&c.bytes).into_owned())
        .unwrap_or_default();
    let elapsed = start.elapsed();

    Ok(interpret(status, stdout, &stderr, limits, elapsed))
}

/// Turn a finished child's exit status and output into a result.
fn interpret(
    status: ExitStatus,
    stdout: Option<Captured>,
    stderr: &str,
    limits: &ExecLimits,
    elapsed: Duration,
) -> ExecutionResult {
    let exit_code = status.code();
    let stdout_text = stdout
        .as_ref()
        .map(|c| String::from_utf8_lossy(&c.bytes).into_owned())
        .unwrap_or_default();

    if !status.success() {
        let detail = SkillResponse::parse(&stdout_text)
            .ok()
            .and_then(|r| r.error)
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| preview_text(stderr.trim(), STDERR_PREVIEW_CHARS));
        let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
        let message = if detail.is_empty() {
            format!("exit status {}", code)
        } else {
            format!("exit status {}: {}", code, detail)
        };
        return ExecutionResult::failed(FailureKind::NonZeroExit, message, exit_code, elapsed);
    }

    let Some(stdout) = stdout else {
        return ExecutionResult::failed(
            FailureKind::Malformed,
            "malformed response: output stream did not close",
            exit_code,
            elapsed,
        );
    };
    if stdout.overflowed {
        return ExecutionResult::failed(
            FailureKind::Malformed,
            format!(
                "malformed response: exceeds {} bytes: {}",
                limits.max_response_bytes,
                preview_text(&stdout_text, STDOUT_PREVIEW_CHARS)
            ),
            exit_code,
            elapsed,
        );
    }

    match SkillResponse::parse(&stdout_text) {
        Ok(response) if response.success => {
            ExecutionResult::succeeded(response.output, exit_code, elapsed)
        }
        Ok(response) => {
            let error = response
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "skill reported failure without an error message".to_string());
            ExecutionResult::failed(FailureKind::Reported, error, exit_code, elapsed)
        }
        Err(e) => ExecutionResult::failed(
            FailureKind::Malformed,
            format!(
                "malformed response: {}: {}",
                e,
                preview_text(stdout_text.trim(), STDOUT_PREVIEW_CHARS)
            ),
            exit_code,
            elapsed,
        ),
    }
}

enum Wait {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
    Failed(std::io::Error),
}

/// Poll the child until it exits, the deadline passes, or cancellation fires.
fn wait_for_exit(
    child: &mut Child,
    timeout: Duration,
    cancel: &CancelToken,
    poll_interval: Duration,
    start: Instant,
) -> Wait {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Wait::Exited(status),
            Ok(None) => {}
            Err(e) => return Wait::Failed(e),
        }

        if cancel.is_cancelled() {
            return Wait::Cancelled;
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Wait::TimedOut;
        }
        thread::sleep(poll_interval.min(timeout - elapsed));
    }
}

/// Kill a process and reap it.
fn kill_process(child: &mut Child) {
    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
    let _ = child.kill();
    let _ = child.wait();
}

/// Write the request and close stdin so the child sees EOF.
fn spawn_request_writer(mut stdin: ChildStdin, payload: Vec<u8>) {
    thread::spawn(move || {
        if let Err(e) = stdin.write_all(&payload)
            && e.kind() != ErrorKind::BrokenPipe
        {
            tracing::debug!(error = %e, "failed to write skill request");
        }
    });
}

/// Read a stream to EOF keeping at most `limit` bytes; the rest is drained
/// so the child never blocks on a full pipe.
fn spawn_reader<R: Read + Send + 'static>(mut stream: R, limit: usize) -> Receiver<Captured> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut bytes = Vec::new();
        let mut overflowed = false;
        let mut buf = [0u8; READ_CHUNK_BYTES];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let room = limit.saturating_sub(bytes.len());
                    if n > room {
                        overflowed = true;
                    }
                    bytes.extend_from_slice(&buf[..n.min(room)]);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        let _ = tx.send(Captured { bytes, overflowed });
    });
    rx
}
