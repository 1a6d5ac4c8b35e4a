// crates/core/src/llm/command.rs
//! Generator client that pipes prompts through a local CLI process.

use regex_lite::Regex;
use std::io::{Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::OnceLock;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::provider::GenerationClient;
use super::types::{GenerationError, TIMEOUT_OUTPUT};

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Timeout for `--version` checks.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs `<program> <args...>` once per prompt, prompt on stdin, output on
/// stdout. The default is `ollama run llama3.1p`.
#[derive(Debug, Clone)]
pub struct CommandClient {
    program: String,
    args: Vec<String>,
    model: String,
}

impl CommandClient {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        let program = program.into();
        let model = args.last().cloned().unwrap_or_else(|| program.clone());
        Self {
            program,
            args,
            model,
        }
    }

    /// Parse a whitespace-separated command line such as `ollama run llama3.1p`.
    pub fn from_command_line(line: &str) -> Result<Self, GenerationError> {
        let mut parts = line.split_whitespace().map(str::to_owned);
        let program = parts
            .next()
            .ok_or_else(|| GenerationError::InvalidCommand("empty command".into()))?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl GenerationClient for CommandClient {
    fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GenerationError> {
        let t0 = Instant::now();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        let outcome = run_with_timeout(&mut cmd, Some(format!("{prompt}\n")), timeout)?;
        let elapsed_ms = t0.elapsed().as_millis() as u64;

        match outcome {
            RunOutcome::TimedOut => {
                tracing::warn!(
                    program = %self.program,
                    timeout_secs = timeout.as_secs(),
                    "generator timed out; process killed"
                );
                Ok(TIMEOUT_OUTPUT.to_string())
            }
            RunOutcome::Finished {
                status,
                stdout,
                stderr,
            } => {
                if !status.success() {
                    let stderr = String::from_utf8_lossy(&stderr);
                    tracing::error!(
                        elapsed_ms,
                        exit_code = ?status.code(),
                        stderr = %truncate(stderr.trim(), 500),
                        "generator: non-zero exit"
                    );
                    return Ok(String::new());
                }
                let text = strip_ansi(&String::from_utf8_lossy(&stdout)).trim().to_string();
                tracing::debug!(elapsed_ms, bytes = text.len(), raw = %text, "generator output");
                Ok(text)
            }
        }
    }

    fn health_check(&self) -> Result<(), GenerationError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--version");
        match run_with_timeout(&mut cmd, None, HEALTH_TIMEOUT) {
            Ok(RunOutcome::Finished { status, .. }) if status.success() => Ok(()),
            Ok(RunOutcome::Finished { status, stderr, .. }) => Err(GenerationError::NotAvailable(
                format!(
                    "{} --version exited with {:?}: {}",
                    self.program,
                    status.code(),
                    String::from_utf8_lossy(&stderr).trim()
                ),
            )),
            Ok(RunOutcome::TimedOut) => Err(GenerationError::Timeout(HEALTH_TIMEOUT.as_secs())),
            Err(GenerationError::SpawnFailed(msg)) => Err(GenerationError::NotAvailable(msg)),
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        &self.program
    }

    fn model(&self) -> &str {
        &self.model
    }
}

enum RunOutcome {
    Finished {
        status: ExitStatus,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    TimedOut,
}

/// Spawn with piped stdio, feed `input`, and poll until exit or deadline.
///
/// stdin/stdout/stderr each get their own thread so a chatty child can
/// never deadlock on a full pipe. On timeout the child is killed and the
/// reader threads are left to finish once the pipes close.
fn run_with_timeout(
    cmd: &mut Command,
    input: Option<String>,
    timeout: Duration,
) -> Result<RunOutcome, GenerationError> {
    let mut child = cmd
        .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            tracing::error!(error = %e, "generator: failed to spawn process");
            GenerationError::SpawnFailed(e.to_string())
        })?;

    if let (Some(mut stdin), Some(input)) = (child.stdin.take(), input) {
        std::thread::spawn(move || {
            // A child that exits without reading stdin yields EPIPE here.
            let _ = stdin.write_all(input.as_bytes());
        });
    }
    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Ok(RunOutcome::TimedOut);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(GenerationError::Io(e.to_string()));
            }
        }
    };

    Ok(RunOutcome::Finished {
        status,
        stdout: join_reader(stdout),
        stderr: join_reader(stderr),
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn ansi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("valid ANSI regex"))
}

/// Remove terminal control sequences (colors, cursor moves, spinners).
pub fn strip_ansi(text: &str) -> String {
    ansi_re().replace_all(text, "").into_owned()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
