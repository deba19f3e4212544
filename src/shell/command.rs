//! External process execution.
//!
//! Programs are launched directly (no shell in between) so arguments reach
//! the child verbatim. Output is read on two helper threads and forwarded
//! over a channel; the calling thread polls that channel and the child so it
//! can enforce a timeout and honour cancellation while the child runs.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{ProvisionError, Result};
use crate::runner::CancellationToken;

/// How often the child is polled for exit, timeout and cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A program and its arguments, plus the environment it runs in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    /// Program to run. Bare names are looked up on PATH.
    pub program: PathBuf,

    /// Arguments, passed verbatim.
    pub args: Vec<String>,

    /// Extra environment variables (merged with the parent's).
    pub env: BTreeMap<String, String>,

    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Data written to the child's stdin, which is then closed.
    pub stdin: Option<String>,
}

impl Invocation {
    /// Create an invocation of `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Feed `input` to the child's stdin.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Short program name for messages.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Result of running a program to completion.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Kill the child after this long.
    pub timeout: Option<Duration>,

    /// Kill the child when this token is cancelled.
    pub cancel: Option<CancellationToken>,
}

/// Output line from command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

impl OutputLine {
    /// Line text regardless of stream.
    pub fn text(&self) -> &str {
        match self {
            OutputLine::Stdout(s) | OutputLine::Stderr(s) => s,
        }
    }
}

/// Run a program to completion, streaming each output line to `on_line`.
///
/// # Errors
///
/// - `NotFound` if the program cannot be located
/// - `Timeout` if `options.timeout` elapses (the child is killed)
/// - `Cancelled` if `options.cancel` fires (the child is killed)
///
/// A non-zero exit is not an error here; inspect [`CommandResult::success`].
pub fn execute(
    invocation: &Invocation,
    options: &CommandOptions,
    on_line: &mut dyn FnMut(&OutputLine),
) -> Result<CommandResult> {
    let start = Instant::now();
    let mut child = spawn(invocation)?;
    let mut helpers = Vec::new();

    if let (Some(input), Some(mut pipe)) = (invocation.stdin.clone(), child.stdin.take()) {
        let program = invocation.program_name();
        helpers.push(thread::spawn(move || {
            // A child that exits without reading stdin closes the pipe early.
            if let Err(e) = pipe.write_all(input.as_bytes()) {
                tracing::debug!("stdin for {} not fully written: {}", program, e);
            }
        }));
    }

    let (tx, rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        let tx = tx.clone();
        helpers.push(thread::spawn(move || forward_lines(stdout, &tx, OutputLine::Stdout)));
    }
    if let Some(stderr) = child.stderr.take() {
        let tx = tx.clone();
        helpers.push(thread::spawn(move || forward_lines(stderr, &tx, OutputLine::Stderr)));
    }
    drop(tx);

    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut record = |line: OutputLine, on_line: &mut dyn FnMut(&OutputLine)| {
        on_line(&line);
        let buf = match &line {
            OutputLine::Stdout(_) => &mut stdout,
            OutputLine::Stderr(_) => &mut stderr,
        };
        buf.push_str(line.text());
        buf.push('\n');
    };

    let status = loop {
        // Forward output for at most one tick so a chatty child cannot
        // starve the exit, timeout and cancellation checks below.
        let tick = Instant::now() + POLL_INTERVAL;
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(line) => {
                record(line, on_line);
                while Instant::now() < tick {
                    match rx.try_recv() {
                        Ok(line) => record(line, on_line),
                        Err(_) => break,
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => thread::sleep(POLL_INTERVAL),
            Err(RecvTimeoutError::Timeout) => {}
        }

        if let Some(status) = child
            .try_wait()
            .map_err(|e| ProvisionError::io(&invocation.program, e))?
        {
            break status;
        }

        if let Some(limit) = options.timeout {
            if start.elapsed() >= limit {
                terminate(&mut child, invocation);
                return Err(ProvisionError::Timeout {
                    program: invocation.program_name(),
                    seconds: limit.as_secs(),
                });
            }
        }

        if options.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            terminate(&mut child, invocation);
            return Err(ProvisionError::Cancelled);
        }
    };

    for helper in helpers {
        let _ = helper.join();
    }
    for line in rx.try_iter() {
        record(line, on_line);
    }

    Ok(CommandResult {
        exit_code: status.code(),
        stdout,
        stderr,
        duration: start.elapsed(),
        success: status.success(),
    })
}

/// Send each line of `source` until EOF.
///
/// Bytes that are not UTF-8 are replaced rather than ending the read, so
/// the child never sees its pipe close while it is still writing.
fn forward_lines(source: impl Read, tx: &Sender<OutputLine>, wrap: fn(String) -> OutputLine) {
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                // The receiver is gone once the child was killed; keep draining.
                let _ = tx.send(wrap(String::from_utf8_lossy(&buf).into_owned()));
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!("output stream closed: {}", e);
                break;
            }
        }
    }
}

/// Run a program, collecting output without streaming.
pub fn execute_quiet(invocation: &Invocation) -> Result<CommandResult> {
    execute(invocation, &CommandOptions::default(), &mut |_| {})
}

/// Run a program and report only whether it exited 0.
pub fn execute_check(invocation: &Invocation) -> bool {
    execute_quiet(invocation)
        .map(|r| r.success)
        .unwrap_or(false)
}

fn spawn(invocation: &Invocation) -> Result<Child> {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args);

    if let Some(cwd) = &invocation.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in &invocation.env {
        cmd.env(key, value);
    }

    cmd.stdin(if invocation.stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ProvisionError::NotFound {
            path: invocation.program.clone(),
        },
        std::io::ErrorKind::PermissionDenied => ProvisionError::permission(format!(
            "cannot execute {}: {}",
            invocation.program.display(),
            e
        )),
        _ => ProvisionError::io(&invocation.program, e),
    })
}

fn terminate(child: &mut Child, invocation: &Invocation) {
    tracing::warn!("Terminating {}", invocation.program_name());
    if let Err(e) = child.kill() {
        tracing::debug!("kill failed: {}", e);
    }
    let _ = child.wait();
}
