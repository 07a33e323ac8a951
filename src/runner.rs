//! External command execution
//!
//! Commands are always spawned from an explicit argument list. Nothing is
//! ever handed to a shell, so a domain, path or password containing `;`,
//! `|` or backticks is just bytes in one argv slot. Input that must not be
//! visible in the process table goes through stdin.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

use crate::error::{Error, ExecutionError, Result};
use crate::secret::{self, REDACTED};

/// Bytes kept from each of stdout and stderr; the rest is discarded
const MAX_OUTPUT_BYTES: u64 = 1024 * 1024;

/// One argument of an invocation
#[derive(Debug)]
pub enum Arg {
    Plain(String),
    /// Passed to the process verbatim, rendered as `********` everywhere else
    Secret(SecretString),
}

impl Arg {
    fn expose(&self) -> &str {
        match self {
            Arg::Plain(s) => s,
            Arg::Secret(s) => s.expose_secret(),
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Plain(s) => f.write_str(s),
            Arg::Secret(_) => f.write_str(REDACTED),
        }
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Plain(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Plain(s)
    }
}

/// A command to run: program, arguments, extra environment and input
#[derive(Debug)]
pub struct Invocation {
    program: String,
    args: Vec<Arg>,
    env: Vec<(String, Arg)>,
    stdin: Option<SecretString>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdin: None,
        }
    }

    /// Build from a configured argv (first element is the program)
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, rest) = argv.split_first()?;
        Some(Self::new(program.clone()).args(rest.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env_secret(mut self, key: impl Into<String>, secret: SecretString) -> Self {
        self.env.push((key.into(), Arg::Secret(secret)));
        self
    }

    /// Feed `input` to the process on stdin; it never appears in argv
    pub fn stdin_secret(mut self, input: SecretString) -> Self {
        self.stdin = Some(input);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments as passed to the process
    pub fn exposed_args(&self) -> Vec<&str> {
        self.args.iter().map(Arg::expose).collect()
    }

    /// Environment entries as passed to the process
    pub fn exposed_env(&self) -> Vec<(&str, &str)> {
        self.env.iter().map(|(k, v)| (k.as_str(), v.expose())).collect()
    }

    /// Input piped to the process
    pub fn exposed_stdin(&self) -> Option<&str> {
        self.stdin.as_ref().map(|input| input.expose_secret())
    }

    /// Whether any argument, environment entry or input is a secret
    pub fn has_secrets(&self) -> bool {
        self.stdin.is_some()
            || self
                .args
                .iter()
                .chain(self.env.iter().map(|(_, v)| v))
                .any(|a| matches!(a, Arg::Secret(_)))
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        if self.stdin.is_some() {
            write!(f, " < {REDACTED}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code (None if terminated by a signal)
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs external commands on the host
///
/// Implementors provide [`spawn`](SystemExecutor::spawn); the provided
/// methods add audit logging and exit-status checking so every executor
/// behaves identically in those respects.
pub trait SystemExecutor {
    /// Run the command to completion (or timeout) and capture its output
    ///
    /// Only fails if the command could not be started or timed out.
    fn spawn(&self, invocation: &Invocation, timeout: Duration) -> Result<CommandOutput>;

    /// Run a command and return its output whatever the exit status
    fn probe(&self, invocation: &Invocation, timeout: Duration) -> Result<CommandOutput> {
        let started = Instant::now();
        let result = self.spawn(invocation, timeout);
        let elapsed_ms = started.elapsed().as_millis();
        let redacted = if invocation.has_secrets() { " redacted" } else { "" };

        match &result {
            Ok(output) => log::info!(
                target: "franken::audit",
                "exec `{invocation}` exit={} duration_ms={elapsed_ms}{redacted}",
                output
                    .exit_code
                    .map_or_else(|| "signal".to_string(), |c| c.to_string())
            ),
            Err(e) => log::warn!(
                target: "franken::audit",
                "exec `{invocation}` failed duration_ms={elapsed_ms}{redacted}: {e}"
            ),
        }
        result
    }

    /// Run a command, failing with [`ExecutionError`] on a non-zero exit
    fn run(&self, invocation: &Invocation, timeout: Duration) -> Result<CommandOutput> {
        let output = self.probe(invocation, timeout)?;
        if output.success() {
            Ok(output)
        } else {
            Err(Error::Execution(ExecutionError {
                command: invocation.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
                timed_out: false,
            }))
        }
    }
}

/// Spawns real processes
#[derive(Debug, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    /// Read up to the cap, then keep draining so the child never blocks on a full pipe
    fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<thread::JoinHandle<String>> {
        pipe.map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.by_ref().take(MAX_OUTPUT_BYTES).read_to_end(&mut buf);
                let _ = io::copy(&mut pipe, &mut io::sink());
                String::from_utf8_lossy(&buf).into_owned()
            })
        })
    }

    fn feed<W: Write + Send + 'static>(pipe: Option<W>, input: Option<SecretString>) {
        if let (Some(mut pipe), Some(input)) = (pipe, input) {
            thread::spawn(move || {
                // A child that exits without reading its input is reported by its status
                let _ = pipe.write_all(input.expose_secret().as_bytes());
            });
        }
    }

    fn collect(handle: Option<thread::JoinHandle<String>>) -> String {
        handle.and_then(|h| h.join().ok()).unwrap_or_default()
    }

    fn failure(invocation: &Invocation, stderr: String, timed_out: bool) -> Error {
        Error::Execution(ExecutionError {
            command: invocation.to_string(),
            exit_code: None,
            stderr,
            timed_out,
        })
    }
}

impl SystemExecutor for ProcessExecutor {
    fn spawn(&self, invocation: &Invocation, timeout: Duration) -> Result<CommandOutput> {
        let mut command = Command::new(invocation.program());
        command
            .args(invocation.exposed_args())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in invocation.exposed_env() {
            command.env(key, value);
        }

        let mut child = command
            .spawn()
            .map_err(|e| Self::failure(invocation, format!("failed to start: {e}"), false))?;

        // Feed and drain concurrently so neither side can block on a full pipe
        Self::feed(child.stdin.take(), invocation.stdin.as_ref().map(secret::duplicate));
        let stdout = Self::drain(child.stdout.take());
        let stderr = Self::drain(child.stderr.take());

        let status = match child.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Self::failure(invocation, String::new(), true));
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Self::failure(invocation, format!("wait failed: {e}"), false));
            }
        };

        Ok(CommandOutput {
            exit_code: status.code(),
            stdout: Self::collect(stdout),
            stderr: Self::collect(stderr),
        })
    }
}
