//! External command execution for phonejs-core

use std::fmt;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use serde::{Deserialize, Serialize};

/// Where a child's standard output goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum StdoutTarget {
    /// Share the parent's stdout.
    Inherit,
    /// Create (or truncate) this file and write stdout into it.
    File(PathBuf),
}

/// A single external command, fully described.
///
/// The working directory travels with the invocation; nothing in this crate
/// calls `std::env::set_current_dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the child; `None` inherits the parent's.
    pub cwd: Option<PathBuf>,
    pub stdout: StdoutTarget,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdout: StdoutTarget::Inherit,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = StdoutTarget::File(path.into());
        self
    }

    /// Shell-like rendering, for logs and dry runs. Not meant to be fed back to a shell.
    pub fn command_line(&self) -> String {
        let mut line = quote(&self.program);
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote(arg));
        }
        if let StdoutTarget::File(path) = &self.stdout {
            line.push_str(" > ");
            line.push_str(&quote(&path.display().to_string()));
        }
        line
    }
}

fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@%+,".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// How a finished child exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    /// `None` when the child was terminated by a signal.
    pub code: Option<i32>,
}

impl RunStatus {
    pub fn from_code(code: Option<i32>) -> Self {
        Self { code }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for RunStatus {
    fn from(status: ExitStatus) -> Self {
        Self::from_code(status.code())
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("a signal"),
        }
    }
}

/// Runs invocations to completion. Implemented by [`SystemRunner`] and by test doubles.
pub trait CommandRunner {
    /// Block until the command exits. `Err` means it could not be started
    /// (or its stdout file could not be opened); a non-zero exit is `Ok`.
    fn run(&mut self, invocation: &Invocation) -> io::Result<RunStatus>;
}

/// Spawns real processes via `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> io::Result<RunStatus> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);

        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }

        match &invocation.stdout {
            StdoutTarget::Inherit => {
                cmd.stdout(Stdio::inherit());
            }
            StdoutTarget::File(path) => {
                cmd.stdout(Stdio::from(File::create(path)?));
            }
        }

        let status = cmd.status()?;
        Ok(status.into())
    }
}
