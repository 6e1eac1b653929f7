//! Subprocess execution.
//!
//! Stages never inspect ambient process state: every invocation returns an explicit
//! [`CommandOutcome`] carrying the child's exit code. The [`CommandRunner`] trait is the
//! seam the orchestrator is generic over, so a run can be driven without spawning real
//! tools.

use crate::error::LOCAL_FAILURE_EXIT_CODE;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// What happens to a child's stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Child writes straight to our terminal
    Inherit,
    /// Child stdout is thrown away
    Discard,
}

/// A command line to execute, described as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<OsString>,
    output: OutputMode,
}

impl CommandSpec {
    /// Command running `program` with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            output: OutputMode::Inherit,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Discard the child's stdout
    pub fn discard_output(mut self) -> Self {
        self.output = OutputMode::Discard;
        self
    }

    /// Program to execute
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments, in order
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// How stdout is handled
    pub fn output_mode(&self) -> OutputMode {
        self.output
    }

    /// Whether `arg` appears verbatim among the arguments
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Whether any argument starts with `prefix`
    pub fn has_arg_prefix(&self, prefix: &str) -> bool {
        self.args
            .iter()
            .any(|a| a.to_string_lossy().starts_with(prefix))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Exit status of a finished subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    code: i32,
}

impl CommandOutcome {
    /// Outcome with an explicit exit code
    pub fn from_code(code: i32) -> Self {
        Self { code }
    }

    /// Zero exit
    pub fn success() -> Self {
        Self { code: 0 }
    }

    /// Whether the child exited zero
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// The child's exit code
    pub fn code(&self) -> i32 {
        self.code
    }
}

impl From<ExitStatus> for CommandOutcome {
    fn from(status: ExitStatus) -> Self {
        // Killed by a signal: no code to propagate.
        Self {
            code: status.code().unwrap_or(LOCAL_FAILURE_EXIT_CODE),
        }
    }
}

/// Exit status plus captured stdout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Exit status
    pub outcome: CommandOutcome,
    /// Stdout decoded lossily
    pub stdout: String,
}

/// Executes commands on behalf of pipeline stages.
pub trait CommandRunner {
    /// Run to completion, blocking until the child exits
    fn run(&mut self, command: &CommandSpec) -> io::Result<CommandOutcome>;

    /// Run to completion and capture stdout
    fn capture(&mut self, command: &CommandSpec) -> io::Result<CapturedOutput>;

    /// Whether `program` can be resolved on `PATH`
    fn is_available(&self, program: &Path) -> bool {
        which::which(program).is_ok()
    }
}

/// [`CommandRunner`] spawning real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(spec.program());
        cmd.args(spec.arguments());
        if spec.output_mode() == OutputMode::Discard {
            cmd.stdout(Stdio::null());
        }
        cmd
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, command: &CommandSpec) -> io::Result<CommandOutcome> {
        log::info!("> {command}");
        let status = Self::command(command).status()?;
        let outcome = CommandOutcome::from(status);
        log::debug!("{} exited with code {}", command.program().display(), outcome.code());
        Ok(outcome)
    }

    fn capture(&mut self, command: &CommandSpec) -> io::Result<CapturedOutput> {
        log::debug!("> {command}");
        let output = Self::command(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        Ok(CapturedOutput {
            outcome: CommandOutcome::from(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}
