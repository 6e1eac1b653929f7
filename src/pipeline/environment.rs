//! Build environment provisioning.
//!
//! The environment directory is created once and reused on every later run. Its
//! contents are never validated beyond the presence of the interpreter.

use crate::error::{PipelineError, Result};
use crate::pipeline::layout::ProjectLayout;
use crate::pipeline::process::{CommandRunner, CommandSpec};
use crate::pipeline::stage::{BuildContext, PipelineState, Stage};
use std::path::{Path, PathBuf};

/// Version the packaged application targets
pub const PREFERRED_VERSION: &str = "3.9";

/// System interpreters tried, in order, when the environment must be created.
const CANDIDATES: &[(&str, &[&str])] = &[
    ("py", &["-3.9"]),
    ("py", &["-3.10"]),
    ("py", &["-3"]),
    ("python", &[]),
    ("python3", &[]),
];

const VERSION_PROBE: &str = "import sys; print('%d.%d' % sys.version_info[:2])";

/// A system interpreter able to create the build environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseInterpreter {
    program: String,
    leading_args: Vec<String>,
    version: String,
}

impl BaseInterpreter {
    /// `major.minor` reported by the interpreter
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Command prefix invoking this interpreter
    pub fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.program).args(&self.leading_args)
    }
}

/// Probe the candidate interpreters once each and pick one.
///
/// The preferred version wins outright; otherwise the first Python 3 found is
/// used with a warning.
pub fn find_base_interpreter(runner: &mut dyn CommandRunner) -> Result<BaseInterpreter> {
    let mut fallback: Option<BaseInterpreter> = None;

    for &(program, leading_args) in CANDIDATES {
        if !runner.is_available(Path::new(program)) {
            log::debug!("{program} not found on PATH");
            continue;
        }

        let probe = CommandSpec::new(program)
            .args(leading_args.iter().copied())
            .args(["-c", VERSION_PROBE]);
        let output = match runner.capture(&probe) {
            Ok(output) if output.outcome.is_success() => output,
            Ok(output) => {
                log::debug!("{probe} exited with code {}", output.outcome.code());
                continue;
            }
            Err(e) => {
                log::debug!("{probe} could not be started: {e}");
                continue;
            }
        };

        let candidate = BaseInterpreter {
            program: program.to_string(),
            leading_args: leading_args.iter().map(|a| (*a).to_string()).collect(),
            version: output.stdout.trim().to_string(),
        };

        if candidate.version == PREFERRED_VERSION {
            return Ok(candidate);
        }
        if fallback.is_none() && candidate.version.starts_with("3.") {
            fallback = Some(candidate);
        }
    }

    match fallback {
        Some(candidate) => {
            log::warn!(
                "Found Python {} but it's not {PREFERRED_VERSION}. Build may not match target runtime.",
                candidate.version
            );
            Ok(candidate)
        }
        None => Err(PipelineError::BaseInterpreterNotFound {
            tried: CANDIDATES
                .iter()
                .map(|(program, args)| {
                    std::iter::once(*program)
                        .chain(args.iter().copied())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// Creates or reuses the isolated build environment.
#[derive(Debug, Clone)]
pub struct EnvironmentProvisioner {
    env_dir: PathBuf,
    python: PathBuf,
}

impl EnvironmentProvisioner {
    /// Provisioner for the layout's environment directory
    pub fn new(layout: &ProjectLayout) -> Self {
        Self {
            env_dir: layout.env_dir(),
            python: layout.env_python(),
        }
    }

    /// Ensure the environment exists and return its interpreter.
    pub fn provision(&self, ctx: &mut BuildContext<'_>) -> Result<PathBuf> {
        if self.env_dir.exists() {
            log::info!(
                "Using existing virtual environment at {}",
                self.env_dir.display()
            );
        } else {
            let base = find_base_interpreter(&mut *ctx.runner)?;
            log::info!(
                "Creating virtual environment at {} with Python {}",
                self.env_dir.display(),
                base.version()
            );
            let create = base.command().args(["-m", "venv"]).arg(&self.env_dir);
            let outcome = ctx.run(&create)?;
            if !outcome.is_success() {
                return Err(PipelineError::EnvironmentCreation {
                    path: self.env_dir.clone(),
                    code: outcome.code(),
                });
            }
        }

        if !self.python.is_file() {
            return Err(PipelineError::EnvironmentNotFound {
                path: self.python.clone(),
            });
        }
        Ok(self.python.clone())
    }
}

impl Stage for EnvironmentProvisioner {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn completes(&self) -> PipelineState {
        PipelineState::EnvironmentReady
    }

    fn execute(&self, ctx: &mut BuildContext<'_>) -> Result<()> {
        let python = self.provision(ctx)?;
        ctx.interpreter = Some(python);
        Ok(())
    }
}
