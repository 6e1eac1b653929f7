//! Stage abstraction shared by every pipeline step.

use crate::error::{PipelineError, Result};
use crate::pipeline::archive::Archive;
use crate::pipeline::artifact::Artifact;
use crate::pipeline::layout::ProjectLayout;
use crate::pipeline::packager::Invocation;
use crate::pipeline::process::{CommandOutcome, CommandRunner, CommandSpec};
use crate::pipeline::sanitize::SanitizeReport;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;

/// Orchestrator states, in the order a successful run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Nothing has run yet
    Init,
    /// Build environment exists and has an interpreter
    EnvironmentReady,
    /// Baseline tooling upgraded and manifest installed
    DependenciesReady,
    /// Blacklist cleanup attempted
    Sanitized,
    /// Packaging tool exited zero
    Packaged,
    /// Produced executable located
    ArtifactFound,
    /// Archive written
    Archived,
    /// Run completed
    Done,
    /// A stage failed; terminal
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Init => "init",
            PipelineState::EnvironmentReady => "environment-ready",
            PipelineState::DependenciesReady => "dependencies-ready",
            PipelineState::Sanitized => "sanitized",
            PipelineState::Packaged => "packaged",
            PipelineState::ArtifactFound => "artifact-found",
            PipelineState::Archived => "archived",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Mutable state threaded through the stages of one run.
pub struct BuildContext<'a> {
    /// Fixed filesystem conventions
    pub layout: &'a ProjectLayout,
    /// Executes every subprocess of the run
    pub runner: &'a mut dyn CommandRunner,
    /// Interpreter of the build environment
    pub interpreter: Option<PathBuf>,
    /// Packaging strategy chosen by the capability probe
    pub invocation: Option<Invocation>,
    /// Outcome of blacklist cleanup
    pub sanitize_report: Option<SanitizeReport>,
    /// Located executable
    pub artifact: Option<Artifact>,
    /// Written archive
    pub archive: Option<Archive>,
    /// Non-fatal conditions collected along the way
    pub warnings: Vec<String>,
}

impl<'a> BuildContext<'a> {
    /// Fresh context for one run
    pub fn new(layout: &'a ProjectLayout, runner: &'a mut dyn CommandRunner) -> Self {
        Self {
            layout,
            runner,
            interpreter: None,
            invocation: None,
            sanitize_report: None,
            artifact: None,
            archive: None,
            warnings: Vec::new(),
        }
    }

    /// Environment interpreter, which must have been provisioned by an earlier stage
    pub fn interpreter(&self) -> Result<&Path> {
        self.interpreter
            .as_deref()
            .ok_or_else(|| PipelineError::EnvironmentNotFound {
                path: self.layout.env_python(),
            })
    }

    /// Record a non-fatal condition
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.warnings.push(message);
    }

    /// Run a command for a fatal stage; failing to spawn it is itself fatal
    pub fn run(&mut self, command: &CommandSpec) -> Result<CommandOutcome> {
        self.runner
            .run(command)
            .map_err(|error| PipelineError::CommandSpawnFailed {
                command: command.to_string(),
                error,
            })
    }
}

/// One step of the pipeline.
pub trait Stage {
    /// Short name for progress output
    fn name(&self) -> &'static str;

    /// State the orchestrator enters once this stage succeeds
    fn completes(&self) -> PipelineState;

    /// Perform the stage, blocking until any subprocess finishes
    fn execute(&self, ctx: &mut BuildContext<'_>) -> Result<()>;
}
