//! Build pipeline for the JesnZIP tray agent.
//!
//! The pipeline turns `JesnZIP-tray.py` into a single windowed executable and
//! archives it:
//!
//! 1. [`EnvironmentProvisioner`] creates or reuses `.venv_build`
//! 2. [`DependencyInstaller`] upgrades pip tooling and installs `requirements.txt`
//! 3. [`BlacklistSanitizer`] removes packages that break PyInstaller (never fatal)
//! 4. [`PackagingStage`] runs PyInstaller through a [`PackagerInvoker`]
//! 5. [`ArtifactLocator`] finds the executable in `dist`
//! 6. [`ArchiveStage`] writes `JesnZIP-tray-<YYYYMMDDHHmm>.zip`
//!
//! Stages are plain values behind the [`Stage`] trait. The [`Orchestrator`] walks the
//! list, moving through [`PipelineState`]s, and stops at the first error.
//!
//! ```no_run
//! use jesnzip_tray_builder::cli::OutputManager;
//! use jesnzip_tray_builder::pipeline::{Orchestrator, ProjectLayout};
//!
//! let layout = ProjectLayout::new(std::env::current_dir()?);
//! let mut orchestrator = Orchestrator::system(layout, OutputManager::new(false));
//! let report = orchestrator.run();
//! std::process::exit(report.exit_code());
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod archive;
pub mod artifact;
pub mod dependencies;
pub mod environment;
pub mod layout;
pub mod packager;
pub mod process;
pub mod sanitize;
pub mod stage;

pub use archive::{Archive, ArchiveStage, Archiver, Clock, local_now};
pub use artifact::{Artifact, ArtifactLocator};
pub use dependencies::{DependencyInstaller, DependencyManifest};
pub use environment::{BaseInterpreter, EnvironmentProvisioner, find_base_interpreter};
pub use layout::ProjectLayout;
pub use packager::{Invocation, PackagerInvoker, PackagingRequest, PackagingStage};
pub use process::{CapturedOutput, CommandOutcome, CommandRunner, CommandSpec, SystemRunner};
pub use sanitize::{BlacklistSanitizer, SanitizeOutcome, SanitizeReport};
pub use stage::{BuildContext, PipelineState, Stage};

use crate::cli::OutputManager;
use crate::error::PipelineError;

/// The stages of a full build, in order, naming the archive from `clock`.
pub fn default_stages(layout: &ProjectLayout, clock: Clock) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(EnvironmentProvisioner::new(layout)),
        Box::new(DependencyInstaller::new(layout)),
        Box::new(BlacklistSanitizer::default()),
        Box::new(PackagingStage::new(layout)),
        Box::new(ArtifactLocator::from(layout)),
        Box::new(ArchiveStage::new(layout).with_clock(clock)),
    ]
}

/// Result of one pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
    /// Final state
    pub state: PipelineState,
    /// Every state entered, starting at [`PipelineState::Init`]
    pub history: Vec<PipelineState>,
    /// Stage that failed, if any
    pub failed_stage: Option<&'static str>,
    /// Error that stopped the run, if any
    pub error: Option<PipelineError>,
    /// Strategy the packaging stage used
    pub invocation: Option<Invocation>,
    /// Blacklist cleanup outcome
    pub sanitize_report: Option<SanitizeReport>,
    /// Written archive
    pub archive: Option<Archive>,
    /// Non-fatal conditions
    pub warnings: Vec<String>,
}

impl PipelineReport {
    /// Whether the run reached [`PipelineState::Done`]
    pub fn is_success(&self) -> bool {
        self.state == PipelineState::Done
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> i32 {
        match &self.error {
            Some(error) => error.exit_code(),
            None if self.is_success() => 0,
            None => crate::error::LOCAL_FAILURE_EXIT_CODE,
        }
    }
}

/// Drives the stages of a build in order.
pub struct Orchestrator<R: CommandRunner> {
    layout: ProjectLayout,
    runner: R,
    stages: Vec<Box<dyn Stage>>,
    output: OutputManager,
}

impl Orchestrator<SystemRunner> {
    /// Orchestrator spawning real processes
    pub fn system(layout: ProjectLayout, output: OutputManager) -> Self {
        Self::new(layout, SystemRunner, output)
    }
}

impl<R: CommandRunner> Orchestrator<R> {
    /// Orchestrator with the default stage list
    pub fn new(layout: ProjectLayout, runner: R, output: OutputManager) -> Self {
        let stages = default_stages(&layout, local_now);
        Self {
            layout,
            runner,
            stages,
            output,
        }
    }

    /// Name the archive from `clock` instead of the local time
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.stages = default_stages(&self.layout, clock);
        self
    }

    /// Consume the orchestrator, returning its command runner
    pub fn into_runner(self) -> R {
        self.runner
    }

    /// Run every stage in order, stopping at the first failure.
    pub fn run(&mut self) -> PipelineReport {
        let output = &self.output;
        let mut ctx = BuildContext::new(&self.layout, &mut self.runner);

        let mut state = PipelineState::Init;
        let mut history = vec![state];
        let mut failed_stage = None;
        let mut error = None;

        for stage in &self.stages {
            output.section(stage.name());
            match stage.execute(&mut ctx) {
                Ok(()) => {
                    state = stage.completes();
                    history.push(state);
                    log::debug!("pipeline state -> {state}");
                }
                Err(e) => {
                    log::error!("Stage '{}' failed: {e}", stage.name());
                    state = PipelineState::Failed;
                    history.push(state);
                    failed_stage = Some(stage.name());
                    error = Some(e);
                    break;
                }
            }
        }

        if error.is_none() && ctx.archive.is_some() {
            state = PipelineState::Done;
            history.push(state);
        }

        PipelineReport {
            state,
            history,
            failed_stage,
            error,
            invocation: ctx.invocation,
            sanitize_report: ctx.sanitize_report,
            archive: ctx.archive,
            warnings: ctx.warnings,
        }
    }
}
