//! Command line interface for the tray agent build.

mod args;
mod output;

pub use args::{Args, RuntimeConfig};
pub use output::OutputManager;

use crate::pipeline::{Orchestrator, PipelineReport, ProjectLayout};

/// Main CLI entry point; returns the process exit code
pub fn run() -> i32 {
    let args = Args::parse_args();
    let config = RuntimeConfig::from(&args);
    execute(&config)
}

/// Run the build in the current directory
pub fn execute(config: &RuntimeConfig) -> i32 {
    let root = match std::env::current_dir() {
        Ok(root) => root,
        Err(e) => {
            config
                .output()
                .error(&format!("Cannot determine working directory: {e}"));
            return crate::error::LOCAL_FAILURE_EXIT_CODE;
        }
    };

    config
        .output()
        .info(&format!("Building JesnZIP tray agent in {}", root.display()));

    let mut orchestrator = Orchestrator::system(ProjectLayout::new(root), config.output().clone());
    let report = orchestrator.run();
    print_summary(config.output(), &report);
    report.exit_code()
}

/// Print the outcome of a run
pub fn print_summary(output: &OutputManager, report: &PipelineReport) {
    output.println("");
    for warning in &report.warnings {
        output.warn(warning);
    }

    match (&report.error, &report.archive) {
        (Some(error), _) => {
            output.error(&format!(
                "Build failed in stage '{}': {error}",
                report.failed_stage.unwrap_or("unknown")
            ));
            let suggestions = error.recovery_suggestions();
            if !suggestions.is_empty() {
                output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    output.indent(&suggestion);
                }
            }
        }
        (None, Some(archive)) => {
            output.success(&format!("Built and zipped: {}", archive.path.display()));
            output.indent(&format!("{} ({} bytes)", archive.entry_name, archive.size));
            output.indent(&format!("SHA-256: {}", archive.checksum));
        }
        (None, None) => {
            output.error(&format!("Build stopped in state '{}' without an archive", report.state));
        }
    }
}
