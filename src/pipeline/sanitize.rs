//! Best-effort removal of packages that break PyInstaller.
//!
//! Nothing in this stage is fatal. Each blacklist entry gets an outcome in the
//! [`SanitizeReport`]; anything unexpected is turned into a warning and the next
//! entry is processed.

use crate::error::Result;
use crate::pipeline::layout::BLACKLIST;
use crate::pipeline::process::CommandSpec;
use crate::pipeline::stage::{BuildContext, PipelineState, Stage};
use std::path::Path;

/// What happened to one blacklisted package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizeOutcome {
    /// Not installed; nothing to do
    Absent,
    /// Installed and uninstalled
    Removed,
    /// Installed, but uninstall exited non-zero
    UninstallFailed {
        /// Exit code of `pip uninstall`
        code: i32,
    },
    /// The query or the uninstall could not be run
    Errored {
        /// Description of what went wrong
        reason: String,
    },
}

/// Per-package outcomes of a sanitize pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    entries: Vec<(String, SanitizeOutcome)>,
    warnings: Vec<String>,
}

impl SanitizeReport {
    fn record(&mut self, package: &str, outcome: SanitizeOutcome) {
        match &outcome {
            SanitizeOutcome::Absent => {
                log::debug!("{package} not present in venv");
            }
            SanitizeOutcome::Removed => {
                log::info!("Uninstalled incompatible package \"{package}\"");
            }
            SanitizeOutcome::UninstallFailed { code } => {
                self.warnings.push(format!(
                    "Uninstalling \"{package}\" exited with code {code}"
                ));
            }
            SanitizeOutcome::Errored { reason } => {
                self.warnings.push(format!(
                    "Check/uninstall for package {package} failed: {reason}"
                ));
            }
        }
        self.entries.push((package.to_string(), outcome));
    }

    /// Outcome for `package`, if it was processed
    pub fn outcome(&self, package: &str) -> Option<&SanitizeOutcome> {
        self.entries
            .iter()
            .find(|(name, _)| name == package)
            .map(|(_, outcome)| outcome)
    }

    /// Non-fatal problems encountered
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// True when no blacklisted package was installed
    pub fn is_noop(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, outcome)| *outcome == SanitizeOutcome::Absent)
    }
}

/// Removes blacklisted packages from the build environment.
#[derive(Debug, Clone)]
pub struct BlacklistSanitizer {
    packages: Vec<String>,
}

impl Default for BlacklistSanitizer {
    fn default() -> Self {
        Self::new(BLACKLIST.iter().copied())
    }
}

impl BlacklistSanitizer {
    /// Sanitizer for an explicit list of package names
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: packages.into_iter().map(Into::into).collect(),
        }
    }

    /// Query and, when installed, uninstall every blacklisted package.
    pub fn sanitize(&self, python: &Path, ctx: &mut BuildContext<'_>) -> SanitizeReport {
        let mut report = SanitizeReport::default();

        for package in &self.packages {
            let show = CommandSpec::new(python)
                .args(["-m", "pip", "show"])
                .arg(package)
                .discard_output();
            let installed = match ctx.runner.run(&show) {
                Ok(outcome) => outcome.is_success(),
                Err(e) => {
                    report.record(package, SanitizeOutcome::Errored { reason: e.to_string() });
                    continue;
                }
            };
            if !installed {
                report.record(package, SanitizeOutcome::Absent);
                continue;
            }

            log::info!("Found incompatible package \"{package}\" in venv; uninstalling...");
            let uninstall = CommandSpec::new(python)
                .args(["-m", "pip", "uninstall", "-y"])
                .arg(package);
            let outcome = match ctx.runner.run(&uninstall) {
                Ok(outcome) if outcome.is_success() => SanitizeOutcome::Removed,
                Ok(outcome) => SanitizeOutcome::UninstallFailed {
                    code: outcome.code(),
                },
                Err(e) => SanitizeOutcome::Errored { reason: e.to_string() },
            };
            report.record(package, outcome);
        }

        report
    }
}

impl Stage for BlacklistSanitizer {
    fn name(&self) -> &'static str {
        "sanitize"
    }

    fn completes(&self) -> PipelineState {
        PipelineState::Sanitized
    }

    fn execute(&self, ctx: &mut BuildContext<'_>) -> Result<()> {
        let python = ctx.interpreter()?.to_path_buf();
        let report = self.sanitize(&python, ctx);
        if report.is_noop() {
            log::info!("No incompatible packages found in venv");
        }
        for warning in report.warnings() {
            ctx.warn(warning.clone());
        }
        ctx.sanitize_report = Some(report);
        Ok(())
    }
}
