//! Dependency installation into the build environment.

use crate::error::{PipelineError, Result};
use crate::pipeline::layout::ProjectLayout;
use crate::pipeline::process::CommandSpec;
use crate::pipeline::stage::{BuildContext, PipelineState, Stage};
use std::path::{Path, PathBuf};

/// Baseline packages upgraded before the manifest is installed
pub const BASELINE_PACKAGES: &[&str] = &["pip", "setuptools", "wheel"];

/// Pinned requirements, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyManifest {
    path: PathBuf,
    requirements: Vec<String>,
}

impl DependencyManifest {
    /// Read the manifest, skipping blank lines and comments
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| PipelineError::ManifestUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::parse(path, &contents))
    }

    fn parse(path: &Path, contents: &str) -> Self {
        let requirements = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        Self {
            path: path.to_path_buf(),
            requirements,
        }
    }

    /// Manifest location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Requirement specifiers
    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }
}

/// Upgrades pip tooling, then installs the manifest.
#[derive(Debug, Clone)]
pub struct DependencyInstaller {
    manifest: PathBuf,
}

impl DependencyInstaller {
    /// Installer for the layout's manifest
    pub fn new(layout: &ProjectLayout) -> Self {
        Self {
            manifest: layout.manifest(),
        }
    }

    fn pip(python: &Path) -> CommandSpec {
        CommandSpec::new(python).args(["-m", "pip"])
    }
}

impl Stage for DependencyInstaller {
    fn name(&self) -> &'static str {
        "dependencies"
    }

    fn completes(&self) -> PipelineState {
        PipelineState::DependenciesReady
    }

    fn execute(&self, ctx: &mut BuildContext<'_>) -> Result<()> {
        let python = ctx.interpreter()?.to_path_buf();

        log::info!("Upgrading {} in venv", BASELINE_PACKAGES.join("/"));
        let upgrade = Self::pip(&python)
            .args(["install", "--upgrade"])
            .args(BASELINE_PACKAGES.iter().copied());
        let outcome = ctx.run(&upgrade)?;
        if !outcome.is_success() {
            return Err(PipelineError::ToolchainUpgrade {
                code: outcome.code(),
            });
        }

        let manifest = DependencyManifest::load(&self.manifest)?;
        log::info!(
            "Installing {} requirement(s) from {}",
            manifest.requirements().len(),
            manifest.path().display()
        );
        let install = Self::pip(&python).args(["install", "-r"]).arg(manifest.path());
        let outcome = ctx.run(&install)?;
        if !outcome.is_success() {
            return Err(PipelineError::RequirementsInstall {
                manifest: manifest.path().to_path_buf(),
                code: outcome.code(),
            });
        }

        Ok(())
    }
}
