//! Discovery of the executable PyInstaller produced.

use crate::error::{PipelineError, Result};
use crate::pipeline::layout::{ARTIFACT_EXTENSION, ProjectLayout};
use crate::pipeline::stage::{BuildContext, PipelineState, Stage};
use std::path::{Path, PathBuf};

/// The packaged executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub(crate) path: PathBuf,
}

impl Artifact {
    /// Location on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name assigned by the packaging tool
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Finds the produced executable in the output directory.
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    output_dir: PathBuf,
}

impl ArtifactLocator {
    /// Locator scanning `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Every executable in the output directory, sorted by path
    pub fn candidates(&self) -> Result<Vec<PathBuf>> {
        if !self.output_dir.is_dir() {
            return Err(PipelineError::OutputDirectoryMissing {
                path: self.output_dir.clone(),
            });
        }

        let pattern = format!(
            "{}/*.{ARTIFACT_EXTENSION}",
            glob::Pattern::escape(&self.output_dir.to_string_lossy())
        );
        let options = glob::MatchOptions {
            case_sensitive: false,
            ..Default::default()
        };
        let mut candidates: Vec<PathBuf> = match glob::glob_with(&pattern, options) {
            Ok(paths) => paths
                .filter_map(|entry| match entry {
                    Ok(path) => Some(path),
                    Err(e) => {
                        log::warn!("Skipping unreadable entry: {e}");
                        None
                    }
                })
                .filter(|path| path.is_file())
                .collect(),
            Err(e) => {
                log::warn!("Invalid artifact pattern {pattern}: {e}");
                Vec::new()
            }
        };
        candidates.sort();
        Ok(candidates)
    }

    /// Pick the artifact: the first candidate in sorted order.
    ///
    /// Returns the chosen artifact and any other candidates that were passed over.
    pub fn locate(&self) -> Result<(Artifact, Vec<PathBuf>)> {
        let mut candidates = self.candidates()?.into_iter();
        let Some(path) = candidates.next() else {
            return Err(PipelineError::NoArtifactFound {
                dir: self.output_dir.clone(),
            });
        };
        Ok((Artifact { path }, candidates.collect()))
    }
}

impl Stage for ArtifactLocator {
    fn name(&self) -> &'static str {
        "locate"
    }

    fn completes(&self) -> PipelineState {
        PipelineState::ArtifactFound
    }

    fn execute(&self, ctx: &mut BuildContext<'_>) -> Result<()> {
        let (artifact, ignored) = self.locate()?;
        if !ignored.is_empty() {
            let names: Vec<String> = ignored
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            ctx.warn(format!(
                "Multiple executables in {}; using {} and ignoring {}",
                self.output_dir.display(),
                artifact.path().display(),
                names.join(", ")
            ));
        }
        log::info!("Located artifact {}", artifact.path().display());
        ctx.artifact = Some(artifact);
        Ok(())
    }
}

impl From<&ProjectLayout> for ArtifactLocator {
    fn from(layout: &ProjectLayout) -> Self {
        Self::new(layout.output_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_output_directory() {
        let temp_dir = TempDir::new().unwrap();
        let err = ArtifactLocator::new(temp_dir.path().join("dist"))
            .locate()
            .unwrap_err();
        assert!(matches!(err, PipelineError::OutputDirectoryMissing { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_no_executable_in_output() {
        let temp_dir = TempDir::new().unwrap();
        let dist = temp_dir.path().join("dist");
        fs::create_dir(&dist).unwrap();
        fs::write(dist.join("ICON.ico"), "icon").unwrap();
        let err = ArtifactLocator::new(&dist).locate().unwrap_err();
        assert!(matches!(err, PipelineError::NoArtifactFound { .. }));
    }

    #[test]
    fn test_multiple_executables_pick_sorted_first() {
        let temp_dir = TempDir::new().unwrap();
        let dist = temp_dir.path().join("dist");
        fs::create_dir(&dist).unwrap();
        fs::write(dist.join("zz-helper.exe"), "b").unwrap();
        fs::write(dist.join("JesnZIP-tray.exe"), "a").unwrap();
        fs::create_dir(dist.join("nested.exe")).unwrap();

        let (artifact, ignored) = ArtifactLocator::new(&dist).locate().unwrap();
        assert_eq!(artifact.file_name(), "JesnZIP-tray.exe");
        assert_eq!(ignored, vec![dist.join("zz-helper.exe")]);
    }

    #[test]
    fn test_extension_match_ignores_case() {
        let temp_dir = TempDir::new().unwrap();
        let dist = temp_dir.path().join("dist");
        fs::create_dir(&dist).unwrap();
        fs::write(dist.join("JesnZIP-tray.EXE"), "a").unwrap();

        let (artifact, ignored) = ArtifactLocator::new(&dist).locate().unwrap();
        assert_eq!(artifact.file_name(), "JesnZIP-tray.EXE");
        assert!(ignored.is_empty());
    }
}
