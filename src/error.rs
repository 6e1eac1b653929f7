//! Error types for the tray agent build pipeline.
//!
//! Every fatal pipeline condition is a variant of [`PipelineError`]. Each variant knows the
//! process exit code it maps to and can suggest how to recover.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Exit code used for conditions detected locally, without a subprocess exit code.
pub const LOCAL_FAILURE_EXIT_CODE: i32 = 1;

/// Fatal errors raised by pipeline stages
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No system interpreter could be found to create the build environment
    #[error("No usable Python 3 interpreter found (tried: {tried})")]
    BaseInterpreterNotFound {
        /// Candidate commands that were probed
        tried: String,
    },

    /// Environment creation subprocess exited non-zero
    #[error("Creating build environment at {path} failed with exit code {code}")]
    EnvironmentCreation {
        /// Environment directory
        path: PathBuf,
        /// Subprocess exit code
        code: i32,
    },

    /// Environment interpreter missing after creation or reuse
    #[error("Build environment interpreter not found at {path}")]
    EnvironmentNotFound {
        /// Expected interpreter path
        path: PathBuf,
    },

    /// Upgrading pip/setuptools/wheel failed
    #[error("Upgrading baseline tooling in the build environment failed with exit code {code}")]
    ToolchainUpgrade {
        /// Subprocess exit code
        code: i32,
    },

    /// Dependency manifest could not be read
    #[error("Failed to read dependency manifest {path}: {source}")]
    ManifestUnreadable {
        /// Manifest path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Installing the dependency manifest failed
    #[error("Installing requirements from {manifest} failed with exit code {code}")]
    RequirementsInstall {
        /// Manifest path
        manifest: PathBuf,
        /// Subprocess exit code
        code: i32,
    },

    /// Entry point to package is missing
    #[error("Entry point {path} not found")]
    EntryPointMissing {
        /// Expected entry point path
        path: PathBuf,
    },

    /// Packaging tool exited non-zero
    #[error("PyInstaller failed with exit code {code}")]
    Packaging {
        /// Subprocess exit code
        code: i32,
    },

    /// Packaging reported success but left no output directory
    #[error("Output directory {path} not found; PyInstaller may have failed")]
    OutputDirectoryMissing {
        /// Expected output directory
        path: PathBuf,
    },

    /// No executable found in the output directory
    #[error("No executable found in {dir}; build may have failed")]
    NoArtifactFound {
        /// Scanned output directory
        dir: PathBuf,
    },

    /// Writing the release archive failed
    #[error("Failed to create archive {path}: {source}")]
    ArchiveCreation {
        /// Archive path
        path: PathBuf,
        /// Underlying zip or I/O error
        #[source]
        source: zip::result::ZipError,
    },

    /// A subprocess could not be started at all
    #[error("Failed to run command {command}: {error}")]
    CommandSpawnFailed {
        /// Rendered command line
        command: String,
        /// The underlying error
        error: std::io::Error,
    },
}

impl PipelineError {
    /// Exit code the process should terminate with for this error.
    ///
    /// Subprocess failures propagate the child's code; everything else is
    /// [`LOCAL_FAILURE_EXIT_CODE`].
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::EnvironmentCreation { code, .. }
            | PipelineError::ToolchainUpgrade { code }
            | PipelineError::RequirementsInstall { code, .. }
            | PipelineError::Packaging { code } => *code,
            _ => LOCAL_FAILURE_EXIT_CODE,
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PipelineError::BaseInterpreterNotFound { .. } => vec![
                "Install Python 3.9 and make sure `py` or `python` is on PATH".to_string(),
            ],
            PipelineError::EnvironmentCreation { path, .. }
            | PipelineError::EnvironmentNotFound { path } => vec![
                format!("Delete {} and run the build again", path.display()),
                "Check that the base interpreter ships the venv module".to_string(),
            ],
            PipelineError::ToolchainUpgrade { .. } | PipelineError::RequirementsInstall { .. } => {
                vec![
                    "Check network access to the package index".to_string(),
                    "Review the pip output above for the failing requirement".to_string(),
                ]
            }
            PipelineError::ManifestUnreadable { path, .. } => vec![format!(
                "Place requirements.txt at {}",
                path.display()
            )],
            PipelineError::EntryPointMissing { path } => vec![format!(
                "Run the build from the directory containing {}",
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            )],
            PipelineError::Packaging { .. }
            | PipelineError::OutputDirectoryMissing { .. }
            | PipelineError::NoArtifactFound { .. } => vec![
                "Review the PyInstaller output above".to_string(),
                "Remove the build/ and dist/ directories and retry".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
