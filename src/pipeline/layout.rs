//! Fixed filesystem conventions of the build.
//!
//! Nothing here is user-configurable: every path is derived from the root the
//! pipeline runs in.

use std::path::{Path, PathBuf};

/// Name used for the archive and the packaged application
pub const APP_NAME: &str = "JesnZIP-tray";
/// Build environment directory, relative to the root
pub const ENV_DIR_NAME: &str = ".venv_build";
/// Entry point handed to the packaging tool
pub const ENTRY_POINT_NAME: &str = "JesnZIP-tray.py";
/// Optional application icon
pub const ICON_NAME: &str = "ICON.ico";
/// Pinned dependency manifest
pub const MANIFEST_NAME: &str = "requirements.txt";
/// Directory PyInstaller writes its products to
pub const OUTPUT_DIR_NAME: &str = "dist";
/// Extension of the produced executable
pub const ARTIFACT_EXTENSION: &str = "exe";

/// Packages known to break PyInstaller when present in the environment
pub const BLACKLIST: &[&str] = &["typing", "pathlib"];

#[cfg(windows)]
const ENV_BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
const ENV_BIN_DIR: &str = "bin";

#[cfg(windows)]
const EXE_SUFFIX: &str = ".exe";
#[cfg(not(windows))]
const EXE_SUFFIX: &str = "";

/// Paths of everything the pipeline reads or writes, resolved against a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Layout rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Repository root; the archive is written here
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build environment directory
    pub fn env_dir(&self) -> PathBuf {
        self.root.join(ENV_DIR_NAME)
    }

    /// Interpreter inside the build environment
    pub fn env_python(&self) -> PathBuf {
        self.env_dir()
            .join(ENV_BIN_DIR)
            .join(format!("python{EXE_SUFFIX}"))
    }

    /// Console entry point PyInstaller installs into the environment
    pub fn env_pyinstaller(&self) -> PathBuf {
        self.env_dir()
            .join(ENV_BIN_DIR)
            .join(format!("pyinstaller{EXE_SUFFIX}"))
    }

    /// Application entry point
    pub fn entry_point(&self) -> PathBuf {
        self.root.join(ENTRY_POINT_NAME)
    }

    /// Application icon, which may not exist
    pub fn icon(&self) -> PathBuf {
        self.root.join(ICON_NAME)
    }

    /// Dependency manifest
    pub fn manifest(&self) -> PathBuf {
        self.root.join(MANIFEST_NAME)
    }

    /// PyInstaller output directory
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_rooted() {
        let layout = ProjectLayout::new("/work/TrayAgent");
        assert_eq!(layout.env_dir(), Path::new("/work/TrayAgent/.venv_build"));
        assert_eq!(layout.output_dir(), Path::new("/work/TrayAgent/dist"));
        assert!(layout.env_python().starts_with(layout.env_dir()));
        assert!(layout.env_pyinstaller().starts_with(layout.env_dir()));
        assert_eq!(
            layout.entry_point().file_name().and_then(|n| n.to_str()),
            Some(ENTRY_POINT_NAME)
        );
    }
}
