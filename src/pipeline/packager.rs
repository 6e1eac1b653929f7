//! PyInstaller invocation.
//!
//! The environment is probed once for a PyInstaller console script. The resulting
//! [`Invocation`] is handed to [`PackagerInvoker`], which never probes again.

use crate::error::{PipelineError, Result};
use crate::pipeline::layout::ProjectLayout;
use crate::pipeline::process::CommandSpec;
use crate::pipeline::stage::{BuildContext, PipelineState, Stage};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[cfg(windows)]
const DATA_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const DATA_SEPARATOR: &str = ":";

/// How PyInstaller is launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// The environment's `pyinstaller` console script
    Direct {
        /// Path of the console script
        executable: PathBuf,
    },
    /// `python -m PyInstaller` through the environment interpreter
    Fallback {
        /// Environment interpreter
        python: PathBuf,
    },
}

impl Invocation {
    /// Decide the strategy from what the environment exposes.
    pub fn probe(layout: &ProjectLayout, python: &Path) -> Self {
        let executable = layout.env_pyinstaller();
        if executable.is_file() {
            log::debug!("Using PyInstaller console script {}", executable.display());
            Invocation::Direct { executable }
        } else {
            log::debug!(
                "{} not found; falling back to `python -m PyInstaller`",
                executable.display()
            );
            Invocation::Fallback {
                python: python.to_path_buf(),
            }
        }
    }

    fn command(&self) -> CommandSpec {
        match self {
            Invocation::Direct { executable } => CommandSpec::new(executable),
            Invocation::Fallback { python } => CommandSpec::new(python).args(["-m", "PyInstaller"]),
        }
    }
}

/// What to package and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingRequest {
    entry_point: PathBuf,
    icon: Option<PathBuf>,
    single_file: bool,
    windowed: bool,
}

impl PackagingRequest {
    /// Request for the layout's entry point; the icon is attached only if it exists
    pub fn from_layout(layout: &ProjectLayout) -> Result<Self> {
        let entry_point = layout.entry_point();
        if !entry_point.is_file() {
            return Err(PipelineError::EntryPointMissing { path: entry_point });
        }

        let icon = layout.icon();
        let icon = if icon.is_file() {
            Some(icon)
        } else {
            log::info!("{} not available; continuing without icon", icon.display());
            None
        };

        Ok(Self {
            entry_point,
            icon,
            single_file: true,
            windowed: true,
        })
    }

    /// Script being packaged
    pub fn entry_point(&self) -> &Path {
        &self.entry_point
    }

    /// Icon embedded in the executable, if any
    pub fn icon(&self) -> Option<&Path> {
        self.icon.as_deref()
    }

    /// PyInstaller arguments, entry point last
    pub fn arguments(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--noconfirm".into()];
        if self.single_file {
            args.push("--onefile".into());
        }
        if self.windowed {
            args.push("--windowed".into());
        }
        if let Some(icon) = &self.icon {
            args.push("--icon".into());
            args.push(icon.into());
            // Bundle the icon too so the tray can load it at runtime.
            let mut data = OsString::from(icon.as_os_str());
            data.push(DATA_SEPARATOR);
            data.push(".");
            args.push("--add-data".into());
            args.push(data);
        }
        args.push(self.entry_point.clone().into());
        args
    }
}

/// Runs PyInstaller with a pre-selected [`Invocation`].
#[derive(Debug, Clone)]
pub struct PackagerInvoker {
    invocation: Invocation,
}

impl PackagerInvoker {
    /// Invoker bound to `invocation`
    pub fn new(invocation: Invocation) -> Self {
        Self { invocation }
    }

    /// Full command line for `request`
    pub fn command(&self, request: &PackagingRequest) -> CommandSpec {
        self.invocation.command().args(request.arguments())
    }

    /// Run PyInstaller once.
    pub fn invoke(&self, ctx: &mut BuildContext<'_>, request: &PackagingRequest) -> Result<()> {
        let outcome = ctx.run(&self.command(request))?;
        if !outcome.is_success() {
            return Err(PipelineError::Packaging {
                code: outcome.code(),
            });
        }
        Ok(())
    }
}

/// Stage probing the environment and packaging the entry point.
#[derive(Debug, Clone)]
pub struct PackagingStage {
    layout: ProjectLayout,
}

impl PackagingStage {
    /// Stage for `layout`
    pub fn new(layout: &ProjectLayout) -> Self {
        Self {
            layout: layout.clone(),
        }
    }

    fn copy_icon(&self, icon: &Path, ctx: &mut BuildContext<'_>) {
        let output_dir = self.layout.output_dir();
        if !output_dir.is_dir() {
            return;
        }
        let Some(name) = icon.file_name() else {
            return;
        };
        let dest = output_dir.join(name);
        match std::fs::copy(icon, &dest) {
            Ok(_) => log::info!("Copied icon to {}", dest.display()),
            Err(e) => ctx.warn(format!("Failed to copy icon to {}: {e}", output_dir.display())),
        }
    }
}

impl Stage for PackagingStage {
    fn name(&self) -> &'static str {
        "package"
    }

    fn completes(&self) -> PipelineState {
        PipelineState::Packaged
    }

    fn execute(&self, ctx: &mut BuildContext<'_>) -> Result<()> {
        let request = PackagingRequest::from_layout(&self.layout)?;
        let invocation = Invocation::probe(&self.layout, ctx.interpreter()?);
        ctx.invocation = Some(invocation.clone());

        PackagerInvoker::new(invocation).invoke(ctx, &request)?;

        if let Some(icon) = request.icon() {
            self.copy_icon(icon, ctx);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn layout_with_entry_point() -> (TempDir, ProjectLayout) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let layout = ProjectLayout::new(temp_dir.path());
        fs::write(layout.entry_point(), "print('tray')").unwrap();
        (temp_dir, layout)
    }

    #[test]
    fn test_request_without_icon_omits_icon_flags() {
        let (_temp_dir, layout) = layout_with_entry_point();
        let request = PackagingRequest::from_layout(&layout).unwrap();
        let spec = PackagerInvoker::new(Invocation::Fallback {
            python: layout.env_python(),
        })
        .command(&request);

        assert!(spec.has_arg("--onefile"));
        assert!(spec.has_arg("--windowed"));
        assert!(spec.has_arg("--noconfirm"));
        assert!(!spec.has_arg_prefix("--icon"));
        assert!(!spec.has_arg("--add-data"));
    }

    #[test]
    fn test_request_with_icon_embeds_and_bundles_it() {
        let (_temp_dir, layout) = layout_with_entry_point();
        fs::write(layout.icon(), [0u8; 4]).unwrap();
        let request = PackagingRequest::from_layout(&layout).unwrap();
        let args = request.arguments();

        let icon_at = args.iter().position(|a| a == "--icon").unwrap();
        assert_eq!(args[icon_at + 1], layout.icon().into_os_string());
        let data_at = args.iter().position(|a| a == "--add-data").unwrap();
        assert!(args[data_at + 1].to_string_lossy().ends_with(&format!("{DATA_SEPARATOR}.")));
        assert_eq!(args.last().unwrap(), &layout.entry_point().into_os_string());
    }

    #[test]
    fn test_missing_entry_point() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ProjectLayout::new(temp_dir.path());
        let err = PackagingRequest::from_layout(&layout).unwrap_err();
        assert!(matches!(err, PipelineError::EntryPointMissing { .. }));
    }

    #[test]
    fn test_probe_prefers_console_script() {
        let (_temp_dir, layout) = layout_with_entry_point();
        let python = layout.env_python();
        assert_eq!(
            Invocation::probe(&layout, &python),
            Invocation::Fallback {
                python: python.clone()
            }
        );

        fs::create_dir_all(layout.env_pyinstaller().parent().unwrap()).unwrap();
        fs::write(layout.env_pyinstaller(), "").unwrap();
        assert_eq!(
            Invocation::probe(&layout, &python),
            Invocation::Direct {
                executable: layout.env_pyinstaller()
            }
        );
    }

    #[test]
    fn test_fallback_runs_module_through_interpreter() {
        let (_temp_dir, layout) = layout_with_entry_point();
        let request = PackagingRequest::from_layout(&layout).unwrap();
        let spec = PackagerInvoker::new(Invocation::Fallback {
            python: layout.env_python(),
        })
        .command(&request);
        assert_eq!(spec.program(), layout.env_python());
        assert_eq!(&spec.arguments()[..2], ["-m", "PyInstaller"]);
    }
}
