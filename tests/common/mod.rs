//! Scripted command runner and project fixtures for pipeline tests.

#![allow(dead_code)]

use jesnzip_tray_builder::pipeline::{
    CapturedOutput, CommandOutcome, CommandRunner, CommandSpec, ProjectLayout,
};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use tempfile::TempDir;

/// Which pipeline step a command belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Probe,
    CreateEnv,
    Upgrade,
    Install,
    Show,
    Uninstall,
    Package,
    Other,
}

impl Step {
    pub fn of(spec: &CommandSpec) -> Self {
        if spec.has_arg("-c") {
            Step::Probe
        } else if spec.has_arg("venv") {
            Step::CreateEnv
        } else if spec.has_arg("--upgrade") {
            Step::Upgrade
        } else if spec.has_arg("-r") {
            Step::Install
        } else if spec.has_arg("show") {
            Step::Show
        } else if spec.has_arg("uninstall") {
            Step::Uninstall
        } else if spec.has_arg("--onefile") {
            Step::Package
        } else {
            Step::Other
        }
    }
}

/// Runner that records every command and simulates the tools' side effects.
pub struct FakeRunner {
    layout: ProjectLayout,
    /// Every command passed to `run` or `capture`, in order
    pub calls: Vec<CommandSpec>,
    /// Programs resolvable on PATH
    pub on_path: Vec<String>,
    /// Version reported per interpreter command prefix, e.g. `"py -3.9"`
    pub versions: HashMap<String, String>,
    /// Packages `pip show` reports as installed
    pub installed: Vec<String>,
    /// Exit codes to return instead of success
    pub exit_codes: HashMap<Step, i32>,
    /// Steps whose command cannot be spawned
    pub spawn_errors: Vec<Step>,
    /// Whether a successful PyInstaller run writes `dist/JesnZIP-tray.exe`
    pub produces_output: bool,
}

impl FakeRunner {
    /// Runner where `py -3.9` is available and every tool succeeds
    pub fn new(layout: &ProjectLayout) -> Self {
        Self {
            layout: layout.clone(),
            calls: Vec::new(),
            on_path: vec!["py".to_string()],
            versions: HashMap::from([("py -3.9".to_string(), "3.9".to_string())]),
            installed: Vec::new(),
            exit_codes: HashMap::new(),
            spawn_errors: Vec::new(),
            produces_output: true,
        }
    }

    pub fn fail(mut self, step: Step, code: i32) -> Self {
        self.exit_codes.insert(step, code);
        self
    }

    pub fn with_installed(mut self, package: &str) -> Self {
        self.installed.push(package.to_string());
        self
    }

    pub fn count(&self, step: Step) -> usize {
        self.calls.iter().filter(|c| Step::of(c) == step).count()
    }

    pub fn calls_of(&self, step: Step) -> Vec<&CommandSpec> {
        self.calls.iter().filter(|c| Step::of(c) == step).collect()
    }

    fn interpreter_key(spec: &CommandSpec) -> String {
        let mut parts = vec![spec.program().display().to_string()];
        parts.extend(
            spec.arguments()
                .iter()
                .take_while(|a| *a != "-c")
                .map(|a| a.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }

    fn simulate(&mut self, spec: &CommandSpec) -> io::Result<CommandOutcome> {
        self.calls.push(spec.clone());
        let step = Step::of(spec);

        if self.spawn_errors.contains(&step) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "program not found"));
        }
        if let Some(code) = self.exit_codes.get(&step) {
            return Ok(CommandOutcome::from_code(*code));
        }

        match step {
            Step::CreateEnv => touch(&self.layout.env_python()),
            Step::Show => {
                let package = last_arg(spec);
                if !self.installed.contains(&package) {
                    return Ok(CommandOutcome::from_code(1));
                }
            }
            Step::Uninstall => {
                let package = last_arg(spec);
                self.installed.retain(|p| *p != package);
            }
            Step::Package if self.produces_output => {
                touch(&self.layout.output_dir().join("JesnZIP-tray.exe"));
            }
            _ => {}
        }
        Ok(CommandOutcome::success())
    }
}

impl CommandRunner for FakeRunner {
    fn run(&mut self, command: &CommandSpec) -> io::Result<CommandOutcome> {
        self.simulate(command)
    }

    fn capture(&mut self, command: &CommandSpec) -> io::Result<CapturedOutput> {
        let outcome = self.simulate(command)?;
        match self.versions.get(&Self::interpreter_key(command)) {
            Some(version) => Ok(CapturedOutput {
                outcome,
                stdout: format!("{version}\n"),
            }),
            None => Ok(CapturedOutput {
                outcome: CommandOutcome::from_code(103),
                stdout: String::new(),
            }),
        }
    }

    fn is_available(&self, program: &Path) -> bool {
        self.on_path.iter().any(|p| Path::new(p) == program)
    }
}

fn last_arg(spec: &CommandSpec) -> String {
    spec.arguments()
        .last()
        .map(|a| a.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn touch(path: &Path) {
    fs::create_dir_all(path.parent().expect("path has a parent")).expect("create parent dirs");
    fs::write(path, b"MZ").expect("write file");
}

/// Tray agent sources in a scratch directory
pub fn project(with_icon: bool) -> (TempDir, ProjectLayout) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let layout = ProjectLayout::new(temp_dir.path());
    fs::write(layout.entry_point(), "print('tray')\n").expect("write entry point");
    fs::write(layout.manifest(), "pystray==0.19.5\nrequests\n").expect("write manifest");
    if with_icon {
        fs::write(layout.icon(), [0u8, 0, 1, 0]).expect("write icon");
    }
    (temp_dir, layout)
}

/// Same as [`project`], with an already provisioned environment
pub fn project_with_env(with_icon: bool) -> (TempDir, ProjectLayout) {
    let (temp_dir, layout) = project(with_icon);
    touch(&layout.env_python());
    (temp_dir, layout)
}

/// Archives written to the project root
pub fn zips_in(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root)
        .expect("read root")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".zip"))
        .collect();
    names.sort();
    names
}
