//! Command line argument parsing.
//!
//! The build takes no arguments: it runs from the directory holding the tray agent
//! sources. `clap` still provides `--help` and `--version`.

use clap::Parser;

/// Build the JesnZIP tray agent into a single executable and archive it
#[derive(Parser, Debug, Default)]
#[command(
    name = "jesnzip_tray_builder",
    version,
    about = "Build the JesnZIP tray agent into a single executable and archive it",
    long_about = "Build the JesnZIP tray agent into a single windowed executable.

Run from the TrayAgent directory. The build:
  - creates (or reuses) a virtual environment in .venv_build
  - upgrades pip/setuptools/wheel and installs requirements.txt
  - removes packages known to break PyInstaller
  - runs PyInstaller on JesnZIP-tray.py (embedding ICON.ico when present)
  - zips dist/*.exe into JesnZIP-tray-<YYYYMMDDHHmm>.zip

Set RUST_LOG=debug for detailed diagnostics."
)]
pub struct Args {}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new() -> Self {
        Self {
            output: super::OutputManager::new(false),
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(_args: &Args) -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_rejects_positional_arguments() {
        assert!(Args::try_parse_from(["jesnzip_tray_builder", "extra"]).is_err());
        assert!(Args::try_parse_from(["jesnzip_tray_builder"]).is_ok());
    }
}
