//! # JesnZIP tray builder
//!
//! Reproducible build of the JesnZIP tray agent.
//!
//! The crate drives a strictly sequential pipeline:
//!
//! - **Environment**: create or reuse an isolated virtual environment in `.venv_build`
//! - **Dependencies**: upgrade pip tooling, install the pinned `requirements.txt`
//! - **Hygiene**: uninstall packages that are known to break PyInstaller
//! - **Packaging**: single-file, windowed PyInstaller build of `JesnZIP-tray.py`
//! - **Archiving**: zip the executable into `JesnZIP-tray-<YYYYMMDDHHmm>.zip`
//!
//! ## Usage
//!
//! ```bash
//! cd TrayAgent
//! jesnzip_tray_builder
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod error;
pub mod pipeline;

// Re-export main types for public API
pub use cli::Args;
pub use error::{PipelineError, Result};
pub use pipeline::{Orchestrator, PipelineReport, PipelineState, ProjectLayout};
