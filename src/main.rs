//! JesnZIP tray builder - single-file build of the tray agent.
//!
//! Run from the tray agent directory. The process exit code is the exit code of the
//! first failing tool, `1` for locally detected problems, or `0` on success.

use jesnzip_tray_builder::cli;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    process::exit(cli::run());
}
