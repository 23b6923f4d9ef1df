//! Formprobe CLI Library
//!
//! Command-line interface for replaying recorded form checks.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
pub mod runner;

pub use commands::{
    Cli, ColorArg, Commands, ExportArgs, ExportFormat, ReportFormat, RunArgs, ValidateArgs,
    DEFAULT_BASE_URL,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_report, render_scenario, render_validation};
