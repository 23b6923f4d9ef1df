//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default origin of the form under test
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5500";

/// Formprobe: replay recorded browser form checks
#[derive(Parser, Debug)]
#[command(name = "formprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario in Chromium (the built-in short-name check by default)
    Run(RunArgs),

    /// Parse and validate a scenario file
    Validate(ValidateArgs),

    /// Print the built-in short-name scenario
    Export(ExportArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Scenario file (YAML, or JSON with a `.json` extension)
    pub scenario: Option<PathBuf>,

    /// Origin serving the form; used by the built-in scenario
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "FORMPROBE_BASE_URL")]
    pub base_url: String,

    /// Directory receiving `passed/` and `failed/` screenshots
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Element wait budget in milliseconds (overrides the scenario)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Skip recorded settle and final delays
    #[arg(long)]
    pub no_settle: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the Chromium sandbox (containers/CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Path to the Chromium binary
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<String>,

    /// Initial browser window width
    #[arg(long, default_value_t = 800)]
    pub window_width: u32,

    /// Initial browser window height
    #[arg(long, default_value_t = 600)]
    pub window_height: u32,

    /// User agent override
    #[arg(long, env = "FORMPROBE_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Report format
    #[arg(short, long, default_value = "text")]
    pub format: ReportFormat,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Scenario file to check
    pub scenario: PathBuf,
}

/// Arguments for the export command
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Output format
    #[arg(short, long, default_value = "yaml")]
    pub format: ExportFormat,

    /// Origin serving the form
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

/// Run report format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

/// Scenario export format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// YAML
    #[default]
    Yaml,
    /// JSON
    Json,
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
