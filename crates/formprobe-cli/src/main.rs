//! Formprobe CLI: replay recorded browser form checks
//!
//! ## Usage
//!
//! ```bash
//! formprobe run                              # Built-in short-name check
//! formprobe run check.yaml --no-sandbox      # Recorded scenario file
//! formprobe validate check.yaml              # Parse and validate only
//! formprobe export --format json             # Print the built-in scenario
//! ```

use clap::Parser;
use formprobe::Scenario;
use formprobe_cli::{
    logging, render_report, render_scenario, render_validation, runner, Cli, CliConfig,
    CliError, CliResult, ColorChoice, Commands, ExportArgs, RunArgs, ValidateArgs, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::ScenarioFailed { .. }) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init_logging(&config)?;

    match cli.command {
        Commands::Run(args) => run_scenario(&config, &args),
        Commands::Validate(args) => run_validate(&config, &args),
        Commands::Export(args) => run_export(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.clone().into();
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
        .with_color(color)
        .with_log_json(cli.log_json)
}

fn run_scenario(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let scenario = runner::load_scenario(args)?;
    let runner_config = runner::runner_config(args);
    let browser_config = runner::browser_config(args);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::config(format!("Failed to create tokio runtime: {e}")))?;
    let report = rt.block_on(runner::run_in_browser(
        &scenario,
        runner_config,
        browser_config,
    ))?;

    println!(
        "{}",
        render_report(&report, args.format, config.color.should_color())?
    );
    if report.outcome.is_passed() {
        Ok(())
    } else {
        Err(CliError::scenario_failed(report.title))
    }
}

fn run_validate(config: &CliConfig, args: &ValidateArgs) -> CliResult<()> {
    let scenario = Scenario::load(&args.scenario)?;
    if !config.verbosity.is_quiet() {
        println!(
            "{}",
            render_validation(&scenario, config.color.should_color())
        );
    }
    Ok(())
}

fn run_export(args: &ExportArgs) -> CliResult<()> {
    let scenario = Scenario::short_name_form(&args.base_url);
    println!("{}", render_scenario(&scenario, args.format)?.trim_end());
    Ok(())
}
