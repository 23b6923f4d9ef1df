//! Browser lifecycle around a scenario run

use crate::commands::RunArgs;
use crate::error::CliResult;
use formprobe::{Browser, BrowserConfig, RunReport, RunnerConfig, Scenario, ScenarioRunner};

/// Resolve the scenario named by `args`, or the built-in one
pub fn load_scenario(args: &RunArgs) -> CliResult<Scenario> {
    match &args.scenario {
        Some(path) => Ok(Scenario::load(path)?),
        None => Ok(Scenario::short_name_form(&args.base_url)),
    }
}

/// Runner settings from flags
#[must_use]
pub fn runner_config(args: &RunArgs) -> RunnerConfig {
    let mut config = RunnerConfig::new().with_output_dir(&args.output_dir);
    if let Some(timeout) = args.timeout {
        config = config.with_timeout(timeout);
    }
    if args.no_settle {
        config = config.without_settle();
    }
    config
}

/// Browser settings from flags
#[must_use]
pub fn browser_config(args: &RunArgs) -> BrowserConfig {
    let mut config = BrowserConfig::default()
        .with_headless(!args.headed)
        .with_viewport(args.window_width, args.window_height);
    if args.no_sandbox {
        config = config.with_no_sandbox();
    }
    if let Some(ref path) = args.chromium_path {
        config = config.with_chromium_path(path);
    }
    if let Some(ref ua) = args.user_agent {
        config = config.with_user_agent(ua);
    }
    config
}

/// Launch Chromium, run the scenario on a fresh page and close the browser.
///
/// The browser is closed whether the run succeeds or fails; a close error
/// is only reported when the run itself succeeded.
pub async fn run_in_browser(
    scenario: &Scenario,
    runner: RunnerConfig,
    browser: BrowserConfig,
) -> CliResult<RunReport> {
    let browser = Browser::launch(browser).await?;

    let result = async {
        let page = browser.new_page().await?;
        ScenarioRunner::new(scenario, runner).run(&page).await
    }
    .await;

    let closed = browser.close().await;
    match (result, closed) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(close_err)) => Err(close_err.into()),
        (Err(run_err), closed) => {
            if let Err(close_err) = closed {
                tracing::warn!(%close_err, "failed to close browser");
            }
            Err(run_err.into())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use clap::Parser;
    use std::path::PathBuf;

    fn run_args(argv: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        args
    }

    #[test]
    fn test_builtin_scenario_uses_base_url() {
        let args = run_args(&["formprobe", "run", "--base-url", "http://localhost:9000/"]);
        let scenario = load_scenario(&args).unwrap();
        assert_eq!(scenario.title, "form-test-short-name");
        assert_eq!(
            scenario.steps[1],
            formprobe::Step::Navigate {
                url: "http://localhost:9000/index.html?".into()
            }
        );
    }

    #[test]
    fn test_scenario_file_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("check.json");
        let scenario = Scenario::short_name_form("http://example.test");
        std::fs::write(&path, scenario.to_json().unwrap()).unwrap();

        let args = run_args(&["formprobe", "run", path.to_str().unwrap()]);
        assert_eq!(load_scenario(&args).unwrap(), scenario);
    }

    #[test]
    fn test_runner_config_from_flags() {
        let args = run_args(&[
            "formprobe",
            "run",
            "--output-dir",
            "out",
            "--timeout",
            "1200",
            "--no-settle",
        ]);
        let config = runner_config(&args);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.timeout_ms, Some(1200));
        assert!(!config.settle);
    }

    #[test]
    fn test_browser_config_from_flags() {
        let args = run_args(&[
            "formprobe",
            "run",
            "--headed",
            "--no-sandbox",
            "--chromium-path",
            "/opt/chromium",
        ]);
        let config = browser_config(&args);
        assert!(!config.headless);
        assert!(!config.sandbox);
        assert_eq!(config.chromium_path.as_deref(), Some("/opt/chromium"));
        assert_eq!((config.viewport_width, config.viewport_height), (800, 600));
        assert_eq!(config.user_agent, None);
    }

    #[test]
    fn test_window_size_and_user_agent_flags() {
        let args = run_args(&[
            "formprobe",
            "run",
            "--window-width",
            "1167",
            "--window-height",
            "980",
            "--user-agent",
            "formprobe-check",
        ]);
        let config = browser_config(&args);
        assert_eq!((config.viewport_width, config.viewport_height), (1167, 980));
        assert_eq!(config.user_agent.as_deref(), Some("formprobe-check"));
    }
}
