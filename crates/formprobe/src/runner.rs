//! Scenario execution.
//!
//! Replays a [`Scenario`] against any [`DomDriver`], classifies the run by
//! its text assertion and files the final screenshot under `passed/` or
//! `failed/`.

use crate::driver::DomDriver;
use crate::engine::{ResolveOptions, Resolver};
use crate::result::FormprobeResult;
use crate::scenario::{Scenario, Step};
use crate::selector::SelectorAlternatives;
use crate::wait::{pause, DEFAULT_POLL_INTERVAL_MS};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::time::Instant;

/// Classification of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Assertion held (or there was none)
    Passed,
    /// Observed text differed from the expectation
    Failed,
}

impl Outcome {
    /// Directory the screenshot is written to
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }

    /// Whether the run passed
    #[must_use]
    pub const fn is_passed(self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Directory that receives `passed/` and `failed/`
    pub output_dir: PathBuf,
    /// Element wait budget overriding the scenario's own
    pub timeout_ms: Option<u64>,
    /// Polling interval for element waits
    pub poll_interval_ms: u64,
    /// Honour the scenario's settle and final delays
    pub settle: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            timeout_ms: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            settle: true,
        }
    }
}

impl RunnerConfig {
    /// Create config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Override the element wait budget
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Skip settle and final delays
    #[must_use]
    pub const fn without_settle(mut self) -> Self {
        self.settle = false;
        self
    }
}

/// Result of running one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Scenario title
    pub title: String,
    /// Pass/fail classification
    pub outcome: Outcome,
    /// Expected text, when the scenario asserts one
    pub expected: Option<String>,
    /// Text observed by the assertion (`None` when the element had none)
    pub actual: Option<String>,
    /// Where the screenshot was written
    pub screenshot: PathBuf,
    /// Number of steps executed
    pub steps_executed: usize,
    /// Wall time of the run in milliseconds
    pub elapsed_ms: u64,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({} steps, {}ms)",
            self.title, self.outcome, self.steps_executed, self.elapsed_ms
        )?;
        if self.outcome == Outcome::Failed {
            write!(
                f,
                "\n  expected: {:?}\n  actual:   {:?}",
                self.expected.as_deref().unwrap_or_default(),
                self.actual
            )?;
        }
        write!(f, "\n  screenshot: {}", self.screenshot.display())
    }
}

/// Executes a scenario against a driver
#[derive(Debug)]
pub struct ScenarioRunner<'a> {
    scenario: &'a Scenario,
    config: RunnerConfig,
}

impl<'a> ScenarioRunner<'a> {
    /// Create a runner
    #[must_use]
    pub const fn new(scenario: &'a Scenario, config: RunnerConfig) -> Self {
        Self { scenario, config }
    }

    /// Runner configuration
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions::new()
            .with_timeout(self.config.timeout_ms.unwrap_or(self.scenario.timeout_ms))
            .with_poll_interval(self.config.poll_interval_ms)
    }

    /// Replay every step, then classify and screenshot.
    ///
    /// # Errors
    ///
    /// Any step that cannot complete (element never found, navigation
    /// failure, driver error) aborts the run with that error. No screenshot
    /// is written in that case.
    pub async fn run<D: DomDriver>(&self, driver: &D) -> FormprobeResult<RunReport> {
        self.scenario.validate()?;
        let started = Instant::now();
        let resolver = Resolver::with_options(driver, self.resolve_options());
        let total = self.scenario.steps.len();
        let mut actual = None;

        tracing::info!(title = %self.scenario.title, steps = total, "running scenario");
        for (index, step) in self.scenario.steps.iter().enumerate() {
            tracing::info!(step = index + 1, total, "{step}");
            self.execute(&resolver, driver, step, &mut actual).await?;
            self.settle(self.scenario.settle_ms).await;
        }

        let expected = self
            .scenario
            .assertion()
            .map(|(_, expected)| expected.to_string());
        let outcome = match expected.as_deref() {
            Some(expected) if actual.as_deref() != Some(expected) => Outcome::Failed,
            _ => Outcome::Passed,
        };
        if outcome.is_passed() {
            tracing::info!(title = %self.scenario.title, "scenario passed");
        } else {
            tracing::warn!(?expected, ?actual, "scenario failed");
        }

        let screenshot = self.capture(driver, outcome).await?;
        self.settle(self.scenario.final_pause_ms).await;

        Ok(RunReport {
            title: self.scenario.title.clone(),
            outcome,
            expected,
            actual,
            screenshot,
            steps_executed: total,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }

    async fn execute<D: DomDriver>(
        &self,
        resolver: &Resolver<'_, D>,
        driver: &D,
        step: &Step,
        observed: &mut Option<String>,
    ) -> FormprobeResult<()> {
        match step {
            Step::SetViewport { width, height } => driver.set_viewport(*width, *height).await,
            Step::Navigate { url } => driver.navigate(url).await,
            Step::Click { selectors, offset } => {
                let element = locate(resolver, driver, selectors).await?;
                driver.click(&element, *offset).await
            }
            Step::Type { selectors, text } => {
                let element = locate(resolver, driver, selectors).await?;
                driver.type_text(&element, text).await
            }
            Step::KeyDown { key } => driver.key_down(key).await,
            Step::KeyUp { key } => driver.key_up(key).await,
            Step::WaitForElement { selectors, .. } => {
                let constraint = step.count_constraint().unwrap_or_default();
                let root = driver.document().await?;
                let count = resolver
                    .wait_for_count(selectors, &root, constraint, resolver.options().deadline())
                    .await?;
                tracing::debug!(count, %constraint, "element count satisfied");
                Ok(())
            }
            Step::AssertText { selectors, .. } => {
                let element = locate(resolver, driver, selectors).await?;
                *observed = driver.text_content(&element).await?;
                tracing::debug!(actual = ?observed, "observed text");
                Ok(())
            }
            Step::Pause { ms } => {
                pause(*ms).await;
                Ok(())
            }
        }
    }

    async fn capture<D: DomDriver>(&self, driver: &D, outcome: Outcome) -> FormprobeResult<PathBuf> {
        let bytes = driver.screenshot().await?;
        let dir = self.config.output_dir.join(outcome.dir_name());
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(Path::new(&self.scenario.screenshot));
        tokio::fs::write(&path, bytes).await?;
        tracing::info!(path = %path.display(), "screenshot saved");
        Ok(path)
    }

    async fn settle(&self, ms: u64) {
        if self.config.settle && ms > 0 {
            pause(ms).await;
        }
    }
}

async fn locate<D: DomDriver>(
    resolver: &Resolver<'_, D>,
    driver: &D,
    selectors: &SelectorAlternatives,
) -> FormprobeResult<D::Handle> {
    let root = driver.document().await?;
    let element = resolver.resolve_any(selectors, &root).await?;
    resolver
        .ensure_visible(&element, resolver.options().deadline())
        .await?;
    Ok(element)
}
