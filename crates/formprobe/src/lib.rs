//! Formprobe: Element Resolution & Wait Engine for Recorded Form Checks
//!
//! Replays recorded browser interactions against a live page. Each element
//! is found through an ordered set of selector alternatives; a chain of
//! selectors pierces shadow roots between its links. Every lookup waits
//! under a deadline instead of failing on the first miss.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌────────────────────┐
//! │ Scenario     │──►│ ScenarioRunner   │──►│ Resolver           │
//! │ (YAML/JSON)  │   │ steps, verdict,  │   │ resolve_any/chain, │
//! │              │   │ screenshot       │   │ ensure_visible,    │
//! └──────────────┘   └──────────────────┘   │ wait_for_count     │
//!                                           └─────────┬──────────┘
//!                                                     │ DomDriver
//!                                   ┌─────────────────┴────────────┐
//!                                   │ Page (CDP)      MockDriver   │
//!                                   └──────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use formprobe::{MockDriver, RunnerConfig, Scenario, ScenarioRunner};
//!
//! # async fn demo() -> formprobe::FormprobeResult<()> {
//! let scenario = Scenario::short_name_form("http://127.0.0.1:5500");
//! let driver = MockDriver::new();
//! let report = ScenarioRunner::new(&scenario, RunnerConfig::new())
//!     .run(&driver)
//!     .await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod browser;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod driver;
#[allow(clippy::missing_errors_doc)]
mod engine;
mod fallback;
mod result;
#[allow(clippy::missing_errors_doc)]
mod runner;
#[allow(clippy::missing_errors_doc)]
mod scenario;
mod selector;

/// Deadlines, count constraints and polling primitives
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
pub mod wait;

pub use browser::{BrowserConfig, KeyDefinition};
#[cfg(feature = "browser")]
pub use browser::{Browser, Page};
pub use driver::{ClickHandler, DomDriver, MockDom, MockDriver, MockNode, NodeId, Point};
pub use engine::{ResolveOptions, Resolver};
pub use fallback::{first_ok, AttemptFailure};
pub use result::{FormprobeError, FormprobeResult};
pub use runner::{Outcome, RunReport, RunnerConfig, ScenarioRunner};
pub use scenario::{
    Scenario, Step, DEFAULT_FINAL_PAUSE_MS, DEFAULT_SETTLE_MS, SHORT_NAME_MESSAGE,
};
pub use selector::{aria_name, SelectorAlternatives, SelectorChain, ARIA_PREFIX};
pub use wait::{
    CountComparator, CountConstraint, Deadline, WaitResult,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        CountComparator, CountConstraint, Deadline, DomDriver, FormprobeError, FormprobeResult,
        MockDriver, MockNode, Outcome, ResolveOptions, Resolver, RunReport, RunnerConfig,
        Scenario, ScenarioRunner, SelectorAlternatives, SelectorChain, Step,
    };
}
