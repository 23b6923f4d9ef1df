//! Element Resolution & Wait Engine
//!
//! Resolves [`SelectorAlternatives`] against a live page, piercing shadow
//! roots between chain links, and waits for elements to become connected and
//! scrolled into view.
//!
//! ```text
//! resolve_any ──► resolve_chain (alt 1) ──► link ─► shadow? ─► link ─► ...
//!             └─► resolve_chain (alt 2)      (each link polls until matched)
//! ensure_visible ──► poll connected ──► in viewport? ──► scroll ──► poll in viewport
//! wait_for_count ──► poll query_all ──► comparator(count, target)
//! ```
//!
//! Every wait is sequential: alternatives are never raced against each other.

use crate::driver::DomDriver;
use crate::fallback::first_ok;
use crate::result::{FormprobeError, FormprobeResult};
use crate::selector::{SelectorAlternatives, SelectorChain};
use crate::wait::{
    poll_until, try_poll_for, try_poll_until, CountConstraint, Deadline,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};
use std::time::Duration;

/// Options for element resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Budget for resolving one chain, in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Whether every resolved link must also be visible
    pub visible: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            visible: true,
        }
    }
}

impl ResolveOptions {
    /// Create options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Require (or not) that resolved elements be visible
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Start a fresh deadline from the configured timeout
    #[must_use]
    pub fn deadline(&self) -> Deadline {
        Deadline::after_ms(self.timeout_ms)
    }
}

/// Resolves selectors and waits on elements of one page
#[derive(Debug)]
pub struct Resolver<'a, D: DomDriver> {
    driver: &'a D,
    options: ResolveOptions,
}

impl<'a, D: DomDriver> Resolver<'a, D> {
    /// Create a resolver with default options
    #[must_use]
    pub fn new(driver: &'a D) -> Self {
        Self::with_options(driver, ResolveOptions::default())
    }

    /// Create a resolver with custom options
    #[must_use]
    pub const fn with_options(driver: &'a D, options: ResolveOptions) -> Self {
        Self { driver, options }
    }

    /// Configured options
    #[must_use]
    pub const fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve the first alternative that matches.
    ///
    /// Alternatives are tried in order; a failing alternative is logged and
    /// the next one attempted. Alternatives after the first success are
    /// never queried.
    pub async fn resolve_any(
        &self,
        alternatives: &SelectorAlternatives,
        root: &D::Handle,
    ) -> FormprobeResult<D::Handle> {
        if alternatives.is_empty() {
            return Err(FormprobeError::invalid_argument(
                "Empty selector set provided to resolve_any",
            ));
        }

        let outcome = first_ok(alternatives, |chain| async move {
            self.resolve_chain(chain, root).await.map_err(|err| {
                tracing::warn!(selector = %chain, error = %err, "selector alternative failed");
                err
            })
        })
        .await;

        outcome.map_err(|failures| FormprobeError::NotFound {
            selectors: alternatives.clone(),
            failures: failures
                .into_iter()
                .map(|f| format!("{}: {}", f.item, f.error))
                .collect(),
        })
    }

    /// Resolve a single chain, entering shadow roots between links.
    ///
    /// Every link waits for a match under the current scope. When a matched
    /// element (other than the last) exposes a shadow root, the next link is
    /// queried inside that root instead of the light subtree. All links share
    /// one deadline.
    pub async fn resolve_chain(
        &self,
        chain: &SelectorChain,
        root: &D::Handle,
    ) -> FormprobeResult<D::Handle> {
        let Some((last, inner)) = chain.links().split_last() else {
            return Err(FormprobeError::invalid_argument(
                "Empty selector provided to resolve_chain",
            ));
        };

        let deadline = self.options.deadline();
        let mut scope = root.clone();
        for selector in inner {
            let element = self.wait_for_link(chain, &scope, selector, deadline).await?;
            scope = self.driver.shadow_root(&element).await?.unwrap_or(element);
        }
        let element = self.wait_for_link(chain, &scope, last, deadline).await?;
        tracing::debug!(selector = %chain, "resolved");
        Ok(element)
    }

    async fn wait_for_link(
        &self,
        chain: &SelectorChain,
        scope: &D::Handle,
        selector: &str,
        deadline: Deadline,
    ) -> FormprobeResult<D::Handle> {
        let probe = move || self.probe_link(scope, selector);

        match try_poll_for(probe, deadline, self.options.poll_interval(), selector).await {
            Ok((element, _)) => Ok(element),
            Err(FormprobeError::Timeout { ms, .. }) => Err(FormprobeError::NotFound {
                selectors: SelectorAlternatives::new(vec![chain.clone()]),
                failures: vec![format!("no match for `{selector}` within {ms}ms")],
            }),
            Err(err) => Err(err),
        }
    }

    async fn probe_link(
        &self,
        scope: &D::Handle,
        selector: &str,
    ) -> FormprobeResult<Option<D::Handle>> {
        let matches = self.driver.query_selector_all(scope, selector).await?;
        let Some(first) = matches.into_iter().next() else {
            return Ok(None);
        };
        if self.options.visible && !self.driver.is_visible(&first).await? {
            return Ok(None);
        }
        Ok(Some(first))
    }

    /// Scroll `element` into view if it is not already intersecting the
    /// viewport.
    ///
    /// Waits for the element to be connected first. May change the page's
    /// scroll position.
    pub async fn ensure_visible(
        &self,
        element: &D::Handle,
        deadline: Deadline,
    ) -> FormprobeResult<()> {
        let driver = self.driver;
        let interval = self.options.poll_interval();

        try_poll_until(
            move || driver.is_connected(element),
            deadline,
            interval,
            "element to be connected",
        )
        .await?;

        if driver.is_intersecting_viewport(element).await? {
            return Ok(());
        }

        tracing::debug!(?element, "scrolling into view");
        driver.scroll_into_view(element).await?;

        try_poll_until(
            move || driver.is_intersecting_viewport(element),
            deadline,
            interval,
            "element to be in viewport",
        )
        .await?;
        Ok(())
    }

    /// All elements matched by one chain, fanning out across every match of
    /// each link and entering shadow roots between links.
    pub async fn query_chain_all(
        &self,
        chain: &SelectorChain,
        root: &D::Handle,
    ) -> FormprobeResult<Vec<D::Handle>> {
        let Some((last, inner)) = chain.links().split_last() else {
            return Err(FormprobeError::invalid_argument(
                "Empty selector provided to query_chain_all",
            ));
        };

        let mut scopes = vec![root.clone()];
        for selector in inner {
            let mut next = Vec::new();
            for scope in &scopes {
                for element in self.driver.query_selector_all(scope, selector).await? {
                    next.push(self.driver.shadow_root(&element).await?.unwrap_or(element));
                }
            }
            if next.is_empty() {
                return Ok(next);
            }
            scopes = next;
        }

        let mut matches = Vec::new();
        for scope in &scopes {
            matches.extend(self.driver.query_selector_all(scope, last).await?);
        }
        Ok(matches)
    }

    /// Matches of the first alternative that matches anything (empty when
    /// none do).
    pub async fn query_all(
        &self,
        alternatives: &SelectorAlternatives,
        root: &D::Handle,
    ) -> FormprobeResult<Vec<D::Handle>> {
        for chain in alternatives {
            let matches = self.query_chain_all(chain, root).await?;
            if !matches.is_empty() {
                return Ok(matches);
            }
        }
        Ok(Vec::new())
    }

    /// Wait until the number of matched elements satisfies `constraint`.
    ///
    /// Returns the count observed on success.
    pub async fn wait_for_count(
        &self,
        alternatives: &SelectorAlternatives,
        root: &D::Handle,
        constraint: CountConstraint,
        deadline: Deadline,
    ) -> FormprobeResult<usize> {
        let waited_for = format!("{alternatives} to reach {constraint}");
        let probe = move || self.count_satisfying(alternatives, root, constraint);
        let (count, _) =
            try_poll_for(probe, deadline, self.options.poll_interval(), &waited_for).await?;
        Ok(count)
    }

    async fn count_satisfying(
        &self,
        alternatives: &SelectorAlternatives,
        root: &D::Handle,
        constraint: CountConstraint,
    ) -> FormprobeResult<Option<usize>> {
        let count = self.query_all(alternatives, root).await?.len();
        Ok(constraint.is_satisfied_by(count).then_some(count))
    }

    /// Poll an arbitrary async predicate with this resolver's interval
    pub async fn wait_for_function<F, Fut>(
        &self,
        predicate: F,
        deadline: Deadline,
        description: &str,
    ) -> FormprobeResult<()>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        poll_until(predicate, deadline, self.options.poll_interval(), description).await?;
        Ok(())
    }
}
