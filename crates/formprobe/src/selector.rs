//! Selector chains and alternative sets.
//!
//! A [`SelectorChain`] pierces nested shadow roots: every link after the first
//! is resolved inside the shadow root (or light subtree) of the previous match.
//! A [`SelectorAlternatives`] set lists equivalent ways to reach the same
//! logical element, tried in order.
//!
//! # Serialized form
//!
//! Alternatives follow the recorder export format: each entry is either a bare
//! string (a one-link chain) or a list of strings (a multi-link chain).
//!
//! ```yaml
//! selectors:
//!   - "aria/Name:"
//!   - "#text > input[type=text]"
//!   - [my-form, "#inner > input"]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix used by recorded accessibility-tree selectors
pub const ARIA_PREFIX: &str = "aria/";

/// Ordered selectors that cross shadow boundaries to reach one element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SelectorChain {
    links: Vec<String>,
}

impl SelectorChain {
    /// Create a chain from its links
    #[must_use]
    pub fn new<I, S>(links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            links: links.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a one-link chain
    #[must_use]
    pub fn single(selector: impl Into<String>) -> Self {
        Self {
            links: vec![selector.into()],
        }
    }

    /// Links in resolution order
    #[must_use]
    pub fn links(&self) -> &[String] {
        &self.links
    }

    /// Number of links
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the chain has no links
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl fmt::Display for SelectorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.links.join(" >> "))
    }
}

impl From<&str> for SelectorChain {
    fn from(selector: &str) -> Self {
        Self::single(selector)
    }
}

impl From<Vec<&str>> for SelectorChain {
    fn from(links: Vec<&str>) -> Self {
        Self::new(links)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(
    untagged,
    expecting = "a selector string or a list of selector strings (quote selectors ending in ':')"
)]
enum ChainRepr {
    Single(String),
    Links(Vec<String>),
}

impl Serialize for SelectorChain {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.links.as_slice() {
            [only] => ChainRepr::Single(only.clone()).serialize(serializer),
            links => ChainRepr::Links(links.to_vec()).serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for SelectorChain {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match ChainRepr::deserialize(deserializer)? {
            ChainRepr::Single(s) => Self::single(s),
            ChainRepr::Links(links) => Self { links },
        })
    }
}

/// Ordered list of equivalent chains; the first one that resolves wins
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectorAlternatives {
    chains: Vec<SelectorChain>,
}

impl SelectorAlternatives {
    /// Create an alternative set
    #[must_use]
    pub fn new(chains: Vec<SelectorChain>) -> Self {
        Self { chains }
    }

    /// A set holding one single-link chain
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(vec![SelectorChain::single(selector)])
    }

    /// Append another alternative
    #[must_use]
    pub fn or(mut self, chain: impl Into<SelectorChain>) -> Self {
        self.chains.push(chain.into());
        self
    }

    /// Chains in priority order
    #[must_use]
    pub fn chains(&self) -> &[SelectorChain] {
        &self.chains
    }

    /// Number of alternatives
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether no alternatives are present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl fmt::Display for SelectorAlternatives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.chains.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(" | "))
    }
}

impl From<&str> for SelectorAlternatives {
    fn from(selector: &str) -> Self {
        Self::css(selector)
    }
}

impl<'a> IntoIterator for &'a SelectorAlternatives {
    type Item = &'a SelectorChain;
    type IntoIter = std::slice::Iter<'a, SelectorChain>;

    fn into_iter(self) -> Self::IntoIter {
        self.chains.iter()
    }
}

/// Accessible name targeted by an `aria/<name>` selector
#[must_use]
pub fn aria_name(selector: &str) -> Option<&str> {
    selector.strip_prefix(ARIA_PREFIX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod chain_tests {
        use super::*;

        #[test]
        fn test_single_chain() {
            let chain = SelectorChain::single("#email > input");
            assert_eq!(chain.len(), 1);
            assert_eq!(chain.links()[0], "#email > input");
        }

        #[test]
        fn test_display_joins_links() {
            let chain = SelectorChain::new(["my-app", "my-form", "input"]);
            assert_eq!(chain.to_string(), "my-app >> my-form >> input");
        }

        #[test]
        fn test_empty_chain() {
            let chain = SelectorChain::default();
            assert!(chain.is_empty());
            assert_eq!(chain.to_string(), "");
        }
    }

    mod alternatives_tests {
        use super::*;

        #[test]
        fn test_builder() {
            let alts = SelectorAlternatives::css("aria/Name:").or("#text > input[type=text]");
            assert_eq!(alts.len(), 2);
            assert_eq!(alts.to_string(), "aria/Name: | #text > input[type=text]");
        }

        #[test]
        fn test_deserialize_mixed_forms() {
            let yaml = "- 'aria/Name:'\n- '#text > input'\n- [host-el, '#inner']\n";
            let alts: SelectorAlternatives = serde_yaml_ng::from_str(yaml).unwrap();
            assert_eq!(alts.len(), 3);
            assert_eq!(alts.chains()[0], SelectorChain::single("aria/Name:"));
            assert_eq!(alts.chains()[2], SelectorChain::new(["host-el", "#inner"]));
        }

        #[test]
        fn test_deserialize_recorder_json() {
            let json = r##"[["aria/Name:"],["#text > input[type=text]"]]"##;
            let alts: SelectorAlternatives = serde_json::from_str(json).unwrap();
            assert_eq!(alts.chains()[1].links(), ["#text > input[type=text]"]);
        }

        #[test]
        fn test_single_link_serializes_as_string() {
            let alts = SelectorAlternatives::css("#tel > input").or(vec!["a", "b"]);
            let json = serde_json::to_string(&alts).unwrap();
            assert_eq!(json, r##"["#tel > input",["a","b"]]"##);
        }

        #[test]
        fn test_iterates_in_order() {
            let alts = SelectorAlternatives::css("first").or("second");
            let order: Vec<String> = alts.into_iter().map(ToString::to_string).collect();
            assert_eq!(order, vec!["first", "second"]);
        }
    }

    mod aria_tests {
        use super::*;

        #[test]
        fn test_aria_name() {
            assert_eq!(aria_name("aria/Name:"), Some("Name:"));
            assert_eq!(aria_name("#text > p"), None);
        }
    }

    proptest! {
        #[test]
        fn prop_chain_display_has_one_separator_per_boundary(
            links in proptest::collection::vec("[a-z#.]{1,8}", 1..6)
        ) {
            let chain = SelectorChain::new(links.clone());
            prop_assert_eq!(chain.to_string().matches(" >> ").count(), links.len() - 1);
        }
    }
}
