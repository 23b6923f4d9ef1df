//! Recorded scenario schema.
//!
//! A scenario is plain data: the ordered steps a recorder captured plus the
//! expectation that classifies the run. YAML and JSON are both accepted.
//!
//! ```yaml
//! title: form-test-short-name
//! timeoutMs: 5000
//! steps:
//!   - type: setViewport
//!     width: 1167
//!     height: 980
//!   - type: navigate
//!     url: http://127.0.0.1:5500/index.html?
//!   - type: type
//!     selectors: ["aria/Name:", "#text > input[type=text]"]
//!     text: an
//!   - type: assertText
//!     selectors: ["#text > p"]
//!     expected: "name must be greater than 2 chars "
//! ```

use crate::driver::Point;
use crate::result::{FormprobeError, FormprobeResult};
use crate::selector::{SelectorAlternatives, SelectorChain};
use crate::wait::{CountComparator, CountConstraint, DEFAULT_WAIT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default delay after each step
pub const DEFAULT_SETTLE_MS: u64 = 1_000;

/// Default delay before the page is released
pub const DEFAULT_FINAL_PAUSE_MS: u64 = 5_000;

/// Text the short-name form shows when validation rejects the name
pub const SHORT_NAME_MESSAGE: &str = "name must be greater than 2 chars ";

fn default_timeout_ms() -> u64 {
    DEFAULT_WAIT_TIMEOUT_MS
}

fn default_settle_ms() -> u64 {
    DEFAULT_SETTLE_MS
}

fn default_final_pause_ms() -> u64 {
    DEFAULT_FINAL_PAUSE_MS
}

fn default_count() -> usize {
    1
}

/// One recorded interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Step {
    /// Resize the viewport
    SetViewport {
        /// Width in CSS pixels
        width: u32,
        /// Height in CSS pixels
        height: u32,
    },
    /// Navigate and wait for the load to finish
    Navigate {
        /// Target URL
        url: String,
    },
    /// Click an element
    Click {
        /// Where to find the element
        selectors: SelectorAlternatives,
        /// Offset inside the element (centre when absent)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offset: Option<Point>,
    },
    /// Type text into an element
    Type {
        /// Where to find the element
        selectors: SelectorAlternatives,
        /// Text typed key by key
        text: String,
    },
    /// Press a key
    KeyDown {
        /// Key name, e.g. `Tab`
        key: String,
    },
    /// Release a key
    KeyUp {
        /// Key name, e.g. `Tab`
        key: String,
    },
    /// Wait until enough (or few enough) elements match
    WaitForElement {
        /// Where to count elements
        selectors: SelectorAlternatives,
        /// Target count
        #[serde(default = "default_count")]
        count: usize,
        /// How the count is compared
        #[serde(default)]
        operator: CountComparator,
    },
    /// Read an element's text; the run passes only on an exact match
    AssertText {
        /// Where to find the element
        selectors: SelectorAlternatives,
        /// Expected `textContent`, compared byte for byte
        expected: String,
    },
    /// Fixed sleep
    Pause {
        /// Duration in milliseconds
        ms: u64,
    },
}

impl Step {
    /// Selectors used by this step, if it targets elements
    #[must_use]
    pub const fn selectors(&self) -> Option<&SelectorAlternatives> {
        match self {
            Self::Click { selectors, .. }
            | Self::Type { selectors, .. }
            | Self::WaitForElement { selectors, .. }
            | Self::AssertText { selectors, .. } => Some(selectors),
            Self::SetViewport { .. }
            | Self::Navigate { .. }
            | Self::KeyDown { .. }
            | Self::KeyUp { .. }
            | Self::Pause { .. } => None,
        }
    }

    /// Count constraint of a `waitForElement` step
    #[must_use]
    pub const fn count_constraint(&self) -> Option<CountConstraint> {
        match self {
            Self::WaitForElement {
                count, operator, ..
            } => Some(CountConstraint {
                comparator: *operator,
                target: *count,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetViewport { width, height } => write!(f, "set viewport {width}x{height}"),
            Self::Navigate { url } => write!(f, "navigate to {url}"),
            Self::Click { selectors, .. } => write!(f, "click {selectors}"),
            Self::Type { selectors, text } => write!(f, "type {text:?} into {selectors}"),
            Self::KeyDown { key } => write!(f, "key down {key}"),
            Self::KeyUp { key } => write!(f, "key up {key}"),
            Self::WaitForElement {
                selectors,
                count,
                operator,
            } => write!(f, "wait for {selectors} count {operator} {count}"),
            Self::AssertText {
                selectors,
                expected,
            } => write!(f, "assert text of {selectors} is {expected:?}"),
            Self::Pause { ms } => write!(f, "pause {ms}ms"),
        }
    }
}

/// A recorded acceptance check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Scenario title
    pub title: String,
    /// Budget for each element wait, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Delay after every step, in milliseconds
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Delay after the screenshot, before the page is released
    #[serde(default = "default_final_pause_ms")]
    pub final_pause_ms: u64,
    /// Screenshot file name, written under `passed/` or `failed/`
    pub screenshot: String,
    /// Steps in execution order
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parse a YAML scenario
    pub fn from_yaml_str(yaml: &str) -> FormprobeResult<Self> {
        let scenario: Self = serde_yaml_ng::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a JSON scenario
    pub fn from_json_str(json: &str) -> FormprobeResult<Self> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load a scenario file; `.json` is parsed as JSON, anything else as YAML
    pub fn load(path: impl AsRef<Path>) -> FormprobeResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> FormprobeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> FormprobeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The text assertion that classifies the run, if any
    #[must_use]
    pub fn assertion(&self) -> Option<(&SelectorAlternatives, &str)> {
        self.steps.iter().find_map(|step| match step {
            Step::AssertText {
                selectors,
                expected,
            } => Some((selectors, expected.as_str())),
            _ => None,
        })
    }

    /// Check structural consistency
    pub fn validate(&self) -> FormprobeResult<()> {
        if self.steps.is_empty() {
            return Err(FormprobeError::scenario("scenario has no steps"));
        }
        if matches!(self.screenshot.as_str(), "" | "." | "..")
            || self.screenshot.contains(['/', '\\'])
        {
            return Err(FormprobeError::scenario(format!(
                "screenshot must be a bare file name, got {:?}",
                self.screenshot
            )));
        }

        let mut assertions = 0;
        for (index, step) in self.steps.iter().enumerate() {
            let position = index + 1;
            if let Some(selectors) = step.selectors() {
                if selectors.is_empty() {
                    return Err(FormprobeError::scenario(format!(
                        "step {position} ({step}) has no selectors"
                    )));
                }
                if selectors.chains().iter().any(SelectorChain::is_empty) {
                    return Err(FormprobeError::scenario(format!(
                        "step {position} ({step}) has an empty selector chain"
                    )));
                }
            }
            match step {
                Step::SetViewport { width, height } if *width == 0 || *height == 0 => {
                    return Err(FormprobeError::scenario(format!(
                        "step {position}: viewport must be non-empty"
                    )));
                }
                Step::AssertText { .. } => assertions += 1,
                _ => {}
            }
        }
        if assertions > 1 {
            return Err(FormprobeError::scenario(
                "at most one assertText step is allowed",
            ));
        }
        Ok(())
    }

    /// The recorded short-name validation check against `base_url`.
    ///
    /// Types a two-character name plus a valid email and phone, submits, and
    /// expects the name-length message.
    #[must_use]
    pub fn short_name_form(base_url: &str) -> Self {
        let name_field =
            SelectorAlternatives::css("aria/Name:").or("#text > input[type=text]");
        let tab = || {
            [
                Step::KeyDown { key: "Tab".into() },
                Step::KeyUp { key: "Tab".into() },
            ]
        };

        let mut steps = vec![
            Step::SetViewport {
                width: 1167,
                height: 980,
            },
            Step::Navigate {
                url: format!("{}/index.html?", base_url.trim_end_matches('/')),
            },
            Step::Click {
                selectors: name_field.clone(),
                offset: Some(Point::new(147.5, 15.406_25)),
            },
            Step::Type {
                selectors: name_field,
                text: "an".into(),
            },
        ];
        steps.extend(tab());
        steps.push(Step::Type {
            selectors: SelectorAlternatives::css("#email > input[type=email]"),
            text: "good@email.com".into(),
        });
        steps.extend(tab());
        steps.extend([
            Step::Type {
                selectors: SelectorAlternatives::css("#tel > input[type=tel]"),
                text: "0712345678".into(),
            },
            Step::Click {
                selectors: SelectorAlternatives::css("body > form > fieldset > div > button"),
                offset: Some(Point::new(50.5, 20.406_25)),
            },
            Step::AssertText {
                selectors: SelectorAlternatives::css("#text > p"),
                expected: SHORT_NAME_MESSAGE.into(),
            },
        ]);

        Self {
            title: "form-test-short-name".into(),
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            final_pause_ms: DEFAULT_FINAL_PAUSE_MS,
            screenshot: "form-test-short-name.png".into(),
            steps,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r##"
title: minimal
screenshot: out.png
steps:
  - type: navigate
    url: http://localhost/
  - type: click
    selectors:
      - aria/Submit
      - [x-form, button]
    offset: { x: 3.0, y: 4.5 }
  - type: waitForElement
    selectors: [".row"]
    count: 2
    operator: "<="
  - type: assertText
    selectors: ["#text > p"]
    expected: "done "
"##;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parse_yaml_with_defaults() {
            let scenario = Scenario::from_yaml_str(MINIMAL).unwrap();
            assert_eq!(scenario.title, "minimal");
            assert_eq!(scenario.timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
            assert_eq!(scenario.settle_ms, DEFAULT_SETTLE_MS);
            assert_eq!(scenario.final_pause_ms, DEFAULT_FINAL_PAUSE_MS);
            assert_eq!(scenario.steps.len(), 4);
        }

        #[test]
        fn test_click_step_fields() {
            let scenario = Scenario::from_yaml_str(MINIMAL).unwrap();
            match &scenario.steps[1] {
                Step::Click { selectors, offset } => {
                    assert_eq!(selectors.to_string(), "aria/Submit | x-form >> button");
                    assert_eq!(*offset, Some(Point::new(3.0, 4.5)));
                }
                other => panic!("unexpected step {other:?}"),
            }
        }

        #[test]
        fn test_wait_for_element_constraint() {
            let scenario = Scenario::from_yaml_str(MINIMAL).unwrap();
            assert_eq!(
                scenario.steps[2].count_constraint(),
                Some(CountConstraint::at_most(2))
            );
        }

        #[test]
        fn test_wait_for_element_defaults() {
            let step: Step =
                serde_json::from_str(r##"{"type":"waitForElement","selectors":["#a"]}"##).unwrap();
            assert_eq!(step.count_constraint(), Some(CountConstraint::at_least(1)));
        }

        #[test]
        fn test_assertion_preserves_trailing_space() {
            let scenario = Scenario::from_yaml_str(MINIMAL).unwrap();
            let (selectors, expected) = scenario.assertion().unwrap();
            assert_eq!(selectors.to_string(), "#text > p");
            assert_eq!(expected, "done ");
        }

        #[test]
        fn test_json_round_trip_of_builtin() {
            let scenario = Scenario::short_name_form("http://127.0.0.1:5500");
            let json = scenario.to_json().unwrap();
            assert!(json.contains("\"type\": \"setViewport\""));
            assert_eq!(Scenario::from_json_str(&json).unwrap(), scenario);
        }

        #[test]
        fn test_load_picks_format_by_extension() {
            let dir = tempfile::tempdir().unwrap();
            let yaml_path = dir.path().join("check.yaml");
            std::fs::File::create(&yaml_path)
                .unwrap()
                .write_all(MINIMAL.as_bytes())
                .unwrap();
            assert_eq!(Scenario::load(&yaml_path).unwrap().title, "minimal");

            let json_path = dir.path().join("check.JSON");
            let builtin = Scenario::short_name_form("http://localhost");
            std::fs::write(&json_path, builtin.to_json().unwrap()).unwrap();
            assert_eq!(Scenario::load(&json_path).unwrap(), builtin);
        }

        #[test]
        fn test_missing_file_is_io_error() {
            let err = Scenario::load("/definitely/not/here.yaml").unwrap_err();
            assert!(matches!(err, FormprobeError::Io(_)));
        }

        #[test]
        fn test_unknown_step_type_rejected() {
            let yaml = "title: t\nscreenshot: a.png\nsteps:\n  - type: hover\n    selectors: [a]\n";
            assert!(matches!(
                Scenario::from_yaml_str(yaml).unwrap_err(),
                FormprobeError::Yaml(_)
            ));
        }
        #[test]
        fn test_unquoted_trailing_colon_selector_rejected() {
            let yaml = "title: t\nscreenshot: a.png\nsteps:\n  - type: click\n    selectors:\n      - aria/Name:\n";
            let err = Scenario::from_yaml_str(yaml).unwrap_err();
            assert!(matches!(err, FormprobeError::Yaml(_)));
            assert!(err.to_string().contains("quote selectors ending in ':'"));
        }

        #[test]
        fn test_quoted_trailing_colon_selector_accepted() {
            let yaml = "title: t\nscreenshot: a.png\nsteps:\n  - type: click\n    selectors:\n      - \"aria/Name:\"\n";
            let scenario = Scenario::from_yaml_str(yaml).unwrap();
            assert_eq!(scenario.steps[0].selectors().unwrap().to_string(), "aria/Name:");
        }
    }

    mod validate_tests {
        use super::*;

        fn with_steps(steps: Vec<Step>) -> Scenario {
            Scenario {
                steps,
                ..Scenario::short_name_form("http://localhost")
            }
        }

        #[test]
        fn test_builtin_is_valid() {
            Scenario::short_name_form("http://localhost").validate().unwrap();
        }

        #[test]
        fn test_empty_steps() {
            let err = with_steps(vec![]).validate().unwrap_err();
            assert!(err.to_string().contains("no steps"));
        }

        #[test]
        fn test_empty_selector_set() {
            let err = with_steps(vec![Step::Click {
                selectors: SelectorAlternatives::default(),
                offset: None,
            }])
            .validate()
            .unwrap_err();
            assert!(err.to_string().contains("no selectors"));
        }

        #[test]
        fn test_empty_chain() {
            let err = with_steps(vec![Step::Type {
                selectors: SelectorAlternatives::new(vec![SelectorChain::default()]),
                text: "x".into(),
            }])
            .validate()
            .unwrap_err();
            assert!(err.to_string().contains("empty selector chain"));
        }

        #[test]
        fn test_two_assertions() {
            let assert = Step::AssertText {
                selectors: "#a".into(),
                expected: "x".into(),
            };
            let err = with_steps(vec![assert.clone(), assert])
                .validate()
                .unwrap_err();
            assert!(err.to_string().contains("at most one"));
        }

        #[test]
        fn test_zero_viewport() {
            let err = with_steps(vec![Step::SetViewport {
                width: 0,
                height: 10,
            }])
            .validate()
            .unwrap_err();
            assert!(err.to_string().contains("viewport"));
        }

        #[test]
        fn test_screenshot_with_path_rejected() {
            let mut scenario = Scenario::short_name_form("http://localhost");
            scenario.screenshot = "../escape.png".into();
            assert!(scenario.validate().is_err());
        }

        #[test]
        fn test_screenshot_dot_names_rejected() {
            for name in [".", ".."] {
                let mut scenario = Scenario::short_name_form("http://localhost");
                scenario.screenshot = name.into();
                let err = scenario.validate().unwrap_err();
                assert!(err.to_string().contains("bare file name"), "{name}: {err}");
            }
        }
    }

    mod builtin_tests {
        use super::*;

        #[test]
        fn test_short_name_form_shape() {
            let scenario = Scenario::short_name_form("http://127.0.0.1:5500/");
            assert_eq!(
                scenario.steps[1],
                Step::Navigate {
                    url: "http://127.0.0.1:5500/index.html?".into()
                }
            );
            assert_eq!(scenario.steps.len(), 12);
            assert_eq!(scenario.screenshot, "form-test-short-name.png");
            let (selectors, expected) = scenario.assertion().unwrap();
            assert_eq!(selectors.to_string(), "#text > p");
            assert_eq!(expected, SHORT_NAME_MESSAGE);
        }

        #[test]
        fn test_name_field_has_aria_then_css() {
            let scenario = Scenario::short_name_form("http://localhost");
            let selectors = scenario.steps[3].selectors().unwrap();
            assert_eq!(selectors.to_string(), "aria/Name: | #text > input[type=text]");
        }

        #[test]
        fn test_step_display() {
            let step = Step::Type {
                selectors: "#tel > input[type=tel]".into(),
                text: "0712345678".into(),
            };
            assert_eq!(
                step.to_string(),
                "type \"0712345678\" into #tel > input[type=tel]"
            );
        }
    }
}
