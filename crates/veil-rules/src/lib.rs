//! Detection rule catalogue for PII scanning.
//!
//! Rules are data, not code: each entry pairs a compiled pattern with a
//! stable key, a display label, a severity, and an optional validator.
//! Adding a jurisdiction-specific identifier format means adding one
//! record here, not touching the detector.

pub mod validators;

mod patterns;

pub use patterns::default_patterns;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How bad a leak of this match would be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

/// A single detection rule.
///
/// `regex` is compiled lazily; a rule whose pattern fails to compile
/// degrades to "no matches" instead of poisoning the whole catalogue.
/// Context-gated rules put the label token in the pattern and the value in
/// capture group `group` (the lookbehind-equivalent: only the group's range
/// is reported). Loose rules use `group == 0`.
pub struct DetectionPattern {
    /// Stable identifier, e.g. `"creditCard"`.
    pub key: &'static str,
    /// Display type shown to users, e.g. `"Credit Card"`.
    pub label: &'static str,
    pub severity: Severity,
    pub regex: &'static Lazy<Option<Regex>>,
    /// Capture group whose range becomes the match; 0 means the whole match.
    pub group: usize,
    /// Optional sanity check on the matched value.
    pub validate: Option<fn(&str) -> bool>,
}

impl std::fmt::Debug for DetectionPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionPattern")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("severity", &self.severity)
            .field("group", &self.group)
            .field("has_validator", &self.validate.is_some())
            .finish()
    }
}
