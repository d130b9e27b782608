//! Value types produced by detection.
//!
//! Everything here is created fresh per scan and discarded after use; there
//! is no persistent store in the core.

use serde::{Deserialize, Serialize};
use veil_rules::Severity;

/// One detected PII occurrence.
///
/// `index`/`length` denote the half-open byte interval
/// `[index, index + length)` into the exact text that was scanned. The
/// detector guarantees that no two matches in a single output overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedMatch {
    /// Stable pattern key, e.g. `"creditCard"`.
    pub key: String,
    /// Display type, serialized as `type` for UI consumers.
    #[serde(rename = "type")]
    pub label: String,
    pub severity: Severity,
    /// The matched text, exactly as it appears in the source.
    pub value: String,
    /// Byte offset into the scanned text.
    pub index: usize,
    /// Byte length of the matched value.
    pub length: usize,
}

impl DetectedMatch {
    /// Exclusive end of the match interval.
    pub fn end(&self) -> usize {
        self.index + self.length
    }

    /// `key + "::" + value`, the position-independent occurrence signature.
    pub fn signature(&self) -> String {
        format!("{}::{}", self.key, self.value)
    }
}

/// Per-label aggregate for UI reporting, rebuilt on every scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSummary {
    #[serde(rename = "type")]
    pub label: String,
    pub severity: Severity,
    pub count: usize,
    /// Up to 3 distinct example values, in first-seen order.
    pub samples: Vec<String>,
}

/// A selectable occurrence of a match.
///
/// `occurrence` is the 1-based ordinal of this `(key, value)` signature among
/// all matches sharing it, counted in document order. Callers address "the
/// 2nd phone number" this way because raw offsets shift as earlier
/// replacements change text length upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualCandidate {
    pub id: usize,
    #[serde(rename = "match")]
    pub matched: DetectedMatch,
    pub signature: String,
    pub occurrence: usize,
}

/// A caller-selected `(signature, occurrence)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedOccurrence {
    pub signature: String,
    pub occurrence: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DetectedMatch {
        DetectedMatch {
            key: "ssn".to_string(),
            label: "Social Security Number".to_string(),
            severity: Severity::Critical,
            value: "123-45-6789".to_string(),
            index: 5,
            length: 11,
        }
    }

    #[test]
    fn test_signature_format() {
        assert_eq!(sample().signature(), "ssn::123-45-6789");
    }

    #[test]
    fn test_match_serializes_label_as_type() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "Social Security Number");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["index"], 5);
    }
}
