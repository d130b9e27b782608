//! Pattern-driven match detection with overlap resolution.

use crate::types::{DetectedMatch, DetectionSummary, ManualCandidate};
use std::collections::{HashMap, HashSet};
use veil_rules::DetectionPattern;

/// Run every pattern over `text` and resolve conflicts.
///
/// Candidates from all patterns are pooled, validated, then ranked by
/// descending length with ascending index as the tie-break: longer matches
/// are considered more specific and win contested byte ranges (a labeled
/// street address beats the bare ZIP code inside it). A candidate is dropped
/// when its `(key, index, value)` triple was already accepted or any byte of
/// its interval is already claimed.
///
/// The returned list is re-sorted ascending by index and is guaranteed
/// conflict-free; the whole pass is deterministic for a given
/// `(text, patterns)` pair. A pattern whose regex failed to compile
/// contributes nothing and never aborts the pass.
pub fn detect_matches(text: &str, patterns: &[DetectionPattern]) -> Vec<DetectedMatch> {
    let mut candidates: Vec<DetectedMatch> = Vec::new();

    for pattern in patterns {
        let re = match pattern.regex.as_ref() {
            Some(re) => re,
            None => {
                log::warn!("[detect] pattern '{}' failed to compile, skipped", pattern.key);
                continue;
            }
        };

        if pattern.group == 0 {
            for m in re.find_iter(text) {
                push_candidate(&mut candidates, pattern, m.as_str(), m.start());
            }
        } else {
            for caps in re.captures_iter(text) {
                // The gated value lives in the configured group; if the
                // alternation left it empty, fall back to the whole match.
                let m = match caps.get(pattern.group).or_else(|| caps.get(0)) {
                    Some(m) => m,
                    None => continue,
                };
                push_candidate(&mut candidates, pattern, m.as_str(), m.start());
            }
        }
    }

    // Longest first, then leftmost. The sort is stable, so equal-length
    // candidates at the same index keep catalogue order.
    candidates.sort_by(|a, b| b.length.cmp(&a.length).then(a.index.cmp(&b.index)));

    let mut claimed = vec![false; text.len()];
    let mut seen: HashSet<(String, usize, String)> = HashSet::new();
    let mut accepted: Vec<DetectedMatch> = Vec::new();

    for candidate in candidates {
        let triple = (
            candidate.key.clone(),
            candidate.index,
            candidate.value.clone(),
        );
        if seen.contains(&triple) {
            continue;
        }
        if claimed[candidate.index..candidate.end()].iter().any(|&c| c) {
            continue;
        }
        for slot in &mut claimed[candidate.index..candidate.index + candidate.length] {
            *slot = true;
        }
        seen.insert(triple);
        accepted.push(candidate);
    }

    // Callers rewrite left to right over this ordering.
    accepted.sort_by_key(|m| m.index);
    accepted
}

fn push_candidate(
    candidates: &mut Vec<DetectedMatch>,
    pattern: &DetectionPattern,
    value: &str,
    index: usize,
) {
    if value.is_empty() {
        return;
    }
    if let Some(validate) = pattern.validate {
        if !validate(value) {
            return;
        }
    }
    candidates.push(DetectedMatch {
        key: pattern.key.to_string(),
        label: pattern.label.to_string(),
        severity: pattern.severity,
        value: value.to_string(),
        index,
        length: value.len(),
    });
}

/// Group matches by display type, keeping first-seen order and up to three
/// distinct sample values per type.
pub fn summarize_matches(matches: &[DetectedMatch]) -> Vec<DetectionSummary> {
    let mut order: Vec<String> = Vec::new();
    let mut by_label: HashMap<String, DetectionSummary> = HashMap::new();

    for m in matches {
        let entry = by_label.entry(m.label.clone()).or_insert_with(|| {
            order.push(m.label.clone());
            DetectionSummary {
                label: m.label.clone(),
                severity: m.severity,
                count: 0,
                samples: Vec::new(),
            }
        });
        entry.count += 1;
        if entry.samples.len() < 3 && !entry.samples.contains(&m.value) {
            entry.samples.push(m.value.clone());
        }
    }

    order
        .into_iter()
        .filter_map(|label| by_label.remove(&label))
        .collect()
}

/// Assign every match its occurrence signature and 1-based ordinal, so a
/// caller can address "the 2nd phone number" independent of byte offsets.
pub fn manual_candidates(matches: &[DetectedMatch]) -> Vec<ManualCandidate> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    matches
        .iter()
        .enumerate()
        .map(|(id, m)| {
            let signature = m.signature();
            let occurrence = counts
                .entry(signature.clone())
                .and_modify(|c| *c += 1)
                .or_insert(1);
            ManualCandidate {
                id,
                matched: m.clone(),
                signature,
                occurrence: *occurrence,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use regex::Regex;
    use veil_rules::{default_patterns, Severity};

    static RE_WIDE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"abc \d{3}-\d{2}").ok());
    static RE_NARROW: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\d{3}-\d{2}").ok());
    static RE_ABCD: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"abcd").ok());
    static RE_CDEF: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"cdef").ok());
    static RE_BROKEN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(unclosed").ok());

    fn pattern(
        key: &'static str,
        regex: &'static Lazy<Option<Regex>>,
    ) -> veil_rules::DetectionPattern {
        veil_rules::DetectionPattern {
            key,
            label: key,
            severity: Severity::Medium,
            regex,
            group: 0,
            validate: None,
        }
    }

    #[test]
    fn test_ssn_and_email_example() {
        let text = "SSN: 123-45-6789 Email: jane@example.com";
        let matches = detect_matches(text, default_patterns());

        let ssn: Vec<_> = matches.iter().filter(|m| m.key.starts_with("ssn")).collect();
        assert_eq!(ssn.len(), 1);
        assert_eq!(ssn[0].value, "123-45-6789");

        let email: Vec<_> = matches.iter().filter(|m| m.key == "email").collect();
        assert_eq!(email.len(), 1);
        assert_eq!(email[0].value, "jane@example.com");

        assert_non_overlapping(&matches);
    }

    #[test]
    fn test_credit_card_example() {
        let text = "Credit Card: 4111-1111-1111-1111";
        let matches = detect_matches(text, default_patterns());
        let cards: Vec<_> = matches.iter().filter(|m| m.key == "creditCard").collect();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].value, "4111-1111-1111-1111");
    }

    #[test]
    fn test_luhn_validator_rejects() {
        // same shape, bad checksum
        let text = "Credit Card: 4111-1111-1111-1112";
        let matches = detect_matches(text, default_patterns());
        assert!(matches.iter().all(|m| m.key != "creditCard"));
    }

    #[test]
    fn test_longest_match_wins() {
        let text = "xx abc 123-45 yy";
        let patterns = vec![pattern("narrow", &RE_NARROW), pattern("wide", &RE_WIDE)];
        let matches = detect_matches(text, &patterns);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].key, "wide");
        assert_eq!(matches[0].value, "abc 123-45");
    }

    #[test]
    fn test_equal_length_tie_breaks_to_earliest() {
        // equal-length candidates contesting "cd": the earlier one wins,
        // regardless of catalogue order
        let text = "abcdef";
        let patterns = vec![pattern("late", &RE_CDEF), pattern("early", &RE_ABCD)];
        let matches = detect_matches(text, &patterns);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].key, "early");
        assert_eq!(matches[0].index, 0);
    }

    #[test]
    fn test_broken_pattern_does_not_blind_the_rest() {
        let text = "abc 123-45";
        let patterns = vec![pattern("broken", &RE_BROKEN), pattern("wide", &RE_WIDE)];
        let matches = detect_matches(text, &patterns);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].key, "wide");
    }

    #[test]
    fn test_output_sorted_and_idempotent() {
        let text = "SSN: 123-45-6789, card 4111-1111-1111-1111, ip 10.0.0.1, \
                    Email: a@b.co, Name: Jane Doe, zip 62704";
        let first = detect_matches(text, default_patterns());
        let second = detect_matches(text, default_patterns());
        assert_eq!(first, second);
        assert_non_overlapping(&first);
        for pair in first.windows(2) {
            assert!(pair[0].index <= pair[1].index);
        }
    }

    #[test]
    fn test_address_beats_embedded_zip() {
        let text = "ship to 123 Main Street, Springfield, IL 62704 today";
        let matches = detect_matches(text, default_patterns());
        assert!(matches.iter().any(|m| m.key == "streetAddress"));
        assert!(matches.iter().all(|m| m.key != "zipCode"));
    }

    #[test]
    fn test_summarize() {
        let text = "a@b.co then c@d.org then a@b.co and 10.0.0.1";
        let matches = detect_matches(text, default_patterns());
        let summary = summarize_matches(&matches);
        let email = summary.iter().find(|s| s.label == "Email Address").unwrap();
        assert_eq!(email.count, 3);
        assert_eq!(email.samples, vec!["a@b.co", "c@d.org"]);
        // first-seen order: email appears before ip
        assert_eq!(summary[0].label, "Email Address");
    }

    #[test]
    fn test_manual_candidate_occurrences() {
        let text = "a@b.co x a@b.co y c@d.org";
        let matches = detect_matches(text, default_patterns());
        let candidates = manual_candidates(&matches);
        assert_eq!(candidates[0].signature, "email::a@b.co");
        assert_eq!(candidates[0].occurrence, 1);
        assert_eq!(candidates[1].occurrence, 2);
        assert_eq!(candidates[2].occurrence, 1);
    }

    fn assert_non_overlapping(matches: &[DetectedMatch]) {
        for pair in matches.windows(2) {
            assert!(
                pair[0].end() <= pair[1].index,
                "overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }
}
