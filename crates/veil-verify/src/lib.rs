//! Post-sanitization safety gate.
//!
//! After any rewrite, the output is re-scanned before export is allowed.
//! Hide mode must be complete by construction, so any residual high-risk
//! match is a bug and blocks unconditionally. Replace mode blocks only when
//! a selected original value survived byte-identical at its original
//! location; that narrow case may be overridden by an explicit, logged
//! caller decision.

use serde::{Deserialize, Serialize};
use veil_core::{detect_matches, DetectedMatch};
use veil_rules::DetectionPattern;

/// Pattern keys whose leakage is unacceptable under any export mode absent
/// explicit override: financial, government-ID, and contact-identifier keys.
pub const HIGH_RISK_KEYS: &[&str] = &[
    "ssn",
    "ssnLabeled",
    "creditCard",
    "bankAccount",
    "routingNumber",
    "cvv",
    "passport",
    "driversLicense",
    "email",
    "phone",
];

pub fn is_high_risk(key: &str) -> bool {
    HIGH_RISK_KEYS.contains(&key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateVerdict {
    /// Export may proceed.
    Pass,
    /// Export is blocked; no override exists.
    Blocked,
    /// Export is blocked but a knowing caller may override.
    BlockedOverridable,
}

/// One piece of PII still present in the sanitized output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidualFinding {
    pub key: String,
    #[serde(rename = "type")]
    pub label: String,
    pub index: usize,
    pub length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateReport {
    pub verdict: GateVerdict,
    pub residual: Vec<ResidualFinding>,
    pub message: String,
}

impl GateReport {
    pub fn passed(&self) -> bool {
        self.verdict == GateVerdict::Pass
    }
}

/// Gate for hide-mode output: re-detect and block on any residual
/// high-risk match. Masking is complete by construction, so a hit here
/// means a match spanned a redaction boundary or similar bug, never a gray
/// area.
pub fn verify_hide(sanitized: &str, patterns: &[DetectionPattern]) -> GateReport {
    let residual: Vec<ResidualFinding> = detect_matches(sanitized, patterns)
        .into_iter()
        .filter(|m| is_high_risk(&m.key))
        .map(finding)
        .collect();

    if residual.is_empty() {
        GateReport {
            verdict: GateVerdict::Pass,
            residual,
            message: "no residual high-risk matches".to_string(),
        }
    } else {
        log::warn!(
            "[gate] hide-mode output still contains {} high-risk match(es), export blocked",
            residual.len()
        );
        GateReport {
            message: format!(
                "{} high-risk match(es) remain after masking; export blocked",
                residual.len()
            ),
            verdict: GateVerdict::Blocked,
            residual,
        }
    }
}

/// Gate for replace-mode output: block only when a selected original value
/// is still byte-identical at its original interval, i.e. the replacement
/// degenerated to a no-op.
///
/// Replacements are length-preserving, so original intervals remain valid
/// in the sanitized text.
pub fn verify_replace(sanitized: &str, replaced: &[DetectedMatch]) -> GateReport {
    let residual: Vec<ResidualFinding> = replaced
        .iter()
        .filter(|m| {
            sanitized
                .get(m.index..m.end())
                .map(|slice| slice == m.value)
                .unwrap_or(false)
        })
        .map(|m| finding(m.clone()))
        .collect();

    if residual.is_empty() {
        GateReport {
            verdict: GateVerdict::Pass,
            residual,
            message: "all selected values were substituted".to_string(),
        }
    } else {
        log::warn!(
            "[gate] {} replacement(s) were no-ops; export blocked pending override",
            residual.len()
        );
        GateReport {
            message: format!(
                "{} selected value(s) survived substitution; export blocked (override available)",
                residual.len()
            ),
            verdict: GateVerdict::BlockedOverridable,
            residual,
        }
    }
}

/// Record a caller's explicit decision to export despite an overridable
/// block. The decision is logged; a non-overridable block stays blocked.
pub fn apply_override(report: &GateReport) -> bool {
    match report.verdict {
        GateVerdict::Pass => true,
        GateVerdict::BlockedOverridable => {
            log::warn!(
                "[gate] caller override accepted for {} residual finding(s)",
                report.residual.len()
            );
            true
        }
        GateVerdict::Blocked => {
            log::warn!("[gate] override refused: block is not overridable");
            false
        }
    }
}

fn finding(m: DetectedMatch) -> ResidualFinding {
    ResidualFinding {
        index: m.index,
        length: m.length,
        key: m.key,
        label: m.label,
    }
}
