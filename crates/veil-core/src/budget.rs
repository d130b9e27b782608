//! Time budgets for the stages that wrap external collaborators.
//!
//! Document decoding, OCR, and DOCX rewriting all run against opaque
//! engines; each call gets a budget, and a blown budget is reported exactly
//! like any other failure of that stage: abort, surface the error, apply
//! nothing partially.

use crate::{CoreError, Result};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub const DECODE_BUDGET: Duration = Duration::from_secs(30);
pub const DOCX_REWRITE_BUDGET: Duration = Duration::from_secs(20);
pub const OCR_INIT_BUDGET: Duration = Duration::from_secs(45);
pub const OCR_PAGE_BUDGET: Duration = Duration::from_secs(30);

/// Run `f` on a worker thread, failing with `CoreError::Timeout` when
/// `limit` elapses first. The elapsed budget lands in the error message.
pub fn run_with_budget<T, F>(stage: &'static str, limit: Duration, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(f());
    });

    match rx.recv_timeout(limit) {
        Ok(value) => Ok(value),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            let budget_ms = limit.as_millis() as u64;
            log::warn!("[budget] stage '{stage}' exceeded {budget_ms} ms");
            Err(CoreError::Timeout { stage, budget_ms })
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(CoreError::StageFailed {
            stage,
            message: "worker exited without a result".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_budget() {
        let result = run_with_budget("decode", Duration::from_secs(1), || 41 + 1);
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_timeout_reports_budget() {
        let result = run_with_budget("ocr-page", Duration::from_millis(10), || {
            thread::sleep(Duration::from_millis(500));
        });
        let err = result.unwrap_err();
        assert!(matches!(err, CoreError::Timeout { budget_ms: 10, .. }));
        assert!(err.to_string().contains("10 ms"));
    }
}
