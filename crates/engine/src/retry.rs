//! Retry wrapper implementing the propagation policy of spec §7: a
//! retriable failure is retried up to `retry_count` times with a fixed
//! wait, then counted as a failure; a fatal failure never retries.

use std::thread;
use std::time::Duration;

use core::error::CoreError;
use core::log::LogContext;

use crate::settings::ClientSettings;
use crate::stats::Stats;

/// Runs `op`, retrying while it returns a [`CoreError::is_retriable`] error
/// and the attempt budget remains.
///
/// Clears the context's last-error slot before each attempt so a stale
/// message from a prior file never survives past the attempt that produced
/// it; the final attempt's error, if any, is left recorded.
pub fn with_retry<T>(
    settings: &ClientSettings,
    log_ctx: &LogContext,
    stats: &mut Stats,
    mut op: impl FnMut() -> Result<T, CoreError>,
) -> Result<T, CoreError> {
    let mut attempt = 1u32;
    loop {
        log_ctx.clear_last_error();
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                log_ctx.record_error(&err);
                let retriable = err.is_retriable() && attempt <= settings.retry_count;
                if !retriable {
                    stats.fail_count += 1;
                    return Err(err);
                }
                stats.retry_count += 1;
                attempt += 1;
                thread::sleep(Duration::from_millis(settings.retry_wait_ms));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tracing::Span;

    fn settings(retry_count: u32) -> ClientSettings {
        ClientSettings {
            retry_count,
            retry_wait_ms: 0,
            ..ClientSettings::default()
        }
    }

    #[test]
    fn succeeds_after_retriable_failures_within_budget() {
        let ctx = LogContext::new(Span::none());
        let mut stats = Stats::default();
        let calls = Cell::new(0);
        let result = with_retry(&settings(3), &ctx, &mut stats, || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(CoreError::Network("closed".into()))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(stats.retry_count, 2);
        assert_eq!(stats.fail_count, 0);
    }

    #[test]
    fn gives_up_once_the_budget_is_exhausted() {
        let ctx = LogContext::new(Span::none());
        let mut stats = Stats::default();
        let result: Result<(), CoreError> = with_retry(&settings(2), &ctx, &mut stats, || {
            Err(CoreError::Network("closed".into()))
        });
        assert!(result.is_err());
        assert_eq!(stats.retry_count, 2);
        assert_eq!(stats.fail_count, 1);
    }

    #[test]
    fn a_fatal_error_never_retries() {
        let ctx = LogContext::new(Span::none());
        let mut stats = Stats::default();
        let calls = Cell::new(0);
        let result: Result<(), CoreError> = with_retry(&settings(5), &ctx, &mut stats, || {
            calls.set(calls.get() + 1);
            Err(CoreError::Network("closed".into()).fatal())
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
        assert_eq!(stats.retry_count, 0);
        assert_eq!(stats.fail_count, 1);
    }
}
