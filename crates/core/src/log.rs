//! Explicit log-context propagation (spec §9 "Global mutable state").
//!
//! A [`LogContext`] is bound for the lifetime of one `process()` call (client)
//! or one session thread (server) and threaded through the work-engine and
//! server API surface. A thread-local fallback lets deeply nested filesystem
//! helpers that were not handed the context explicitly still record the last
//! error, matching the source tool's thread-local logger pointer while giving
//! the public API an explicit, testable contract.

use std::cell::RefCell;
use std::sync::{Arc, Mutex};

use tracing::Span;

use crate::error::CoreError;

struct Inner {
    span: Span,
    last_error: Mutex<Option<String>>,
}

/// A cheaply-cloneable handle bound to one logical operation.
#[derive(Clone)]
pub struct LogContext {
    inner: Arc<Inner>,
}

impl LogContext {
    /// Creates a new context rooted at `span`.
    #[must_use]
    pub fn new(span: Span) -> Self {
        Self {
            inner: Arc::new(Inner {
                span,
                last_error: Mutex::new(None),
            }),
        }
    }

    /// Returns the tracing span this context logs under.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.inner.span
    }

    /// Records `error` as the most recent failure observed on this context,
    /// enters the span, and emits a `warn` event.
    pub fn record_error(&self, error: &CoreError) {
        let _guard = self.inner.span.enter();
        tracing::warn!(error = %error, "operation failed");
        *self.inner.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(error.to_string());
    }

    /// Clears the last-error slot. Called between retries so a stale error
    /// does not outlive the attempt that produced it.
    pub fn clear_last_error(&self) {
        *self.inner.last_error.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Returns the last recorded error message, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Installs this context as the thread-local fallback for the current
    /// thread and runs `f` while it is active.
    pub fn with_current<R>(&self, f: impl FnOnce() -> R) -> R {
        CURRENT.with(|cell| {
            let previous = cell.borrow_mut().replace(self.clone());
            let result = f();
            *cell.borrow_mut() = previous;
            result
        })
    }

    /// Returns the thread-local fallback context, if one is installed.
    #[must_use]
    pub fn current() -> Option<Self> {
        CURRENT.with(|cell| cell.borrow().clone())
    }
}

thread_local! {
    static CURRENT: RefCell<Option<LogContext>> = const { RefCell::new(None) };
}
