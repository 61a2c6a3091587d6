// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # I/O Shutdown Token
//!
//! A single process-wide cancellation token (§4.8) observed by every public
//! engine entry point (`createWritable`, `load`, `openForRead`,
//! `loadForDelete`, every chunk read/write) and by the verifier's poll
//! loop. `abort` is idempotent: calling it twice (e.g. once from a signal
//! handler, once from an `IOABORT` bubbled up by a failing read) only ever
//! records the first reason.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::StrubsError;

#[derive(Debug, Default)]
struct Inner {
    aborted: AtomicBool,
    reason: Mutex<Option<String>>,
    notify: Notify,
}

/// Cloneable handle onto one process-wide shutdown token.
///
/// Cloning is cheap (an `Arc` bump); every clone observes the same abort
/// state. Construct exactly one per process and thread it through the
/// composition root (`strubs-bootstrap`) into every engine service.
#[derive(Debug, Clone, Default)]
pub struct IoShutdownToken {
    inner: Arc<Inner>,
}

impl IoShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token aborted. Idempotent: only the first call's `reason`
    /// is retained; later calls are no-ops beyond waking waiters.
    pub fn abort(&self, reason: impl Into<String>) {
        if !self.inner.aborted.swap(true, Ordering::SeqCst) {
            *self.inner.reason.lock() = Some(reason.into());
        }
        self.inner.notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Fails fast with `IOABORT` if the token has been aborted; otherwise a
    /// no-op. Every public engine entry point calls this first (§4.8).
    pub fn throw_if_aborted(&self) -> Result<(), StrubsError> {
        if self.is_aborted() {
            let reason = self.inner.reason.lock().clone().unwrap_or_else(|| "shutdown requested".to_string());
            return Err(StrubsError::aborted(reason));
        }
        Ok(())
    }

    /// Resolves once the token is aborted, for callers (the verifier's
    /// `stop()`) that need to await cancellation rather than poll it.
    pub async fn aborted(&self) {
        if self.is_aborted() {
            return;
        }
        self.inner.notify.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_aborted() {
        let token = IoShutdownToken::new();
        assert!(!token.is_aborted());
        assert!(token.throw_if_aborted().is_ok());
    }

    #[test]
    fn abort_is_observed_by_clones() {
        let token = IoShutdownToken::new();
        let clone = token.clone();
        token.abort("shutting down");
        assert!(clone.is_aborted());
        let err = clone.throw_if_aborted().unwrap_err();
        assert_eq!(err.code(), "IOABORT");
        assert!(err.is_cancellation());
    }

    #[test]
    fn abort_is_idempotent_keeps_first_reason() {
        let token = IoShutdownToken::new();
        token.abort("first");
        token.abort("second");
        let err = token.throw_if_aborted().unwrap_err();
        assert!(err.to_string().contains("first"));
    }

    #[tokio::test]
    async fn aborted_future_resolves_after_abort() {
        let token = IoShutdownToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.aborted().await;
        });
        token.abort("stop");
        handle.await.unwrap();
    }
}
