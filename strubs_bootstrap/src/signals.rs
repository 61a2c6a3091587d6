// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # OS Signal Handling
//!
//! Listens for SIGINT/SIGTERM (Unix) or Ctrl-C (Windows) and forwards them
//! into an [`IoShutdownToken`], which is the single abort signal every public
//! engine entry point checks. This is the only place in the process that
//! turns an OS signal into that token's `abort()` call.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use strubs_bootstrap::signals::install_signal_handlers;
//! use strubs_domain::io_shutdown::IoShutdownToken;
//!
//! # async fn example() {
//! let token = IoShutdownToken::new();
//! install_signal_handlers(token.clone());
//!
//! token.aborted().await;
//! println!("shutting down");
//! # }
//! ```

use strubs_domain::io_shutdown::IoShutdownToken;

/// Spawns a background task that waits for a termination signal and aborts
/// `token` when one arrives. Returns immediately; the handler runs for the
/// life of the process.
pub fn install_signal_handlers(token: IoShutdownToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        token.abort("received shutdown signal".to_string());
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("failed to install SIGTERM handler: {e}");
            std::future::pending::<()>().await;
            unreachable!()
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("failed to install SIGINT handler: {e}");
            std::future::pending::<()>().await;
            unreachable!()
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        _ = sigint.recv() => tracing::info!("received SIGINT"),
    }
}

#[cfg(windows)]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install Ctrl-C handler: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("received Ctrl-C");
}

#[cfg(not(any(unix, windows)))]
async fn wait_for_signal() {
    std::future::pending::<()>().await;
}
