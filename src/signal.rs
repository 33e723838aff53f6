//! Shutdown signals.
//!
//! Ctrl-C (and SIGTERM on Unix) cancels the token driving the watch loop,
//! so the binary drains what it has and exits through the normal path.

use dirsweep_core::CancelToken;
use std::future::Future;
use std::io;
use std::thread;
use tracing::{info, warn};

/// Cancel `token` when the process is asked to shut down.
///
/// Signals are received on a dedicated thread running a small
/// current-thread runtime; the sweep itself stays synchronous.
pub fn cancel_on_shutdown(token: CancelToken) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    thread::Builder::new()
        .name("dirsweep-signal".into())
        .spawn(move || runtime.block_on(cancel_after(token, shutdown_signal())))?;
    Ok(())
}

async fn cancel_after(token: CancelToken, signal: impl Future<Output = io::Result<()>>) {
    match signal.await {
        Ok(()) => {
            info!("shutdown requested, stopping");
            token.cancel();
        }
        Err(err) => warn!("cannot listen for shutdown signals: {err}"),
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}
