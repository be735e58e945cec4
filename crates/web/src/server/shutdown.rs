//! Graceful shutdown.
//!
//! Listeners register a close task with a [`ShutdownCoordinator`] when they are bound. Running
//! the tasks stops accepting and waits for connections in flight.

use std::sync::{Mutex, PoisonError};

use futures::future::{BoxFuture, join_all};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub type ShutdownTask = BoxFuture<'static, ()>;

/// Sequences the shutdown of everything that registered a close task.
pub trait ShutdownCoordinator: Send + Sync {
    fn add_task(&self, task: ShutdownTask);
}

/// Runs every registered task concurrently on [`shutdown`](Self::shutdown).
#[derive(Default)]
pub struct ShutdownHandler {
    tasks: Mutex<Vec<ShutdownTask>>,
    done: CancellationToken,
}

impl std::fmt::Debug for ShutdownHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("ShutdownHandler").field("pending", &pending).field("done", &self.done.is_cancelled()).finish()
    }
}

impl ShutdownCoordinator for ShutdownHandler {
    fn add_task(&self, task: ShutdownTask) {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).push(task);
    }
}

impl ShutdownHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the registered tasks and waits for all of them.
    ///
    /// Tasks registered later are run by the next call.
    pub async fn shutdown(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        info!(tasks = tasks.len(), "shutting down");
        join_all(tasks).await;
        self.done.cancel();
        info!("shutdown complete");
    }

    /// Resolves once a [`shutdown`](Self::shutdown) has completed.
    pub async fn wait(&self) {
        self.done.cancelled().await;
    }

    /// Waits for SIGINT or SIGTERM, then shuts down.
    ///
    /// If the signal handlers can't be installed nothing is shut down.
    pub async fn listen_for_signals(&self) {
        match wait_for_signal().await {
            Ok(signal) => {
                info!(signal, "received signal");
                self.shutdown().await;
            }
            Err(e) => warn!(cause = %e, "can't listen for shutdown signals"),
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}
