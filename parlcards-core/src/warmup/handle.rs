//! Background warmup task

use super::orchestrator::WarmupOrchestrator;
use super::state::{WarmupReport, WarmupStatus};
use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to an orchestrator running on its own task
///
/// [`shutdown`](Self::shutdown) cancels cooperatively and waits for the task,
/// so progress is persisted before the shared client is dropped.
pub struct WarmupHandle {
    cancel: CancellationToken,
    status: watch::Receiver<WarmupStatus>,
    task: JoinHandle<Result<WarmupReport>>,
}

impl WarmupHandle {
    pub fn spawn(orchestrator: WarmupOrchestrator) -> Self {
        let cancel = CancellationToken::new();
        let status = orchestrator.subscribe();
        let token = cancel.clone();
        let task = tokio::spawn(async move { orchestrator.run(&token).await });

        Self {
            cancel,
            status,
            task,
        }
    }

    /// Latest published status
    pub fn status(&self) -> WarmupStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<WarmupStatus> {
        self.status.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Request cancellation without waiting
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run to end on its own
    pub async fn join(self) -> Result<WarmupReport> {
        self.task.await.context("Warmup task aborted")?
    }

    /// Cancel and wait for the task to persist progress and exit
    pub async fn shutdown(self) -> Result<WarmupReport> {
        tracing::info!("Stopping warmup");
        self.cancel.cancel();
        self.join().await
    }
}
