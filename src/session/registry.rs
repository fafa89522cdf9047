//! Per-operator background tasks
//!
//! At most one task runs per operator. Starting a new one cancels the old one
//! and waits for it to finish first, so two tasks never write to the same
//! conversation at once.

use crate::domain::OperatorId;

use std::collections::HashMap;
use std::future::Future;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Entry {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Entry {
    async fn stop(self, owner: OperatorId) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                log::error!("Background task for {} failed: {}", owner, e);
            }
        }
    }
}

/// Registry of cancellable tasks keyed by operator
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<OperatorId, Entry>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `make(token)` for `owner`, replacing any running task
    ///
    /// The previous task has fully stopped before the new one is spawned.
    pub async fn register<F, Fut>(&self, owner: OperatorId, make: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        if let Some(previous) = tasks.remove(&owner) {
            log::debug!("Replacing background task for {}", owner);
            previous.stop(owner).await;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(make(cancel.clone()));
        tasks.insert(owner, Entry { cancel, task });
    }

    /// Cancel the task of `owner` and wait until it has stopped
    ///
    /// Returns false when nothing was running.
    pub async fn cancel_and_await(&self, owner: OperatorId) -> bool {
        let entry = self.tasks.lock().await.remove(&owner);
        match entry {
            Some(entry) => {
                entry.stop(owner).await;
                true
            }
            None => false,
        }
    }

    /// Stop every task; returns how many were running
    pub async fn cancel_all(&self) -> usize {
        let entries: Vec<(OperatorId, Entry)> = self.tasks.lock().await.drain().collect();
        let count = entries.len();
        for (owner, entry) in entries {
            entry.stop(owner).await;
        }
        count
    }

    /// Whether `owner` has a task that has not finished yet
    pub async fn is_running(&self, owner: OperatorId) -> bool {
        self.tasks
            .lock()
            .await
            .get(&owner)
            .is_some_and(|entry| !entry.task.is_finished())
    }

    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.lock().await.is_empty()
    }
}
