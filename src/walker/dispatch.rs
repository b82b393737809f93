//! Bounded dispatch of terminal actions
//!
//! ```text
//!   traverse ──visit_file──► classify ──Ignore──► (counted, dropped)
//!                               │
//!                   acquire slot (awaits when N busy)
//!                               │
//!                   ┌───────────┼───────────┐
//!               worker 1    worker 2 ...  worker N     (tokio tasks)
//!                   └───────────┼───────────┘
//!                               ▼
//!                    outcome channel (unbounded)
//!                               ▼
//!                      aggregator task  ── owns the failure log
//! ```
//!
//! A failing worker never cancels its siblings. The aggregator is the only
//! place failures are stored; the first one it receives stays first.

use crate::classify::Action;
use crate::config::MirrorConfig;
use crate::error::{ActionError, FileFailure, MirrorError, Result};
use crate::output::{copy_file, pointer_file_name, write_pointer};
use crate::remote::RemoteFs;
use crate::walker::stats::MirrorStats;
use crate::walker::traverse::{DiscoveredFile, Visitor};
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, warn};

/// Result of one terminal action
#[derive(Debug)]
pub enum WorkOutcome {
    /// Action completed
    Done {
        path: String,
        action: Action,
        bytes: u64,
    },

    /// Action failed
    Failed(FileFailure),
}

/// Pool of at most `worker_count` concurrent workers
pub struct DispatchPool<R: ?Sized> {
    remote: Arc<R>,
    config: Arc<MirrorConfig>,
    stats: Arc<MirrorStats>,
    slots: Arc<Semaphore>,
    tasks: JoinSet<()>,
    outcome_tx: mpsc::UnboundedSender<WorkOutcome>,
    aggregator: JoinHandle<Vec<FileFailure>>,
}

impl<R> DispatchPool<R>
where
    R: RemoteFs + ?Sized + 'static,
{
    /// Create a pool sized by `config.worker_count`
    ///
    /// Must be called inside a tokio runtime (the aggregator is spawned here).
    pub fn new(remote: Arc<R>, config: Arc<MirrorConfig>, stats: Arc<MirrorStats>) -> Self {
        let slots = Arc::new(Semaphore::new(config.worker_count.max(1)));
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let aggregator = tokio::spawn(aggregate(outcome_rx, Arc::clone(&stats)));

        Self {
            remote,
            config,
            stats,
            slots,
            tasks: JoinSet::new(),
            outcome_tx,
            aggregator,
        }
    }

    /// Run `action` for `file` on a worker, waiting for a free slot first
    pub async fn dispatch(&mut self, file: DiscoveredFile, action: Action) -> Result<()> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| MirrorError::PoolClosed)?;

        self.reap_finished();

        let remote = Arc::clone(&self.remote);
        let config = Arc::clone(&self.config);
        let stats = Arc::clone(&self.stats);
        let tx = self.outcome_tx.clone();

        self.tasks.spawn(async move {
            stats.worker_started();
            let path = file.remote_path();

            let outcome = match AssertUnwindSafe(run_action(&*remote, &config, &file, action))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(panic) => WorkOutcome::Failed(FileFailure {
                    path,
                    action,
                    error: ActionError::Panicked(panic_message(panic.as_ref())),
                }),
            };

            stats.worker_finished();
            drop(permit);

            // Only fails once the aggregator is gone, which happens after all senders drop
            let _ = tx.send(outcome);
        });

        Ok(())
    }

    /// Drop handles of workers that already finished
    fn reap_finished(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(e) = joined {
                error!(error = %e, "Worker task failed to join");
            }
        }
    }

    /// Wait for every dispatched worker and return all recorded failures,
    /// in the order the aggregator received them
    pub async fn finish(self) -> Result<Vec<FileFailure>> {
        let DispatchPool {
            mut tasks,
            outcome_tx,
            aggregator,
            ..
        } = self;

        drop(outcome_tx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Worker task failed to join");
            }
        }

        aggregator
            .await
            .map_err(|e| MirrorError::TaskFailed(e.to_string()))
    }
}

#[async_trait]
impl<R> Visitor for DispatchPool<R>
where
    R: RemoteFs + ?Sized + 'static,
{
    fn enter_dir(&mut self, _path: &str, _depth: usize) {
        self.stats.record_dir();
    }

    async fn visit_file(&mut self, file: DiscoveredFile) -> Result<()> {
        self.stats.record_file();

        let action = self.config.classifier.classify(&file.name);
        if action == Action::Ignore {
            debug!(path = %file.remote_path(), "Ignored");
            self.stats.record_ignored();
            return Ok(());
        }

        self.dispatch(file, action).await
    }
}

/// Perform the terminal action for one file
async fn run_action<R: RemoteFs + ?Sized>(
    remote: &R,
    config: &MirrorConfig,
    file: &DiscoveredFile,
    action: Action,
) -> WorkOutcome {
    let path = file.remote_path();
    let local_dir = config.local_dir(&file.containing_path);

    let result = match action {
        Action::Pointer => write_pointer(
            &config.pointer_base,
            &path,
            &local_dir,
            &pointer_file_name(&file.name),
        )
        .await
        .map(|_| 0),
        Action::FullCopy => copy_file(remote, &path, &local_dir).await,
        Action::Ignore => Ok(0),
    };

    match result {
        Ok(bytes) => WorkOutcome::Done {
            path,
            action,
            bytes,
        },
        Err(error) => WorkOutcome::Failed(FileFailure {
            path,
            action,
            error,
        }),
    }
}

/// Single owner of the failure log
async fn aggregate(
    mut rx: mpsc::UnboundedReceiver<WorkOutcome>,
    stats: Arc<MirrorStats>,
) -> Vec<FileFailure> {
    let mut failures = Vec::new();

    while let Some(outcome) = rx.recv().await {
        match outcome {
            WorkOutcome::Done {
                path,
                action,
                bytes,
            } => {
                debug!(path = %path, action = %action, bytes, "Done");
                stats.record_done(action, bytes);
            }
            WorkOutcome::Failed(failure) => {
                warn!(path = %failure.path, error = %failure.error, "{}", failure);
                stats.record_failure();
                failures.push(failure);
            }
        }
    }

    failures
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
