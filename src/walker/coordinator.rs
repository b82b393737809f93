//! Mirror coordinator - runs one traversal feeding the dispatch pool
//!
//! The run is complete only once the walk has finished AND every worker it
//! dispatched has drained. Per-file failures never stop the run; a listing
//! failure stops discovery but in-flight workers still finish.

use crate::config::MirrorConfig;
use crate::error::{FileFailure, MirrorError, Result};
use crate::remote::RemoteFs;
use crate::walker::dispatch::DispatchPool;
use crate::walker::stats::{MirrorProgress, MirrorStats};
use crate::walker::traverse::{traverse, TraverseOptions, TraverseStats};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Outcome of a completed run
#[derive(Debug)]
pub struct MirrorReport {
    pub total_dirs: u64,
    pub total_files: u64,
    pub pointers_written: u64,
    pub files_copied: u64,
    pub ignored: u64,
    pub excluded: u64,
    pub bytes_copied: u64,
    pub peak_workers: usize,
    pub duration: Duration,

    /// Set when the traversal aborted (listing failure)
    pub walk_error: Option<MirrorError>,

    /// Every failed file, first recorded first
    pub failures: Vec<FileFailure>,
}

impl MirrorReport {
    /// True when the walk completed and no file failed
    pub fn is_success(&self) -> bool {
        self.walk_error.is_none() && self.failures.is_empty()
    }

    /// First recorded file failure
    pub fn first_failure(&self) -> Option<&FileFailure> {
        self.failures.first()
    }

    /// Run-level result: the walk error if any, else the first file failure
    pub fn into_result(self) -> Result<()> {
        if let Some(e) = self.walk_error {
            return Err(e);
        }
        match self.failures.into_iter().next() {
            Some(failure) => Err(failure.into()),
            None => Ok(()),
        }
    }
}

/// Orchestrates one mirror run against a remote filesystem
pub struct MirrorCoordinator<R: ?Sized> {
    config: Arc<MirrorConfig>,
    remote: Arc<R>,
    stats: Arc<MirrorStats>,
    started: Instant,
}

impl<R> MirrorCoordinator<R>
where
    R: RemoteFs + ?Sized + 'static,
{
    pub fn new(config: MirrorConfig, remote: Arc<R>) -> Self {
        Self {
            config: Arc::new(config),
            remote,
            stats: Arc::new(MirrorStats::default()),
            started: Instant::now(),
        }
    }

    /// Current progress snapshot
    pub fn progress(&self) -> MirrorProgress {
        self.stats
            .progress(self.config.worker_count, self.started.elapsed())
    }

    /// Run and collapse the report into the run-level result
    pub async fn run(&self) -> Result<()> {
        self.run_report().await.into_result()
    }

    /// Run the mirror and return the full report
    pub async fn run_report(&self) -> MirrorReport {
        let start = Instant::now();

        info!(
            root = %self.config.remote_root,
            local = %self.config.local_root.display(),
            workers = self.config.worker_count,
            "Starting mirror"
        );

        let options = TraverseOptions::from_config(&self.config);
        let mut pool = DispatchPool::new(
            Arc::clone(&self.remote),
            Arc::clone(&self.config),
            Arc::clone(&self.stats),
        );

        let walked = traverse(&*self.remote, &self.config.remote_root, &options, &mut pool).await;

        let (walk_stats, walk_error) = match walked {
            Ok(stats) => (stats, None),
            Err(e) => {
                warn!(error = %e, "Traversal aborted, waiting for in-flight workers");
                (TraverseStats::default(), Some(e))
            }
        };

        let (failures, walk_error) = match pool.finish().await {
            Ok(failures) => (failures, walk_error),
            Err(e) => (Vec::new(), walk_error.or(Some(e))),
        };

        let duration = start.elapsed();
        let report = MirrorReport {
            total_dirs: self.stats.dirs_listed.load(Ordering::Relaxed),
            total_files: self.stats.files_found.load(Ordering::Relaxed),
            pointers_written: self.stats.pointers_written.load(Ordering::Relaxed),
            files_copied: self.stats.files_copied.load(Ordering::Relaxed),
            ignored: self.stats.ignored.load(Ordering::Relaxed),
            excluded: walk_stats.excluded,
            bytes_copied: self.stats.bytes_copied.load(Ordering::Relaxed),
            peak_workers: self.stats.peak_workers.load(Ordering::SeqCst),
            duration,
            walk_error,
            failures,
        };

        info!(
            dirs = report.total_dirs,
            files = report.total_files,
            pointers = report.pointers_written,
            copies = report.files_copied,
            failed = report.failures.len(),
            duration_secs = duration.as_secs(),
            "Mirror completed"
        );

        report
    }
}
