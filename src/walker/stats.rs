//! Shared run counters
//!
//! Updated by the traversal, the workers and the outcome aggregator;
//! read by the progress display.

use crate::classify::Action;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Statistics collected during a run
#[derive(Debug, Default)]
pub struct MirrorStats {
    pub dirs_listed: AtomicU64,
    pub files_found: AtomicU64,
    pub pointers_written: AtomicU64,
    pub files_copied: AtomicU64,
    pub ignored: AtomicU64,
    pub failed: AtomicU64,
    pub bytes_copied: AtomicU64,
    pub active_workers: AtomicUsize,
    pub peak_workers: AtomicUsize,
}

impl MirrorStats {
    pub fn record_dir(&self) {
        self.dirs_listed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file(&self) {
        self.files_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_done(&self, action: Action, bytes: u64) {
        match action {
            Action::Pointer => self.pointers_written.fetch_add(1, Ordering::Relaxed),
            Action::FullCopy => self.files_copied.fetch_add(1, Ordering::Relaxed),
            Action::Ignore => self.ignored.fetch_add(1, Ordering::Relaxed),
        };
        self.bytes_copied.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Mark a worker as running and track the high-water mark
    pub fn worker_started(&self) {
        let active = self.active_workers.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_workers.fetch_max(active, Ordering::SeqCst);
    }

    pub fn worker_finished(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }

    /// Point-in-time view for progress display
    pub fn progress(&self, total_workers: usize, elapsed: Duration) -> MirrorProgress {
        MirrorProgress {
            dirs: self.dirs_listed.load(Ordering::Relaxed),
            files: self.files_found.load(Ordering::Relaxed),
            pointers: self.pointers_written.load(Ordering::Relaxed),
            copies: self.files_copied.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes: self.bytes_copied.load(Ordering::Relaxed),
            active_workers: self.active_workers.load(Ordering::Relaxed),
            total_workers,
            elapsed,
        }
    }
}

/// Progress information for display
#[derive(Debug, Clone, Default)]
pub struct MirrorProgress {
    pub dirs: u64,
    pub files: u64,
    pub pointers: u64,
    pub copies: u64,
    pub failed: u64,
    pub bytes: u64,
    pub active_workers: usize,
    pub total_workers: usize,
    pub elapsed: Duration,
}

impl MirrorProgress {
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.files as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_workers() {
        let stats = MirrorStats::default();
        stats.worker_started();
        stats.worker_started();
        stats.worker_finished();
        stats.worker_started();
        stats.worker_finished();
        stats.worker_finished();
        assert_eq!(stats.peak_workers.load(Ordering::SeqCst), 2);
        assert_eq!(stats.active_workers.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_progress_snapshot() {
        let stats = MirrorStats::default();
        stats.record_file();
        stats.record_file();
        stats.record_done(Action::FullCopy, 512);
        stats.record_done(Action::Pointer, 0);

        let progress = stats.progress(10, Duration::from_secs(2));
        assert_eq!(progress.files, 2);
        assert_eq!(progress.copies, 1);
        assert_eq!(progress.pointers, 1);
        assert_eq!(progress.bytes, 512);
        assert_eq!(progress.files_per_second(), 1.0);
    }
}
