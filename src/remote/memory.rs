//! In-memory remote filesystem
//!
//! A [`RemoteFs`] backed by a sorted map of paths, with hooks to inject
//! listing failures, open failures, interrupted streams and slow reads.

use crate::error::{RemoteError, RemoteResult};
use crate::remote::{normalize_path, RemoteEntry, RemoteFs, RemoteReader};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::{self, Cursor};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::io::StreamReader;

/// In-memory tree of directories and files
#[derive(Debug, Default)]
pub struct MemoryRemote {
    files: BTreeMap<String, Bytes>,
    dirs: BTreeSet<String>,
    fail_list: HashSet<String>,
    fail_open: HashSet<String>,
    interrupt_after: HashMap<String, usize>,
    read_delay: Option<Duration>,
    list_calls: AtomicU64,
    open_calls: AtomicU64,
    active_reads: AtomicUsize,
    peak_reads: AtomicUsize,
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        let mut remote = Self::default();
        remote.dirs.insert("/".to_string());
        remote
    }

    /// Add a directory (and its ancestors)
    pub fn with_dir(mut self, path: &str) -> Self {
        self.add_dir(&normalize_path(path));
        self
    }

    /// Add a file (and its ancestor directories)
    pub fn with_file(mut self, path: &str, content: impl Into<Bytes>) -> Self {
        let path = normalize_path(path);
        self.add_dir(parent_of(&path));
        self.files.insert(path, content.into());
        self
    }

    /// Make listing `path` fail
    pub fn fail_listing(mut self, path: &str) -> Self {
        self.fail_list.insert(normalize_path(path));
        self
    }

    /// Make opening `path` fail
    pub fn fail_open(mut self, path: &str) -> Self {
        self.fail_open.insert(normalize_path(path));
        self
    }

    /// Deliver `bytes` bytes of `path`, then break the stream
    pub fn interrupt_after(mut self, path: &str, bytes: usize) -> Self {
        self.interrupt_after.insert(normalize_path(path), bytes);
        self
    }

    /// Sleep inside every `open_read` call
    pub fn read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    fn add_dir(&mut self, path: &str) {
        let mut current = path.to_string();
        while self.dirs.insert(current.clone()) && current != "/" {
            current = parent_of(&current).to_string();
        }
    }

    /// Number of `list_dir` calls served
    pub fn list_calls(&self) -> u64 {
        self.list_calls.load(Ordering::Relaxed)
    }

    /// Number of `open_read` calls served
    pub fn open_calls(&self) -> u64 {
        self.open_calls.load(Ordering::Relaxed)
    }

    /// Highest number of `open_read` calls in flight at once
    pub fn peak_reads(&self) -> usize {
        self.peak_reads.load(Ordering::SeqCst)
    }

    /// All file paths in the tree
    pub fn file_paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

#[async_trait]
impl RemoteFs for MemoryRemote {
    async fn list_dir(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        let path = normalize_path(path);

        if self.fail_list.contains(&path) {
            return Err(RemoteError::ListFailed {
                path,
                reason: "injected listing failure".into(),
            });
        }
        if !self.dirs.contains(&path) {
            return Err(RemoteError::NotFound { path });
        }

        let child_name = |child: &str| -> Option<String> {
            if child != "/" && parent_of(child) == path {
                child.rsplit('/').next().map(str::to_string)
            } else {
                None
            }
        };

        let mut entries: Vec<RemoteEntry> = self
            .dirs
            .iter()
            .filter_map(|d| child_name(d).map(RemoteEntry::dir))
            .chain(
                self.files
                    .keys()
                    .filter_map(|f| child_name(f).map(RemoteEntry::file)),
            )
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(entries)
    }

    async fn open_read(&self, path: &str) -> RemoteResult<RemoteReader> {
        self.open_calls.fetch_add(1, Ordering::Relaxed);
        let path = normalize_path(path);

        if let Some(delay) = self.read_delay {
            let active = self.active_reads.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_reads.fetch_max(active, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.active_reads.fetch_sub(1, Ordering::SeqCst);
        }

        if self.fail_open.contains(&path) {
            return Err(RemoteError::OpenFailed {
                path,
                reason: "injected open failure".into(),
            });
        }

        let content = self
            .files
            .get(&path)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound { path: path.clone() })?;

        match self.interrupt_after.get(&path) {
            Some(&limit) => {
                let head = content.slice(..limit.min(content.len()));
                let chunks: Vec<io::Result<Bytes>> = vec![
                    Ok(head),
                    Err(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "injected stream interruption",
                    )),
                ];
                Ok(Box::pin(StreamReader::new(futures::stream::iter(chunks))))
            }
            None => Ok(Box::pin(Cursor::new(content))),
        }
    }
}
