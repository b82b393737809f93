//! Recursive remote tree traversal
//!
//! The traversal is a single sequential walker. Every entry of every listed
//! directory is handled: subdirectories are recursed into in listing order,
//! files are handed to the [`Visitor`]. The visitor decides how expensive
//! a file is; the walker only awaits it, which is where backpressure from
//! the dispatch pool comes in.

use crate::config::MirrorConfig;
use crate::error::Result;
use crate::remote::{join_path, normalize_path, RemoteFs};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use regex::Regex;
use tracing::debug;

/// A leaf file found during traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// File name
    pub name: String,

    /// Remote directory containing the file
    pub containing_path: String,
}

impl DiscoveredFile {
    pub fn new(name: impl Into<String>, containing_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            containing_path: containing_path.into(),
        }
    }

    /// Full remote path of the file
    pub fn remote_path(&self) -> String {
        join_path(&self.containing_path, &self.name)
    }
}

/// Receives traversal events
#[async_trait]
pub trait Visitor: Send {
    /// Called after a directory was listed successfully
    fn enter_dir(&mut self, _path: &str, _depth: usize) {}

    /// Called once per discovered file; an error aborts the traversal
    async fn visit_file(&mut self, file: DiscoveredFile) -> Result<()>;
}

/// Traversal limits
#[derive(Debug, Clone, Default)]
pub struct TraverseOptions {
    /// Deepest directory level listed (root is 0)
    pub max_depth: Option<usize>,

    /// Remote paths matching any of these are skipped
    pub exclude: Vec<Regex>,
}

impl TraverseOptions {
    pub fn from_config(config: &MirrorConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            exclude: config.exclude_patterns.clone(),
        }
    }

    /// Check if a remote path should be skipped
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude.iter().any(|re| re.is_match(path))
    }

    fn within_depth(&self, depth: usize) -> bool {
        self.max_depth.map_or(true, |max| depth <= max)
    }
}

/// Counters collected by a traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraverseStats {
    /// Directories listed
    pub dirs: u64,

    /// Files handed to the visitor
    pub files: u64,

    /// Entries skipped by exclude patterns
    pub excluded: u64,

    /// Directories not entered because of the depth limit
    pub pruned: u64,
}

/// Walk the tree below `root`, visiting every file
///
/// A listing failure aborts the walk and is returned as is; no retry.
pub async fn traverse<R, V>(
    remote: &R,
    root: &str,
    options: &TraverseOptions,
    visitor: &mut V,
) -> Result<TraverseStats>
where
    R: RemoteFs + ?Sized,
    V: Visitor + ?Sized,
{
    let mut stats = TraverseStats::default();
    walk_dir(remote, normalize_path(root), 0, options, visitor, &mut stats).await?;
    Ok(stats)
}

fn walk_dir<'a, R, V>(
    remote: &'a R,
    path: String,
    depth: usize,
    options: &'a TraverseOptions,
    visitor: &'a mut V,
    stats: &'a mut TraverseStats,
) -> BoxFuture<'a, Result<()>>
where
    R: RemoteFs + ?Sized,
    V: Visitor + ?Sized,
{
    async move {
        let entries = remote.list_dir(&path).await?;
        stats.dirs += 1;
        visitor.enter_dir(&path, depth);
        debug!(path = %path, entries = entries.len(), depth, "Listed directory");

        for entry in entries {
            let child = join_path(&path, &entry.name);
            if options.is_excluded(&child) {
                debug!(path = %child, "Excluded");
                stats.excluded += 1;
                continue;
            }

            if entry.is_dir {
                if !options.within_depth(depth + 1) {
                    stats.pruned += 1;
                    continue;
                }
                walk_dir(remote, child, depth + 1, options, &mut *visitor, &mut *stats).await?;
            } else {
                stats.files += 1;
                visitor
                    .visit_file(DiscoveredFile::new(entry.name, path.clone()))
                    .await?;
            }
        }

        Ok(())
    }
    .boxed()
}
