//! Remote filesystem access
//!
//! The mirror engine consumes exactly two capabilities from a remote
//! filesystem: listing a directory and opening a read stream for a file.
//! Both are expressed by the [`RemoteFs`] trait.
//!
//! # Backends
//!
//! ```text
//! ┌───────────────────────────┐   ┌───────────────────────────┐
//! │       WebDavClient        │   │       MemoryRemote        │
//! │  - PROPFIND Depth: 1      │   │  - in-process tree        │
//! │  - GET streamed body      │   │  - failure injection      │
//! │  - shared via Arc         │   │  - used by tests/benches  │
//! └─────────────┬─────────────┘   └─────────────┬─────────────┘
//!               └──────────────┬────────────────┘
//!                              ▼
//!                      trait RemoteFs
//! ```

pub mod memory;
pub mod propfind;
pub mod webdav;

use crate::error::RemoteResult;
use async_trait::async_trait;
use std::pin::Pin;
use tokio::io::AsyncRead;

pub use memory::MemoryRemote;
pub use webdav::{WebDavClient, WebDavClientBuilder};

/// Byte stream for the contents of a remote file
pub type RemoteReader = Pin<Box<dyn AsyncRead + Send>>;

/// One entry of a remote directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Entry name (single path component, decoded)
    pub name: String,

    /// Whether the entry is a directory
    pub is_dir: bool,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Capabilities the mirror engine needs from a remote filesystem
///
/// Implementations are shared read-only across all workers, so they must
/// be safe for concurrent use.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// List the entries of a directory, in server order
    async fn list_dir(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>>;

    /// Open a read stream for a file
    async fn open_read(&self, path: &str) -> RemoteResult<RemoteReader>;
}

#[async_trait]
impl<T: RemoteFs + ?Sized> RemoteFs for std::sync::Arc<T> {
    async fn list_dir(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>> {
        (**self).list_dir(path).await
    }

    async fn open_read(&self, path: &str) -> RemoteResult<RemoteReader> {
        (**self).open_read(path).await
    }
}

/// Join a remote directory path and an entry name
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Normalize a remote path: leading slash, no trailing slash, `/` for empty
///
/// `""` and `"/"` become `"/"`, `"movies/"` becomes `"/movies"`. Whitespace
/// is part of the name and kept as is.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Last component of a remote path
pub fn base_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}
