//! strm-mirror - Mirror a WebDAV media tree into .strm files
//!
//! Walks a remote WebDAV share and reproduces its directory layout locally.
//! Media files become tiny `.strm` pointer files holding a direct-link URL,
//! sidecar files (subtitles, artwork, NFO metadata) are downloaded in full,
//! and everything else is skipped.
//!
//! # Features
//!
//! - **Bounded Concurrency**: A fixed pool of workers (default 10) performs
//!   downloads and pointer writes; the walker waits when the pool is full.
//!
//! - **Keeps Going on Failure**: A failing file never cancels its
//!   siblings. Every failure is recorded, the first one becomes the run's
//!   error once all work has drained.
//!
//! - **Pluggable Remote**: The engine only needs directory listings and
//!   read streams ([`remote::RemoteFs`]); WebDAV and in-memory backends
//!   are provided.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  WebDAV server (e.g. AList)                      │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ PROPFIND / GET
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │   traverse ──► classify ──► DispatchPool (N slots)               │
//! │                                 │                                │
//! │                   ┌─────────────┴─────────────┐                  │
//! │                   ▼                           ▼                  │
//! │            write_pointer                 copy_file               │
//! │           (Foo.mkv → Foo.strm)       (Foo.nfo → Foo.nfo)         │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!                     local directory tree
//! ```
//!
//! # Example
//!
//! ```bash
//! strm-mirror -a http://nas:5244/dav -u admin -p secret -r /movies -l ./library
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod output;
pub mod progress;
pub mod remote;
pub mod walker;

pub use classify::{Action, Classifier, ExtensionSet};
pub use config::{CliArgs, MirrorConfig};
pub use error::{MirrorError, Result};
pub use remote::{MemoryRemote, RemoteEntry, RemoteFs, WebDavClient, WebDavClientBuilder};
pub use walker::{MirrorCoordinator, MirrorReport};
