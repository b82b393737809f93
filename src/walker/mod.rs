//! Concurrent mirror engine
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │   MirrorCoordinator     │
//!                     │  - one sequential walk  │
//!                     │  - PROPFIND per dir     │
//!                     └───────────┬─────────────┘
//!                                 │ DiscoveredFile
//!                                 ▼
//!                     ┌─────────────────────────┐
//!                     │     DispatchPool        │
//!                     │  - classify by ext      │
//!                     │  - semaphore, N slots   │
//!                     └───────────┬─────────────┘
//!       ┌─────────────────────────┼─────────────────────────┐
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼─────┐
//! │  Worker 1 │             │  Worker 2 │             │  Worker N │
//! │ .strm/GET │             │ .strm/GET │             │ .strm/GET │
//! └─────┬─────┘             └─────┬─────┘             └─────┬─────┘
//!       └─────────────────────────┼─────────────────────────┘
//!                                 ▼
//!                        outcome aggregator
//! ```

pub mod coordinator;
pub mod dispatch;
pub mod stats;
pub mod traverse;

pub use coordinator::{MirrorCoordinator, MirrorReport};
pub use dispatch::{DispatchPool, WorkOutcome};
pub use stats::{MirrorProgress, MirrorStats};
pub use traverse::{traverse, DiscoveredFile, TraverseOptions, TraverseStats, Visitor};
