#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Request Path
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  client line ──▶ Session ──▶ Store ──READ──▶ ReadThroughCache ──┐    │
//! │                                │                  (optional)    │    │
//! │                                └──WRITE──▶ Controller ◀─────────┘    │
//! │                                                │                     │
//! │                                                ▼                     │
//! │                                           VectorStore                │
//! │                                  (cells + write counter)             │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Strategy Quick Reference
//!
//! | Strategy | Controller | READ | WRITE | Sum | Lost updates |
//! |----------|------------|------|-------|-----|--------------|
//! | `none` | [`Unsynchronized`] | no lock | load + store, no lock | no lock | possible |
//! | `global` | [`GlobalLock`] | global mutex | global mutex | global mutex | no |
//! | `per-index` | [`PerIndexLock`] | cell mutex | cell mutex | no lock | no |
//! | `reader-writer` | [`ReaderWriterLock`] | shared | exclusive | shared | no |
//!
//! ## Code Examples
//!
//! ### Driving a controller directly
//!
//! ```rust
//! use counter_store::{controller, Strategy};
//!
//! let store = controller::build(Strategy::ReaderWriter, 4).unwrap();
//! assert_eq!(store.increment(1).unwrap(), 1);
//! assert_eq!(store.increment(1).unwrap(), 2);
//! assert_eq!(store.read(1).unwrap(), 2);
//! assert_eq!(store.write_count(), 2);
//! assert_eq!(store.total_sum(), 2);
//! assert!(store.read(4).is_err());
//! ```
//!
//! ### A store with a read cache
//!
//! ```rust
//! use counter_store::config::{BackendKind, CacheConfig, StoreConfig};
//! use counter_store::{Store, Strategy};
//! use core::num::NonZeroUsize;
//!
//! let store = Store::open(StoreConfig {
//!     size: 10,
//!     strategy: Strategy::PerIndex,
//!     cache: Some(CacheConfig {
//!         capacity: NonZeroUsize::new(8).unwrap(),
//!         backend: BackendKind::Controller,
//!     }),
//! })
//! .unwrap();
//!
//! store.write(3).unwrap();
//! assert_eq!(store.read(3).unwrap(), 1);
//! assert_eq!(store.read(3).unwrap(), 1);
//! assert_eq!(store.cache().unwrap().snapshot().core.cache_hits, 2);
//! ```
//!
//! ### Serving one session over an in-memory pipe
//!
//! ```rust
//! use counter_store::config::{SessionConfig, StoreConfig};
//! use counter_store::session::Session;
//! use counter_store::{Store, Strategy};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let store = Store::open(StoreConfig {
//!     size: 10,
//!     strategy: Strategy::Global,
//!     cache: None,
//! })
//! .unwrap();
//!
//! let input: &[u8] = b"2\nWRITE 5\nREAD 5\n";
//! let mut output = Vec::new();
//! let report = Session::new(store, SessionConfig::default())
//!     .run(input, &mut output)
//!     .await
//!     .unwrap();
//!
//! assert_eq!(String::from_utf8(output).unwrap(), "10\nWRITE 5: 1\nREAD 5: 1\n1\n1\n");
//! assert_eq!(report.writes, 1);
//! # });
//! ```
//!
//! ## Modules
//!
//! - [`controller`]: the four concurrency-control strategies
//! - [`session`]: the line protocol state machine
//! - [`fifo`]: bounded FIFO cache
//! - [`read_through`]: cache plus backend
//! - [`config`]: configuration structs
//! - [`metrics`]: cache counters

/// Error type shared by every layer.
pub mod error;

/// Fixed-length vector of counters plus the write counter.
///
/// The cells themselves carry no locking; access discipline is the job of the
/// controller wrapping them.
pub mod vector;

/// Concurrency controllers.
///
/// One [`Controller`] implementation per [`Strategy`], all behind the same
/// trait object so the server can pick one at startup.
pub mod controller;

/// Store, cache and session configuration structures.
pub mod config;

/// First-In First-Out (FIFO) cache implementation.
///
/// Provides a fixed-size cache that evicts the oldest insertion when full.
/// Access does not reorder entries.
pub mod fifo;

/// Read-through cache in front of a backend.
pub mod read_through;

/// Cache metrics system.
///
/// Counters for the FIFO cache, reported through the [`metrics::CacheMetrics`]
/// trait as a `BTreeMap` so callers can print them in a stable order.
pub mod metrics;

/// The shared store handed to sessions.
pub mod store;

/// Line-based session protocol.
pub mod session;

pub use controller::{
    Controller, GlobalLock, PerIndexLock, ReaderWriterLock, SharedController, Strategy,
    Unsynchronized,
};
pub use error::{StoreError, StoreResult};
pub use fifo::FifoCache;
pub use read_through::{Backend, ControllerBackend, ReadThroughCache, SimulatedBackend};
pub use session::{Session, SessionReport};
pub use store::{SessionStats, Store};
pub use vector::VectorStore;
