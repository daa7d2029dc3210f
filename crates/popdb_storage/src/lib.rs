//! # popdb Storage
//!
//! Ledger state abstraction for popdb.
//!
//! A ledger exposes a flat key-value namespace to the contracts it runs.
//! This crate models that namespace: values are **opaque bytes** and the
//! state has no knowledge of segments, maps or key layouts.
//!
//! ## Design Principles
//!
//! - Point reads and writes plus ordered range scans
//! - Optional rich (JSON selector) queries for document ledgers
//! - Forward-only cursors that must be closed by the caller
//! - Must be `Send + Sync`
//!
//! ## Available States
//!
//! - [`InMemoryState`] - For testing and ephemeral use
//! - [`FileState`] - Persists every write to an append-only log
//!
//! ## Example
//!
//! ```rust
//! use popdb_storage::{InMemoryState, LedgerState, StateIterator};
//!
//! let mut state = InMemoryState::new();
//! state.put_state(b"a", b"1").unwrap();
//! state.put_state(b"b", b"2").unwrap();
//!
//! let mut cursor = state.range(b"a", b"z").unwrap();
//! assert_eq!(cursor.next().unwrap().value, b"1");
//! cursor.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod iterator;
mod memory;
mod selector;

pub use backend::LedgerState;
pub use error::{StorageError, StorageResult};
pub use file::FileState;
pub use iterator::{KeyValue, StateIterator, VecStateIterator};
pub use memory::InMemoryState;
pub use selector::RichQuery;
