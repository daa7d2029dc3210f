//! # popdb Core
//!
//! Hash-linked segment store for popdb.
//!
//! Segments are JSON records chained into maps by `prevLinkHash` and grouped
//! by process. This crate provides:
//! - Segment parsing, canonical serialization and validation
//! - A record store that enforces parent links on write
//! - Two storage layouts: composite keys with prefix scans, and JSON
//!   documents with selector queries
//! - Filter parsing from URL query strings and compilation to either layout
//! - A contract entry point that dispatches named invocations
//!
//! ## Example
//!
//! ```rust
//! use popdb_core::{Config, Contract, RecordStore};
//! use popdb_core::segment::SegmentBuilder;
//! use popdb_storage::InMemoryState;
//!
//! let store = RecordStore::open(Config::composite_key(), Box::new(InMemoryState::new()));
//! let mut contract = Contract::new(store);
//!
//! let genesis = SegmentBuilder::new("orders", "order-42").build().unwrap();
//! let raw = genesis.to_canonical_bytes().unwrap();
//! assert!(contract.invoke("putSegment", &[raw.as_slice()]).is_ok());
//!
//! let listed = contract.invoke("listSegmentsForMap", &[b"order-42".as_slice()]);
//! let expected = format!("[{}]", String::from_utf8(raw).unwrap());
//! assert_eq!(listed.payload, expected.into_bytes());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod collector;
mod config;
mod contract;
mod error;
pub mod filter;
pub mod keyspace;
pub mod query;
pub mod segment;
mod store;
mod types;

pub use backend::{SegmentBackend, StoredSegment};
pub use config::{BackendKind, Config};
pub use contract::{Contract, Function, Response, Status};
pub use error::{CoreError, CoreResult, FilterTarget};
pub use filter::{MapFilter, Pagination, SegmentFilter};
pub use segment::{LinkHash, LinkMeta, Segment};
pub use store::RecordStore;
pub use types::{Height, ObjectType};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
