//! # popdb Testkit
//!
//! Test utilities for popdb.
//!
//! This crate provides:
//! - Record store fixtures over both backends
//! - Property-based test generators using proptest
//! - A model-checking harness for segment chains
//! - Filter and rejection test vectors
//!
//! ## Usage
//!
//! ```rust
//! use popdb_testkit::prelude::*;
//!
//! with_each_backend(|store| {
//!     let hash = store.put(&genesis("process", "map"));
//!     assert!(store.get_segment(&hash.to_hex()).is_ok());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::vectors::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use vectors::*;
