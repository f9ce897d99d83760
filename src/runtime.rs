//! Runtime module.
//!
//! This module provides the data environment contract, the in-memory record
//! store and operation descriptors.
//!
//! # Examples
//!
//! ```rust,no_run
//! use reinhardt_relay::runtime::{FetchPolicy, InMemoryEnvironment, RecordStore};
//! ```

pub use reinhardt_relay_runtime::*;
