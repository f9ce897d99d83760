//! # Reinhardt Relay Runtime
//!
//! Data environment contract and in-memory record store used by
//! `reinhardt-relay-resolver`.
//!
//! ## Overview
//!
//! - [`request`]: compiled query definitions (fields, arguments, conditions)
//! - [`OperationDescriptor`] and [`Selector`]: a query bound to its variables
//! - [`Environment`]: execute, lookup, subscribe, retain and check
//! - [`InMemoryEnvironment`]: an environment over a [`RecordStore`] and a [`Network`]
//!
//! ## Architecture
//!
//! ```text
//! execute ──▶ Network ──▶ response ──▶ RecordStore::publish ──▶ ExecuteSink::next
//!                                              │
//!                                              └──▶ store subscribers (changed data only)
//! ```
//!
//! ## Examples
//!
//! ```rust
//! use reinhardt_relay_runtime::request::{ConcreteRequest, Field, Query};
//! use reinhardt_relay_runtime::{
//!     Environment, InMemoryEnvironment, NetworkRequest, NetworkResponse, OperationDescriptor,
//!     RecordStore, Variables,
//! };
//! use serde_json::json;
//!
//! let store = RecordStore::with_records(json!({"widget": {"name": "bar"}}));
//! let environment = InMemoryEnvironment::with_store(store, |_: &NetworkRequest| {
//!     NetworkResponse::Sync(Ok(json!({"data": {"widget": {"name": "foo"}}})))
//! });
//!
//! let query = Query::new(
//!     ConcreteRequest::new("widget_Query")
//!         .select(Field::linked("widget", vec![Field::scalar("name").into()])),
//! );
//! let operation = OperationDescriptor::new(&query, &Variables::new());
//!
//! let snapshot = environment.lookup(&operation.fragment());
//! assert!(!snapshot.is_missing_data);
//! ```

pub mod disposable;
pub mod environment;
pub mod error;
pub mod memory;
pub mod network;
pub mod operation;
pub mod policy;
pub mod request;
pub mod snapshot;
pub mod store;
pub mod variables;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports
pub use disposable::Disposable;
pub use environment::{Environment, ExecuteEvent, ExecuteRequest, ExecuteSink, SnapshotCallback};
pub use error::{RelayError, RelayResult};
pub use memory::InMemoryEnvironment;
pub use network::{Network, NetworkRequest, NetworkResponse};
pub use operation::{OperationDescriptor, Selector};
pub use policy::{CacheConfig, FetchPolicy, UnknownFetchPolicy};
pub use request::Query;
pub use snapshot::{Availability, Snapshot};
pub use store::RecordStore;
pub use variables::{SelectorData, Variables};
