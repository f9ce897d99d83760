//! Data environment contract
//!
//! An [`Environment`] is the facade over a normalized record store and the
//! network layer that fills it. Query subscriptions only talk to the store
//! through this trait: they execute operations, read snapshots, subscribe to
//! snapshot changes, and retain operations so the store keeps their data.

use crate::disposable::Disposable;
use crate::error::{RelayError, RelayResult};
use crate::operation::{OperationDescriptor, Selector};
use crate::policy::CacheConfig;
use crate::snapshot::{Availability, Snapshot};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with the new snapshot when subscribed data changes.
pub type SnapshotCallback = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// An operation to execute, with the cache hints it was requested with.
#[derive(Debug, Clone, Copy)]
pub struct ExecuteRequest<'a> {
	/// The operation.
	pub operation: &'a OperationDescriptor,
	/// Cache hints for the network layer.
	pub cache_config: Option<&'a CacheConfig>,
}

/// A payload delivered by an executing operation.
///
/// By the time an event is delivered its data has been published to the
/// store, so consumers read through [`Environment::lookup`] rather than the
/// raw payload.
#[derive(Debug, Clone)]
pub struct ExecuteEvent {
	/// Name of the executed operation.
	pub operation_name: String,
	/// The `data` member of the response.
	pub data: Value,
}

type NextFn = Box<dyn Fn(ExecuteEvent) + Send + Sync>;
type ErrorFn = Box<dyn Fn(RelayError) + Send + Sync>;
type CompleteFn = Box<dyn Fn() + Send + Sync>;

/// Observer receiving the events of one execution.
///
/// Environments may call the sink synchronously from inside
/// [`Environment::execute`] or later from another task.
pub struct ExecuteSink {
	next: NextFn,
	error: ErrorFn,
	complete: CompleteFn,
}

impl ExecuteSink {
	/// Creates a sink from its three callbacks.
	pub fn new<N, E, C>(next: N, error: E, complete: C) -> Self
	where
		N: Fn(ExecuteEvent) + Send + Sync + 'static,
		E: Fn(RelayError) + Send + Sync + 'static,
		C: Fn() + Send + Sync + 'static,
	{
		Self {
			next: Box::new(next),
			error: Box::new(error),
			complete: Box::new(complete),
		}
	}

	/// Delivers a payload.
	pub fn next(&self, event: ExecuteEvent) {
		(self.next)(event);
	}

	/// Delivers a terminal error.
	pub fn error(&self, error: RelayError) {
		(self.error)(error);
	}

	/// Signals that no further payloads follow.
	pub fn complete(&self) {
		(self.complete)();
	}
}

impl fmt::Debug for ExecuteSink {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ExecuteSink").finish_non_exhaustive()
	}
}

/// Store and network facade consumed by query subscriptions.
pub trait Environment: Send + Sync {
	/// Starts executing an operation.
	///
	/// Returns a handle that cancels the request when disposed. An `Err`
	/// means the request could not be started at all.
	fn execute(&self, request: ExecuteRequest<'_>, sink: ExecuteSink) -> RelayResult<Disposable>;

	/// Reads the current store data for a selector.
	fn lookup(&self, selector: &Selector) -> Snapshot;

	/// Calls `on_change` whenever the data behind `snapshot` changes.
	fn subscribe(&self, snapshot: &Snapshot, on_change: SnapshotCallback) -> Disposable;

	/// Keeps the operation's data in the store until the handle is disposed.
	fn retain(&self, operation: &OperationDescriptor) -> Disposable;

	/// Reports whether the store can fulfil the operation without a request.
	fn check(&self, operation: &OperationDescriptor) -> Availability;
}

#[cfg(test)]
mod tests {
	use super::*;
	use parking_lot::Mutex;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_sink_dispatches_callbacks() {
		let log = Arc::new(Mutex::new(Vec::new()));
		let (next_log, error_log, complete_log) = (log.clone(), log.clone(), log.clone());

		let sink = ExecuteSink::new(
			move |event: ExecuteEvent| next_log.lock().push(format!("next:{}", event.data)),
			move |error: RelayError| error_log.lock().push(format!("error:{}", error)),
			move || complete_log.lock().push("complete".to_string()),
		);

		sink.next(ExecuteEvent {
			operation_name: "q".to_string(),
			data: json!(1),
		});
		sink.error(RelayError::Cancelled);
		sink.complete();

		assert_eq!(
			*log.lock(),
			vec!["next:1", "error:Request cancelled", "complete"]
		);
	}
}
