//! In-memory environment
//!
//! [`InMemoryEnvironment`] pairs a [`RecordStore`] with a [`Network`]. Responses
//! are published to the store before the execution sink sees them.
//! Asynchronous responses are awaited on a task spawned on the ambient tokio
//! runtime; disposing the execution handle aborts that task.

use crate::disposable::Disposable;
use crate::environment::{Environment, ExecuteEvent, ExecuteRequest, ExecuteSink, SnapshotCallback};
use crate::error::{RelayError, RelayResult};
use crate::network::{Network, NetworkRequest, NetworkResponse};
use crate::operation::{OperationDescriptor, Selector};
use crate::snapshot::{Availability, Snapshot};
use crate::store::RecordStore;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An [`Environment`] backed by an in-memory record store.
///
/// # Examples
///
/// ```
/// use reinhardt_relay_runtime::request::{ConcreteRequest, Field, Query};
/// use reinhardt_relay_runtime::{
///     Environment, ExecuteRequest, ExecuteSink, InMemoryEnvironment, NetworkRequest,
///     NetworkResponse, OperationDescriptor, Variables,
/// };
/// use serde_json::json;
///
/// let environment = InMemoryEnvironment::new(|_: &NetworkRequest| {
///     NetworkResponse::Sync(Ok(json!({"data": {"widget": {"name": "foo"}}})))
/// });
/// let query = Query::new(
///     ConcreteRequest::new("widget_Query")
///         .select(Field::linked("widget", vec![Field::scalar("name").into()])),
/// );
/// let operation = OperationDescriptor::new(&query, &Variables::new());
///
/// let _request = environment
///     .execute(
///         ExecuteRequest { operation: &operation, cache_config: None },
///         ExecuteSink::new(|_| {}, |_| {}, || {}),
///     )
///     .unwrap();
///
/// assert!(environment.check(&operation).is_available());
/// assert_eq!(environment.fetch_count(), 1);
/// ```
pub struct InMemoryEnvironment {
	store: RecordStore,
	network: Arc<dyn Network>,
	fetch_count: AtomicUsize,
}

impl InMemoryEnvironment {
	/// Creates an environment with an empty store.
	pub fn new<N>(network: N) -> Self
	where
		N: Network + 'static,
	{
		Self::with_store(RecordStore::new(), network)
	}

	/// Creates an environment over an existing store.
	pub fn with_store<N>(store: RecordStore, network: N) -> Self
	where
		N: Network + 'static,
	{
		Self {
			store,
			network: Arc::new(network),
			fetch_count: AtomicUsize::new(0),
		}
	}

	/// Returns the record store.
	pub fn store(&self) -> &RecordStore {
		&self.store
	}

	/// Returns how many requests were handed to the network.
	pub fn fetch_count(&self) -> usize {
		self.fetch_count.load(Ordering::SeqCst)
	}

	/// Returns how many handles retain the operation.
	pub fn retain_count(&self, operation: &OperationDescriptor) -> usize {
		self.store.retain_count(operation.identifier())
	}

	/// Returns the number of live store subscriptions.
	pub fn subscription_count(&self) -> usize {
		self.store.subscription_count()
	}
}

impl Environment for InMemoryEnvironment {
	fn execute(&self, request: ExecuteRequest<'_>, sink: ExecuteSink) -> RelayResult<Disposable> {
		let operation = request.operation.clone();
		let network_request = NetworkRequest {
			name: operation.name().to_string(),
			variables: operation.variables().clone(),
			cache_config: request.cache_config.cloned(),
		};

		self.fetch_count.fetch_add(1, Ordering::SeqCst);
		tracing::debug!(
			operation = operation.name(),
			force = request.cache_config.map(|config| config.force).unwrap_or(false),
			"executing operation"
		);

		match self.network.fetch(&network_request) {
			NetworkResponse::Sync(result) => {
				deliver(&self.store, &operation, result, &sink);
				Ok(Disposable::noop())
			}
			NetworkResponse::Async(response) => {
				let handle = tokio::runtime::Handle::try_current()
					.map_err(|_| RelayError::MissingRuntime(operation.name().to_string()))?;
				let store = self.store.clone();
				let task = handle.spawn(async move {
					let result = response.await;
					deliver(&store, &operation, result, &sink);
				});
				Ok(Disposable::new(move || task.abort()))
			}
		}
	}

	fn lookup(&self, selector: &Selector) -> Snapshot {
		self.store.lookup(selector)
	}

	fn subscribe(&self, snapshot: &Snapshot, on_change: SnapshotCallback) -> Disposable {
		self.store.subscribe(snapshot, on_change)
	}

	fn retain(&self, operation: &OperationDescriptor) -> Disposable {
		self.store.retain(operation.identifier())
	}

	fn check(&self, operation: &OperationDescriptor) -> Availability {
		self.store.check(&operation.fragment())
	}
}

fn deliver(
	store: &RecordStore,
	operation: &OperationDescriptor,
	result: RelayResult<Value>,
	sink: &ExecuteSink,
) {
	match result.and_then(response_data) {
		Ok(data) => {
			store.publish(&operation.fragment(), &data);
			sink.next(ExecuteEvent {
				operation_name: operation.name().to_string(),
				data,
			});
			sink.complete();
		}
		Err(error) => {
			tracing::debug!(operation = operation.name(), %error, "operation failed");
			sink.error(error);
		}
	}
}

fn response_data(response: Value) -> RelayResult<Value> {
	match response.get("data") {
		Some(data) if !data.is_null() => Ok(data.clone()),
		_ => match response.get("errors") {
			Some(errors) => Err(RelayError::from_graphql_errors(errors)),
			None => Err(RelayError::Network(
				"response contained neither data nor errors".to_string(),
			)),
		},
	}
}
