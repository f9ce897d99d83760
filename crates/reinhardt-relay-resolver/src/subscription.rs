//! Query subscriptions
//!
//! A [`QuerySubscription`] owns the lifecycle of one operation against an
//! [`Environment`]: it decides between the store and the network according to
//! its fetch policy, keeps the operation retained, follows store changes once
//! data arrives, and exposes the result as a [`ReadyState`].
//!
//! Every execution is tagged with a generation number. Disposing or retrying
//! bumps the generation, so callbacks from a superseded execution are ignored
//! even if the environment delivers them late.
//!
//! State commits and listener calls happen under one delivery lock, so
//! listeners observe transitions in commit order even when the environment
//! calls back from several threads.

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::{BoxFuture, Shared};
use parking_lot::{Mutex, ReentrantMutex};
use reinhardt_relay_runtime::{
	CacheConfig, Disposable, Environment, ExecuteEvent, ExecuteRequest, ExecuteSink, FetchPolicy,
	OperationDescriptor, Query, RelayError, SelectorData, Snapshot, Variables,
};
use std::fmt;
use std::sync::{Arc, Weak};

/// Future completing once a subscription settles for the first time, or is disposed.
pub type FetchFuture = Shared<BoxFuture<'static, ()>>;

/// Callback notified with the new ready state on every transition after the first.
pub type Listener = Arc<dyn Fn(&ReadyState) + Send + Sync>;

/// Identifies a listener registered with [`QuerySubscription::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Settled or pending status of a query subscription.
///
/// While pending both `error` and `data` are `None`. Once settled exactly one
/// of them is set and `retry` is available.
#[derive(Debug, Clone, Default)]
pub struct ReadyState {
	/// The error the last execution failed with.
	pub error: Option<RelayError>,
	/// Data read from the store for the operation.
	pub data: Option<SelectorData>,
	/// Re-executes the operation.
	pub retry: Option<Retry>,
}

impl ReadyState {
	/// Returns whether neither data nor an error is available.
	pub fn is_pending(&self) -> bool {
		self.error.is_none() && self.data.is_none()
	}
}

/// Handle that re-executes a subscription's operation.
///
/// It does not keep the subscription alive; retrying a dropped subscription
/// does nothing.
#[derive(Clone)]
pub struct Retry {
	subscription: WeakQuerySubscription,
}

impl Retry {
	/// Re-executes the operation, bypassing any store shortcut.
	pub fn retry(&self) {
		if let Some(subscription) = self.subscription.upgrade() {
			subscription.retry();
		}
	}
}

impl fmt::Debug for Retry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Retry")
	}
}

/// The environment and operation variables a rendered query runs under.
#[derive(Clone)]
pub struct RelayContext {
	/// The data environment.
	pub environment: Arc<dyn Environment>,
	/// The operation variables.
	pub variables: Variables,
}

impl fmt::Debug for RelayContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RelayContext")
			.field("variables", &self.variables)
			.finish_non_exhaustive()
	}
}

struct State {
	cache_config: Option<CacheConfig>,
	fetch_policy: FetchPolicy,
	ready_state: ReadyState,
	fetch: Option<FetchFuture>,
	resolve: Option<oneshot::Sender<()>>,
	selection_reference: Option<Disposable>,
	pending_request: Option<Disposable>,
	root_subscription: Option<Disposable>,
	retrying: bool,
	retrying_after_error: bool,
	generation: u64,
	disposed: bool,
	has_snapshot: bool,
	settled: bool,
	listeners: Vec<(ListenerId, Listener)>,
	next_listener_id: u64,
}

struct Inner {
	environment: Arc<dyn Environment>,
	query: Query,
	variables: Variables,
	operation: OperationDescriptor,
	state: Mutex<State>,
	// Reentrant so that a listener may retry the subscription it observes
	delivery: ReentrantMutex<()>,
}

/// Lifecycle of one operation against a data environment.
///
/// Cloning yields another handle to the same subscription.
///
/// # Examples
///
/// ```
/// use reinhardt_relay_resolver::QuerySubscription;
/// use reinhardt_relay_runtime::request::{ConcreteRequest, Field, Query};
/// use reinhardt_relay_runtime::{
///     Environment, InMemoryEnvironment, NetworkRequest, NetworkResponse, Variables,
/// };
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let environment: Arc<dyn Environment> = Arc::new(InMemoryEnvironment::new(|_: &NetworkRequest| {
///     NetworkResponse::Sync(Ok(json!({"data": {"widget": {"name": "foo"}}})))
/// }));
/// let query = Query::new(
///     ConcreteRequest::new("widget_Query")
///         .select(Field::linked("widget", vec![Field::scalar("name").into()])),
/// );
///
/// let subscription = QuerySubscription::new(environment, query, Variables::new());
/// subscription.fetch().await;
///
/// let ready_state = subscription.ready_state();
/// assert_eq!(
///     serde_json::Value::Object(ready_state.data.unwrap()),
///     json!({"widget": {"name": "foo"}}),
/// );
/// # });
/// ```
#[derive(Clone)]
pub struct QuerySubscription {
	inner: Arc<Inner>,
}

/// A non-owning handle to a [`QuerySubscription`].
#[derive(Clone)]
pub struct WeakQuerySubscription {
	inner: Weak<Inner>,
}

impl WeakQuerySubscription {
	/// Returns the subscription if it is still alive.
	pub fn upgrade(&self) -> Option<QuerySubscription> {
		self.inner.upgrade().map(|inner| QuerySubscription { inner })
	}
}

impl QuerySubscription {
	/// Creates a subscription for `query` with the given derived variables.
	///
	/// Nothing is executed until [`fetch`](Self::fetch) is called.
	pub fn new(environment: Arc<dyn Environment>, query: Query, variables: Variables) -> Self {
		let operation = OperationDescriptor::new(&query, &variables);

		Self {
			inner: Arc::new(Inner {
				environment,
				query,
				variables,
				operation,
				state: Mutex::new(State {
					cache_config: None,
					fetch_policy: FetchPolicy::default(),
					ready_state: ReadyState::default(),
					fetch: None,
					resolve: None,
					selection_reference: None,
					pending_request: None,
					root_subscription: None,
					retrying: false,
					retrying_after_error: false,
					generation: 0,
					disposed: false,
					has_snapshot: false,
					settled: false,
					listeners: Vec::new(),
					next_listener_id: 0,
				}),
				delivery: ReentrantMutex::new(()),
			}),
		}
	}

	/// Sets the cache config and returns the subscription.
	pub fn with_cache_config(self, cache_config: Option<CacheConfig>) -> Self {
		self.set_cache_config(cache_config);
		self
	}

	/// Sets the fetch policy and returns the subscription.
	pub fn with_fetch_policy(self, fetch_policy: FetchPolicy) -> Self {
		self.set_fetch_policy(fetch_policy);
		self
	}

	/// Returns the query.
	pub fn query(&self) -> &Query {
		&self.inner.query
	}

	/// Returns the derived variables the subscription was created with.
	pub fn variables(&self) -> &Variables {
		&self.inner.variables
	}

	/// Returns the operation.
	pub fn operation(&self) -> &OperationDescriptor {
		&self.inner.operation
	}

	/// Returns the data environment.
	pub fn environment(&self) -> &Arc<dyn Environment> {
		&self.inner.environment
	}

	/// Returns the environment and operation variables for rendering.
	pub fn relay_context(&self) -> RelayContext {
		RelayContext {
			environment: self.inner.environment.clone(),
			variables: self.inner.operation.variables().clone(),
		}
	}

	/// Returns the operation name, for diagnostics.
	pub fn query_name(&self) -> &str {
		self.inner.operation.name()
	}

	/// Returns the cache config used for the next execution.
	pub fn cache_config(&self) -> Option<CacheConfig> {
		self.inner.state.lock().cache_config.clone()
	}

	/// Replaces the cache config used for the next execution.
	pub fn set_cache_config(&self, cache_config: Option<CacheConfig>) {
		self.inner.state.lock().cache_config = cache_config;
	}

	/// Returns the fetch policy used for the next execution.
	pub fn fetch_policy(&self) -> FetchPolicy {
		self.inner.state.lock().fetch_policy
	}

	/// Replaces the fetch policy used for the next execution.
	pub fn set_fetch_policy(&self, fetch_policy: FetchPolicy) {
		self.inner.state.lock().fetch_policy = fetch_policy;
	}

	/// Returns the current ready state.
	pub fn ready_state(&self) -> ReadyState {
		self.inner.state.lock().ready_state.clone()
	}

	/// Returns whether the subscription was disposed and not executed since.
	pub fn is_disposed(&self) -> bool {
		self.inner.state.lock().disposed
	}

	/// Returns whether both handles refer to the same subscription.
	pub fn ptr_eq(&self, other: &QuerySubscription) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	/// Returns a non-owning handle.
	pub fn downgrade(&self) -> WeakQuerySubscription {
		WeakQuerySubscription {
			inner: Arc::downgrade(&self.inner),
		}
	}

	/// Retains the operation in the store until the handle is disposed.
	pub fn retain(&self) -> Disposable {
		self.inner.environment.retain(&self.inner.operation)
	}

	/// Starts fetching, or returns the fetch already in flight.
	///
	/// The returned future completes when the subscription first settles,
	/// with data or with an error, or when it is disposed. Failures are
	/// reported through [`ready_state`](Self::ready_state), never through
	/// the future.
	pub fn fetch(&self) -> FetchFuture {
		let future = {
			let mut state = self.inner.state.lock();
			if let Some(fetch) = &state.fetch {
				return fetch.clone();
			}

			let (resolve, resolved) = oneshot::channel::<()>();
			let future = async move {
				let _ = resolved.await;
			}
			.boxed()
			.shared();

			state.fetch = Some(future.clone());
			state.resolve = Some(resolve);
			future
		};

		self.execute();
		future
	}

	/// Registers a listener for ready state transitions.
	///
	/// The settlement that completes a [`fetch`](Self::fetch) future is not
	/// delivered to listeners; every later transition is, in order.
	pub fn subscribe<F>(&self, listener: F) -> ListenerId
	where
		F: Fn(&ReadyState) + Send + Sync + 'static,
	{
		let mut state = self.inner.state.lock();
		let id = ListenerId(state.next_listener_id);
		state.next_listener_id += 1;
		state.listeners.push((id, Arc::new(listener)));
		id
	}

	/// Removes a listener. Unknown ids are ignored.
	pub fn unsubscribe(&self, id: ListenerId) {
		self.inner
			.state
			.lock()
			.listeners
			.retain(|(listener_id, _)| *listener_id != id);
	}

	/// Returns the number of registered listeners.
	pub fn listener_count(&self) -> usize {
		self.inner.state.lock().listeners.len()
	}

	/// Re-executes the operation.
	///
	/// Store shortcuts are disabled for the new execution regardless of the
	/// fetch policy. When retrying after an error, the ready state goes back
	/// to pending unless the new execution settles immediately.
	pub fn retry(&self) {
		{
			let mut state = self.inner.state.lock();
			state.retrying = true;
			state.retrying_after_error = state.ready_state.error.is_some();
		}

		tracing::debug!(query = self.query_name(), "retrying query");

		self.dispose();
		self.execute();
	}

	/// Releases the retained operation, cancels the request in flight and
	/// stops following store changes.
	///
	/// Completes any outstanding fetch future. Calling it again is a no-op.
	pub fn dispose(&self) {
		let (selection_reference, pending_request, root_subscription, resolve) = {
			let mut state = self.inner.state.lock();
			state.generation += 1;
			state.disposed = true;
			state.fetch = None;
			(
				state.selection_reference.take(),
				state.pending_request.take(),
				state.root_subscription.take(),
				state.resolve.take(),
			)
		};

		if selection_reference.is_some() || pending_request.is_some() || root_subscription.is_some() {
			tracing::trace!(query = self.query_name(), "disposing query subscription");
		}

		drop(selection_reference);
		drop(pending_request);
		drop(root_subscription);
		drop(resolve);
	}

	fn execute(&self) {
		let environment = &self.inner.environment;
		let operation = &self.inner.operation;

		let selection_reference = environment.retain(operation);
		let (generation, retrying, retrying_after_error, fetch_policy, cache_config, replaced) = {
			let mut state = self.inner.state.lock();
			state.generation += 1;
			state.disposed = false;
			state.has_snapshot = false;
			state.settled = false;
			let replaced = state.selection_reference.replace(selection_reference);
			(
				state.generation,
				state.retrying,
				state.retrying_after_error,
				state.fetch_policy,
				state.cache_config.clone(),
				replaced,
			)
		};
		drop(replaced);

		let use_store_snapshot =
			!retrying && fetch_policy.reads_store() && environment.check(operation).is_available();

		tracing::debug!(
			query = self.query_name(),
			policy = %fetch_policy,
			use_store_snapshot,
			retrying,
			"executing query subscription"
		);

		if !(fetch_policy == FetchPolicy::StoreOrNetwork && use_store_snapshot) {
			let request = ExecuteRequest {
				operation,
				cache_config: cache_config.as_ref(),
			};

			match environment.execute(request, self.sink(generation)) {
				Ok(pending_request) => {
					let stale = {
						let mut state = self.inner.state.lock();
						if state.generation == generation {
							state.pending_request.replace(pending_request)
						} else {
							Some(pending_request)
						}
					};
					drop(stale);
				}
				Err(error) => {
					self.on_error(generation, error);
					return;
				}
			}
		}

		// A snapshot delivered synchronously by the request wins over the store.
		if use_store_snapshot && !self.inner.state.lock().has_snapshot {
			self.on_snapshot(generation);
		}

		if retrying_after_error {
			let _delivery = self.inner.delivery.lock();
			if !self.inner.state.lock().settled {
				self.update_ready_state(generation, ReadyState::default(), None);
			}
		}
	}

	fn sink(&self, generation: u64) -> ExecuteSink {
		let on_next = self.downgrade();
		let on_error = self.downgrade();
		let on_complete = self.downgrade();

		ExecuteSink::new(
			move |_: ExecuteEvent| {
				if let Some(subscription) = on_next.upgrade() {
					subscription.on_snapshot(generation);
				}
			},
			move |error: RelayError| {
				if let Some(subscription) = on_error.upgrade() {
					subscription.on_error(generation, error);
				}
			},
			move || {
				if let Some(subscription) = on_complete.upgrade() {
					subscription.on_complete(generation);
				}
			},
		)
	}

	fn on_snapshot(&self, generation: u64) {
		let _delivery = self.inner.delivery.lock();
		{
			let mut state = self.inner.state.lock();
			if state.generation != generation || state.has_snapshot {
				return;
			}
			state.has_snapshot = true;
			state.settled = true;
		}

		let environment = &self.inner.environment;
		let fragment = self.inner.operation.fragment();

		let on_change = self.downgrade();
		let root_subscription = environment.subscribe(
			&environment.lookup(&fragment),
			Arc::new(move |_: &Snapshot| {
				if let Some(subscription) = on_change.upgrade() {
					subscription.on_change(generation);
				}
			}),
		);

		// Read again so writes that raced the subscription are not lost
		let snapshot = environment.lookup(&fragment);
		let ready_state = self.data_state(&snapshot);
		self.update_ready_state(generation, ready_state, Some(root_subscription));
	}

	fn on_change(&self, generation: u64) {
		let _delivery = self.inner.delivery.lock();
		{
			// Until the first snapshot is committed, on_snapshot reads the store itself.
			let state = self.inner.state.lock();
			if state.generation != generation || state.root_subscription.is_none() {
				return;
			}
		}

		let snapshot = self.inner.environment.lookup(&self.inner.operation.fragment());
		if self.inner.state.lock().ready_state.data == snapshot.data {
			return;
		}

		let ready_state = self.data_state(&snapshot);
		self.update_ready_state(generation, ready_state, None);
	}

	fn on_error(&self, generation: u64, error: RelayError) {
		{
			let mut state = self.inner.state.lock();
			if state.generation != generation {
				return;
			}
			state.settled = true;
		}

		tracing::debug!(query = self.query_name(), %error, "query failed");

		let ready_state = ReadyState {
			error: Some(error),
			data: None,
			retry: Some(self.retry_handle()),
		};
		self.update_ready_state(generation, ready_state, None);
	}

	fn on_complete(&self, generation: u64) {
		let finished = {
			let mut state = self.inner.state.lock();
			if state.generation == generation {
				state.pending_request.take()
			} else {
				None
			}
		};
		drop(finished);
	}

	fn data_state(&self, snapshot: &Snapshot) -> ReadyState {
		ReadyState {
			error: None,
			data: snapshot.data.clone(),
			retry: Some(self.retry_handle()),
		}
	}

	fn retry_handle(&self) -> Retry {
		Retry {
			subscription: self.downgrade(),
		}
	}

	fn update_ready_state(
		&self,
		generation: u64,
		ready_state: ReadyState,
		root_subscription: Option<Disposable>,
	) {
		let _delivery = self.inner.delivery.lock();
		let (listeners, resolve, replaced) = {
			let mut state = self.inner.state.lock();
			if state.generation != generation {
				drop(state);
				drop(root_subscription);
				return;
			}

			state.ready_state = ready_state.clone();
			let replaced = match root_subscription {
				Some(root_subscription) => state.root_subscription.replace(root_subscription),
				None => None,
			};

			let resolve = state.resolve.take();
			let listeners: Vec<Listener> = if resolve.is_some() {
				Vec::new()
			} else {
				state
					.listeners
					.iter()
					.map(|(_, listener)| listener.clone())
					.collect()
			};
			(listeners, resolve, replaced)
		};
		drop(replaced);

		for listener in listeners {
			listener(&ready_state);
		}

		if let Some(resolve) = resolve {
			let _ = resolve.send(());
		}
	}
}

impl fmt::Debug for QuerySubscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("QuerySubscription")
			.field("query", &self.query_name())
			.field("variables", &self.inner.variables)
			.finish_non_exhaustive()
	}
}
