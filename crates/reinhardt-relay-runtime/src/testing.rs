//! Test utilities
//!
//! [`MockNetwork`] records every request it receives and answers from a queue
//! of scripted responses. Deferred responses are resolved by the test through
//! a [`DeferredResponse`] handle, which makes "still loading" states easy to
//! observe.

use crate::error::{RelayError, RelayResult};
use crate::network::{Network, NetworkRequest, NetworkResponse};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;

type Handler = Box<dyn Fn(&NetworkRequest) -> Value + Send + Sync>;

enum ScriptedResponse {
	Immediate(RelayResult<Value>),
	Deferred(oneshot::Receiver<RelayResult<Value>>),
}

#[derive(Default)]
struct MockState {
	requests: Mutex<Vec<NetworkRequest>>,
	responses: Mutex<VecDeque<ScriptedResponse>>,
	handler: Mutex<Option<Handler>>,
}

/// Scripted network for tests.
///
/// Cloning shares the script and the request log, so a test can hand one
/// clone to an environment and keep another to drive it.
///
/// # Examples
///
/// ```
/// use reinhardt_relay_runtime::testing::MockNetwork;
/// use reinhardt_relay_runtime::{Network, NetworkRequest, NetworkResponse, Variables};
/// use serde_json::json;
///
/// let network = MockNetwork::new();
/// network.respond(json!({"data": {"widget": {"name": "foo"}}}));
///
/// let request = NetworkRequest {
///     name: "widget_Query".to_string(),
///     variables: Variables::new(),
///     cache_config: None,
/// };
/// assert!(matches!(network.fetch(&request), NetworkResponse::Sync(Ok(_))));
/// assert_eq!(network.request_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MockNetwork {
	state: Arc<MockState>,
}

impl MockNetwork {
	/// Creates a network with an empty script.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a network that answers every unscripted request with `handler`.
	pub fn with_handler<F>(handler: F) -> Self
	where
		F: Fn(&NetworkRequest) -> Value + Send + Sync + 'static,
	{
		let network = Self::new();
		*network.state.handler.lock() = Some(Box::new(handler));
		network
	}

	/// Queues a raw GraphQL response to be returned synchronously.
	pub fn respond(&self, response: Value) {
		self.push(ScriptedResponse::Immediate(Ok(response)));
	}

	/// Queues a network failure to be returned synchronously.
	pub fn fail(&self, error: RelayError) {
		self.push(ScriptedResponse::Immediate(Err(error)));
	}

	/// Queues a response that stays pending until the returned handle resolves it.
	pub fn defer(&self) -> DeferredResponse {
		let (sender, receiver) = oneshot::channel();
		self.push(ScriptedResponse::Deferred(receiver));
		DeferredResponse { sender }
	}

	/// Returns every request received so far.
	pub fn requests(&self) -> Vec<NetworkRequest> {
		self.state.requests.lock().clone()
	}

	/// Returns the number of requests received so far.
	pub fn request_count(&self) -> usize {
		self.state.requests.lock().len()
	}

	fn push(&self, response: ScriptedResponse) {
		self.state.responses.lock().push_back(response);
	}
}

impl Network for MockNetwork {
	fn fetch(&self, request: &NetworkRequest) -> NetworkResponse {
		self.state.requests.lock().push(request.clone());

		let scripted = self.state.responses.lock().pop_front();
		match scripted {
			Some(ScriptedResponse::Immediate(result)) => NetworkResponse::Sync(result),
			Some(ScriptedResponse::Deferred(receiver)) => NetworkResponse::future(async move {
				receiver.await.unwrap_or(Err(RelayError::Cancelled))
			}),
			None => match self.state.handler.lock().as_ref() {
				Some(handler) => NetworkResponse::Sync(Ok(handler(request))),
				None => NetworkResponse::Sync(Err(RelayError::Network(format!(
					"no response scripted for `{}`",
					request.name
				)))),
			},
		}
	}
}

/// Handle resolving a deferred [`MockNetwork`] response.
#[derive(Debug)]
pub struct DeferredResponse {
	sender: oneshot::Sender<RelayResult<Value>>,
}

impl DeferredResponse {
	/// Resolves the request with a raw GraphQL response.
	pub fn resolve(self, response: Value) {
		let _ = self.sender.send(Ok(response));
	}

	/// Fails the request.
	pub fn reject(self, error: RelayError) {
		let _ = self.sender.send(Err(error));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::variables::Variables;
	use rstest::*;
	use serde_json::json;

	#[fixture]
	fn request() -> NetworkRequest {
		NetworkRequest {
			name: "widget_Query".to_string(),
			variables: Variables::new(),
			cache_config: None,
		}
	}

	#[rstest]
	fn test_unscripted_request_fails(request: NetworkRequest) {
		let network = MockNetwork::new();
		match network.fetch(&request) {
			NetworkResponse::Sync(Err(error)) => assert_eq!(
				error,
				RelayError::Network("no response scripted for `widget_Query`".to_string())
			),
			other => panic!("unexpected response: {:?}", other),
		}
	}

	#[rstest]
	fn test_handler_answers_unscripted_requests(request: NetworkRequest) {
		let network = MockNetwork::with_handler(|request| json!({"data": {"name": request.name}}));
		network.fail(RelayError::Network("first".to_string()));

		assert!(matches!(network.fetch(&request), NetworkResponse::Sync(Err(_))));
		match network.fetch(&request) {
			NetworkResponse::Sync(Ok(response)) => {
				assert_eq!(response, json!({"data": {"name": "widget_Query"}}))
			}
			other => panic!("unexpected response: {:?}", other),
		}
		assert_eq!(network.requests(), vec![request.clone(), request]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_deferred_response(request: NetworkRequest) {
		let network = MockNetwork::new();
		let deferred = network.defer();

		let NetworkResponse::Async(response) = network.fetch(&request) else {
			panic!("expected an async response");
		};
		deferred.resolve(json!({"data": {}}));

		assert_eq!(response.await, Ok(json!({"data": {}})));
	}

	#[rstest]
	#[tokio::test]
	async fn test_dropped_deferred_response_is_cancelled(request: NetworkRequest) {
		let network = MockNetwork::new();
		drop(network.defer());

		let NetworkResponse::Async(response) = network.fetch(&request) else {
			panic!("expected an async response");
		};

		assert_eq!(response.await, Err(RelayError::Cancelled));
	}
}
