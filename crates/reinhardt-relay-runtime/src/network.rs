//! Network layer abstraction
//!
//! A [`Network`] turns an operation into a raw GraphQL response. It may
//! answer synchronously (from a local cache, or a test fixture) or return a
//! future that resolves later.

use crate::error::RelayResult;
use crate::policy::CacheConfig;
use crate::variables::Variables;
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;

/// A request handed to the network layer.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkRequest {
	/// Operation name.
	pub name: String,
	/// Operation variables, already filtered to the declared arguments.
	pub variables: Variables,
	/// Cache hints the operation was executed with.
	pub cache_config: Option<CacheConfig>,
}

/// The answer of the network layer.
pub enum NetworkResponse {
	/// A response that is already available.
	Sync(RelayResult<Value>),
	/// A response that arrives later.
	Async(BoxFuture<'static, RelayResult<Value>>),
}

impl NetworkResponse {
	/// Wraps a future response.
	pub fn future<F>(future: F) -> Self
	where
		F: std::future::Future<Output = RelayResult<Value>> + Send + 'static,
	{
		Self::Async(Box::pin(future))
	}
}

impl fmt::Debug for NetworkResponse {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Sync(result) => f.debug_tuple("Sync").field(result).finish(),
			Self::Async(_) => f.write_str("Async(..)"),
		}
	}
}

/// Fetches raw GraphQL responses.
pub trait Network: Send + Sync {
	/// Starts a request.
	fn fetch(&self, request: &NetworkRequest) -> NetworkResponse;
}

impl<F> Network for F
where
	F: Fn(&NetworkRequest) -> NetworkResponse + Send + Sync,
{
	fn fetch(&self, request: &NetworkRequest) -> NetworkResponse {
		self(request)
	}
}
