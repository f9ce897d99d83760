//! # Reinhardt Relay
//!
//! Route-driven GraphQL data resolution.
//!
//! Every segment of a matched route tree may declare a query. The resolver
//! derives each segment's variables from its ancestors and route params,
//! fetches through a data environment, reuses query subscriptions across
//! navigations, and produces element trees: an optional pending tree while
//! data is loading, then a settled tree.
//!
//! ## Crates
//!
//! - [`runtime`]: the data environment contract, an in-memory record store
//!   and operation descriptors
//! - [`resolver`]: routes, query subscriptions, the resolver and live
//!   element renderers
//!
//! ## Feature Flags
//!
//! - `test-utils` - Scripted network for tests (`runtime::testing`)
//!
//! ## Quick Example
//!
//! ```rust
//! use futures::StreamExt;
//! use reinhardt_relay::prelude::*;
//! use reinhardt_relay::runtime::request::{ConcreteRequest, Field};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let environment = Arc::new(InMemoryEnvironment::new(|_: &NetworkRequest| {
//!     NetworkResponse::Sync(Ok(json!({"data": {"viewer": {"name": "Ada"}}})))
//! }));
//! let query = Query::new(
//!     ConcreteRequest::new("viewer_Query")
//!         .select(Field::linked("viewer", vec![Field::scalar("name").into()])),
//! );
//! let route = Arc::new(Route::new().query(query).component(Component::new("Profile")));
//!
//! let resolver = Resolver::new(environment);
//! let route_match = RouteMatch::new(Location::new("/profile")).with_route(MatchedRoute::new(route));
//! let resolution = resolver.resolve_elements(route_match).next().await.unwrap();
//!
//! assert!(resolution.is_settled());
//! assert_eq!(
//!     resolution.tree().get(0).unwrap().props().unwrap()["viewer"],
//!     json!({"name": "Ada"}),
//! );
//! # });
//! ```

pub mod resolver;
pub mod runtime;

// Re-export the types most applications need
pub use reinhardt_relay_resolver::{
	Component, ElementTree, Location, MatchedRoute, ReadyState, ReadyStateRenderer, Resolution,
	Resolver, ResolverSettings, Route, RouteElement, RouteMatch,
};
pub use reinhardt_relay_runtime::{
	CacheConfig, Environment, FetchPolicy, InMemoryEnvironment, RelayError, RelayResult,
};

/// Prelude module for convenient imports
pub mod prelude {
	pub use crate::resolver::{
		Component, Element, ElementTree, Location, MatchedRoute, Props, QuerySubscription,
		ReadyState, ReadyStateRenderer, RenderArgs, Resolution, Resolver, ResolverSettings, Route,
		RouteElement, RouteMatch,
	};
	pub use crate::runtime::{
		CacheConfig, Environment, FetchPolicy, InMemoryEnvironment, Network, NetworkRequest,
		NetworkResponse, Query, RelayError, RelayResult, Variables,
	};
}
