//! Route segments and matched route trees
//!
//! A [`Route`] describes what one segment of a matched route tree needs: an
//! optional query, how to compute its variables, which fetch policy and cache
//! config to use, and how to render it. Every per-route value can be given
//! statically or computed from the [`SegmentMatch`] it is resolved for.
//!
//! Matching a location against a route configuration is outside this crate;
//! callers hand the resolver an already matched [`RouteMatch`].

use crate::element::{RenderArgs, RenderFn, RouteElement};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reinhardt_relay_runtime::{CacheConfig, FetchPolicy, Query, Variables};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Route parameters captured from the path, keyed by parameter name.
pub type Params = BTreeMap<String, String>;

/// Rewrites the accumulated variables of a segment.
pub type PrepareVariablesFn = Arc<dyn Fn(Variables, &SegmentMatch) -> Variables + Send + Sync>;

/// A future resolving to a lazily loaded component.
pub type ComponentFuture = Shared<BoxFuture<'static, Option<Component>>>;

/// An opaque reference to a view component.
///
/// The view layer owns what a component is; the resolver only needs to know
/// whether a segment has one and to hand it back in element descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Component {
	name: Arc<str>,
}

impl Component {
	/// Creates a component reference.
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self { name: name.into() }
	}

	/// Returns the component name.
	pub fn name(&self) -> &str {
		&self.name
	}
}

/// Where a segment's component comes from.
#[derive(Clone)]
pub enum ComponentSource {
	/// Known up front; `None` means the route has no component.
	Ready(Option<Component>),
	/// Resolved by a future, typically a code-split import.
	Lazy(ComponentFuture),
}

impl ComponentSource {
	/// Wraps a future as a lazily resolved component.
	pub fn lazy<F>(future: F) -> Self
	where
		F: Future<Output = Option<Component>> + Send + 'static,
	{
		Self::Lazy(future.boxed().shared())
	}

	/// Returns the component if it is available without waiting.
	///
	/// The outer `None` means the component is still loading.
	pub fn now_or_never(&self) -> Option<Option<Component>> {
		match self {
			Self::Ready(component) => Some(component.clone()),
			Self::Lazy(future) => future.clone().now_or_never(),
		}
	}

	/// Waits for the component.
	pub async fn resolve(self) -> Option<Component> {
		match self {
			Self::Ready(component) => component,
			Self::Lazy(future) => future.await,
		}
	}
}

impl fmt::Debug for ComponentSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Ready(component) => f.debug_tuple("Ready").field(component).finish(),
			Self::Lazy(_) => f.write_str("Lazy(..)"),
		}
	}
}

/// A per-route value that is either fixed or computed from the match.
#[derive(Clone)]
pub enum RouteValue<T> {
	/// Not configured.
	Unset,
	/// The same value for every match.
	Static(T),
	/// Computed for each match.
	Dynamic(Arc<dyn Fn(&SegmentMatch) -> Option<T> + Send + Sync>),
}

impl<T: Clone> RouteValue<T> {
	/// Resolves the value for a match. A dynamic getter takes precedence.
	pub fn resolve(&self, segment: &SegmentMatch) -> Option<T> {
		match self {
			Self::Unset => None,
			Self::Static(value) => Some(value.clone()),
			Self::Dynamic(get) => get(segment),
		}
	}

	/// Returns whether any value was configured.
	pub fn is_set(&self) -> bool {
		!matches!(self, Self::Unset)
	}
}

impl<T> Default for RouteValue<T> {
	fn default() -> Self {
		Self::Unset
	}
}

impl<T: fmt::Debug> fmt::Debug for RouteValue<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Unset => f.write_str("Unset"),
			Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
			Self::Dynamic(_) => f.write_str("Dynamic(..)"),
		}
	}
}

/// One segment of a route configuration.
///
/// # Examples
///
/// ```
/// use reinhardt_relay_resolver::{Component, Route};
/// use reinhardt_relay_runtime::FetchPolicy;
/// use reinhardt_relay_runtime::request::{ConcreteRequest, Field, Query};
/// use serde_json::json;
///
/// let query = Query::new(
///     ConcreteRequest::new("widget_Query")
///         .select(Field::linked("widget", vec![Field::scalar("name").into()])),
/// );
///
/// let route = Route::new()
///     .query(query)
///     .fetch_policy(FetchPolicy::StoreAndNetwork)
///     .prepare_variables(|mut variables, _| {
///         variables.insert("first".to_string(), json!(10));
///         variables
///     })
///     .component(Component::new("WidgetPage"));
///
/// assert!(route.has_query());
/// assert!(!route.has_render());
/// ```
#[derive(Clone, Default)]
pub struct Route {
	query: RouteValue<Query>,
	cache_config: RouteValue<CacheConfig>,
	fetch_policy: RouteValue<FetchPolicy>,
	component: RouteValue<ComponentSource>,
	prepare_variables: Option<PrepareVariablesFn>,
	render: Option<RenderFn>,
}

impl Route {
	/// Creates a route with nothing configured.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the query for every match.
	pub fn query(mut self, query: Query) -> Self {
		self.query = RouteValue::Static(query);
		self
	}

	/// Computes the query per match.
	pub fn get_query<F>(mut self, get: F) -> Self
	where
		F: Fn(&SegmentMatch) -> Option<Query> + Send + Sync + 'static,
	{
		self.query = RouteValue::Dynamic(Arc::new(get));
		self
	}

	/// Sets the cache config for every match.
	pub fn cache_config(mut self, cache_config: CacheConfig) -> Self {
		self.cache_config = RouteValue::Static(cache_config);
		self
	}

	/// Computes the cache config per match.
	pub fn get_cache_config<F>(mut self, get: F) -> Self
	where
		F: Fn(&SegmentMatch) -> Option<CacheConfig> + Send + Sync + 'static,
	{
		self.cache_config = RouteValue::Dynamic(Arc::new(get));
		self
	}

	/// Sets the fetch policy for every match.
	pub fn fetch_policy(mut self, fetch_policy: FetchPolicy) -> Self {
		self.fetch_policy = RouteValue::Static(fetch_policy);
		self
	}

	/// Computes the fetch policy per match.
	pub fn get_fetch_policy<F>(mut self, get: F) -> Self
	where
		F: Fn(&SegmentMatch) -> Option<FetchPolicy> + Send + Sync + 'static,
	{
		self.fetch_policy = RouteValue::Dynamic(Arc::new(get));
		self
	}

	/// Rewrites the variables accumulated for this segment.
	///
	/// The function receives the parent's variables overlaid with this
	/// segment's route params.
	pub fn prepare_variables<F>(mut self, prepare: F) -> Self
	where
		F: Fn(Variables, &SegmentMatch) -> Variables + Send + Sync + 'static,
	{
		self.prepare_variables = Some(Arc::new(prepare));
		self
	}

	/// Renders the segment with a custom function instead of its component.
	///
	/// Returning `None` means "not ready yet".
	pub fn render<F>(mut self, render: F) -> Self
	where
		F: for<'a> Fn(RenderArgs<'a>) -> Option<RouteElement> + Send + Sync + 'static,
	{
		self.render = Some(Arc::new(render));
		self
	}

	/// Sets the component.
	pub fn component(mut self, component: Component) -> Self {
		self.component = RouteValue::Static(ComponentSource::Ready(Some(component)));
		self
	}

	/// Sets a component that is loaded on first use.
	///
	/// The future runs once and its result is shared by every later match.
	pub fn lazy_component<F>(mut self, future: F) -> Self
	where
		F: Future<Output = Option<Component>> + Send + 'static,
	{
		self.component = RouteValue::Static(ComponentSource::lazy(future));
		self
	}

	/// Computes the component source per match.
	pub fn get_component<F>(mut self, get: F) -> Self
	where
		F: Fn(&SegmentMatch) -> ComponentSource + Send + Sync + 'static,
	{
		self.component = RouteValue::Dynamic(Arc::new(move |segment| Some(get(segment))));
		self
	}

	/// Returns whether a query is configured, statically or dynamically.
	pub fn has_query(&self) -> bool {
		self.query.is_set()
	}

	/// Returns whether a custom render function is configured.
	pub fn has_render(&self) -> bool {
		self.render.is_some()
	}

	/// Returns the custom render function.
	pub fn render_fn(&self) -> Option<&RenderFn> {
		self.render.as_ref()
	}

	/// Resolves the query for a match.
	pub fn resolve_query(&self, segment: &SegmentMatch) -> Option<Query> {
		self.query.resolve(segment)
	}

	/// Resolves the cache config for a match.
	pub fn resolve_cache_config(&self, segment: &SegmentMatch) -> Option<CacheConfig> {
		self.cache_config.resolve(segment)
	}

	/// Resolves the fetch policy for a match.
	pub fn resolve_fetch_policy(&self, segment: &SegmentMatch) -> Option<FetchPolicy> {
		self.fetch_policy.resolve(segment)
	}

	/// Resolves the component source for a match.
	pub fn resolve_component(&self, segment: &SegmentMatch) -> ComponentSource {
		self.component
			.resolve(segment)
			.unwrap_or(ComponentSource::Ready(None))
	}

	/// Applies `prepare_variables`, if configured.
	pub fn prepare(&self, variables: Variables, segment: &SegmentMatch) -> Variables {
		match &self.prepare_variables {
			Some(prepare) => prepare(variables, segment),
			None => variables,
		}
	}
}

impl fmt::Debug for Route {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Route")
			.field("query", &self.query)
			.field("cache_config", &self.cache_config)
			.field("fetch_policy", &self.fetch_policy)
			.field("component", &self.component)
			.field("prepare_variables", &self.prepare_variables.is_some())
			.field("render", &self.render.is_some())
			.finish()
	}
}

/// The location a route tree was matched against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
	/// Path of the location.
	pub pathname: String,
	/// Parsed query string.
	pub query: BTreeMap<String, String>,
}

impl Location {
	/// Creates a location without a query string.
	pub fn new(pathname: impl Into<String>) -> Self {
		Self {
			pathname: pathname.into(),
			query: BTreeMap::new(),
		}
	}

	/// Adds a query string parameter.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.insert(key.into(), value.into());
		self
	}
}

/// A route matched at one position of the tree, with its matched children.
#[derive(Debug, Clone)]
pub struct MatchedRoute {
	/// The matched route.
	pub route: Arc<Route>,
	/// Params captured by this route's own path.
	pub params: Params,
	/// Matched child routes.
	pub children: Vec<MatchedRoute>,
}

impl MatchedRoute {
	/// Creates a match without params or children.
	pub fn new(route: Arc<Route>) -> Self {
		Self {
			route,
			params: Params::new(),
			children: Vec::new(),
		}
	}

	/// Adds a captured route param.
	pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.insert(name.into(), value.into());
		self
	}

	/// Adds a matched child route.
	pub fn with_child(mut self, child: MatchedRoute) -> Self {
		self.children.push(child);
		self
	}
}

/// A fully matched route tree.
///
/// # Examples
///
/// ```
/// use reinhardt_relay_resolver::{Location, MatchedRoute, Route, RouteMatch};
/// use std::sync::Arc;
///
/// let root = Arc::new(Route::new());
/// let child = Arc::new(Route::new());
///
/// let route_match = RouteMatch::new(Location::new("/items/1")).with_route(
///     MatchedRoute::new(root).with_child(MatchedRoute::new(child).with_param("id", "1")),
/// );
///
/// let segments = route_match.flatten();
/// assert_eq!(segments.len(), 2);
/// assert_eq!(segments[1].parent, Some(0));
/// assert_eq!(segments[1].params["id"], "1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteMatch {
	/// The matched location.
	pub location: Location,
	/// Top-level matched routes.
	pub routes: Vec<MatchedRoute>,
}

impl RouteMatch {
	/// Creates an empty match for a location.
	pub fn new(location: Location) -> Self {
		Self {
			location,
			routes: Vec::new(),
		}
	}

	/// Adds a top-level matched route.
	pub fn with_route(mut self, route: MatchedRoute) -> Self {
		self.routes.push(route);
		self
	}

	/// Lists every segment in pre-order, so ancestors precede descendants.
	pub fn flatten(&self) -> Vec<SegmentMatch> {
		let mut segments = Vec::new();
		for route in &self.routes {
			self.flatten_into(route, None, &mut segments);
		}
		segments
	}

	fn flatten_into(
		&self,
		matched: &MatchedRoute,
		parent: Option<usize>,
		segments: &mut Vec<SegmentMatch>,
	) {
		let index = segments.len();
		segments.push(SegmentMatch {
			index,
			parent,
			route: matched.route.clone(),
			params: matched.params.clone(),
			location: self.location.clone(),
		});

		for child in &matched.children {
			self.flatten_into(child, Some(index), segments);
		}
	}
}

/// One segment of a flattened [`RouteMatch`].
#[derive(Debug, Clone)]
pub struct SegmentMatch {
	/// Position in pre-order.
	pub index: usize,
	/// Position of the parent segment; `None` for top-level segments.
	pub parent: Option<usize>,
	/// The matched route.
	pub route: Arc<Route>,
	/// Params captured by this route's own path.
	pub params: Params,
	/// The matched location.
	pub location: Location,
}
