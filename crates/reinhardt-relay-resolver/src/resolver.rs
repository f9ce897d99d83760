//! Route data resolver
//!
//! [`Resolver::resolve_elements`] turns a matched route tree into a stream of
//! element trees. Query subscriptions are kept per tree position between
//! navigations: a position whose query and variables did not change keeps
//! its subscription, and every subscription that is not carried over is
//! disposed.
//!
//! ## Resolution protocol
//!
//! ```text
//! resolve_elements(match)
//!     │  reconcile subscriptions, start every fetch
//!     ├─ anything still loading? ──▶ Pending(tree)   (only if every segment is renderable)
//!     │  await components and fetches
//!     ├─ queries disposed meanwhile? ──▶ (ends)
//!     └────────────────────────────▶ Settled(tree)
//! ```

use crate::element::{ComponentState, ElementTree, create_elements};
use crate::route::{ComponentSource, RouteMatch, SegmentMatch};
use crate::settings::ResolverSettings;
use crate::subscription::{FetchFuture, QuerySubscription};
use crate::variables::route_variables;
use futures::future::join_all;
use futures::{FutureExt, Stream};
use parking_lot::Mutex;
use reinhardt_relay_runtime::{Environment, Variables};
use std::pin::Pin;
use std::sync::{Arc, Weak};

type Slots = Mutex<Vec<Option<QuerySubscription>>>;

/// Stream of resolutions for one navigation.
pub type ResolveElements = Pin<Box<dyn Stream<Item = Resolution> + Send>>;

/// One step of resolving a navigation.
#[derive(Debug, Clone)]
pub enum Resolution {
	/// Something is still loading; rendered from the state available so far.
	Pending(ElementTree),
	/// Every component and query has settled.
	Settled(ElementTree),
}

impl Resolution {
	/// Returns the element tree.
	pub fn tree(&self) -> &ElementTree {
		match self {
			Self::Pending(tree) | Self::Settled(tree) => tree,
		}
	}

	/// Returns the element tree, consuming the resolution.
	pub fn into_tree(self) -> ElementTree {
		match self {
			Self::Pending(tree) | Self::Settled(tree) => tree,
		}
	}

	/// Returns whether this is the final resolution of a navigation.
	pub fn is_settled(&self) -> bool {
		matches!(self, Self::Settled(_))
	}
}

/// Resolves data for matched route trees.
///
/// # Examples
///
/// ```
/// use futures::StreamExt;
/// use reinhardt_relay_resolver::{Component, Location, MatchedRoute, Resolver, Route, RouteMatch};
/// use reinhardt_relay_runtime::request::{ConcreteRequest, Field, Query};
/// use reinhardt_relay_runtime::{InMemoryEnvironment, NetworkRequest, NetworkResponse};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let environment = Arc::new(InMemoryEnvironment::new(|_: &NetworkRequest| {
///     NetworkResponse::future(async { Ok(json!({"data": {"widget": {"name": "foo"}}})) })
/// }));
/// let query = Query::new(
///     ConcreteRequest::new("widget_Query")
///         .select(Field::linked("widget", vec![Field::scalar("name").into()])),
/// );
/// let route = Arc::new(Route::new().query(query).component(Component::new("Widget")));
/// let resolver = Resolver::new(environment);
///
/// let route_match = RouteMatch::new(Location::new("/")).with_route(MatchedRoute::new(route));
/// let resolutions: Vec<_> = resolver.resolve_elements(route_match).collect().await;
///
/// // The component renders nothing until its data arrives, so only the
/// // settled tree is produced.
/// assert_eq!(resolutions.len(), 1);
/// assert!(resolutions[0].is_settled());
/// # });
/// ```
pub struct Resolver {
	environment: Arc<dyn Environment>,
	settings: ResolverSettings,
	last_query_subscriptions: Arc<Slots>,
}

impl Resolver {
	/// Creates a resolver with default settings.
	pub fn new(environment: Arc<dyn Environment>) -> Self {
		Self::with_settings(environment, ResolverSettings::default())
	}

	/// Creates a resolver with the given settings.
	pub fn with_settings(environment: Arc<dyn Environment>, settings: ResolverSettings) -> Self {
		Self {
			environment,
			settings,
			last_query_subscriptions: Arc::new(Mutex::new(Vec::new())),
		}
	}

	/// Returns the data environment.
	pub fn environment(&self) -> &Arc<dyn Environment> {
		&self.environment
	}

	/// Returns the settings.
	pub fn settings(&self) -> &ResolverSettings {
		&self.settings
	}

	/// Returns the subscriptions of the last navigation, by tree position.
	pub fn query_subscriptions(&self) -> Vec<Option<QuerySubscription>> {
		self.last_query_subscriptions.lock().clone()
	}

	/// Resolves a matched route tree.
	///
	/// Nothing happens until the stream is first polled. The stream yields
	/// an optional [`Resolution::Pending`] followed by a
	/// [`Resolution::Settled`]. A stream polled after its resolver was
	/// dropped ends without yielding, and a stream whose subscriptions are
	/// disposed by a later navigation ends without a settled tree.
	pub fn resolve_elements(&self, route_match: RouteMatch) -> ResolveElements {
		let environment = self.environment.clone();
		let settings = self.settings.clone();
		let slots = Arc::downgrade(&self.last_query_subscriptions);

		Box::pin(async_stream::stream! {
			let segments = route_match.flatten();
			let variables = route_variables(&segments);

			let Some(subscriptions) =
				update_query_subscriptions(&environment, &settings, &slots, &segments, &variables)
			else {
				tracing::debug!("resolver dropped before resolution started");
				return;
			};

			let fetches: Vec<Option<FetchFuture>> = subscriptions
				.iter()
				.map(|subscription| subscription.as_ref().map(QuerySubscription::fetch))
				.collect();
			let sources: Vec<ComponentSource> = segments
				.iter()
				.map(|segment| segment.route.resolve_component(segment))
				.collect();

			let early_components: Vec<ComponentState> = sources
				.iter()
				.map(|source| ComponentState::from(source.now_or_never()))
				.collect();
			let fetches_settled = fetches
				.iter()
				.flatten()
				.all(|fetch| fetch.clone().now_or_never().is_some());

			let components = if fetches_settled && early_components.iter().all(ComponentState::is_resolved) {
				early_components
			} else {
				let pending = create_elements(&segments, &early_components, &subscriptions, false);
				if pending.is_renderable() {
					tracing::debug!(segments = segments.len(), "yielding pending elements");
					yield Resolution::Pending(pending);
				} else {
					tracing::debug!(segments = segments.len(), "pending elements are not renderable");
				}

				let (components, _) = futures::join!(
					join_all(sources.into_iter().map(ComponentSource::resolve)),
					join_all(fetches.into_iter().flatten()),
				);

				// A later navigation or the resolver's drop released our queries
				if subscriptions.iter().flatten().any(QuerySubscription::is_disposed) {
					tracing::debug!(segments = segments.len(), "navigation superseded before settling");
					return;
				}

				components.into_iter().map(ComponentState::Resolved).collect()
			};

			tracing::debug!(segments = segments.len(), "yielding settled elements");
			yield Resolution::Settled(create_elements(&segments, &components, &subscriptions, true));
		})
	}

	/// Disposes every subscription kept from the last navigation.
	pub fn dispose(&self) {
		let subscriptions = std::mem::take(&mut *self.last_query_subscriptions.lock());
		for subscription in subscriptions.into_iter().flatten() {
			subscription.dispose();
		}
	}
}

impl Drop for Resolver {
	fn drop(&mut self) {
		self.dispose();
	}
}

fn update_query_subscriptions(
	environment: &Arc<dyn Environment>,
	settings: &ResolverSettings,
	slots: &Weak<Slots>,
	segments: &[SegmentMatch],
	variables: &[Variables],
) -> Option<Vec<Option<QuerySubscription>>> {
	let slots = slots.upgrade()?;
	let mut last = slots.lock();

	let subscriptions: Vec<Option<QuerySubscription>> = segments
		.iter()
		.zip(variables)
		.map(|(segment, variables)| {
			let query = segment.route.resolve_query(segment)?;
			let cache_config = segment
				.route
				.resolve_cache_config(segment)
				.or_else(|| settings.default_cache_config.clone());
			let fetch_policy = segment
				.route
				.resolve_fetch_policy(segment)
				.unwrap_or(settings.default_fetch_policy);

			let reusable = last.get(segment.index).and_then(Option::as_ref).is_some_and(
				|subscription| {
					subscription.query().ptr_eq(&query) && subscription.variables() == variables
				},
			);

			if reusable {
				if let Some(subscription) = last.get_mut(segment.index).and_then(Option::take) {
					tracing::debug!(
						index = segment.index,
						query = subscription.query_name(),
						"reusing query subscription"
					);
					subscription.set_cache_config(cache_config);
					subscription.set_fetch_policy(fetch_policy);
					return Some(subscription);
				}
			}

			tracing::debug!(
				index = segment.index,
				query = query.name(),
				policy = %fetch_policy,
				"creating query subscription"
			);
			Some(
				QuerySubscription::new(environment.clone(), query, variables.clone())
					.with_cache_config(cache_config)
					.with_fetch_policy(fetch_policy),
			)
		})
		.collect();

	let stale = std::mem::replace(&mut *last, subscriptions.clone());
	drop(last);

	for subscription in stale.into_iter().flatten() {
		tracing::debug!(query = subscription.query_name(), "disposing superseded query subscription");
		subscription.dispose();
	}

	Some(subscriptions)
}
