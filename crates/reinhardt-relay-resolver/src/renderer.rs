//! Live rendering of query elements
//!
//! A [`ReadyStateRenderer`] is what the view layer mounts for a
//! [`RouteElement::ReadyState`]. While mounted it keeps the operation retained
//! and follows its query subscription, re-rendering when the store changes.
//! Updates that arrive before the element's tree has settled are ignored;
//! the settled tree replaces the element anyway.

use crate::element::{ComponentState, Props, ReadyStateElement, RouteElement, render_element};
use crate::route::SegmentMatch;
use crate::subscription::{ListenerId, QuerySubscription, RelayContext, WeakQuerySubscription};
use parking_lot::Mutex;
use reinhardt_relay_runtime::Disposable;
use std::sync::Arc;
use tokio::sync::watch;

struct RenderInputs {
	route_match: SegmentMatch,
	component: ComponentState,
	fetched: bool,
}

/// The rendered output of a [`ReadyStateRenderer`].
#[derive(Debug, Clone)]
pub struct RenderedElement {
	/// The element, with props from the parent merged in.
	pub element: RouteElement,
	/// The environment and variables the element's query runs under.
	pub relay_context: RelayContext,
}

/// Keeps a mounted query element current.
///
/// # Examples
///
/// ```
/// use reinhardt_relay_resolver::{
///     Component, Location, MatchedRoute, ReadyStateRenderer, Resolution, Resolver, Route,
///     RouteElement, RouteMatch,
/// };
/// use reinhardt_relay_runtime::request::{ConcreteRequest, Field, Query};
/// use reinhardt_relay_runtime::{InMemoryEnvironment, NetworkRequest, NetworkResponse};
/// use futures::StreamExt;
/// use serde_json::{Map, json};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let environment = Arc::new(InMemoryEnvironment::new(|_: &NetworkRequest| {
///     NetworkResponse::Sync(Ok(json!({"data": {"widget": {"name": "foo"}}})))
/// }));
/// let query = Query::new(
///     ConcreteRequest::new("widget_Query")
///         .select(Field::linked("widget", vec![Field::scalar("name").into()])),
/// );
/// let route = Arc::new(Route::new().query(query).component(Component::new("Widget")));
/// let resolver = Resolver::new(environment);
///
/// let route_match = RouteMatch::new(Location::new("/")).with_route(MatchedRoute::new(route));
/// let mut resolutions = resolver.resolve_elements(route_match);
/// let Some(Resolution::Settled(tree)) = resolutions.next().await else {
///     panic!("expected a settled tree");
/// };
///
/// let Some(RouteElement::ReadyState(element)) = tree.get(0) else {
///     panic!("expected a query element");
/// };
/// let renderer = ReadyStateRenderer::mount(element);
/// let rendered = renderer.render(&Map::new()).unwrap();
/// assert_eq!(rendered.element.props().unwrap()["widget"], json!({"name": "foo"}));
/// # });
/// ```
pub struct ReadyStateRenderer {
	inputs: Arc<Mutex<RenderInputs>>,
	element: Arc<watch::Sender<RouteElement>>,
	subscription: QuerySubscription,
	selection_reference: Option<Disposable>,
	listener: ListenerId,
}

impl ReadyStateRenderer {
	/// Mounts a query element: retains its operation and starts listening.
	pub fn mount(element: &ReadyStateElement) -> Self {
		let inputs = Arc::new(Mutex::new(RenderInputs {
			route_match: element.route_match.clone(),
			component: element.component.clone(),
			fetched: element.fetched,
		}));
		let (sender, _) = watch::channel(element.element.clone());
		let sender = Arc::new(sender);

		let subscription = element.subscription.clone();
		let selection_reference = subscription.retain();
		let listener = listen(&subscription, &inputs, &sender);

		Self {
			inputs,
			element: sender,
			subscription,
			selection_reference: Some(selection_reference),
			listener,
		}
	}

	/// Applies a newer element for the same segment.
	///
	/// Observers of [`changes`](Self::changes) are only woken when the
	/// element renders differently. When the element carries a different
	/// subscription, the renderer releases and stops following the old one.
	pub fn update(&mut self, element: &ReadyStateElement) {
		{
			let mut inputs = self.inputs.lock();
			inputs.route_match = element.route_match.clone();
			inputs.component = element.component.clone();
			inputs.fetched = element.fetched;
		}
		send_element(&self.element, element.element.clone());

		if element.subscription.ptr_eq(&self.subscription) {
			return;
		}

		tracing::trace!(
			from = self.subscription.query_name(),
			to = element.subscription.query_name(),
			"swapping query subscription"
		);

		if let Some(selection_reference) = self.selection_reference.take() {
			selection_reference.dispose();
		}
		self.subscription.unsubscribe(self.listener);

		self.subscription = element.subscription.clone();
		self.selection_reference = Some(self.subscription.retain());
		self.listener = listen(&self.subscription, &self.inputs, &self.element);
	}

	/// Returns the subscription currently followed.
	pub fn subscription(&self) -> &QuerySubscription {
		&self.subscription
	}

	/// Returns the current element, without props from the parent.
	pub fn element(&self) -> RouteElement {
		self.element.borrow().clone()
	}

	/// Returns a receiver that observes every element change.
	pub fn changes(&self) -> watch::Receiver<RouteElement> {
		self.element.subscribe()
	}

	/// Renders the current element with props supplied by a parent.
	///
	/// A parent prop whose name matches a field of the query data is dropped
	/// with a warning so that the data wins. Returns `None` when the element
	/// renders nothing.
	pub fn render(&self, own_props: &Props) -> Option<RenderedElement> {
		let element = self.element();
		if element.is_empty() {
			return None;
		}

		let mut own_props = own_props.clone();
		if let Some(data) = self.subscription.ready_state().data {
			for name in data.keys() {
				if own_props.remove(name).is_some() {
					tracing::warn!(
						prop = name.as_str(),
						query = self.subscription.query_name(),
						"Ignoring prop `{}` that shadows a data field from query `{}`.",
						name,
						self.subscription.query_name()
					);
				}
			}
		}

		let element = match element {
			RouteElement::Element(mut element) => {
				element.props.extend(own_props);
				RouteElement::Element(element)
			}
			other => other,
		};

		Some(RenderedElement {
			element,
			relay_context: self.subscription.relay_context(),
		})
	}
}

impl Drop for ReadyStateRenderer {
	fn drop(&mut self) {
		if let Some(selection_reference) = self.selection_reference.take() {
			selection_reference.dispose();
		}
		self.subscription.unsubscribe(self.listener);
	}
}

fn listen(
	subscription: &QuerySubscription,
	inputs: &Arc<Mutex<RenderInputs>>,
	element: &Arc<watch::Sender<RouteElement>>,
) -> ListenerId {
	let weak: WeakQuerySubscription = subscription.downgrade();
	let inputs = Arc::clone(inputs);
	let element = Arc::clone(element);

	subscription.subscribe(move |_| {
		let Some(subscription) = weak.upgrade() else {
			return;
		};

		let (route_match, component) = {
			let inputs = inputs.lock();
			if !inputs.fetched {
				return;
			}
			(inputs.route_match.clone(), inputs.component.clone())
		};

		let rendered = render_element(&route_match, &component, &subscription, false);
		send_element(&element, rendered.unwrap_or(RouteElement::Empty));
	})
}

fn send_element(sender: &watch::Sender<RouteElement>, element: RouteElement) {
	sender.send_if_modified(|current| {
		if renders_same(current, &element) {
			return false;
		}
		*current = element;
		true
	});
}

fn renders_same(a: &RouteElement, b: &RouteElement) -> bool {
	match (a, b) {
		(RouteElement::Empty, RouteElement::Empty) => true,
		(RouteElement::Element(a), RouteElement::Element(b)) => {
			a.component == b.component
				&& a.props == b.props
				&& a.route_match.index == b.route_match.index
				&& Arc::ptr_eq(&a.route_match.route, &b.route_match.route)
				&& a.route_match.params == b.route_match.params
				&& a.route_match.location == b.route_match.location
		}
		(RouteElement::ReadyState(a), RouteElement::ReadyState(b)) => {
			a.subscription.ptr_eq(&b.subscription) && renders_same(&a.element, &b.element)
		}
		_ => false,
	}
}
