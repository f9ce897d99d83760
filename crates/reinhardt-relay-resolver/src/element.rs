//! Element descriptors
//!
//! The resolver does not render anything itself. For every segment it builds
//! a descriptor that tells the view layer what to show: nothing yet, nothing
//! at all, a component with props, or the result of a custom render function.
//! Segments with a query are wrapped in a [`ReadyStateElement`] so the view
//! layer can keep them current with a [`ReadyStateRenderer`](crate::ReadyStateRenderer).

use crate::route::{Component, SegmentMatch};
use crate::subscription::{QuerySubscription, Retry};
use reinhardt_relay_runtime::{Environment, RelayError, Variables};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Custom render function of a route.
///
/// Returning `None` means the segment is not renderable yet.
pub type RenderFn = Arc<dyn for<'a> Fn(RenderArgs<'a>) -> Option<RouteElement> + Send + Sync>;

/// Props handed to a component, keyed by prop name.
pub type Props = Map<String, Value>;

/// Loading state of a segment's component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentState {
	/// A lazily loaded component has not arrived yet.
	Pending,
	/// The component is known; `None` means the route has none.
	Resolved(Option<Component>),
}

impl ComponentState {
	/// Returns whether the component is known.
	pub fn is_resolved(&self) -> bool {
		matches!(self, Self::Resolved(_))
	}

	/// Returns the resolved component.
	pub fn component(&self) -> Option<&Component> {
		match self {
			Self::Resolved(component) => component.as_ref(),
			Self::Pending => None,
		}
	}

	/// Returns whether the route has, or may still turn out to have, a component.
	pub fn has_component(&self) -> bool {
		match self {
			Self::Pending => true,
			Self::Resolved(component) => component.is_some(),
		}
	}
}

impl From<Option<Option<Component>>> for ComponentState {
	fn from(component: Option<Option<Component>>) -> Self {
		match component {
			Some(component) => Self::Resolved(component),
			None => Self::Pending,
		}
	}
}

/// How a segment is turned into an element.
#[derive(Clone)]
pub enum RenderStrategy {
	/// The route's custom render function.
	Custom(RenderFn),
	/// The route's component, with data as props.
	Component,
	/// Nothing can render the segment.
	None,
}

impl RenderStrategy {
	/// Picks the strategy for a segment. A render function takes precedence.
	pub fn new(segment: &SegmentMatch, component: &ComponentState) -> Self {
		if let Some(render) = segment.route.render_fn() {
			Self::Custom(render.clone())
		} else if component.has_component() {
			Self::Component
		} else {
			Self::None
		}
	}
}

impl fmt::Debug for RenderStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Custom(_) => f.write_str("Custom(..)"),
			Self::Component => f.write_str("Component"),
			Self::None => f.write_str("None"),
		}
	}
}

/// Arguments passed to a route's custom render function.
pub struct RenderArgs<'a> {
	/// The segment being rendered.
	pub route_match: &'a SegmentMatch,
	/// The resolved component, if any.
	pub component: Option<&'a Component>,
	/// Query data, or empty props for a segment without a query. `None`
	/// while the query is pending or failed.
	pub props: Option<Props>,
	/// The error the query failed with.
	pub error: Option<RelayError>,
	/// Re-executes the query.
	pub retry: Option<Retry>,
	/// The data environment of the query.
	pub environment: Option<&'a Arc<dyn Environment>>,
	/// The derived variables of the query.
	pub variables: Option<&'a Variables>,
	/// Whether the call happens while resolving a navigation, as opposed to
	/// a live update of an already rendered element.
	pub resolving: bool,
}

impl fmt::Debug for RenderArgs<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RenderArgs")
			.field("route_match", &self.route_match.index)
			.field("component", &self.component)
			.field("props", &self.props)
			.field("error", &self.error)
			.field("resolving", &self.resolving)
			.finish_non_exhaustive()
	}
}

/// A component together with the props it is rendered with.
#[derive(Debug, Clone)]
pub struct Element {
	/// The component to render.
	pub component: Component,
	/// The segment the element was built for.
	pub route_match: SegmentMatch,
	/// Props for the component.
	pub props: Props,
}

impl Element {
	/// Creates an element.
	pub fn new(component: Component, route_match: SegmentMatch, props: Props) -> Self {
		Self {
			component,
			route_match,
			props,
		}
	}
}

/// A query segment's element, kept current by a
/// [`ReadyStateRenderer`](crate::ReadyStateRenderer) once mounted.
#[derive(Debug, Clone)]
pub struct ReadyStateElement {
	/// The segment the element was built for.
	pub route_match: SegmentMatch,
	/// The component state the element was built with.
	pub component: ComponentState,
	/// The element rendered while resolving.
	pub element: RouteElement,
	/// The segment's query subscription.
	pub subscription: QuerySubscription,
	/// Whether the element belongs to a settled tree.
	pub fetched: bool,
}

/// What the view layer renders for one segment.
#[derive(Debug, Clone)]
pub enum RouteElement {
	/// Intentionally renders nothing.
	Empty,
	/// A component with props.
	Element(Element),
	/// A query segment's element with its live subscription.
	ReadyState(Box<ReadyStateElement>),
}

impl RouteElement {
	/// Returns the props of the element, looking through ready state wrappers.
	pub fn props(&self) -> Option<&Props> {
		match self {
			Self::Empty => None,
			Self::Element(element) => Some(&element.props),
			Self::ReadyState(ready_state) => ready_state.element.props(),
		}
	}

	/// Returns the component of the element, looking through ready state wrappers.
	pub fn component(&self) -> Option<&Component> {
		match self {
			Self::Empty => None,
			Self::Element(element) => Some(&element.component),
			Self::ReadyState(ready_state) => ready_state.element.component(),
		}
	}

	/// Returns whether the element renders nothing.
	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Empty)
	}
}

/// Builds the element for a segment with a query.
///
/// Without a custom render function the element is not ready (`None`) while
/// the component or the query is pending. A route that cannot show the
/// settled result renders [`RouteElement::Empty`] and logs a warning.
pub fn render_element(
	route_match: &SegmentMatch,
	component: &ComponentState,
	subscription: &QuerySubscription,
	resolving: bool,
) -> Option<RouteElement> {
	let ready_state = subscription.ready_state();

	match RenderStrategy::new(route_match, component) {
		RenderStrategy::Custom(render) => render(RenderArgs {
			route_match,
			component: component.component(),
			props: ready_state.data,
			error: ready_state.error,
			retry: ready_state.retry,
			environment: Some(subscription.environment()),
			variables: Some(subscription.variables()),
			resolving,
		}),
		strategy => {
			if !component.is_resolved() || ready_state.is_pending() {
				return None;
			}

			match (strategy, component.component(), ready_state.data) {
				(RenderStrategy::Component, Some(resolved), Some(data)) => Some(RouteElement::Element(
					Element::new(resolved.clone(), route_match.clone(), data),
				)),
				_ => {
					tracing::warn!(
						query = subscription.query_name(),
						index = route_match.index,
						"Route with query `{}` has no render method or component.",
						subscription.query_name()
					);
					Some(RouteElement::Empty)
				}
			}
		}
	}
}

/// Builds the element for a segment without a query.
pub fn render_static_element(
	route_match: &SegmentMatch,
	component: &ComponentState,
) -> Option<RouteElement> {
	match RenderStrategy::new(route_match, component) {
		RenderStrategy::Custom(render) => render(RenderArgs {
			route_match,
			component: component.component(),
			props: Some(Props::new()),
			error: None,
			retry: None,
			environment: None,
			variables: None,
			resolving: false,
		}),
		_ => match component {
			ComponentState::Pending => None,
			ComponentState::Resolved(None) => Some(RouteElement::Empty),
			ComponentState::Resolved(Some(resolved)) => Some(RouteElement::Element(Element::new(
				resolved.clone(),
				route_match.clone(),
				Props::new(),
			))),
		},
	}
}

/// Builds one element per segment.
///
/// `components` and `subscriptions` are indexed like `segments`. Query
/// segments that render something are wrapped in a [`ReadyStateElement`].
pub fn create_elements(
	segments: &[SegmentMatch],
	components: &[ComponentState],
	subscriptions: &[Option<QuerySubscription>],
	fetched: bool,
) -> ElementTree {
	let elements = segments
		.iter()
		.zip(components)
		.zip(subscriptions)
		.map(|((segment, component), subscription)| {
			let Some(subscription) = subscription else {
				return render_static_element(segment, component);
			};

			match render_element(segment, component, subscription, true)? {
				RouteElement::Empty => Some(RouteElement::Empty),
				element => Some(RouteElement::ReadyState(Box::new(ReadyStateElement {
					route_match: segment.clone(),
					component: component.clone(),
					element,
					subscription: subscription.clone(),
					fetched,
				}))),
			}
		})
		.collect();

	ElementTree(elements)
}

/// One element per segment, in pre-order. `None` marks a segment that is not
/// renderable yet.
#[derive(Debug, Clone)]
pub struct ElementTree(Vec<Option<RouteElement>>);

impl ElementTree {
	/// Wraps a list of elements.
	pub fn new(elements: Vec<Option<RouteElement>>) -> Self {
		Self(elements)
	}

	/// Returns whether every segment can be rendered.
	pub fn is_renderable(&self) -> bool {
		self.0.iter().all(Option::is_some)
	}

	/// Returns the element of a segment.
	pub fn get(&self, index: usize) -> Option<&RouteElement> {
		self.0.get(index).and_then(Option::as_ref)
	}

	/// Returns the number of segments.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns whether the tree has no segments.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates over the elements.
	pub fn iter(&self) -> impl Iterator<Item = Option<&RouteElement>> {
		self.0.iter().map(Option::as_ref)
	}

	/// Returns the elements.
	pub fn into_inner(self) -> Vec<Option<RouteElement>> {
		self.0
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::route::{Location, Params, Route};
	use reinhardt_relay_runtime::request::{ConcreteRequest, Field};
	use reinhardt_relay_runtime::testing::MockNetwork;
	use reinhardt_relay_runtime::{InMemoryEnvironment, Query};
	use rstest::*;
	use serde_json::json;
	use tracing_test::traced_test;

	fn segment(route: Route) -> SegmentMatch {
		SegmentMatch {
			index: 0,
			parent: None,
			route: Arc::new(route),
			params: Params::new(),
			location: Location::new("/"),
		}
	}

	#[fixture]
	fn subscription() -> QuerySubscription {
		let network = MockNetwork::new();
		network.respond(json!({"data": {"widget": {"name": "foo"}}}));
		let query = Query::new(
			ConcreteRequest::new("widget_Query")
				.select(Field::linked("widget", vec![Field::scalar("name").into()])),
		);
		QuerySubscription::new(Arc::new(InMemoryEnvironment::new(network)), query, Variables::new())
	}

	fn page() -> ComponentState {
		ComponentState::Resolved(Some(Component::new("Page")))
	}

	#[rstest]
	fn test_pending_query_is_not_renderable(subscription: QuerySubscription) {
		let segment = segment(Route::new().component(Component::new("Page")));
		assert!(render_element(&segment, &page(), &subscription, true).is_none());
	}

	#[rstest]
	fn test_settled_query_renders_component_with_data(subscription: QuerySubscription) {
		let _fetch = subscription.fetch();
		let segment = segment(Route::new().component(Component::new("Page")));

		let element = render_element(&segment, &page(), &subscription, true).unwrap();

		assert_eq!(element.component(), Some(&Component::new("Page")));
		assert_eq!(
			Value::Object(element.props().unwrap().clone()),
			json!({"widget": {"name": "foo"}})
		);
	}

	#[rstest]
	fn test_pending_component_is_not_renderable(subscription: QuerySubscription) {
		let _fetch = subscription.fetch();
		let segment = segment(Route::new());
		assert!(
			render_element(&segment, &ComponentState::Pending, &subscription, true).is_none()
		);
	}

	#[rstest]
	#[traced_test]
	fn test_missing_component_warns(subscription: QuerySubscription) {
		let _fetch = subscription.fetch();
		let segment = segment(Route::new());

		let element = render_element(
			&segment,
			&ComponentState::Resolved(None),
			&subscription,
			true,
		);

		assert!(matches!(element, Some(RouteElement::Empty)));
		assert!(logs_contain(
			"Route with query `widget_Query` has no render method or component."
		));
	}

	#[rstest]
	fn test_custom_render_receives_ready_state(subscription: QuerySubscription) {
		let segment = segment(Route::new().render(|args: RenderArgs<'_>| {
			let props = args.props?;
			assert!(args.error.is_none());
			assert!(args.retry.is_some());
			assert!(args.environment.is_some());
			assert!(args.resolving);
			Some(RouteElement::Element(Element::new(
				Component::new("Custom"),
				args.route_match.clone(),
				props,
			)))
		}));

		assert!(render_element(&segment, &page(), &subscription, true).is_none());

		let _fetch = subscription.fetch();
		let element = render_element(&segment, &page(), &subscription, true).unwrap();
		assert_eq!(element.component(), Some(&Component::new("Custom")));
	}

	#[rstest]
	#[case(ComponentState::Pending, None)]
	#[case(ComponentState::Resolved(None), Some(true))]
	#[case(ComponentState::Resolved(Some(Component::new("Layout"))), Some(false))]
	fn test_static_segments(#[case] component: ComponentState, #[case] empty: Option<bool>) {
		let segment = segment(Route::new());
		let element = render_static_element(&segment, &component);
		assert_eq!(element.map(|element| element.is_empty()), empty);
	}

	#[rstest]
	fn test_static_custom_render_gets_empty_props() {
		let segment = segment(Route::new().render(|args: RenderArgs<'_>| {
			assert_eq!(args.props, Some(Props::new()));
			assert!(args.component.is_none());
			Some(RouteElement::Empty)
		}));

		let element = render_static_element(&segment, &ComponentState::Pending);

		assert!(matches!(element, Some(RouteElement::Empty)));
	}

	#[rstest]
	fn test_create_elements_wraps_query_segments(subscription: QuerySubscription) {
		let _fetch = subscription.fetch();
		let segments = vec![
			segment(Route::new().component(Component::new("Layout"))),
			segment(Route::new().component(Component::new("Page"))),
		];
		let components = vec![
			ComponentState::Resolved(Some(Component::new("Layout"))),
			page(),
		];

		let tree = create_elements(&segments, &components, &[None, Some(subscription)], true);

		assert!(tree.is_renderable());
		assert!(matches!(tree.get(0), Some(RouteElement::Element(_))));
		match tree.get(1) {
			Some(RouteElement::ReadyState(ready_state)) => {
				assert!(ready_state.fetched);
				assert_eq!(ready_state.component, page());
			}
			other => panic!("unexpected element: {:?}", other),
		}
	}
}
