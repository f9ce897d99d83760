//! Shared helpers for resolver integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use reinhardt_relay_resolver::{
	Component, Element, ElementTree, Location, MatchedRoute, RenderArgs, Resolution, Resolver,
	Route, RouteElement, RouteMatch,
};
use reinhardt_relay_runtime::request::{ArgumentDefinition, ArgumentValue, ConcreteRequest, Field};
use reinhardt_relay_runtime::testing::MockNetwork;
use reinhardt_relay_runtime::{InMemoryEnvironment, Query, RecordStore};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Network, environment and resolver wired together.
pub struct Harness {
	pub network: MockNetwork,
	pub environment: Arc<InMemoryEnvironment>,
	pub resolver: Resolver,
}

impl Harness {
	pub fn new(records: Value) -> Self {
		let network = MockNetwork::new();
		let environment = Arc::new(InMemoryEnvironment::with_store(
			RecordStore::with_records(records),
			network.clone(),
		));
		let resolver = Resolver::new(environment.clone());
		Self {
			network,
			environment,
			resolver,
		}
	}

	pub fn empty() -> Self {
		Self::new(json!({}))
	}

	/// Drives one navigation to completion.
	pub async fn resolve(&self, route_match: RouteMatch) -> Vec<Resolution> {
		use futures::StreamExt;
		self.resolver.resolve_elements(route_match).collect().await
	}
}

/// `query { widget { name } }`
pub fn widget_query() -> Query {
	Query::new(
		ConcreteRequest::new("widget_Query")
			.select(Field::linked("widget", vec![Field::scalar("name").into()])),
	)
}

/// `query($name) { widget: widgetByArg(name: $name) { name } }`
pub fn widget_by_arg_query(name: &str) -> Query {
	Query::new(
		ConcreteRequest::new(format!("{}_Query", name))
			.argument(ArgumentDefinition::new("name"))
			.select(
				Field::linked("widgetByArg", vec![Field::scalar("name").into()])
					.with_alias("widget")
					.with_argument("name", ArgumentValue::Variable("name".to_string())),
			),
	)
}

pub fn widget_response(name: &str) -> Value {
	json!({"data": {"widget": {"name": name}}})
}

pub fn widget_records(name: &str) -> Value {
	json!({"widget": {"name": name}})
}

pub fn single(route: Route) -> RouteMatch {
	RouteMatch::new(Location::new("/")).with_route(MatchedRoute::new(Arc::new(route)))
}

/// Custom render that shows `props.widget.name`, or `pending` without data,
/// and records the props it was called with.
pub fn class_name_render(
	calls: Arc<Mutex<Vec<Option<Map<String, Value>>>>>,
) -> impl for<'a> Fn(RenderArgs<'a>) -> Option<RouteElement> + Send + Sync + 'static {
	move |args: RenderArgs<'_>| {
		calls.lock().push(args.props.clone());
		let class_name = match &args.props {
			Some(props) => props["widget"]["name"].clone(),
			None => json!("pending"),
		};
		let mut props = Map::new();
		props.insert("className".to_string(), class_name);
		Some(RouteElement::Element(Element::new(
			Component::new("div"),
			args.route_match.clone(),
			props,
		)))
	}
}

/// Reads the `className` prop rendered for a segment.
pub fn class_name(tree: &ElementTree, index: usize) -> Option<String> {
	element_class_name(tree.get(index)?)
}

pub fn element_class_name(element: &RouteElement) -> Option<String> {
	element
		.props()?
		.get("className")?
		.as_str()
		.map(str::to_string)
}

/// Reads `widget.name` from the data props rendered for a segment.
pub fn widget_name(tree: &ElementTree, index: usize) -> Option<String> {
	tree.get(index)?
		.props()?
		.get("widget")?
		.get("name")?
		.as_str()
		.map(str::to_string)
}
