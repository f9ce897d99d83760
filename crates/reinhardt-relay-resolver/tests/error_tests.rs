//! Failed queries and retries

mod common;

use common::*;
use reinhardt_relay_resolver::{
	Component, ElementTree, Location, MatchedRoute, ReadyStateElement, ReadyStateRenderer, Route,
	RouteElement, RouteMatch,
};
use reinhardt_relay_runtime::RelayError;
use rstest::*;
use serde_json::json;
use std::sync::Arc;
use tracing_test::traced_test;

fn ready_state_element(tree: &ElementTree, index: usize) -> &ReadyStateElement {
	match tree.get(index) {
		Some(RouteElement::ReadyState(element)) => &**element,
		other => panic!("expected a query element, got {:?}", other),
	}
}

/// Test that a failed fetch settles with the error and a retry handle
#[rstest]
#[tokio::test]
async fn test_error_settles_with_retry() {
	let harness = Harness::empty();
	harness
		.network
		.fail(RelayError::Network("expected error".to_string()));
	let route = Route::new()
		.query(widget_query())
		.render(class_name_render(Arc::default()));

	let resolutions = harness.resolve(single(route)).await;

	assert_eq!(resolutions.len(), 1);
	let element = ready_state_element(resolutions[0].tree(), 0);
	let ready_state = element.subscription.ready_state();
	assert_eq!(
		ready_state.error,
		Some(RelayError::Network("expected error".to_string()))
	);
	assert!(ready_state.data.is_none());
	assert!(ready_state.retry.is_some());

	// Without data the render function sees no props
	assert_eq!(
		element_class_name(&element.element).as_deref(),
		Some("pending")
	);
}

/// Test that GraphQL errors without data are surfaced as execution errors
#[rstest]
#[tokio::test]
async fn test_graphql_errors() {
	let harness = Harness::empty();
	harness
		.network
		.respond(json!({"errors": [{"message": "widget not found"}]}));
	let route = Route::new()
		.query(widget_query())
		.render(class_name_render(Arc::default()));

	let resolutions = harness.resolve(single(route)).await;

	let ready_state = ready_state_element(resolutions[0].tree(), 0)
		.subscription
		.ready_state();
	assert_eq!(
		ready_state.error,
		Some(RelayError::Execution("widget not found".to_string()))
	);
}

/// Test that retrying after an error goes back to pending, then shows the data
#[rstest]
#[tokio::test]
async fn test_retry_after_error() {
	let harness = Harness::empty();
	harness
		.network
		.fail(RelayError::Network("expected error".to_string()));
	let deferred = harness.network.defer();
	let route = Route::new()
		.query(widget_query())
		.render(class_name_render(Arc::default()));

	let resolutions = harness.resolve(single(route)).await;
	let element = ready_state_element(resolutions[0].tree(), 0);
	let renderer = ReadyStateRenderer::mount(element);
	let mut changes = renderer.changes();

	let retry = element.subscription.ready_state().retry.unwrap();
	retry.retry();

	// The deferred response has not arrived, so the state is pending again
	assert!(renderer.subscription().ready_state().is_pending());
	assert_eq!(
		element_class_name(&changes.borrow_and_update()).as_deref(),
		Some("pending")
	);

	deferred.resolve(widget_response("foo"));
	changes.changed().await.unwrap();

	let ready_state = renderer.subscription().ready_state();
	assert!(ready_state.error.is_none());
	assert_eq!(element_class_name(&renderer.element()).as_deref(), Some("foo"));
	assert_eq!(harness.network.request_count(), 2);
}

/// Test that one failing segment does not keep its sibling from resolving
#[rstest]
#[traced_test]
#[tokio::test]
async fn test_failing_segment_does_not_block_sibling() {
	let harness = Harness::empty();
	harness
		.network
		.fail(RelayError::Network("expected error".to_string()));
	harness.network.respond(widget_response("foo"));

	let failing = Route::new()
		.query(widget_by_arg_query("failing"))
		.component(Component::new("Failing"));
	let working = Route::new()
		.query(widget_by_arg_query("working"))
		.component(Component::new("Working"));
	let route_match = RouteMatch::new(Location::new("/")).with_route(
		MatchedRoute::new(Arc::new(Route::new().component(Component::new("App"))))
			.with_child(MatchedRoute::new(Arc::new(failing)))
			.with_child(MatchedRoute::new(Arc::new(working))),
	);

	let resolutions = harness.resolve(route_match).await;

	assert_eq!(resolutions.len(), 1);
	let tree = resolutions[0].tree();
	assert_eq!(
		tree.get(0).and_then(RouteElement::component).map(Component::name),
		Some("App")
	);

	// A component cannot show an error, so the failing segment renders nothing
	assert!(tree.get(1).is_some_and(RouteElement::is_empty));
	assert!(logs_contain(
		"Route with query `failing_Query` has no render method or component."
	));

	assert_eq!(widget_name(tree, 2).as_deref(), Some("foo"));
}
