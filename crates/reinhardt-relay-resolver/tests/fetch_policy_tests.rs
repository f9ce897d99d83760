//! Fetch policy behaviour of resolved routes

mod common;

use common::*;
use futures::StreamExt;
use parking_lot::Mutex;
use reinhardt_relay_resolver::{
	ReadyStateRenderer, Resolution, Resolver, ResolverSettings, Route, RouteElement,
};
use reinhardt_relay_runtime::{CacheConfig, FetchPolicy};
use rstest::*;
use serde_json::{Value, json};
use std::sync::Arc;

/// Test that a network-only query renders pending, then the network data
#[rstest]
#[tokio::test]
async fn test_network_only_yields_pending_then_settled() {
	let harness = Harness::empty();
	let deferred = harness.network.defer();
	let calls = Arc::new(Mutex::new(Vec::new()));
	let route = Route::new()
		.query(widget_query())
		.render(class_name_render(calls.clone()));

	let mut resolutions = harness.resolver.resolve_elements(single(route));

	let first = resolutions.next().await.unwrap();
	assert!(!first.is_settled());
	assert_eq!(class_name(first.tree(), 0).as_deref(), Some("pending"));

	deferred.resolve(widget_response("foo"));

	let second = resolutions.next().await.unwrap();
	assert!(second.is_settled());
	assert_eq!(class_name(second.tree(), 0).as_deref(), Some("foo"));
	assert!(resolutions.next().await.is_none());

	// Render is called once per resolution: without props, then with data
	let calls: Vec<Option<Value>> = calls
		.lock()
		.iter()
		.map(|props| props.clone().map(Value::Object))
		.collect();
	assert_eq!(calls, vec![None, Some(json!({"widget": {"name": "foo"}}))]);
	assert_eq!(harness.network.request_count(), 1);
}

/// Test that network-only ignores data already in the store
#[rstest]
#[tokio::test]
async fn test_network_only_ignores_store() {
	let harness = Harness::new(widget_records("bar"));
	let deferred = harness.network.defer();
	let route = Route::new()
		.query(widget_query())
		.render(class_name_render(Arc::default()));

	let mut resolutions = harness.resolver.resolve_elements(single(route));

	let first = resolutions.next().await.unwrap();
	assert!(!first.is_settled());
	assert_eq!(class_name(first.tree(), 0).as_deref(), Some("pending"));

	deferred.resolve(widget_response("foo"));

	let second = resolutions.next().await.unwrap();
	assert_eq!(class_name(second.tree(), 0).as_deref(), Some("foo"));
}

/// Test that store-and-network renders store data first and follows the network update
#[rstest]
#[tokio::test]
async fn test_store_and_network_updates_mounted_element() {
	let harness = Harness::new(widget_records("bar"));
	let deferred = harness.network.defer();
	let route = Route::new()
		.query(widget_query())
		.fetch_policy(FetchPolicy::StoreAndNetwork)
		.render(class_name_render(Arc::default()));

	let resolutions = harness.resolve(single(route)).await;

	// Store data settles the fetch synchronously, so nothing is pending
	assert_eq!(resolutions.len(), 1);
	let Resolution::Settled(tree) = &resolutions[0] else {
		panic!("expected a settled tree");
	};
	assert_eq!(class_name(tree, 0).as_deref(), Some("bar"));
	assert_eq!(harness.network.request_count(), 1);

	let Some(RouteElement::ReadyState(element)) = tree.get(0) else {
		panic!("expected a query element");
	};
	let renderer = ReadyStateRenderer::mount(element);
	let mut changes = renderer.changes();

	deferred.resolve(widget_response("foo"));
	changes.changed().await.unwrap();

	assert_eq!(element_class_name(&renderer.element()).as_deref(), Some("foo"));
}

/// Test that store-and-network prefers a synchronous network response over the store
#[rstest]
#[tokio::test]
async fn test_store_and_network_with_synchronous_network() {
	let harness = Harness::new(widget_records("bar"));
	harness.network.respond(widget_response("foo"));
	let route = Route::new()
		.query(widget_query())
		.fetch_policy(FetchPolicy::StoreAndNetwork)
		.render(class_name_render(Arc::default()));

	let resolutions = harness.resolve(single(route)).await;

	assert_eq!(resolutions.len(), 1);
	assert_eq!(class_name(resolutions[0].tree(), 0).as_deref(), Some("foo"));
}

/// Test that store-or-network skips the network when the store has the data
#[rstest]
#[tokio::test]
async fn test_store_or_network_uses_store() {
	let harness = Harness::new(widget_records("bar"));
	let route = Route::new()
		.query(widget_query())
		.fetch_policy(FetchPolicy::StoreOrNetwork)
		.render(class_name_render(Arc::default()));

	let resolutions = harness.resolve(single(route)).await;

	assert_eq!(resolutions.len(), 1);
	assert_eq!(class_name(resolutions[0].tree(), 0).as_deref(), Some("bar"));
	assert_eq!(harness.network.request_count(), 0);
}

/// Test that store-or-network falls back to the network when the store misses
#[rstest]
#[tokio::test]
async fn test_store_or_network_fetches_missing_data() {
	let harness = Harness::empty();
	harness.network.respond(widget_response("foo"));
	let route = Route::new()
		.query(widget_query())
		.fetch_policy(FetchPolicy::StoreOrNetwork)
		.render(class_name_render(Arc::default()));

	let resolutions = harness.resolve(single(route)).await;

	assert_eq!(resolutions.len(), 1);
	assert_eq!(class_name(resolutions[0].tree(), 0).as_deref(), Some("foo"));
	assert_eq!(harness.network.request_count(), 1);
}

/// Test that resolver settings apply only to routes without their own values
#[rstest]
#[case(None, 0)]
#[case(Some(FetchPolicy::NetworkOnly), 1)]
#[tokio::test]
async fn test_settings_default_fetch_policy(
	#[case] route_policy: Option<FetchPolicy>,
	#[case] expected_requests: usize,
) {
	let harness = Harness::new(widget_records("bar"));
	harness.network.respond(widget_response("foo"));
	let resolver = Resolver::with_settings(
		harness.environment.clone(),
		ResolverSettings::new().with_fetch_policy(FetchPolicy::StoreOrNetwork),
	);

	let mut route = Route::new()
		.query(widget_query())
		.render(class_name_render(Arc::default()));
	if let Some(policy) = route_policy {
		route = route.fetch_policy(policy);
	}

	let resolutions: Vec<_> = resolver.resolve_elements(single(route)).collect().await;

	assert_eq!(resolutions.len(), 1);
	assert_eq!(harness.network.request_count(), expected_requests);
}

/// Test that the route cache config is handed to the network
#[rstest]
#[tokio::test]
async fn test_cache_config_reaches_network() {
	let harness = Harness::empty();
	harness.network.respond(widget_response("foo"));
	let route = Route::new()
		.query(widget_query())
		.cache_config(CacheConfig::force())
		.render(class_name_render(Arc::default()));

	harness.resolve(single(route)).await;

	let requests = harness.network.requests();
	assert_eq!(requests.len(), 1);
	assert_eq!(requests[0].name, "widget_Query");
	assert_eq!(requests[0].cache_config, Some(CacheConfig::force()));
}
