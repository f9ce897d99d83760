//! Variable accumulation along the route tree
//!
//! Each segment starts from its parent's variables, overlays its own route
//! params, then runs its route's `prepare_variables`. Siblings never see each
//! other's variables, and a descendant can override an ancestor's key but not
//! the other way around.

use crate::route::SegmentMatch;
use reinhardt_relay_runtime::Variables;
use serde_json::Value;

/// Computes the variables of every segment.
///
/// `segments` must be in pre-order, as produced by
/// [`RouteMatch::flatten`](crate::RouteMatch::flatten).
///
/// # Examples
///
/// ```
/// use reinhardt_relay_resolver::variables::route_variables;
/// use reinhardt_relay_resolver::{Location, MatchedRoute, Route, RouteMatch};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let parent = Route::new().prepare_variables(|mut variables, _| {
///     variables.insert("first".to_string(), json!(10));
///     variables
/// });
/// let route_match = RouteMatch::new(Location::new("/users/7")).with_route(
///     MatchedRoute::new(Arc::new(parent))
///         .with_child(MatchedRoute::new(Arc::new(Route::new())).with_param("id", "7")),
/// );
///
/// let variables = route_variables(&route_match.flatten());
/// assert_eq!(serde_json::Value::Object(variables[1].clone()), json!({"first": 10, "id": "7"}));
/// ```
pub fn route_variables(segments: &[SegmentMatch]) -> Vec<Variables> {
	let mut accumulated: Vec<Variables> = Vec::with_capacity(segments.len());

	for segment in segments {
		let mut variables = segment
			.parent
			.and_then(|parent| accumulated.get(parent))
			.cloned()
			.unwrap_or_default();

		// Params are merged even for segments without a query so that
		// descendants still see them.
		for (name, value) in &segment.params {
			variables.insert(name.clone(), Value::String(value.clone()));
		}

		accumulated.push(segment.route.prepare(variables, segment));
	}

	accumulated
}
