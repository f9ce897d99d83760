//! Placeholder data props
//!
//! Pre-rendering a query segment before its data exists needs every
//! top-level data prop present. [`null_data_props`] lists them with `null`
//! values.

use crate::element::Props;
use crate::route::SegmentMatch;
use reinhardt_relay_runtime::request::Selection;
use serde_json::Value;

/// Maps every top-level linked field of the segment's query to `null`.
///
/// Fields are keyed by alias when one is set. Fields under a condition are
/// included whatever the condition's variable. Segments without a query
/// produce no props.
///
/// # Examples
///
/// ```
/// use reinhardt_relay_resolver::{Location, Route, SegmentMatch, null_data_props};
/// use reinhardt_relay_runtime::request::{ConcreteRequest, Field, Query};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let query = Query::new(
///     ConcreteRequest::new("viewer_Query")
///         .select(Field::linked("viewer", vec![Field::scalar("id").into()]))
///         .select(Field::scalar("version")),
/// );
/// let segment = SegmentMatch {
///     index: 0,
///     parent: None,
///     route: Arc::new(Route::new().query(query)),
///     params: Default::default(),
///     location: Location::new("/"),
/// };
///
/// assert_eq!(
///     serde_json::Value::Object(null_data_props(&segment)),
///     json!({"viewer": null}),
/// );
/// ```
pub fn null_data_props(segment: &SegmentMatch) -> Props {
	let mut props = Props::new();

	if let Some(query) = segment.route.resolve_query(segment) {
		collect_linked_fields(&query.request().selections, &mut props);
	}

	props
}

fn collect_linked_fields(selections: &[Selection], props: &mut Props) {
	for selection in selections {
		match selection {
			Selection::Field(field) if field.is_linked() => {
				props.insert(field.response_name().to_string(), Value::Null);
			}
			Selection::Field(_) => {}
			Selection::Condition(condition) => collect_linked_fields(&condition.selections, props),
		}
	}
}
