//! Query variables

use serde_json::{Map, Value};

/// Variables passed to a query, keyed by variable name.
pub type Variables = Map<String, Value>;

/// Data read from the store for a selector, keyed by response name.
pub type SelectorData = Map<String, Value>;

/// Converts a JSON value into variables.
///
/// Non-object values produce an empty variable set.
///
/// # Examples
///
/// ```
/// use reinhardt_relay_runtime::variables::to_variables;
/// use serde_json::json;
///
/// let variables = to_variables(json!({"id": "1"}));
/// assert_eq!(variables.get("id"), Some(&json!("1")));
///
/// assert!(to_variables(json!(null)).is_empty());
/// ```
pub fn to_variables(value: Value) -> Variables {
	match value {
		Value::Object(map) => map,
		_ => Variables::new(),
	}
}

/// Overlays `overlay` on top of `base`; keys in `overlay` win.
pub fn merge_variables(base: &Variables, overlay: &Variables) -> Variables {
	let mut merged = base.clone();
	for (key, value) in overlay {
		merged.insert(key.clone(), value.clone());
	}
	merged
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_merge_variables_overlay_wins() {
		let base = to_variables(json!({"a": 1, "b": 2}));
		let overlay = to_variables(json!({"b": 3, "c": 4}));

		let merged = merge_variables(&base, &overlay);

		assert_eq!(Value::Object(merged), json!({"a": 1, "b": 3, "c": 4}));
	}

	#[rstest]
	fn test_merge_variables_keeps_base() {
		let base = to_variables(json!({"a": 1}));
		let merged = merge_variables(&base, &Variables::new());
		assert_eq!(merged, base);
	}
}
