//! Operation descriptors and selectors

use crate::request::{ConcreteRequest, Query};
use crate::variables::Variables;
use serde_json::Value;

/// A query paired with the variables it is executed with.
///
/// Only the variables the query declares are kept; missing ones take the
/// declared default, or `null`.
///
/// # Examples
///
/// ```
/// use reinhardt_relay_runtime::request::{ArgumentDefinition, ConcreteRequest, Query};
/// use reinhardt_relay_runtime::{OperationDescriptor, variables::to_variables};
/// use serde_json::json;
///
/// let query = Query::new(
///     ConcreteRequest::new("widget_Query")
///         .argument(ArgumentDefinition::new("id"))
///         .argument(ArgumentDefinition::with_default("first", json!(10))),
/// );
/// let operation = OperationDescriptor::new(&query, &to_variables(json!({"id": "1", "extra": true})));
///
/// assert_eq!(
///     serde_json::Value::Object(operation.variables().clone()),
///     json!({"id": "1", "first": 10}),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
	query: Query,
	variables: Variables,
	identifier: String,
}

impl OperationDescriptor {
	/// Creates the descriptor for `query` executed with `variables`.
	pub fn new(query: &Query, variables: &Variables) -> Self {
		let variables = operation_variables(query.request(), variables);
		let identifier = format!("{}{}", query.name(), Value::Object(variables.clone()));

		Self {
			query: query.clone(),
			variables,
			identifier,
		}
	}

	/// Returns the query.
	pub fn query(&self) -> &Query {
		&self.query
	}

	/// Returns the operation variables.
	pub fn variables(&self) -> &Variables {
		&self.variables
	}

	/// Returns the operation name.
	pub fn name(&self) -> &str {
		self.query.name()
	}

	/// Returns a stable identifier for the (query, variables) pair.
	pub fn identifier(&self) -> &str {
		&self.identifier
	}

	/// Returns the selector reading the operation's root data.
	pub fn fragment(&self) -> Selector {
		Selector {
			query: self.query.clone(),
			variables: self.variables.clone(),
		}
	}
}

/// Reads a query's root selections under a set of variables.
#[derive(Debug, Clone)]
pub struct Selector {
	query: Query,
	variables: Variables,
}

impl Selector {
	/// Returns the query whose selections are read.
	pub fn query(&self) -> &Query {
		&self.query
	}

	/// Returns the variables the selections are read with.
	pub fn variables(&self) -> &Variables {
		&self.variables
	}
}

fn operation_variables(request: &ConcreteRequest, provided: &Variables) -> Variables {
	request
		.argument_definitions
		.iter()
		.map(|definition| {
			let value = provided
				.get(&definition.name)
				.cloned()
				.or_else(|| definition.default_value.clone())
				.unwrap_or(Value::Null);
			(definition.name.clone(), value)
		})
		.collect()
}
