//! Query definitions
//!
//! A [`Query`] is the compiled form of a GraphQL query document: its name, the
//! arguments it declares, and its selection set. Queries are shared behind an
//! [`Arc`] and compared by identity, so two routes that reference the same
//! `Query` value are known to request the same data.

use crate::variables::Variables;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A variable declared by a query, with an optional default value.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDefinition {
	/// Variable name, without the leading `$`.
	pub name: String,
	/// Value used when the caller does not provide one.
	pub default_value: Option<Value>,
}

impl ArgumentDefinition {
	/// Declares a variable without a default value.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			default_value: None,
		}
	}

	/// Declares a variable with a default value.
	pub fn with_default(name: impl Into<String>, default_value: Value) -> Self {
		Self {
			name: name.into(),
			default_value: Some(default_value),
		}
	}
}

/// The value passed to a field argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
	/// A literal written in the query document.
	Literal(Value),
	/// A reference to an operation variable.
	Variable(String),
}

impl ArgumentValue {
	fn resolve(&self, variables: &Variables) -> Value {
		match self {
			Self::Literal(value) => value.clone(),
			Self::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
		}
	}
}

/// A field argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
	/// Argument name.
	pub name: String,
	/// Argument value.
	pub value: ArgumentValue,
}

/// A selected field. Fields with sub-selections are linked fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
	/// Schema field name.
	pub name: String,
	/// Alias the field is returned under, if any.
	pub alias: Option<String>,
	/// Arguments passed to the field.
	pub arguments: Vec<Argument>,
	/// Nested selections; empty for scalar fields.
	pub selections: Vec<Selection>,
}

impl Field {
	/// Creates a scalar field.
	pub fn scalar(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			alias: None,
			arguments: Vec::new(),
			selections: Vec::new(),
		}
	}

	/// Creates a linked field with the given sub-selections.
	pub fn linked(name: impl Into<String>, selections: Vec<Selection>) -> Self {
		Self {
			name: name.into(),
			alias: None,
			arguments: Vec::new(),
			selections,
		}
	}

	/// Sets the alias of this field.
	pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
		self.alias = Some(alias.into());
		self
	}

	/// Adds an argument to this field.
	pub fn with_argument(mut self, name: impl Into<String>, value: ArgumentValue) -> Self {
		self.arguments.push(Argument {
			name: name.into(),
			value,
		});
		self
	}

	/// Returns whether the field selects nested data.
	pub fn is_linked(&self) -> bool {
		!self.selections.is_empty()
	}

	/// Returns the key the field appears under in response data.
	pub fn response_name(&self) -> &str {
		self.alias.as_deref().unwrap_or(&self.name)
	}

	/// Returns the key the field is stored under in the record store.
	///
	/// Arguments are part of the key so that the same field requested with
	/// different arguments is stored separately.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_relay_runtime::request::{ArgumentValue, Field};
	/// use reinhardt_relay_runtime::Variables;
	/// use serde_json::json;
	///
	/// let field = Field::scalar("widgetByArg")
	///     .with_argument("name", ArgumentValue::Literal(json!("foo")));
	/// assert_eq!(field.storage_key(&Variables::new()), "widgetByArg(name:\"foo\")");
	/// assert_eq!(Field::scalar("name").storage_key(&Variables::new()), "name");
	/// ```
	pub fn storage_key(&self, variables: &Variables) -> String {
		if self.arguments.is_empty() {
			return self.name.clone();
		}

		let mut arguments: Vec<&Argument> = self.arguments.iter().collect();
		arguments.sort_by(|a, b| a.name.cmp(&b.name));

		let rendered: Vec<String> = arguments
			.iter()
			.map(|argument| format!("{}:{}", argument.name, argument.value.resolve(variables)))
			.collect();

		format!("{}({})", self.name, rendered.join(","))
	}
}

/// Selections included only when a boolean variable has the passing value.
///
/// Models `@include(if: $var)` (passing value `true`) and `@skip(if: $var)`
/// (passing value `false`).
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
	/// Name of the boolean variable.
	pub variable: String,
	/// Value the variable must have for the selections to apply.
	pub passing_value: bool,
	/// Conditional selections.
	pub selections: Vec<Selection>,
}

impl Condition {
	/// Creates a condition.
	pub fn new(variable: impl Into<String>, passing_value: bool, selections: Vec<Selection>) -> Self {
		Self {
			variable: variable.into(),
			passing_value,
			selections,
		}
	}

	/// Returns whether the conditional selections apply under `variables`.
	pub fn passes(&self, variables: &Variables) -> bool {
		let value = variables
			.get(&self.variable)
			.map(is_truthy)
			.unwrap_or(false);
		value == self.passing_value
	}
}

fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(value) => *value,
		Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
		Value::String(value) => !value.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}

/// One entry of a selection set.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
	/// A field.
	Field(Field),
	/// A conditional group of selections.
	Condition(Condition),
}

impl From<Field> for Selection {
	fn from(field: Field) -> Self {
		Self::Field(field)
	}
}

impl From<Condition> for Selection {
	fn from(condition: Condition) -> Self {
		Self::Condition(condition)
	}
}

/// A compiled query document.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcreteRequest {
	/// Operation name, used for diagnostics.
	pub name: String,
	/// Variables the operation declares.
	pub argument_definitions: Vec<ArgumentDefinition>,
	/// Root selection set.
	pub selections: Vec<Selection>,
}

impl ConcreteRequest {
	/// Creates an empty request with the given operation name.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			argument_definitions: Vec::new(),
			selections: Vec::new(),
		}
	}

	/// Declares an operation variable.
	pub fn argument(mut self, definition: ArgumentDefinition) -> Self {
		self.argument_definitions.push(definition);
		self
	}

	/// Adds a root selection.
	pub fn select(mut self, selection: impl Into<Selection>) -> Self {
		self.selections.push(selection.into());
		self
	}
}

/// A shared query definition, compared by identity.
///
/// # Examples
///
/// ```
/// use reinhardt_relay_runtime::request::{ConcreteRequest, Field, Query};
///
/// let request = ConcreteRequest::new("widget_Query")
///     .select(Field::linked("widget", vec![Field::scalar("name").into()]));
/// let query = Query::new(request.clone());
///
/// assert!(query.ptr_eq(&query.clone()));
/// assert!(!query.ptr_eq(&Query::new(request)));
/// ```
#[derive(Clone)]
pub struct Query(Arc<ConcreteRequest>);

impl Query {
	/// Wraps a compiled request.
	pub fn new(request: ConcreteRequest) -> Self {
		Self(Arc::new(request))
	}

	/// Returns the compiled request.
	pub fn request(&self) -> &ConcreteRequest {
		&self.0
	}

	/// Returns the operation name.
	pub fn name(&self) -> &str {
		&self.0.name
	}

	/// Returns whether both handles refer to the same query definition.
	pub fn ptr_eq(&self, other: &Query) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl From<ConcreteRequest> for Query {
	fn from(request: ConcreteRequest) -> Self {
		Self::new(request)
	}
}

impl fmt::Debug for Query {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Query").field(&self.0.name).finish()
	}
}
