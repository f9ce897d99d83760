//! Error types for data environment operations

/// Errors produced while executing an operation against a data environment.
///
/// Errors are cloneable so they can be stored in a ready state and handed to
/// every renderer that observes it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
	/// The network layer failed to produce a response.
	#[error("Network error: {0}")]
	Network(String),
	/// The server answered with GraphQL errors and no data.
	#[error("Query execution failed: {0}")]
	Execution(String),
	/// The operation could not be started.
	#[error("Invalid operation: {0}")]
	InvalidOperation(String),
	/// An asynchronous request was issued outside of a tokio runtime.
	#[error("No async runtime available to execute `{0}`")]
	MissingRuntime(String),
	/// The request was cancelled before it produced a response.
	#[error("Request cancelled")]
	Cancelled,
}

/// Result type for data environment operations
pub type RelayResult<T> = Result<T, RelayError>;

impl RelayError {
	/// Builds an execution error from the `errors` array of a GraphQL response.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_relay_runtime::RelayError;
	/// use serde_json::json;
	///
	/// let errors = json!([{"message": "first"}, {"message": "second"}]);
	/// let error = RelayError::from_graphql_errors(&errors);
	/// assert_eq!(error, RelayError::Execution("first; second".to_string()));
	/// ```
	pub fn from_graphql_errors(errors: &serde_json::Value) -> Self {
		let messages: Vec<String> = errors
			.as_array()
			.map(|errors| {
				errors
					.iter()
					.map(|error| {
						error
							.get("message")
							.and_then(|message| message.as_str())
							.map(str::to_string)
							.unwrap_or_else(|| error.to_string())
					})
					.collect()
			})
			.unwrap_or_default();

		if messages.is_empty() {
			Self::Execution("unknown error".to_string())
		} else {
			Self::Execution(messages.join("; "))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_error_display() {
		assert_eq!(
			RelayError::Network("expected error".to_string()).to_string(),
			"Network error: expected error"
		);
		assert_eq!(RelayError::Cancelled.to_string(), "Request cancelled");
	}

	#[rstest]
	#[case(json!([{"message": "boom"}]), "boom")]
	#[case(json!([{"code": 1}]), "{\"code\":1}")]
	#[case(json!([]), "unknown error")]
	#[case(json!("not a list"), "unknown error")]
	fn test_from_graphql_errors(#[case] errors: serde_json::Value, #[case] expected: &str) {
		assert_eq!(
			RelayError::from_graphql_errors(&errors),
			RelayError::Execution(expected.to_string())
		);
	}
}
