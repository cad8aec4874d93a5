//! GraphQL request and response wire types.
//!
//! These are the JSON shapes exchanged over HTTP POST bodies and inside
//! subscription protocol frames: `{query, variables, operationName}` in,
//! `{data, errors}` out.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single-shot or subscription GraphQL operation request.
///
/// # Example
///
/// ```
/// use prism_core::GraphQLRequest;
///
/// let request: GraphQLRequest = serde_json::from_str(
///     r#"{"query": "{ hello }", "operationName": null}"#,
/// ).unwrap();
/// assert_eq!(request.query, "{ hello }");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLRequest {
    /// The operation document.
    pub query: String,

    /// Operation variables, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,

    /// Which operation in the document to run.
    #[serde(
        default,
        rename = "operationName",
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_name: Option<String>,
}

impl GraphQLRequest {
    /// Create a request from a bare query document.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
            operation_name: None,
        }
    }

    /// Set the operation variables.
    #[must_use]
    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Set the operation name.
    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// A GraphQL response error entry.
///
/// Errors during context construction or execution are carried here, in the
/// response error list; they are never a transport-level failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    /// Human-readable error description.
    pub message: String,

    /// Response path at which the error occurred, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,

    /// Implementation-specific error extensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl GraphQLError {
    /// Create an error with just a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            extensions: None,
        }
    }

    /// Attach a response path.
    #[must_use]
    pub fn with_path(mut self, path: Vec<Value>) -> Self {
        self.path = Some(path);
        self
    }

    /// Attach error extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Map<String, Value>) -> Self {
        self.extensions = Some(extensions);
        self
    }
}

impl std::fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for GraphQLError {}

/// The `{data, errors}` result of executing an operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphQLResponse {
    /// The execution result, `null` when execution failed outright.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Errors raised during context construction or execution.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

impl GraphQLResponse {
    /// A successful response carrying only data.
    #[must_use]
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// A failed response carrying a single error and null data.
    #[must_use]
    pub fn from_error(error: GraphQLError) -> Self {
        Self {
            data: Some(Value::Null),
            errors: vec![error],
        }
    }

    /// Whether the response carries any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_deserializes_operation_name() {
        let request: GraphQLRequest = serde_json::from_value(json!({
            "query": "query Hello { hello }",
            "operationName": "Hello",
            "variables": {"name": "world"},
        }))
        .unwrap();

        assert_eq!(request.operation_name.as_deref(), Some("Hello"));
        assert_eq!(
            request.variables.unwrap().get("name"),
            Some(&json!("world"))
        );
    }

    #[test]
    fn test_request_missing_optional_fields() {
        let request: GraphQLRequest =
            serde_json::from_value(json!({"query": "{ hello }"})).unwrap();
        assert!(request.variables.is_none());
        assert!(request.operation_name.is_none());
    }

    #[test]
    fn test_response_skips_empty_errors() {
        let response = GraphQLResponse::from_data(json!({"hello": "world"}));
        let serialized = serde_json::to_value(&response).unwrap();
        assert_eq!(serialized, json!({"data": {"hello": "world"}}));
    }

    #[test]
    fn test_error_response_serializes_errors() {
        let response = GraphQLResponse::from_error(GraphQLError::new("boom"));
        let serialized = serde_json::to_value(&response).unwrap();
        assert_eq!(
            serialized,
            json!({"data": null, "errors": [{"message": "boom"}]})
        );
    }

    #[test]
    fn test_error_display() {
        let error = GraphQLError::new("resolver failed");
        assert_eq!(error.to_string(), "resolver failed");
    }
}
