//! Common types and type aliases
//!
//! The API reports many failures inside the response body rather than via
//! HTTP status codes. Those travel through the library as values
//! ([`ApiError`] inside [`FetchOutcome`]/[`CallOutcome`]) so that resource
//! methods can decide recoverability themselves.

use serde_json::Value;
use std::fmt;

/// A single JSON record returned by the API
pub type Record = Value;

/// An ordered sequence of records, accumulated strictly in page order
pub type RecordSequence = Vec<Record>;

/// A tabular projection: rows keyed by flattened field name
pub type Table = Vec<serde_json::Map<String, Value>>;

// ============================================================================
// Reason codes
// ============================================================================

/// Machine-readable reason codes surfaced to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasonCode {
    /// A required parameter was empty or absent
    MissingParameter,
    /// A POST/PUT body failed the minimum-field check
    InvalidJson,
    /// An availability target was not one of marketplace/mandant/listing
    InvalidTarget,
    /// A stock booking quantity had the wrong sign
    InvalidQuantity,
    /// A language abbreviation is not supported by PlentyMarkets
    InvalidLanguage,
    /// A transfer template failed quantity-consistency validation
    InvalidTemplate,
    /// The login endpoint rejected the credentials
    InvalidCredentials,
    /// The server reported an error object without a known code
    ServerError,
    /// Any other code reported by the server
    Other(String),
}

impl ReasonCode {
    /// Parse a server-reported code string
    pub fn parse(code: &str) -> Self {
        match code {
            "missing_parameter" => Self::MissingParameter,
            "invalid_json" => Self::InvalidJson,
            "invalid_target" => Self::InvalidTarget,
            "invalid_quantity" => Self::InvalidQuantity,
            "invalid_language" => Self::InvalidLanguage,
            "invalid_template" => Self::InvalidTemplate,
            "invalid_credentials" => Self::InvalidCredentials,
            other => Self::Other(other.to_string()),
        }
    }

    /// The snake_case code string
    pub fn as_str(&self) -> &str {
        match self {
            Self::MissingParameter => "missing_parameter",
            Self::InvalidJson => "invalid_json",
            Self::InvalidTarget => "invalid_target",
            Self::InvalidQuantity => "invalid_quantity",
            Self::InvalidLanguage => "invalid_language",
            Self::InvalidTemplate => "invalid_template",
            Self::InvalidCredentials => "invalid_credentials",
            Self::ServerError => "server_error",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Server-reported errors as values
// ============================================================================

/// An error reported inside a response body
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    /// Reason code for the failure
    pub code: ReasonCode,
    /// Human-readable message, when the server provided one
    pub message: Option<String>,
    /// The original error payload, unchanged, when one exists
    pub payload: Option<Value>,
}

impl ApiError {
    /// Create an error value for a client-side validation failure
    pub fn new(code: ReasonCode) -> Self {
        Self {
            code,
            message: None,
            payload: None,
        }
    }

    /// Create an error value with a message
    pub fn with_message(code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
            payload: None,
        }
    }

    /// Extract an error from a response body, if it carries one.
    ///
    /// The API uses two shapes: `{"error": "some_code", ...}` on the login
    /// route and `{"error": {"message": "..."}, ...}` everywhere else.
    pub fn from_payload(body: &Value) -> Option<Self> {
        let error = body.as_object()?.get("error")?;
        let (code, message) = match error {
            Value::String(code) => (ReasonCode::parse(code), None),
            Value::Object(map) => (
                ReasonCode::ServerError,
                map.get("message")
                    .and_then(Value::as_str)
                    .map(String::from),
            ),
            _ => (ReasonCode::ServerError, None),
        };
        Some(Self {
            code,
            message,
            payload: Some(body.clone()),
        })
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.code),
            None => write!(f, "{}", self.code),
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of a fetch operation.
///
/// A caller always receives one of: a usable record sequence (or its tabular
/// projection), an explicit error value, or `Empty` — never a silently
/// truncated success.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The concatenation of all pages, in page order
    Records(RecordSequence),
    /// Tabular projection of the records
    Table(Table),
    /// A server-reported or validation error
    Error(ApiError),
    /// The server produced no decodable response body
    Empty,
}

impl FetchOutcome {
    /// The records, if this outcome carries any
    pub fn records(&self) -> Option<&[Record]> {
        match self {
            Self::Records(records) => Some(records),
            _ => None,
        }
    }

    /// Consume the outcome and return the records
    pub fn into_records(self) -> Option<RecordSequence> {
        match self {
            Self::Records(records) => Some(records),
            _ => None,
        }
    }

    /// The table, if this outcome was projected
    pub fn table(&self) -> Option<&Table> {
        match self {
            Self::Table(table) => Some(table),
            _ => None,
        }
    }

    /// The error value, if any
    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Check whether the server produced no response
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Convert records into the session's output representation
    pub fn into_output(self, format: OutputFormat) -> Self {
        match (self, format) {
            (Self::Records(records), OutputFormat::Tabular) => {
                Self::Table(crate::tabular::to_table(&records))
            }
            (outcome, _) => outcome,
        }
    }
}

/// Result of a single mutating call (POST/PUT)
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The decoded response body
    Response(Value),
    /// A server-reported or validation error
    Error(ApiError),
    /// The server produced no decodable response body
    Empty,
}

impl CallOutcome {
    /// Classify a decoded response body
    pub fn from_response(response: Option<Value>) -> Self {
        match response {
            None => Self::Empty,
            Some(body) => match ApiError::from_payload(&body) {
                Some(error) => Self::Error(error),
                None => Self::Response(body),
            },
        }
    }

    /// The response body, if the call succeeded
    pub fn response(&self) -> Option<&Value> {
        match self {
            Self::Response(body) => Some(body),
            _ => None,
        }
    }

    /// The error value, if any
    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Check whether the call produced an error value
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

// ============================================================================
// Output representation
// ============================================================================

/// Output representation, selected once at session creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Native JSON records
    #[default]
    Structured,
    /// Rows keyed by flattened field name
    Tabular,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reason_code_roundtrip() {
        for code in [
            "missing_parameter",
            "invalid_json",
            "invalid_target",
            "invalid_quantity",
            "invalid_language",
            "invalid_template",
            "invalid_credentials",
        ] {
            assert_eq!(ReasonCode::parse(code).as_str(), code);
        }
        assert_eq!(
            ReasonCode::parse("access_denied"),
            ReasonCode::Other("access_denied".to_string())
        );
    }

    #[test]
    fn test_api_error_from_string_payload() {
        let body = json!({"error": "invalid_credentials"});
        let error = ApiError::from_payload(&body).unwrap();
        assert_eq!(error.code, ReasonCode::InvalidCredentials);
        assert!(error.message.is_none());
        assert_eq!(error.payload, Some(body));
    }

    #[test]
    fn test_api_error_from_object_payload() {
        let body = json!({"error": {"message": "order not found", "code": 0}});
        let error = ApiError::from_payload(&body).unwrap();
        assert_eq!(error.code, ReasonCode::ServerError);
        assert_eq!(error.message.as_deref(), Some("order not found"));
    }

    #[test]
    fn test_api_error_absent() {
        assert!(ApiError::from_payload(&json!({"entries": []})).is_none());
        assert!(ApiError::from_payload(&json!([1, 2, 3])).is_none());
    }

    #[test]
    fn test_call_outcome_classification() {
        assert_eq!(CallOutcome::from_response(None), CallOutcome::Empty);
        assert!(CallOutcome::from_response(Some(json!({"error": "invalid_target"}))).is_error());

        let ok = CallOutcome::from_response(Some(json!({"id": 7})));
        assert_eq!(ok.response().unwrap()["id"], 7);
    }

    #[test]
    fn test_fetch_outcome_into_output() {
        let records = vec![json!({"id": 1, "name": "a"})];
        let outcome = FetchOutcome::Records(records.clone());
        assert!(outcome
            .clone()
            .into_output(OutputFormat::Structured)
            .records()
            .is_some());
        assert!(outcome.into_output(OutputFormat::Tabular).table().is_some());

        // Errors and Empty pass through unchanged
        let error = FetchOutcome::Error(ApiError::new(ReasonCode::InvalidLanguage));
        assert!(error.into_output(OutputFormat::Tabular).error().is_some());
        assert!(FetchOutcome::Empty.into_output(OutputFormat::Tabular).is_empty());
    }
}
