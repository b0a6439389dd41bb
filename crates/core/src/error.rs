//! Structured errors returned by the recall tool operations
//!
//! Every failure a caller can observe is a [`QueryError`]. It serializes to a
//! flat JSON object so automated callers can branch on `kind` without parsing
//! the message text.

use serde::Serialize;
use std::fmt;

/// Error taxonomy shared by all tool operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad field name, out-of-range limit, unknown sort order. Raised before any network call.
    InvalidInput,
    /// DNS, connection, timeout or body read failure
    Transport,
    /// Upstream answered with a 4xx status
    ClientError,
    /// Upstream answered with a 5xx status
    ServerError,
    /// Upstream payload could not be mapped onto the result model
    NormalizationFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Transport => "transport",
            ErrorKind::ClientError => "client_error",
            ErrorKind::ServerError => "server_error",
            ErrorKind::NormalizationFailure => "normalization_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct QueryError {
    pub kind: ErrorKind,
    #[serde(rename = "error")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invalid_fields: Vec<String>,
}

impl QueryError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            body: None,
            hint: None,
            invalid_fields: Vec::new(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    /// Rejection of a raw filter expression that references fields outside the allow-list
    pub fn invalid_fields(fields: Vec<String>) -> Self {
        let mut error = Self::new(
            ErrorKind::InvalidInput,
            format!("Unknown field(s) in filter: {}", fields.join(", ")),
        );
        error.hint = Some(
            "Only dataset fields may appear in a filter expression. \
             Use the `filters` argument for exact matches on known fields."
                .to_string(),
        );
        error.invalid_fields = fields;
        error
    }

    pub fn transport(message: impl Into<String>) -> Self {
        let mut error = Self::new(ErrorKind::Transport, message);
        error.hint = Some("The RappelConso API could not be reached. Try again later.".to_string());
        error
    }

    /// Classify a non-success HTTP status returned by the upstream API
    ///
    /// 4xx statuses become [`ErrorKind::ClientError`] with a hint keyed by status,
    /// everything else becomes [`ErrorKind::ServerError`].
    pub fn from_status(status: u16, body: String) -> Self {
        let kind = if (400..500).contains(&status) {
            ErrorKind::ClientError
        } else {
            ErrorKind::ServerError
        };

        let mut error = Self::new(kind, format!("RappelConso API returned HTTP {status}"));
        error.status_code = Some(status);
        error.body = Some(body);
        error.hint = status_hint(status).map(str::to_string);
        error
    }
}

/// Human hint attached to upstream errors, keyed by HTTP status
pub fn status_hint(status: u16) -> Option<&'static str> {
    match status {
        400 => Some(
            "The upstream rejected the query. Raw `where` expressions are easy to get wrong: \
             switch to the structured `filters` argument (exact match per field) instead.",
        ),
        401 | 403 => Some(
            "The upstream refused access. This dataset is public, so check the base URL \
             or any proxy that may require authentication.",
        ),
        404 => Some("Dataset or endpoint not found. Check the configured base URL."),
        429 => Some("Rate limited by the upstream API. Wait before retrying."),
        500..=599 => Some("The RappelConso API is failing. Try again later."),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_client_error() {
        let error = QueryError::from_status(404, "Not Found".to_string());
        assert_eq!(error.kind, ErrorKind::ClientError);
        assert_eq!(error.status_code, Some(404));
        assert_eq!(error.body.as_deref(), Some("Not Found"));
        assert!(error.hint.unwrap().contains("base URL"));
    }

    #[test]
    fn test_from_status_bad_request_suggests_filters() {
        let error = QueryError::from_status(400, String::new());
        assert_eq!(error.kind, ErrorKind::ClientError);
        assert!(error.hint.unwrap().contains("filters"));
    }

    #[test]
    fn test_from_status_auth_hint() {
        for status in [401, 403] {
            let error = QueryError::from_status(status, String::new());
            assert!(error.hint.unwrap().contains("access"));
        }
    }

    #[test]
    fn test_from_status_server_error() {
        let error = QueryError::from_status(503, "unavailable".to_string());
        assert_eq!(error.kind, ErrorKind::ServerError);
        assert_eq!(error.status_code, Some(503));
    }

    #[test]
    fn test_serialized_shape() {
        let error = QueryError::from_status(404, "Not Found".to_string());
        let value = serde_json::to_value(&error).unwrap();

        assert_eq!(value["kind"], "client_error");
        assert_eq!(value["status_code"], 404);
        assert!(value["error"].as_str().unwrap().contains("404"));
        assert!(value.get("invalid_fields").is_none());
    }

    #[test]
    fn test_invalid_fields_names_offenders() {
        let error = QueryError::invalid_fields(vec!["prix".to_string()]);
        assert_eq!(error.kind, ErrorKind::InvalidInput);
        assert!(error.message.contains("prix"));
        assert_eq!(error.invalid_fields, vec!["prix".to_string()]);
    }

    #[test]
    fn test_display() {
        let error = QueryError::transport("connection refused");
        assert_eq!(error.to_string(), "transport: connection refused");
    }
}
