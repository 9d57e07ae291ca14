//! Data source error types

use std::fmt;
use std::time::Duration;

/// An optional data source capability.
///
/// Reported by [`DataSourceError::Unsupported`] when a caller invokes a
/// capability the source did not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Count,
    Export,
    Columns,
    FilterOperators,
    ValidateQuery,
    Subscribe,
    Crud,
    Batch,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Count => "count",
            Capability::Export => "export",
            Capability::Columns => "columns",
            Capability::FilterOperators => "filter operators",
            Capability::ValidateQuery => "query validation",
            Capability::Subscribe => "subscribe",
            Capability::Crud => "create/update/delete",
            Capability::Batch => "batch create/update/delete",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while fetching, counting or exporting rows.
#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    /// Failure reported by the backend itself.
    #[error("Backend error: {message}")]
    Backend {
        /// Human-readable error message.
        message: String,
        /// Backend-specific error code, if any.
        code: Option<String>,
        /// HTTP status code, for network-hosted backends.
        status_code: Option<u16>,
        /// Structured error payload returned by the backend.
        details: Option<serde_json::Value>,
    },

    /// Network error from the underlying transport.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// The source does not provide the requested capability.
    #[error("Data source does not support {0}")]
    Unsupported(Capability),

    /// The query was rejected before reaching the backend.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// No row exists with the given id.
    #[error("Row '{0}' not found")]
    NotFound(String),

    /// Failed to parse a backend response.
    #[error("Response parse error: {message}")]
    Parse {
        /// Description of the parse error.
        message: String,
        /// Raw response body, if available.
        body: Option<String>,
    },

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV serialization error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The operation was cancelled through its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,
}

impl DataSourceError {
    /// Creates a backend error with only a message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            code: None,
            status_code: None,
            details: None,
        }
    }

    /// Creates a backend error carrying an HTTP status code.
    pub fn http(status_code: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            code: None,
            status_code: Some(status_code),
            details: None,
        }
    }

    /// Creates a new parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            body: None,
        }
    }

    /// Creates a new parse error with the raw response body.
    pub fn parse_with_body(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            body: Some(body.into()),
        }
    }

    /// Sets the backend error code. No-op for other variants.
    pub fn with_code(mut self, new_code: impl Into<String>) -> Self {
        if let Self::Backend { code, .. } = &mut self {
            *code = Some(new_code.into());
        }
        self
    }

    /// Sets the backend error details. No-op for other variants.
    pub fn with_details(mut self, payload: serde_json::Value) -> Self {
        if let Self::Backend { details, .. } = &mut self {
            *details = Some(payload);
        }
        self
    }

    /// Returns the HTTP status code if the backend reported one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Backend { status_code, .. } => *status_code,
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns the backend error code if available.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Backend { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Returns `true` for transport failures and transient server statuses.
    ///
    /// Useful as a `should_retry` predicate.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Backend {
                status_code: Some(status),
                ..
            } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            Self::Network(_) | Self::Timeout(_) => true,
            _ => false,
        }
    }
}
