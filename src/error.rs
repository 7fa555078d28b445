//! Custom error types for rustlitreview.
//!
//! Two layers: [`TransportError`] describes a single failed HTTP exchange and is
//! recorded per keyword/combination, while [`LitReviewError`] covers everything
//! that can stop a provider run (credentials, configuration, output files).

use thiserror::Error;

/// Main error type for rustlitreview operations.
#[derive(Debug, Error)]
pub enum LitReviewError {
    /// Credential environment variable absent or blank
    #[error("Missing credential for {provider}: set the {env_var} environment variable")]
    MissingCredential {
        /// Provider display name
        provider: String,
        /// Environment variable that was read
        env_var: String,
    },

    /// Input file was missing; an example was written in its place
    #[error("Input file not found, example written to {0}; edit it and run again")]
    ExampleCreated(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Request URL could not be built
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Failed HTTP exchange
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias using `LitReviewError`
pub type Result<T> = std::result::Result<T, LitReviewError>;

/// Error produced by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// Non-2xx response, with captured diagnostics
    #[error("HTTP {}", .0.summary())]
    Status(Box<HttpFailure>),

    /// Connection, timeout or protocol failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// 2xx response whose body was not JSON
    #[error("Invalid JSON body: {0}")]
    Decode(String),
}

/// Diagnostics captured from a non-2xx response.
#[derive(Debug, Clone, Default)]
pub struct HttpFailure {
    /// HTTP status code
    pub status: u16,
    /// Canonical reason phrase
    pub reason: String,
    /// Rate-limit and vendor headers (`x-*`, `www-*`, `retry*`)
    pub headers: Vec<(String, String)>,
    /// First 500 characters of the body
    pub body_excerpt: String,
}

impl HttpFailure {
    /// "429 Too Many Requests"
    pub fn summary(&self) -> String {
        format!("{} {}", self.status, self.reason)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Operator-facing remediation hints for the common failure codes.
    pub fn hints(&self) -> Vec<&'static str> {
        match self.status {
            401 => vec![
                "API key invalid or not sent",
                "Check the credential environment variable",
            ],
            403 => {
                let inactive = self.body_excerpt.contains("Developer Inactive")
                    || self
                        .headers
                        .iter()
                        .any(|(_, v)| v.contains("DEVELOPER_INACTIVE"));
                if inactive {
                    vec![
                        "Developer account is INACTIVE",
                        "Check your email to activate the account",
                        "Verify the account status on the developer portal",
                    ]
                } else {
                    vec![
                        "Verify that the API key is valid",
                        "Confirm that the subscription is active",
                        "Review the plan's request limits",
                    ]
                }
            }
            429 => vec![
                "Request quota exceeded",
                "Wait a few minutes before running again",
            ],
            _ => Vec::new(),
        }
    }
}

impl From<HttpFailure> for TransportError {
    fn from(failure: HttpFailure) -> Self {
        TransportError::Status(Box::new(failure))
    }
}
