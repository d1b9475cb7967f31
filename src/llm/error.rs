//! Typed errors for model dispatch
//!
//! Provides structured error types so the engines can classify failures
//! (expired credentials, rate limiting, etc.) without string matching.

use thiserror::Error;

/// Dispatch errors with typed variants
///
/// Enables callers to distinguish between failure modes:
/// - `Authentication` (401) - credential rejected
/// - `RateLimited` (429) - quota exceeded; retry is a user action
/// - `PermissionDenied` (403) - credential valid but lacks scope
/// - `Network` - connection/timeout, no status available
/// - `Unclassified` - catch-all
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Credential rejected by the endpoint (HTTP 401)
    ///
    /// `project_scoped` is set when the response body identifies a
    /// project-scoped key; the user-facing message differs in that case.
    #[error("Authentication failed: {message}")]
    Authentication { message: String, project_scoped: bool },

    /// Rate limit exceeded (HTTP 429)
    ///
    /// The engines never retry automatically; the message tells the user
    /// to try again.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Credential valid but insufficient scope (HTTP 403)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Network connectivity issue (connection refused, timeout, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Anything not matching the variants above
    #[error("{0}")]
    Unclassified(String),
}

impl DispatchError {
    /// Convert HTTP status code and error text into a typed DispatchError
    pub fn from_http_status(status: reqwest::StatusCode, error_text: String) -> Self {
        match status.as_u16() {
            401 => DispatchError::Authentication {
                project_scoped: looks_project_scoped(&error_text),
                message: error_text,
            },
            403 => DispatchError::PermissionDenied(error_text),
            429 => DispatchError::RateLimited(error_text),
            500..=599 => {
                DispatchError::Unclassified(format!("server error ({status}): {error_text}"))
            }
            _ => DispatchError::Unclassified(format!("HTTP {status}: {error_text}")),
        }
    }

    /// Convert transport-level errors into a typed DispatchError
    ///
    /// When reqwest carries a status code the status mapping applies;
    /// otherwise timeout/connect heuristics classify as `Network`.
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DispatchError::Network(format!("request timeout: {e}"))
        } else if e.is_connect() {
            DispatchError::Network(format!("connection failed: {e}"))
        } else if let Some(status) = e.status() {
            Self::from_http_status(status, e.to_string())
        } else if e.is_request() {
            DispatchError::Network(e.to_string())
        } else {
            DispatchError::Unclassified(e.to_string())
        }
    }

    /// Render the assistant-facing text for this failure
    ///
    /// This is the string the engines place into the error-marked assistant
    /// message instead of raising the failure to the rendering layer.
    pub fn user_message(&self) -> String {
        match self {
            DispatchError::Authentication { project_scoped, .. } => {
                if *project_scoped {
                    "The project API key was rejected. Ask your workspace administrator to check \
                     the project credentials in Settings."
                        .to_string()
                } else {
                    "Your API key was rejected. Check the credentials in Settings and try again."
                        .to_string()
                }
            }
            DispatchError::RateLimited(_) => {
                "The model is receiving too many requests right now. Wait a moment and send your \
                 message again."
                    .to_string()
            }
            DispatchError::PermissionDenied(_) => {
                "Your API key does not have access to this model. Pick another model or ask for \
                 access."
                    .to_string()
            }
            DispatchError::Network(_) => {
                "Could not reach the model service. Check your connection and try again."
                    .to_string()
            }
            DispatchError::Unclassified(msg) => {
                format!("The model request failed: {msg}")
            }
        }
    }
}

/// Heuristic: does a 401 body identify a project-scoped credential?
fn looks_project_scoped(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("project") && (lower.contains("key") || lower.contains("credential"))
}
