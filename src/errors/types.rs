use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Permission error: {0}")]
    Permission(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Delegated data error: {0}")]
    Delegated(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A single upstream request failure, captured by the fan-out and never re-raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe(.status, .message))]
pub struct UpstreamError {
    /// HTTP status when the upstream answered; `None` for transport failures.
    pub status: Option<u16>,
    pub message: String,
}

fn describe(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {}: {}", code, message),
        None => message.to_string(),
    }
}

impl UpstreamError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self { status: Some(status), message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self { status: None, message: message.into() }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return UpstreamError::http(status.as_u16(), e.to_string());
        }
        if e.is_timeout() {
            return UpstreamError::transport(format!("request timed out: {}", e));
        }
        UpstreamError::transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_display_with_status() {
        let err = UpstreamError::http(403, "Forbidden");
        assert_eq!(err.to_string(), "HTTP 403: Forbidden");
    }

    #[test]
    fn test_upstream_display_transport() {
        let err = UpstreamError::transport("connection reset");
        assert_eq!(err.to_string(), "connection reset");
        assert!(err.status.is_none());
    }
}
