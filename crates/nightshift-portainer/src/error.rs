use thiserror::Error;

/// Errors that can occur while talking to Portainer.
#[derive(Debug, Error)]
pub enum PortainerError {
    /// Connection-level failure (refused, timed out, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response outside the authentication path.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Authentication rejected, or still unauthorized after a session refresh.
    #[error("Authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    /// No container matched the configured name or ID prefix.
    #[error("Container not found: {name}")]
    ContainerNotFound { name: String },

    /// Response body did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, PortainerError>;
