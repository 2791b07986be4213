use thiserror::Error;

#[derive(Debug, Error)]
pub enum NightshiftError {
    /// Missing or contradictory configuration. Fatal — raised once at
    /// startup, before the restart loop begins.
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, NightshiftError>;
