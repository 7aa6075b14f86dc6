use thiserror::Error;

#[derive(Debug, Error)]
pub enum HookError {
    /// The hook was registered with invalid or missing configuration.
    #[error("Hook configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, HookError>;
