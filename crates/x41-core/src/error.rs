use thiserror::Error;

/// A page read or write that the host refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("window is unavailable")]
    WindowUnavailable,
    #[error("document is unavailable")]
    DocumentUnavailable,
    #[error("document body is unavailable")]
    BodyUnavailable,
    #[error("dom operation `{operation}` failed")]
    Dom { operation: &'static str },
    #[error("hook `{hook}` could not be installed")]
    Hook { hook: &'static str },
}

impl HostError {
    #[must_use]
    pub fn dom(operation: &'static str) -> Self {
        Self::Dom { operation }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage backend is unavailable")]
    Unavailable,
    #[error("storage read for `{key}` failed: {reason}")]
    Read { key: String, reason: String },
    #[error("storage write for `{key}` failed: {reason}")]
    Write { key: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("username not found after {attempts} probe passes")]
    NotFound { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid stored preferences: {0}")]
    InvalidPreferences(String),
}

/// The only error the lifecycle boundary ever sees. Anything that reaches it
/// during initialization turns into graceful degradation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("engine has been torn down")]
    Destroyed,
}
