use thiserror::Error;

/// Errors reported by a remote backend call (identity or agent).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),
}

/// Errors surfaced to callers of authenticated operations.
///
/// Auth-class variants (`Unauthenticated`, `RenewalFailed`,
/// `AuthenticationFailed`) are only returned after the session has been
/// reset to anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("credential renewal failed")]
    RenewalFailed,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("request failed: {0}")]
    RequestFailed(BackendError),

    #[error("stream failed: {0}")]
    StreamFailed(String),
}

impl ClientError {
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ClientError::Unauthenticated
                | ClientError::RenewalFailed
                | ClientError::AuthenticationFailed
        )
    }
}

/// Errors from durable credential storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("keychain error: {0}")]
    Keychain(String),
}
