//! Auth error types. `invalid_token` is deliberately generic — see
//! [`crate::verifier`] for why no claim-specific detail is returned.

pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Token failed verification or claim validation. Never carries which
    /// claim failed — the broker must not leak that to a client probing
    /// for a valid-ish token.
    #[error("invalid_token")]
    InvalidToken,

    #[error("authentication_failed: {0}")]
    AuthenticationFailed(String),

    #[error("access_denied")]
    AccessDenied,

    #[error("public key file error: {0}")]
    KeyFile(String),
}
