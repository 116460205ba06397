//! Error types for credential operations

/// Errors from authorization, grant, refresh and verification.
///
/// Every engine operation returns the first error it hits; nothing is
/// retried internally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("client not found: {0}")]
    ClientNotFound(String),

    #[error("invalid grant code")]
    InvalidGrantCode,

    #[error("invalid access token")]
    InvalidAccessToken,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("invalid redirect: {0}")]
    InvalidRedirect(String),

    #[error("unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    #[error("client rejected grant: {0}")]
    ClientRejected(String),

    #[error("token expired")]
    Expired,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("token generation failed: {0}")]
    Generator(String),

    #[error("request verification failed: {0}")]
    Verification(String),
}

impl Error {
    /// Whether the error means the client, code or token does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::ClientNotFound(_)
                | Error::InvalidGrantCode
                | Error::InvalidAccessToken
                | Error::InvalidRefreshToken
        )
    }

    /// Stable machine-readable label, used in transport error bodies and
    /// metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::ClientNotFound(_) => "client_not_found",
            Error::InvalidGrantCode => "invalid_grant_code",
            Error::InvalidAccessToken => "invalid_access_token",
            Error::InvalidRefreshToken => "invalid_refresh_token",
            Error::InvalidRedirect(_) => "invalid_redirect",
            Error::UnsupportedGrantType(_) => "unsupported_grant_type",
            Error::ClientRejected(_) => "client_rejected",
            Error::Expired => "expired",
            Error::Storage(_) => "storage_error",
            Error::Generator(_) => "generator_error",
            Error::Verification(_) => "verification_failed",
        }
    }

    /// Replace a not-found error with `replacement`, passing others through.
    pub(crate) fn or_if_missing(self, replacement: Error) -> Error {
        if matches!(self, Error::NotFound(_)) {
            replacement
        } else {
            self
        }
    }
}

impl From<kv_store::Error> for Error {
    fn from(err: kv_store::Error) -> Self {
        match err {
            kv_store::Error::NotFound(key) => Error::NotFound(key),
            kv_store::Error::Backend(msg) => Error::Storage(msg),
        }
    }
}

/// Result alias for credential operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_errors_map_to_not_found_and_storage() {
        let missing: Error = kv_store::Error::NotFound("abc".into()).into();
        assert!(matches!(missing, Error::NotFound(ref k) if k == "abc"));

        let backend: Error = kv_store::Error::Backend("disk full".into()).into();
        assert!(matches!(backend, Error::Storage(ref m) if m == "disk full"));
        assert!(!backend.is_not_found());
    }

    #[test]
    fn token_errors_count_as_not_found() {
        assert!(Error::InvalidAccessToken.is_not_found());
        assert!(Error::InvalidRefreshToken.is_not_found());
        assert!(Error::InvalidGrantCode.is_not_found());
        assert!(Error::ClientNotFound("1000".into()).is_not_found());
        assert!(!Error::Expired.is_not_found());
    }

    #[test]
    fn or_if_missing_only_replaces_not_found() {
        let replaced = Error::NotFound("x".into()).or_if_missing(Error::InvalidGrantCode);
        assert!(matches!(replaced, Error::InvalidGrantCode));

        let kept = Error::Storage("boom".into()).or_if_missing(Error::InvalidGrantCode);
        assert!(matches!(kept, Error::Storage(_)));
    }

    #[test]
    fn display_includes_context() {
        assert_eq!(
            Error::UnsupportedGrantType("password".into()).to_string(),
            "unsupported grant type: password"
        );
        assert_eq!(Error::Expired.kind(), "expired");
    }
}
