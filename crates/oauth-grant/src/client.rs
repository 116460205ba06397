//! Registered third-party client applications
//!
//! A `Client` is a capability rather than plain data: besides its identity
//! and registered redirect targets it decides what payload a session is
//! granted for a requested scope. The core never writes clients; it only
//! reads them through the storage layer.

use std::sync::Arc;

use common::Secret;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Raised by `Client::grant` when the client declines to grant access.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct GrantRejected(pub String);

/// A registered client application.
pub trait Client: Send + Sync {
    /// Public client identifier
    fn id(&self) -> &str;

    /// Shared secret used by transport-level request verification
    fn secret(&self) -> &str;

    /// Registered redirect URIs, in registration order
    fn redirects(&self) -> &[String];

    /// Resolve the opaque payload bound to a new credential for `session_id`.
    fn grant(&self, scope: &[String], session_id: &str) -> std::result::Result<Value, GrantRejected>;
}

/// Fallback lookup used by the storage layer when a client is not cached.
pub type ClientResolver = Arc<dyn Fn(&str) -> Result<Arc<dyn Client>> + Send + Sync>;

/// Statically configured client.
///
/// Grants every scope and returns a stable pseudonymous `open_id` per
/// (client, session) pair, so the same user gets different ids at
/// different clients.
pub struct SimpleClient {
    id: String,
    secret: Secret<String>,
    redirects: Vec<String>,
}

impl SimpleClient {
    pub fn new(id: impl Into<String>, secret: Secret<String>, redirects: Vec<String>) -> Self {
        Self {
            id: id.into(),
            secret,
            redirects,
        }
    }

    /// Build a client from a whitespace-separated redirect list.
    pub fn from_redirect_list(id: impl Into<String>, secret: Secret<String>, redirects: &str) -> Self {
        Self::new(
            id,
            secret,
            redirects.split_whitespace().map(str::to_owned).collect(),
        )
    }

    fn open_id(&self, session_id: &str) -> String {
        let hash = Sha256::digest(format!("{id}@{session_id}@{id}", id = self.id).as_bytes());
        hex::encode(hash)
    }
}

impl std::fmt::Debug for SimpleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleClient")
            .field("id", &self.id)
            .field("secret", &self.secret)
            .field("redirects", &self.redirects)
            .finish()
    }
}

impl Client for SimpleClient {
    fn id(&self) -> &str {
        &self.id
    }

    fn secret(&self) -> &str {
        self.secret.expose()
    }

    fn redirects(&self) -> &[String] {
        &self.redirects
    }

    fn grant(&self, _scope: &[String], session_id: &str) -> std::result::Result<Value, GrantRejected> {
        Ok(json!({ "open_id": self.open_id(session_id) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SimpleClient {
        SimpleClient::from_redirect_list(
            "1000",
            Secret::new("ab2c9fbe11ecd792e731ca26972416d9".into()),
            "http://127.0.0.1:8000/example/callback  https://app.example.com/cb\n",
        )
    }

    #[test]
    fn redirect_list_splits_on_whitespace() {
        assert_eq!(
            client().redirects(),
            &[
                "http://127.0.0.1:8000/example/callback".to_string(),
                "https://app.example.com/cb".to_string(),
            ]
        );
    }

    #[test]
    fn grant_returns_stable_open_id() {
        let client = client();
        let first = client.grant(&[], "user-42").unwrap();
        let second = client.grant(&["profile".into()], "user-42").unwrap();
        assert_eq!(first, second);

        let open_id = first["open_id"].as_str().unwrap();
        assert_eq!(open_id.len(), 64);
        assert!(open_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn open_id_differs_per_session_and_client() {
        let a = client();
        let b = SimpleClient::new("2000", Secret::new("x".into()), vec![]);
        let a_user = a.grant(&[], "user-42").unwrap();
        assert_ne!(a_user, a.grant(&[], "user-43").unwrap());
        assert_ne!(a_user, b.grant(&[], "user-42").unwrap());
    }

    #[test]
    fn debug_redacts_secret() {
        let debug = format!("{:?}", client());
        assert!(debug.contains("1000"));
        assert!(!debug.contains("ab2c9fbe"), "secret leaked: {debug}");
    }
}
