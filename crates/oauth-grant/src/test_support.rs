//! Shared fixtures for unit tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use common::Secret;
use serde_json::{Value, json};

use crate::authorize::{AuthorizeRequest, AuthorizeType};
use crate::client::{Client, GrantRejected, SimpleClient};
use crate::error::Result;
use crate::generator::{CredentialGenerator, RandomGenerator};
use crate::grant::GrantInfo;

/// Client "1000" registered for http://127.0.0.1:8000.
pub fn test_client() -> Arc<SimpleClient> {
    Arc::new(SimpleClient::from_redirect_list(
        "1000",
        Secret::new("ab2c9fbe11ecd792e731ca26972416d9".into()),
        "http://127.0.0.1:8000/example/callback",
    ))
}

pub fn code_request(redirect: &str) -> AuthorizeRequest {
    AuthorizeRequest {
        request_type: AuthorizeType::AuthorizationCode,
        client_id: "1000".into(),
        redirect: redirect.into(),
        state: "xyz".into(),
        ..Default::default()
    }
}

pub fn sample_info(access: &str, refresh: &str, access_expire_at: i64) -> GrantInfo {
    GrantInfo {
        client_id: "1000".into(),
        session_id: "user-42".into(),
        access_token: access.into(),
        access_token_expire_at: access_expire_at,
        refresh_token: refresh.into(),
        refresh_token_expire_at: access_expire_at + 3600,
        data: json!({ "open_id": "abc" }),
    }
}

/// Seeded generator that counts how many tokens of each kind it produced.
pub struct CountingGenerator {
    inner: RandomGenerator,
    grant_codes: AtomicUsize,
}

impl Default for CountingGenerator {
    fn default() -> Self {
        Self {
            inner: RandomGenerator::seeded(7),
            grant_codes: AtomicUsize::new(0),
        }
    }
}

impl CountingGenerator {
    pub fn grant_codes(&self) -> usize {
        self.grant_codes.load(Ordering::SeqCst)
    }
}

impl CredentialGenerator for CountingGenerator {
    fn grant_code(&self, client: &dyn Client, session_id: &str) -> Result<String> {
        self.grant_codes.fetch_add(1, Ordering::SeqCst);
        self.inner.grant_code(client, session_id)
    }

    fn access_token(&self, client: &dyn Client, session_id: &str) -> Result<String> {
        self.inner.access_token(client, session_id)
    }

    fn refresh_token(&self, client: &dyn Client, session_id: &str) -> Result<String> {
        self.inner.refresh_token(client, session_id)
    }
}

/// Client that rejects grants until `accept` is called.
pub struct RejectingClient {
    id: String,
    redirects: Vec<String>,
    accepting: AtomicBool,
}

impl RejectingClient {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.into(),
            redirects: vec!["http://127.0.0.1:8000/cb".into()],
            accepting: AtomicBool::new(false),
        }
    }

    pub fn accept(&self) {
        self.accepting.store(true, Ordering::SeqCst);
    }
}

impl Client for RejectingClient {
    fn id(&self) -> &str {
        &self.id
    }

    fn secret(&self) -> &str {
        ""
    }

    fn redirects(&self) -> &[String] {
        &self.redirects
    }

    fn grant(&self, scope: &[String], session_id: &str) -> std::result::Result<Value, GrantRejected> {
        if self.accepting.load(Ordering::SeqCst) {
            Ok(json!({ "scope": scope, "session": session_id }))
        } else {
            Err(GrantRejected("upstream directory unavailable".into()))
        }
    }
}

/// Table whose writes always fail.
pub struct FailingPuts;

impl<V> kv_store::KeyValueStore<V> for FailingPuts {
    fn get(&self, key: &str) -> kv_store::Result<V> {
        Err(kv_store::Error::NotFound(key.to_owned()))
    }

    fn put(&self, _key: &str, _value: V) -> kv_store::Result<()> {
        Err(kv_store::Error::Backend("write rejected".into()))
    }

    fn delete(&self, _key: &str) -> kv_store::Result<()> {
        Ok(())
    }

    fn take(&self, key: &str) -> kv_store::Result<V> {
        Err(kv_store::Error::NotFound(key.to_owned()))
    }
}
