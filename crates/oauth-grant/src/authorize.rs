//! Authorization code issuance
//!
//! A grant code moves through two states: issued (stored as
//! `code -> session id`) and gone (redeemed by `GrantEngine::grant`, or
//! evicted by a bounded backend). The redirect is validated before a code is
//! generated, so a rejected request never leaves a live code behind.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::options::Options;
use crate::redirect::validate_redirect;
use crate::storage::{Storage, resolve_client};

/// Query parameters written into the callback URL.
const CALLBACK_PARAMS: [&str; 5] = ["grant_code", "state", "client_id", "t", "nonce"];

/// Requested grant type. Only `AuthorizationCode` is served.
///
/// Unrecognized type strings are kept as `Unknown` and rejected by
/// `AuthorizationEngine::authorize` once the client is known.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthorizeType {
    #[default]
    AuthorizationCode,
    Implicit,
    PasswordCredentials,
    ClientCredentials,
    Unknown(String),
}

impl AuthorizeType {
    pub fn as_str(&self) -> &str {
        match self {
            AuthorizeType::AuthorizationCode => "code",
            AuthorizeType::Implicit => "implicit",
            AuthorizeType::PasswordCredentials => "password",
            AuthorizeType::ClientCredentials => "client",
            AuthorizeType::Unknown(raw) => raw,
        }
    }
}

impl From<&str> for AuthorizeType {
    /// An empty string means the default authorization-code type.
    fn from(s: &str) -> Self {
        match s {
            "" | "code" => AuthorizeType::AuthorizationCode,
            "implicit" => AuthorizeType::Implicit,
            "password" => AuthorizeType::PasswordCredentials,
            "client" => AuthorizeType::ClientCredentials,
            other => AuthorizeType::Unknown(other.to_owned()),
        }
    }
}

/// Authorization request, built per call and never stored.
#[derive(Debug, Clone, Default)]
pub struct AuthorizeRequest {
    pub request_type: AuthorizeType,
    pub client_id: String,
    pub redirect: String,
    pub state: String,
    /// Caller timestamp (`t`), unix seconds; 0 when absent or unparsable
    pub timestamp: i64,
    pub nonce: String,
}

impl AuthorizeRequest {
    /// Read `type`, `client_id`, `state`, `t`, `nonce` and `redirect` from
    /// transport parameters.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let value = |key: &str| params.get(key).cloned().unwrap_or_default();
        Self {
            request_type: AuthorizeType::from(value("type").as_str()),
            client_id: value("client_id"),
            redirect: value("redirect"),
            state: value("state"),
            timestamp: value("t").parse().unwrap_or(0),
            nonce: value("nonce"),
        }
    }
}

/// Result of a successful authorization.
#[derive(Debug, Clone)]
pub struct AuthorizeResponse {
    pub client_id: String,
    pub grant_code: String,
    pub state: String,
    redirect: Url,
}

impl AuthorizeResponse {
    /// The validated redirect target, without callback parameters.
    pub fn redirect(&self) -> &Url {
        &self.redirect
    }

    /// Redirect target with `grant_code`, `state`, `client_id`, a fresh `t`
    /// and an empty `nonce` set on its query. Existing values of those keys
    /// are replaced; other query pairs are kept.
    pub fn callback_url(&self) -> String {
        let mut url = self.redirect.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !CALLBACK_PARAMS.iter().any(|param| key == param))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        let timestamp = crate::unix_now().to_string();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept.iter())
            .append_pair("grant_code", &self.grant_code)
            .append_pair("state", &self.state)
            .append_pair("client_id", &self.client_id)
            .append_pair("t", &timestamp)
            .append_pair("nonce", "");
        url.to_string()
    }
}

/// Issues grant codes bound to a session.
pub struct AuthorizationEngine {
    storage: Arc<dyn Storage>,
    options: Arc<Options>,
}

impl AuthorizationEngine {
    pub fn new(storage: Arc<dyn Storage>, options: Arc<Options>) -> Self {
        Self { storage, options }
    }

    /// Issue a grant code for `session_id`.
    ///
    /// `session_id` is opaque to the engine (usually the authenticated user)
    /// and is handed back to the caller when the code is redeemed.
    pub fn authorize(&self, request: &AuthorizeRequest, session_id: &str) -> Result<AuthorizeResponse> {
        let client = resolve_client(self.storage.as_ref(), &request.client_id)?;
        match &request.request_type {
            AuthorizeType::AuthorizationCode => self.authorize_by_code(client, request, session_id),
            other => {
                warn!(client_id = %request.client_id, grant_type = other.as_str(), "unsupported grant type");
                Err(Error::UnsupportedGrantType(other.as_str().to_owned()))
            }
        }
    }

    fn authorize_by_code(
        &self,
        client: Arc<dyn Client>,
        request: &AuthorizeRequest,
        session_id: &str,
    ) -> Result<AuthorizeResponse> {
        let redirect = Url::parse(&request.redirect)
            .map_err(|e| Error::InvalidRedirect(format!("{}: {e}", request.redirect)))?;

        if self.options.check_redirect && !validate_redirect(&redirect, client.redirects()) {
            warn!(client_id = client.id(), redirect = %redirect, "redirect not registered for client");
            return Err(Error::InvalidRedirect(format!(
                "{redirect} is not registered for client {}",
                client.id()
            )));
        }

        let grant_code = self.options.generator.grant_code(client.as_ref(), session_id)?;
        self.storage.save_grant_code(&grant_code, session_id)?;
        info!(client_id = client.id(), session_id, "grant code issued");

        Ok(AuthorizeResponse {
            client_id: client.id().to_owned(),
            grant_code,
            state: request.state.clone(),
            redirect,
        })
    }
}
