//! Code redemption, token refresh and access token verification

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::options::Options;
use crate::storage::{Storage, resolve_client};

/// Persisted credential record.
///
/// Stored under `access_token`; the refresh index maps `refresh_token` back
/// to it. Expiry fields are absolute unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantInfo {
    pub client_id: String,
    pub session_id: String,
    pub access_token: String,
    #[serde(rename = "access_token_expire")]
    pub access_token_expire_at: i64,
    pub refresh_token: String,
    #[serde(rename = "refresh_token_expire")]
    pub refresh_token_expire_at: i64,
    /// Opaque payload returned by `Client::grant`
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantResponse {
    pub info: GrantInfo,
}

/// Request to redeem a grant code.
#[derive(Debug, Clone, Default)]
pub struct GrantRequest {
    /// Caller timestamp (`t`), unix seconds; 0 when absent or unparsable
    pub timestamp: i64,
    pub nonce: String,
    pub client_id: String,
    pub grant_code: String,
    pub scope: Vec<String>,
}

impl GrantRequest {
    /// Read `t`, `nonce`, `client_id`, `grant_code` and the space-separated
    /// `scope` from transport parameters.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let value = |key: &str| params.get(key).cloned().unwrap_or_default();
        Self {
            timestamp: value("t").parse().unwrap_or(0),
            nonce: value("nonce"),
            client_id: value("client_id"),
            grant_code: value("grant_code"),
            scope: value("scope").split_whitespace().map(str::to_owned).collect(),
        }
    }
}

/// Redeems grant codes and manages the resulting token pairs.
pub struct GrantEngine {
    storage: Arc<dyn Storage>,
    options: Arc<Options>,
}

impl GrantEngine {
    pub fn new(storage: Arc<dyn Storage>, options: Arc<Options>) -> Self {
        Self { storage, options }
    }

    /// Exchange a grant code for a token pair.
    ///
    /// The code is taken out of storage atomically, so of two concurrent
    /// redemptions only one gets past this point. If the client rejects the
    /// grant, the code is put back and stays redeemable.
    pub fn grant(&self, request: &GrantRequest) -> Result<GrantResponse> {
        let client = resolve_client(self.storage.as_ref(), &request.client_id)?;
        let session_id = self
            .storage
            .take_grant_code(&request.grant_code)
            .map_err(|e| e.or_if_missing(Error::InvalidGrantCode))?;

        let data = match client.grant(&request.scope, &session_id) {
            Ok(data) => data,
            Err(rejected) => {
                if let Err(e) = self.storage.save_grant_code(&request.grant_code, &session_id) {
                    warn!(client_id = client.id(), error = %e, "failed to restore grant code after rejection");
                }
                warn!(client_id = client.id(), session_id = %session_id, reason = %rejected, "client rejected grant");
                return Err(Error::ClientRejected(rejected.0));
            }
        };

        let info = self.issue(client.as_ref(), session_id, data)?;
        self.storage.save_grant_info(&info)?;
        info!(client_id = %info.client_id, session_id = %info.session_id, "credentials granted");
        Ok(GrantResponse { info })
    }

    /// Replace a token pair with a fresh one.
    ///
    /// The old access and refresh tokens are removed before new ones are
    /// generated; there is no overlap window during which both pairs work.
    pub fn refresh(&self, refresh_token: &str) -> Result<GrantResponse> {
        let info = self
            .storage
            .get_grant_info_by_refresh_token(refresh_token)
            .map_err(|e| e.or_if_missing(Error::InvalidRefreshToken))?;
        let client = resolve_client(self.storage.as_ref(), &info.client_id)?;

        if info.refresh_token_expire_at < crate::unix_now() {
            warn!(client_id = %info.client_id, session_id = %info.session_id, "refresh token expired");
            return Err(Error::Expired);
        }

        // a concurrent refresh of the same pair loses here
        self.storage
            .remove_access_token(&info.access_token)
            .map_err(|e| e.or_if_missing(Error::InvalidRefreshToken))?;
        self.storage.remove_refresh_token(&info.refresh_token)?;
        debug!(client_id = %info.client_id, "old token pair removed");

        let refreshed = self.issue(client.as_ref(), info.session_id, info.data)?;
        self.storage.save_grant_info(&refreshed)?;
        info!(client_id = %refreshed.client_id, session_id = %refreshed.session_id, "token pair refreshed");
        Ok(GrantResponse { info: refreshed })
    }

    /// Look up an access token and check it has not expired. Read-only.
    pub fn verify_access_token(&self, access_token: &str) -> Result<GrantResponse> {
        let info = self
            .storage
            .get_grant_info_by_access_token(access_token)
            .map_err(|e| e.or_if_missing(Error::InvalidAccessToken))?;
        if info.access_token_expire_at < crate::unix_now() {
            debug!(client_id = %info.client_id, session_id = %info.session_id, "access token expired");
            return Err(Error::Expired);
        }
        Ok(GrantResponse { info })
    }

    fn issue(&self, client: &dyn Client, session_id: String, data: Value) -> Result<GrantInfo> {
        let generator = &self.options.generator;
        let access_token = generator.access_token(client, &session_id)?;
        let refresh_token = generator.refresh_token(client, &session_id)?;
        let now = crate::unix_now();
        Ok(GrantInfo {
            client_id: client.id().to_owned(),
            session_id,
            access_token,
            access_token_expire_at: now.saturating_add(self.options.access_token_expire_secs),
            refresh_token,
            refresh_token_expire_at: now.saturating_add(self.options.refresh_token_expire_secs),
            data,
        })
    }
}
