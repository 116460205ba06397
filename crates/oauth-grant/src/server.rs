//! Server facade
//!
//! The only entry point callers use: composes the authorization and grant
//! engines over one shared storage and one set of options.

use std::sync::Arc;

use tracing::warn;

use crate::authorize::{AuthorizationEngine, AuthorizeRequest, AuthorizeResponse};
use crate::client::Client;
use crate::error::{Error, Result};
use crate::grant::{GrantEngine, GrantRequest, GrantResponse};
use crate::options::{Options, RequestParams};
use crate::storage::Storage;

pub struct Server {
    options: Arc<Options>,
    storage: Arc<dyn Storage>,
    authorization: AuthorizationEngine,
    grants: GrantEngine,
}

impl Server {
    pub fn new(options: Options, storage: Arc<dyn Storage>) -> Self {
        let options = Arc::new(options);
        Self {
            authorization: AuthorizationEngine::new(storage.clone(), options.clone()),
            grants: GrantEngine::new(storage.clone(), options.clone()),
            options,
            storage,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn get_client(&self, client_id: &str) -> Result<Arc<dyn Client>> {
        self.storage.get_client(client_id)
    }

    /// Issue a grant code for an authenticated session.
    pub fn authorize(&self, request: &AuthorizeRequest, session_id: &str) -> Result<AuthorizeResponse> {
        self.authorization.authorize(request, session_id)
    }

    /// Parse an authorize request from transport parameters, run the verify
    /// hook if one is configured, then authorize.
    pub fn authorize_from_params(
        &self,
        params: &RequestParams,
        session_id: &str,
    ) -> Result<AuthorizeResponse> {
        let request = AuthorizeRequest::from_params(&params.form);
        self.run_verify(&request.client_id, params)?;
        self.authorize(&request, session_id)
    }

    /// Redeem a grant code for a token pair.
    pub fn grant(&self, request: &GrantRequest) -> Result<GrantResponse> {
        self.grants.grant(request)
    }

    /// Parse a grant request from transport parameters, run the verify hook
    /// if one is configured, then grant.
    pub fn grant_from_params(&self, params: &RequestParams) -> Result<GrantResponse> {
        let request = GrantRequest::from_params(&params.form);
        self.run_verify(&request.client_id, params)?;
        self.grant(&request)
    }

    pub fn refresh(&self, refresh_token: &str) -> Result<GrantResponse> {
        self.grants.refresh(refresh_token)
    }

    pub fn verify_access_token(&self, access_token: &str) -> Result<GrantResponse> {
        self.grants.verify_access_token(access_token)
    }

    /// Revoke an access token together with its refresh token.
    pub fn revoke(&self, access_token: &str) -> Result<()> {
        self.storage
            .remove_access_token(access_token)
            .map_err(|e| e.or_if_missing(Error::InvalidAccessToken))
    }

    fn run_verify(&self, client_id: &str, params: &RequestParams) -> Result<()> {
        let Some(verify) = &self.options.verify else {
            return Ok(());
        };
        let client = self
            .storage
            .get_client(client_id)
            .map_err(|e| e.or_if_missing(Error::ClientNotFound(client_id.to_owned())))?;
        verify(client.as_ref(), params).map_err(|reason| {
            warn!(client_id, reason = %reason, "request verification failed");
            Error::Verification(reason)
        })
    }
}
