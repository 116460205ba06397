//! Server-wide options
//!
//! Set once at startup and shared behind an `Arc`; nothing mutates options
//! after `Server::new`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::client::Client;
use crate::generator::{CredentialGenerator, RandomGenerator};

/// Default access token lifetime: 3 days
pub const DEFAULT_ACCESS_TOKEN_EXPIRE_SECS: i64 = 86400 * 3;

/// Default refresh token lifetime: 30 days
pub const DEFAULT_REFRESH_TOKEN_EXPIRE_SECS: i64 = 86400 * 30;

/// Raw transport parameters handed to the verify hook.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    /// Request headers, lowercase names
    pub headers: HashMap<String, String>,
    /// Query and form values
    pub form: HashMap<String, String>,
}

impl RequestParams {
    pub fn from_form(form: HashMap<String, String>) -> Self {
        Self {
            headers: HashMap::new(),
            form,
        }
    }

    /// Form value, or empty string when absent.
    pub fn value(&self, key: &str) -> &str {
        self.form.get(key).map(String::as_str).unwrap_or("")
    }
}

/// Per-request check run before authorize/grant when parameters come from
/// a transport (e.g. signature or client-secret verification). An `Err`
/// rejects the request.
pub type VerifyHook = Arc<dyn Fn(&dyn Client, &RequestParams) -> Result<(), String> + Send + Sync>;

pub struct Options {
    /// Validate authorize redirects against the client's registered list
    pub check_redirect: bool,
    pub access_token_expire_secs: i64,
    pub refresh_token_expire_secs: i64,
    pub generator: Arc<dyn CredentialGenerator>,
    pub verify: Option<VerifyHook>,
}

impl Options {
    pub fn with_check_redirect(mut self, check_redirect: bool) -> Self {
        self.check_redirect = check_redirect;
        self
    }

    pub fn with_token_lifetimes(mut self, access_secs: i64, refresh_secs: i64) -> Self {
        self.access_token_expire_secs = access_secs;
        self.refresh_token_expire_secs = refresh_secs;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn CredentialGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_verify(mut self, verify: VerifyHook) -> Self {
        self.verify = Some(verify);
        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            check_redirect: true,
            access_token_expire_secs: DEFAULT_ACCESS_TOKEN_EXPIRE_SECS,
            refresh_token_expire_secs: DEFAULT_REFRESH_TOKEN_EXPIRE_SECS,
            generator: Arc::new(RandomGenerator::new()),
            verify: None,
        }
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("check_redirect", &self.check_redirect)
            .field("access_token_expire_secs", &self.access_token_expire_secs)
            .field("refresh_token_expire_secs", &self.refresh_token_expire_secs)
            .field("verify", &self.verify.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_lifetimes() {
        let options = Options::default();
        assert!(options.check_redirect);
        assert_eq!(options.access_token_expire_secs, 259_200);
        assert_eq!(options.refresh_token_expire_secs, 2_592_000);
        assert!(options.verify.is_none());
    }

    #[test]
    fn builders_override_fields() {
        let options = Options::default()
            .with_check_redirect(false)
            .with_token_lifetimes(60, 120)
            .with_verify(Arc::new(|_, _| Ok(())));
        assert!(!options.check_redirect);
        assert_eq!(options.access_token_expire_secs, 60);
        assert_eq!(options.refresh_token_expire_secs, 120);
        assert!(options.verify.is_some());

        let debug = format!("{options:?}");
        assert!(debug.contains("verify: true"), "got: {debug}");
    }

    #[test]
    fn request_params_value_defaults_to_empty() {
        let params = RequestParams::from_form(HashMap::from([("client_id".into(), "1000".into())]));
        assert_eq!(params.value("client_id"), "1000");
        assert_eq!(params.value("state"), "");
    }
}
