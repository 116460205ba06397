//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Client secrets are loaded from `CLIENT_SECRET_<ID>` or `secret_file`,
//! never stored in the TOML directly.

use common::Secret;
use oauth_grant::options::{DEFAULT_ACCESS_TOKEN_EXPIRE_SECS, DEFAULT_REFRESH_TOKEN_EXPIRE_SECS};
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Upper bound for either token lifetime: ten years.
pub const MAX_TOKEN_EXPIRE_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub clients: Vec<ClientConfig>,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Token lifetimes and request checks
#[derive(Debug, Deserialize)]
pub struct OAuthConfig {
    #[serde(default = "default_true")]
    pub check_redirect: bool,
    #[serde(default = "default_access_ttl")]
    pub access_token_expire_secs: i64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_expire_secs: i64,
    /// Require `client_secret` on /authorize and /grant.
    #[serde(default)]
    pub require_client_secret: bool,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            check_redirect: true,
            access_token_expire_secs: DEFAULT_ACCESS_TOKEN_EXPIRE_SECS,
            refresh_token_expire_secs: DEFAULT_REFRESH_TOKEN_EXPIRE_SECS,
            require_client_secret: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Lru,
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub lru_capacity: usize,
}

/// A registered client application
#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    pub id: String,
    #[serde(skip)]
    pub secret: Option<Secret<String>>,
    /// Path to a file holding the client secret (alternative to the env var)
    #[serde(default)]
    pub secret_file: Option<PathBuf>,
    pub redirects: Vec<String>,
}

fn default_max_connections() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_access_ttl() -> i64 {
    DEFAULT_ACCESS_TOKEN_EXPIRE_SECS
}

fn default_refresh_ttl() -> i64 {
    DEFAULT_REFRESH_TOKEN_EXPIRE_SECS
}

/// Env var carrying the secret for `client_id`: `CLIENT_SECRET_` followed by
/// the id upper-cased with non-alphanumerics replaced by `_`.
pub fn secret_env_var(client_id: &str) -> String {
    let suffix: String = client_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("CLIENT_SECRET_{suffix}")
}

impl Config {
    /// Load configuration from a TOML file, then resolve client secrets.
    ///
    /// Secret resolution order per client:
    /// 1. `CLIENT_SECRET_<ID>` env var
    /// 2. `secret_file` path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;

        for client in &mut config.clients {
            if let Ok(secret) = std::env::var(secret_env_var(&client.id)) {
                client.secret = Some(Secret::new(secret));
            } else if let Some(ref secret_file) = client.secret_file {
                let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                    common::Error::Config(format!(
                        "failed to read secret_file {} for client {}: {e}",
                        secret_file.display(),
                        client.id
                    ))
                })?;
                let secret = secret.trim().to_owned();
                if !secret.is_empty() {
                    client.secret = Some(Secret::new(secret));
                }
            }
        }

        if config.oauth.require_client_secret
            && let Some(client) = config.clients.iter().find(|c| c.secret.is_none())
        {
            return Err(common::Error::Config(format!(
                "require_client_secret is set but client {} has no secret",
                client.id
            )));
        }

        Ok(config)
    }

    /// Parse and validate TOML contents without touching the environment.
    pub fn parse(contents: &str) -> common::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if self.server.max_connections == 0 {
            return Err(common::Error::invalid_field(
                "max_connections",
                "must be greater than 0",
            ));
        }
        if self.oauth.access_token_expire_secs <= 0 {
            return Err(common::Error::invalid_field(
                "access_token_expire_secs",
                "must be greater than 0",
            ));
        }
        if self.oauth.access_token_expire_secs > MAX_TOKEN_EXPIRE_SECS {
            return Err(common::Error::invalid_field(
                "access_token_expire_secs",
                format!("must be at most {MAX_TOKEN_EXPIRE_SECS}"),
            ));
        }
        if self.oauth.refresh_token_expire_secs <= 0 {
            return Err(common::Error::invalid_field(
                "refresh_token_expire_secs",
                "must be greater than 0",
            ));
        }
        if self.oauth.refresh_token_expire_secs > MAX_TOKEN_EXPIRE_SECS {
            return Err(common::Error::invalid_field(
                "refresh_token_expire_secs",
                format!("must be at most {MAX_TOKEN_EXPIRE_SECS}"),
            ));
        }
        if self.storage.backend == StorageBackend::Lru && self.storage.lru_capacity == 0 {
            return Err(common::Error::invalid_field(
                "lru_capacity",
                "must be greater than 0 with the lru backend",
            ));
        }

        let mut seen = HashSet::new();
        for client in &self.clients {
            if client.id.is_empty() {
                return Err(common::Error::Config("client id must not be empty".into()));
            }
            if !seen.insert(client.id.as_str()) {
                return Err(common::Error::Config(format!(
                    "duplicate client id: {}",
                    client.id
                )));
            }
            if client.redirects.is_empty() {
                return Err(common::Error::Config(format!(
                    "client {} must list at least one redirect",
                    client.id
                )));
            }
            for redirect in &client.redirects {
                url::Url::parse(redirect).map_err(|e| {
                    common::Error::Config(format!(
                        "client {} has invalid redirect {redirect}: {e}",
                        client.id
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("grant-server.toml")
    }
}
