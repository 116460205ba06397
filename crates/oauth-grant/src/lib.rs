//! Authorization-code credential server core
//!
//! Issues one-time grant codes, redeems them for access/refresh token pairs,
//! verifies access tokens and rotates token pairs on refresh. Transport
//! concerns (HTTP parsing, response encoding) live in the service crate; this
//! crate only deals in typed requests and `Result`s.
//!
//! Credential flow:
//! 1. Caller authenticates the end user and calls `Server::authorize` with a
//!    session id; a grant code bound to that session is stored
//! 2. End user is redirected to `AuthorizeResponse::callback_url()`
//! 3. The third-party client calls `Server::grant` with the code; the code is
//!    consumed, `Client::grant` resolves the payload and a token pair is stored
//! 4. `Server::verify_access_token` checks tokens on each protected request
//! 5. `Server::refresh` swaps the token pair for a new one

pub mod authorize;
pub mod client;
pub mod error;
pub mod generator;
pub mod grant;
pub mod options;
pub mod redirect;
pub mod server;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use authorize::{AuthorizationEngine, AuthorizeRequest, AuthorizeResponse, AuthorizeType};
pub use client::{Client, ClientResolver, GrantRejected, SimpleClient};
pub use error::{Error, Result};
pub use generator::{CredentialGenerator, RandomGenerator};
pub use grant::{GrantEngine, GrantInfo, GrantRequest, GrantResponse};
pub use options::{Options, RequestParams, VerifyHook};
pub use redirect::validate_redirect;
pub use server::Server;
pub use storage::{Backend, SimpleStorage, Storage};

/// Current unix time in seconds.
pub(crate) fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
