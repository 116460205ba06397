//! Token string generation
//!
//! Grant codes, access tokens and refresh tokens are opaque strings. The
//! default generator draws 16 bytes per token from a seeded `StdRng` and
//! hex-encodes them (32 characters). The client and session are passed to
//! every call so replacement generators can embed identity into tokens.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use crate::client::Client;
use crate::error::{Error, Result};

/// Number of random bytes in each generated token.
pub const TOKEN_BYTES: usize = 16;

/// Produces fresh, unpredictable token strings.
///
/// Implementations must not repeat values within a process lifetime; the
/// core treats a collision as a bug rather than handling it.
pub trait CredentialGenerator: Send + Sync {
    fn grant_code(&self, client: &dyn Client, session_id: &str) -> Result<String>;

    fn access_token(&self, client: &dyn Client, session_id: &str) -> Result<String>;

    fn refresh_token(&self, client: &dyn Client, session_id: &str) -> Result<String>;
}

/// Random hex token generator with an injected random source.
pub struct RandomGenerator {
    rng: Mutex<StdRng>,
}

impl RandomGenerator {
    /// Seed from the thread-local OS-backed generator.
    pub fn new() -> Self {
        let mut seed = [0u8; 32];
        rand::rng().fill(&mut seed);
        Self::from_rng(StdRng::from_seed(seed))
    }

    /// Deterministic generator for reproducible token sequences.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    fn random_hex(&self) -> Result<String> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng
            .lock()
            .map_err(|_| Error::Generator("random source lock poisoned".into()))?
            .fill(&mut bytes);
        Ok(hex::encode(bytes))
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialGenerator for RandomGenerator {
    fn grant_code(&self, _client: &dyn Client, _session_id: &str) -> Result<String> {
        self.random_hex()
    }

    fn access_token(&self, _client: &dyn Client, _session_id: &str) -> Result<String> {
        self.random_hex()
    }

    fn refresh_token(&self, _client: &dyn Client, _session_id: &str) -> Result<String> {
        self.random_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_client;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_32_hex_chars() {
        let generator = RandomGenerator::new();
        let client = test_client();
        for token in [
            generator.grant_code(client.as_ref(), "s").unwrap(),
            generator.access_token(client.as_ref(), "s").unwrap(),
            generator.refresh_token(client.as_ref(), "s").unwrap(),
        ] {
            assert_eq!(token.len(), 32);
            assert!(
                token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()),
                "token must be lowercase hex: {token}"
            );
        }
    }

    #[test]
    fn tokens_do_not_repeat() {
        let generator = RandomGenerator::new();
        let client = test_client();
        let tokens: HashSet<String> = (0..1000)
            .map(|_| generator.access_token(client.as_ref(), "s").unwrap())
            .collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn seeded_generators_are_reproducible() {
        let client = test_client();
        let a = RandomGenerator::seeded(42);
        let b = RandomGenerator::seeded(42);
        let c = RandomGenerator::seeded(43);

        let first_a = a.grant_code(client.as_ref(), "s").unwrap();
        assert_eq!(first_a, b.grant_code(client.as_ref(), "s").unwrap());
        assert_ne!(first_a, c.grant_code(client.as_ref(), "s").unwrap());
        assert_ne!(first_a, a.grant_code(client.as_ref(), "s").unwrap());
    }
}
