//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 with the `S256` method only. Verifier and state are 32
//! random bytes from the thread-local CSPRNG, base64url-encoded without
//! padding (43 characters).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

const RANDOM_BYTES: usize = 32;

fn random_urlsafe() -> String {
    let mut bytes = [0u8; RANDOM_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a cryptographically secure code verifier
#[must_use]
pub fn generate_code_verifier() -> String {
    random_urlsafe()
}

/// `BASE64URL(SHA256(ASCII(code_verifier)))`, unpadded.
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random state token for CSRF protection
#[must_use]
pub fn generate_state() -> String {
    random_urlsafe()
}

/// Compare the stored state with the one received on the redirect.
///
/// Runs in time independent of where the strings differ.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    let (a, b) = (expected.as_bytes(), actual.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Verifier/challenge pair for one authentication attempt.
///
/// The verifier stays in process memory until the code exchange; only the
/// challenge is sent on the authorize request.
#[derive(Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    /// Generate a fresh pair.
    ///
    /// # Examples
    /// ```
    /// use authdesk_common::auth::pkce::{generate_code_challenge, PkcePair};
    ///
    /// let pair = PkcePair::generate();
    /// assert_eq!(pair.challenge, generate_code_challenge(&pair.verifier));
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        let verifier = generate_code_verifier();
        let challenge = generate_code_challenge(&verifier);
        Self { verifier, challenge }
    }

    /// Always `"S256"`.
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        authdesk_domain::constants::PKCE_CHALLENGE_METHOD
    }
}

impl std::fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkcePair")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}
