//! Sign in with Apple credential assembly
//!
//! Apple identity tokens are bound to a one-time nonce: the flow request
//! carries the SHA-256 digest of a random value, and the backend verifies the
//! raw value against the digest embedded in the returned token. This makes
//! Apple credentials single-use; see
//! [`Provider::is_reusable`](crate::models::Provider::is_reusable).

use crate::errors::UserError;
use crate::models::Credential;
use crate::utils::crypto;

/// Byte length of generated raw nonces.
const NONCE_LENGTH: usize = 32;

/// A raw/hashed nonce pair binding one Apple sign-in request.
#[derive(Debug, Clone)]
pub struct SignInNonce {
    /// The raw value, submitted to the backend alongside the identity token.
    pub raw: String,
    /// The SHA-256 hex digest, embedded in the flow request.
    pub hashed: String,
}

impl SignInNonce {
    /// Generate a fresh nonce pair.
    #[must_use]
    pub fn generate() -> Self {
        let raw = crypto::generate_nonce(NONCE_LENGTH);
        let hashed = crypto::sha256_hex(&raw);
        Self { raw, hashed }
    }
}

/// Raw artifacts returned by a completed Sign in with Apple flow.
#[derive(Debug, Clone)]
pub struct AppleTokens {
    /// Identity token returned by the flow.
    pub id_token: String,
    /// Account email address. Apple only shares it on first authorization;
    /// later flows must recover it from the identity token.
    pub email: Option<String>,
    /// Full name, only shared on first authorization.
    pub full_name: Option<String>,
}

/// Configuration for a Sign in with Apple flow.
#[derive(Debug, Clone)]
pub struct AppleSignIn {
    nonce: SignInNonce,
}

impl Default for AppleSignIn {
    fn default() -> Self {
        Self::new()
    }
}

impl AppleSignIn {
    /// Create a flow configuration with a fresh nonce.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nonce: SignInNonce::generate(),
        }
    }

    /// The hashed nonce to embed in the flow request.
    #[must_use]
    pub fn hashed_nonce(&self) -> &str {
        &self.nonce.hashed
    }

    /// Build a credential from the tokens a completed flow returned.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::InvalidEmail`] when the flow did not share an
    /// email address; linking requires one.
    pub fn credential(&self, tokens: AppleTokens) -> Result<Credential, UserError> {
        let email = match tokens.email {
            Some(email) if !email.trim().is_empty() => email,
            _ => return Err(UserError::InvalidEmail),
        };
        Ok(Credential::Apple {
            id_token: tokens.id_token,
            email,
            full_name: tokens.full_name,
            nonce: Some(self.nonce.raw.clone()),
        })
    }
}
