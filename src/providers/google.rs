//! Google Sign-In credential assembly

use crate::errors::UserError;
use crate::models::Credential;

/// Raw artifacts returned by a completed Google Sign-In flow.
#[derive(Debug, Clone)]
pub struct GoogleTokens {
    /// OpenID Connect ID token.
    pub id_token: String,
    /// OAuth access token.
    pub access_token: String,
    /// Account email address.
    pub email: String,
    /// Full name, when the account shares one.
    pub full_name: Option<String>,
}

impl From<GoogleTokens> for Credential {
    fn from(tokens: GoogleTokens) -> Self {
        Self::Google {
            id_token: tokens.id_token,
            access_token: tokens.access_token,
            email: tokens.email,
            full_name: tokens.full_name,
        }
    }
}

/// Configuration for a Google Sign-In flow.
///
/// The platform-specific flow itself lives in the application; this type
/// validates its output and turns it into a [`Credential`].
#[derive(Debug, Clone)]
pub struct GoogleSignIn {
    client_id: String,
}

impl GoogleSignIn {
    /// Create a flow configuration for the given OAuth client id.
    #[must_use]
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
        }
    }

    /// The OAuth client id the flow must authenticate as.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Build a credential from the tokens a completed flow returned.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::InvalidEmail`] when the flow did not share an
    /// email address; linking requires one.
    pub fn credential(&self, tokens: GoogleTokens) -> Result<Credential, UserError> {
        if tokens.email.trim().is_empty() {
            return Err(UserError::InvalidEmail);
        }
        Ok(tokens.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(email: &str) -> GoogleTokens {
        GoogleTokens {
            id_token: "id".to_string(),
            access_token: "access".to_string(),
            email: email.to_string(),
            full_name: Some("Test User".to_string()),
        }
    }

    #[test]
    fn test_credential_requires_email() {
        let flow = GoogleSignIn::new("client-123");
        assert!(matches!(
            flow.credential(tokens("  ")),
            Err(UserError::InvalidEmail)
        ));

        let credential = flow.credential(tokens("user@example.com")).unwrap();
        assert_eq!(credential.email(), "user@example.com");
        assert!(credential.is_reusable());
    }
}
