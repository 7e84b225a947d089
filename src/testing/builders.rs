//! Fluent builders and credential fixtures for tests

use crate::models::{Credential, Provider};
use crate::testing::mock::MockAccount;
use crate::utils::crypto;

/// Builder for seeding [`MockBackend`](crate::testing::MockBackend)
/// accounts.
pub struct MockAccountBuilder {
    account: MockAccount,
}

impl MockAccountBuilder {
    /// Start building an account for the given email address.
    #[must_use]
    pub fn new(email: &str) -> Self {
        Self {
            account: MockAccount {
                id: format!("user-{email}"),
                email: email.to_string(),
                password: None,
                display_name: None,
                providers: Vec::new(),
                disabled: false,
            },
        }
    }

    /// Use a fixed account id.
    #[must_use]
    pub fn id(mut self, id: &str) -> Self {
        self.account.id = id.to_string();
        self
    }

    /// Attach a password credential.
    #[must_use]
    pub fn password(mut self, password: &str) -> Self {
        self.account.password = Some(password.to_string());
        if !self.account.providers.contains(&Provider::Password) {
            self.account.providers.push(Provider::Password);
        }
        self
    }

    /// Attach a federated provider.
    #[must_use]
    pub fn provider(mut self, provider: Provider) -> Self {
        if !self.account.providers.contains(&provider) {
            self.account.providers.push(provider);
        }
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn display_name(mut self, name: &str) -> Self {
        self.account.display_name = Some(name.to_string());
        self
    }

    /// Mark the account as administratively disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.account.disabled = true;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> MockAccount {
        self.account
    }
}

/// A Google credential with fresh fake tokens.
#[must_use]
pub fn google_credential(email: &str, full_name: Option<&str>) -> Credential {
    Credential::Google {
        id_token: format!("google-id-{}", crypto::generate_nonce(8)),
        access_token: format!("google-access-{}", crypto::generate_nonce(8)),
        email: email.to_string(),
        full_name: full_name.map(ToString::to_string),
    }
}

/// An Apple credential with a fresh fake token and nonce.
#[must_use]
pub fn apple_credential(email: &str, full_name: Option<&str>) -> Credential {
    let nonce = crypto::generate_nonce(16);
    Credential::Apple {
        id_token: format!("apple-id-{}", crypto::generate_nonce(8)),
        email: email.to_string(),
        full_name: full_name.map(ToString::to_string),
        nonce: Some(nonce),
    }
}
