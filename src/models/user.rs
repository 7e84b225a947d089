//! Identity session snapshot

use crate::models::Provider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A snapshot of the currently signed-in identity.
///
/// Instances are produced by the backend and emitted on the identity feed;
/// they are plain data and never write back to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    /// Opaque stable identifier, present only when signed in.
    pub id: Option<String>,
    /// Email address, when a durable credential carries one.
    pub email: Option<String>,
    /// Display name, when set.
    pub display_name: Option<String>,
    /// Whether this is a guest account with no durable credential.
    pub is_anonymous: bool,
    /// Providers currently linked to this identity.
    pub providers: Vec<Provider>,
    /// When the account was created on the backend.
    pub created_at: Option<DateTime<Utc>>,
    /// When the account last completed a sign-in.
    pub last_sign_in: Option<DateTime<Utc>>,
}

impl UserData {
    /// Whether the password provider is among the linked providers.
    #[must_use]
    pub fn has_password(&self) -> bool {
        self.providers.contains(&Provider::Password)
    }
}
