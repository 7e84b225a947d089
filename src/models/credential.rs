//! Credential union and supported sign-in providers
//!
//! A [`Credential`] describes how the caller wants to authenticate. It is
//! converted to a backend-native credential exactly once, inside the backend
//! implementation, so the rest of the crate only deals with this enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A supported sign-in provider.
///
/// The string forms follow the common backend convention of using the
/// provider domain for federated providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// Email & password.
    Password,
    /// Google Sign-In.
    Google,
    /// Sign in with Apple.
    Apple,
}

impl Provider {
    /// The provider identifier as reported by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Google => "google.com",
            Self::Apple => "apple.com",
        }
    }

    /// Whether credentials of this provider can be resubmitted to a second
    /// backend call without re-prompting the user.
    ///
    /// Password and access-token-based credentials are reusable. Apple
    /// credentials are bound to a one-time nonce: once a link or sign-in
    /// attempt has consumed the token, a fresh credential must be acquired
    /// from the provider flow.
    #[must_use]
    pub const fn is_reusable(self) -> bool {
        match self {
            Self::Password | Self::Google => true,
            Self::Apple => false,
        }
    }

    /// Parse a backend provider identifier.
    #[must_use]
    pub fn from_str_opt(value: &str) -> Option<Self> {
        match value {
            "password" => Some(Self::Password),
            "google.com" => Some(Self::Google),
            "apple.com" => Some(Self::Apple),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login credentials for a single sign-in or link attempt.
///
/// Instances are also carried inside
/// [`UserError::MigrationRequired`](crate::errors::UserError::MigrationRequired)
/// so that callers can resume a login after resolving the migration question.
/// Callers should not need to inspect the contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Email & password.
    Password {
        /// Account email address.
        email: String,
        /// Account password.
        password: String,
    },
    /// A Google Sign-In token pair.
    Google {
        /// OpenID Connect ID token.
        id_token: String,
        /// OAuth access token.
        access_token: String,
        /// Account email address.
        email: String,
        /// Full name, when the provider shared it.
        full_name: Option<String>,
    },
    /// A Sign in with Apple identity token.
    Apple {
        /// Identity token returned by the Apple flow.
        id_token: String,
        /// Account email address.
        email: String,
        /// Full name, only shared by Apple on first authorization.
        full_name: Option<String>,
        /// The raw nonce the identity token is bound to.
        nonce: Option<String>,
    },
}

impl Credential {
    /// Create a password credential.
    #[must_use]
    pub fn password(email: &str, password: &str) -> Self {
        Self::Password {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    /// The provider this credential authenticates with.
    #[must_use]
    pub const fn provider(&self) -> Provider {
        match self {
            Self::Password { .. } => Provider::Password,
            Self::Google { .. } => Provider::Google,
            Self::Apple { .. } => Provider::Apple,
        }
    }

    /// The email address carried by this credential.
    ///
    /// Always present: linking requires an email in every case.
    #[must_use]
    pub fn email(&self) -> &str {
        match self {
            Self::Password { email, .. }
            | Self::Google { email, .. }
            | Self::Apple { email, .. } => email,
        }
    }

    /// The user's full name, when the sign-in method provided one.
    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        match self {
            Self::Password { .. } => None,
            Self::Google { full_name, .. } | Self::Apple { full_name, .. } => {
                full_name.as_deref()
            }
        }
    }

    /// Whether this credential survives a failed backend call.
    ///
    /// See [`Provider::is_reusable`].
    #[must_use]
    pub const fn is_reusable(&self) -> bool {
        self.provider().is_reusable()
    }
}

/// The caller's stance on migrating data away from an anonymous account.
///
/// Every login flow takes one of these. When linking an anonymous session to
/// a credential whose account already exists, the anonymous account has to be
/// discarded; this value decides whether the engine may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationAllowance {
    /// Proceed; the returned descriptor reports that a migration occurred.
    Allow,
    /// Proceed, but report no migration. The caller accepts losing any data
    /// attached to the anonymous account.
    Deny,
    /// Abort with [`UserError::MigrationRequired`](crate::errors::UserError::MigrationRequired)
    /// so the caller can ask the user and re-invoke.
    #[default]
    Undecided,
}

impl MigrationAllowance {
    /// Whether the caller has made a decision.
    #[must_use]
    pub const fn is_decided(self) -> bool {
        !matches!(self, Self::Undecided)
    }

    /// Whether a completed flow should report that data migration happened.
    #[must_use]
    pub const fn performs_migration(self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl From<Option<bool>> for MigrationAllowance {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Allow,
            Some(false) => Self::Deny,
            None => Self::Undecided,
        }
    }
}
