//! Error taxonomy for all account operations
//!
//! Every public operation returns a [`UserError`] instead of panicking.
//! Backend-reported failures are mapped exactly once, at the point where the
//! backend call returns, via the [`From<BackendError>`] conversion; after
//! that only taxonomy values travel through the engine.
//!
//! Callers are expected to pattern-match on
//! [`UserError::MigrationRequired`] to branch into a confirmation UI, and on
//! [`UserError::AutomaticLinkingFailed`] to recover after a lossy migration.

use crate::backend::{BackendError, BackendErrorCode};
use crate::models::{Credential, LoginDescriptor};
use std::fmt;

/// Errors returned by [`UserManager`](crate::manager::UserManager) operations.
#[derive(Debug)]
pub enum UserError {
    /// There is no user associated to perform the requested action.
    NoUser,
    /// The update cannot be performed because of invalid data.
    InvalidUpdate,
    /// There is already another user logged-in.
    AlreadyLoggedIn,
    /// The requested action cannot be performed because there is already an
    /// anonymous user logged-in.
    AlreadyAnonymous,
    /// The provided email is not valid.
    InvalidEmail,
    /// The action would require migrating the current anonymous user's data
    /// to an existing account. Pass the carried credential back to
    /// [`login`](crate::manager::UserManager::login) with a decided
    /// allowance to continue.
    MigrationRequired(Box<Credential>),
    /// The anonymous account was already deleted, but signing in with the
    /// replacement credential failed. The descriptor carries the old user id
    /// and the id of the fresh anonymous account created in its place, so the
    /// caller can recover UI state; data migration has already happened.
    AutomaticLinkingFailed {
        /// Outcome of the partial flow.
        descriptor: LoginDescriptor,
        /// The failure that interrupted the replacement sign-in.
        cause: Box<UserError>,
    },
    /// A single-use credential was consumed by a failed link attempt and no
    /// re-acquisition path is available. Acquire a fresh credential from the
    /// originating provider flow and retry.
    DuplicatedCredentials,
    /// The specified user cannot be found.
    UserNotFound,
    /// The specified user is disabled.
    UserDisabled,
    /// The user token has expired.
    ExpiredToken,
    /// The specified password is invalid.
    WrongPassword,
    /// The specified credential is either expired or invalid.
    InvalidCredential,
    /// The specified email is already in use in another account.
    EmailAlreadyInUse,
    /// The specified password does not satisfy the basic security
    /// requirements.
    WeakPassword(Option<String>),
    /// The requested action would target a different user than the one
    /// currently signed-in.
    WrongUser,
    /// The requested action requires a recent call to
    /// [`confirm_authentication`](crate::manager::UserManager::confirm_authentication).
    AuthenticationConfirmationRequired,
    /// The specified provider is already linked with this user.
    ProviderAlreadyLinked,
    /// An error occurred while reaching the backend servers.
    NetworkError,
    /// The requested operation is not enabled on the backend.
    ConfigurationError,
    /// The backend configuration shipped with the app is invalid.
    InvalidConfiguration,
    /// An error occurred while accessing the local credential store.
    KeychainError(String),
    /// An unknown error has occurred.
    Unknown(Option<String>),
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoUser => write!(f, "This action requires a logged-in user."),
            Self::InvalidUpdate => write!(f, "This update cannot be performed."),
            Self::AlreadyLoggedIn => {
                write!(f, "There is already a non-anonymous user logged-in.")
            }
            Self::AlreadyAnonymous => {
                write!(f, "There is already an anonymous user logged-in.")
            }
            Self::InvalidEmail => write!(f, "The provided email address is invalid."),
            Self::MigrationRequired(_) => write!(
                f,
                "Proceeding with this action requires confirmation to migrate data from a user account to another."
            ),
            Self::AutomaticLinkingFailed { cause, .. } => write!(
                f,
                "The anonymous account was replaced, but the new sign-in failed: {cause}"
            ),
            Self::DuplicatedCredentials => write!(
                f,
                "The credential has already been used and must be acquired again."
            ),
            Self::UserNotFound => write!(f, "The specified user cannot be found."),
            Self::UserDisabled => write!(f, "The specified user is disabled."),
            Self::ExpiredToken => write!(
                f,
                "The credentials stored on this device are no longer valid. Please re-authenticate."
            ),
            Self::WrongPassword => write!(f, "The specified password is invalid."),
            Self::InvalidCredential => write!(f, "The specified credential is invalid."),
            Self::EmailAlreadyInUse => write!(
                f,
                "This email address is already registered with another account."
            ),
            Self::WeakPassword(reason) => write!(
                f,
                "The provided password does not satisfy the security requirements: {}.",
                reason.as_deref().unwrap_or("please try again")
            ),
            Self::WrongUser => write!(f, "You are authenticating with a different user."),
            Self::AuthenticationConfirmationRequired => write!(
                f,
                "In order to perform this action, you'll have to confirm your credentials by authenticating again."
            ),
            Self::ProviderAlreadyLinked => write!(f, "This login provider is already linked."),
            Self::NetworkError => write!(f, "A network error occurred."),
            Self::ConfigurationError => write!(
                f,
                "The requested operation is not enabled in the backend configuration."
            ),
            Self::InvalidConfiguration => write!(f, "There is an error in your app configuration."),
            Self::KeychainError(detail) => write!(
                f,
                "An error occurred while communicating with the keychain: {detail}"
            ),
            Self::Unknown(detail) => write!(
                f,
                "{}",
                detail.as_deref().unwrap_or("An unknown error occurred.")
            ),
        }
    }
}

impl std::error::Error for UserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AutomaticLinkingFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Map a backend failure into the taxonomy.
///
/// This is the single conversion point for backend error codes; engine code
/// applies it with `?` right where a backend call returns.
impl From<BackendError> for UserError {
    fn from(error: BackendError) -> Self {
        match error.code {
            BackendErrorCode::Network => Self::NetworkError,
            BackendErrorCode::UserNotFound => Self::UserNotFound,
            BackendErrorCode::UserTokenExpired => Self::ExpiredToken,
            BackendErrorCode::InvalidEmail => Self::InvalidEmail,
            BackendErrorCode::UserDisabled => Self::UserDisabled,
            BackendErrorCode::WrongPassword => Self::WrongPassword,
            BackendErrorCode::InvalidCredential => Self::InvalidCredential,
            BackendErrorCode::EmailAlreadyInUse => Self::EmailAlreadyInUse,
            BackendErrorCode::OperationNotAllowed => Self::ConfigurationError,
            BackendErrorCode::InvalidApiKey | BackendErrorCode::AppNotAuthorized => {
                Self::InvalidConfiguration
            }
            BackendErrorCode::WeakPassword => Self::WeakPassword(error.message),
            BackendErrorCode::Keychain => {
                Self::KeychainError(error.message.unwrap_or_else(|| "unknown".to_string()))
            }
            BackendErrorCode::UserMismatch => Self::WrongUser,
            BackendErrorCode::RequiresRecentLogin => Self::AuthenticationConfirmationRequired,
            BackendErrorCode::ProviderAlreadyLinked => Self::ProviderAlreadyLinked,
            BackendErrorCode::Other => Self::Unknown(error.message),
        }
    }
}
