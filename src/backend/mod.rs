//! Identity backend abstraction
//!
//! The engine never talks to a concrete identity SDK. Everything it needs is
//! behind [`AuthBackend`]: sign-in, linking, deletion, profile updates,
//! re-authentication, and a change-notification subscription. Production
//! code supplies an adapter over the real SDK; tests use the mock in the
//! `testing` module.

use crate::models::{Credential, Provider, UserData};
use async_trait::async_trait;
use std::fmt;
use tokio::sync::broadcast;

/// Error codes reported by the backend identity SDK.
///
/// Each code has exactly one counterpart in
/// [`UserError`](crate::errors::UserError); the conversion lives in
/// `errors.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorCode {
    /// Connectivity failure between the device and the backend.
    Network,
    /// No account matches the request.
    UserNotFound,
    /// The cached user token is no longer valid.
    UserTokenExpired,
    /// The email address is malformed.
    InvalidEmail,
    /// The account has been administratively disabled.
    UserDisabled,
    /// Password sign-in was attempted with the wrong password.
    WrongPassword,
    /// The supplied credential is malformed, expired, or already consumed.
    InvalidCredential,
    /// The credential's email address belongs to another account.
    EmailAlreadyInUse,
    /// The operation is disabled in the backend project configuration.
    OperationNotAllowed,
    /// The API key shipped with the app is invalid.
    InvalidApiKey,
    /// The app is not authorized to use the backend project.
    AppNotAuthorized,
    /// The password does not meet the backend's strength requirements.
    WeakPassword,
    /// The local credential store could not be accessed.
    Keychain,
    /// Re-authentication used a credential for a different user.
    UserMismatch,
    /// A sensitive operation requires a recent sign-in.
    RequiresRecentLogin,
    /// The provider is already linked to the current user.
    ProviderAlreadyLinked,
    /// Anything the SDK reports that has no dedicated code here.
    Other,
}

/// A failure reported by the backend identity SDK.
#[derive(Debug, Clone)]
pub struct BackendError {
    /// The SDK error code.
    pub code: BackendErrorCode,
    /// Optional human-readable detail, e.g. the weak-password reason.
    pub message: Option<String>,
}

impl BackendError {
    /// A backend error with no detail message.
    #[must_use]
    pub const fn new(code: BackendErrorCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    /// A backend error with a detail message.
    #[must_use]
    pub fn with_message(code: BackendErrorCode, message: &str) -> Self {
        Self {
            code,
            message: Some(message.to_string()),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "backend error {:?}: {message}", self.code),
            None => write!(f, "backend error {:?}", self.code),
        }
    }
}

impl std::error::Error for BackendError {}

/// The identity backend the engine orchestrates.
///
/// Implementations own the notion of a "current user": at most one identity
/// is signed in at a time, and every mutating call below operates on it.
/// Implementations must emit a fresh [`UserData`] snapshot (or `None` after
/// sign-out and deletion) on the channel returned by
/// [`subscribe`](AuthBackend::subscribe) whenever backend state changes of
/// its own accord; the engine supplements that feed for mutations the SDK
/// does not announce, such as linking.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// A snapshot of the currently signed-in user, if any.
    fn current_user(&self) -> Option<UserData>;

    /// Create and sign in a new anonymous user.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure, e.g. network or configuration errors.
    async fn sign_in_anonymously(&self) -> Result<UserData, BackendError>;

    /// Sign in with the given credential, replacing any current session.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure, e.g. wrong password or an invalid or
    /// already-consumed credential.
    async fn sign_in(&self, credential: &Credential) -> Result<UserData, BackendError>;

    /// Create a new account with an email and password, then sign in.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure, e.g. email-already-in-use or a weak
    /// password.
    async fn create_user(&self, email: &str, password: &str) -> Result<UserData, BackendError>;

    /// Attach the credential to the currently signed-in user, keeping its id.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure. `EmailAlreadyInUse` signals that the
    /// credential's underlying account already exists elsewhere; with email
    /// enumeration protection enabled this is the only such signal.
    async fn link(&self, credential: &Credential) -> Result<UserData, BackendError>;

    /// Re-assert that the current user owns the credential.
    ///
    /// Never creates, deletes, or links identities.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure, e.g. `UserMismatch` when the credential
    /// belongs to somebody else.
    async fn reauthenticate(&self, credential: &Credential) -> Result<(), BackendError>;

    /// Update the current user's display name.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure.
    async fn update_profile(&self, display_name: Option<&str>) -> Result<(), BackendError>;

    /// Change the current user's email address.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure, e.g. `RequiresRecentLogin`.
    async fn update_email(&self, new_email: &str) -> Result<(), BackendError>;

    /// Send a verification message to the new email address. The address
    /// only changes once the user confirms it out of band.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure, e.g. an invalid or already-taken
    /// address.
    async fn verify_before_update_email(&self, new_email: &str) -> Result<(), BackendError>;

    /// Change the current user's password. Requires a linked password
    /// provider.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure, e.g. a weak password.
    async fn update_password(&self, new_password: &str) -> Result<(), BackendError>;

    /// Delete the current user's account.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure. `RequiresRecentLogin` is surfaced when
    /// the backend's trust rules demand a recent authentication.
    async fn delete_current_user(&self) -> Result<(), BackendError>;

    /// Sign out the current user.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure, e.g. a keychain error.
    async fn sign_out(&self) -> Result<(), BackendError>;

    /// The providers an email address can sign in with.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure, e.g. an invalid email.
    async fn sign_in_methods(&self, email: &str) -> Result<Vec<Provider>, BackendError>;

    /// A fresh access token for the current user, or `None` when signed out.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure, e.g. an expired user token.
    async fn access_token(&self) -> Result<Option<String>, BackendError>;

    /// Subscribe to backend-originated identity changes.
    ///
    /// Each emission is the post-change snapshot of the current user.
    fn subscribe(&self) -> broadcast::Receiver<Option<UserData>>;
}
