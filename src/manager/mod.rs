//! Account reconciliation engine
//!
//! [`UserManager`] orchestrates every account operation against an
//! [`AuthBackend`]: anonymous sign-in, credential login with
//! anonymous-account reconciliation, linking, deletion, profile updates, and
//! re-authentication. A single instance manages a single backend session.
//!
//! Mutating operations are serialized through an internal mutex, precondition
//! guards included; callers may issue them concurrently, but they execute
//! one at a time. All operations
//! are single-shot futures: dropping one cancels it before any result is
//! delivered.

mod account;
mod login;

pub use login::LoginOptions;

use crate::backend::AuthBackend;
use crate::errors::UserError;
use crate::models::{Credential, UserData};
use crate::providers::LoginProvider;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::broadcast;
use url::Url;

/// Capacity of the identity feed channel. Subscribers that fall further
/// behind than this skip to the most recent snapshots.
const FEED_CAPACITY: usize = 16;

/// The account reconciliation engine.
///
/// Construct one per backend session with [`UserManager::new`]; the
/// constructor spawns a task that forwards backend change notifications onto
/// the identity feed, so it must be called within a Tokio runtime.
pub struct UserManager<B: AuthBackend> {
    backend: Arc<B>,
    /// Serializes all session-mutating operations. The backend session is a
    /// single shared resource; interleaved mutations would race.
    write_lock: tokio::sync::Mutex<()>,
    /// The identity feed. Backend-originated changes are forwarded here, and
    /// the engine pushes extra snapshots for mutations the backend does not
    /// announce (see [`UserManager::force_refresh`]).
    events: broadcast::Sender<Option<UserData>>,
    forwarder: tokio::task::JoinHandle<()>,
    /// The provider flow currently awaiting an external result, if any.
    /// Held only while a flow is in flight; used to route redirect URLs.
    pending_login: std::sync::Mutex<Option<Arc<dyn LoginProvider>>>,
}

impl<B: AuthBackend + 'static> UserManager<B> {
    /// Create an engine over the given backend.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        let (events, _) = broadcast::channel(FEED_CAPACITY);
        let forwarder = Self::spawn_forwarder(&backend, events.clone());
        Self {
            backend,
            write_lock: tokio::sync::Mutex::new(()),
            events,
            forwarder,
            pending_login: std::sync::Mutex::new(None),
        }
    }

    /// Forward backend-originated change notifications onto the feed.
    fn spawn_forwarder(
        backend: &Arc<B>,
        events: broadcast::Sender<Option<UserData>>,
    ) -> tokio::task::JoinHandle<()> {
        let mut backend_events = backend.subscribe();
        tokio::spawn(async move {
            loop {
                match backend_events.recv().await {
                    Ok(snapshot) => {
                        // Nobody subscribed is fine; the feed is restartable.
                        let _ = events.send(snapshot);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("identity feed lagged behind the backend by {skipped} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Whether a non-anonymous user is signed in.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.backend
            .current_user()
            .is_some_and(|user| !user.is_anonymous)
    }

    /// Whether an anonymous user is signed in.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.backend
            .current_user()
            .is_some_and(|user| user.is_anonymous)
    }

    /// A snapshot of the currently signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<UserData> {
        self.backend.current_user()
    }

    /// Subscribe to the identity feed.
    ///
    /// The feed is a single ordered stream of current-user snapshots: every
    /// backend-originated change, plus the snapshots the engine pushes after
    /// mutations the backend does not announce on its own (linking an
    /// anonymous account, profile updates). Subscriptions are independent
    /// and restartable.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Option<UserData>> {
        self.events.subscribe()
    }

    /// Push the current snapshot onto the feed.
    ///
    /// Linking an anonymous account to a real credential does not always
    /// trigger a native change notification from the backend, so observers
    /// would keep stale data without this.
    pub(crate) fn force_refresh(&self) {
        let _ = self.events.send(self.backend.current_user());
    }

    /// Sign in a new anonymous user.
    ///
    /// # Errors
    ///
    /// [`UserError::AlreadyLoggedIn`] or [`UserError::AlreadyAnonymous`] when
    /// a session already exists; otherwise the mapped backend failure.
    pub async fn login_anonymously(&self) -> Result<(), UserError> {
        // Guards run under the lock so concurrent calls observe each other's
        // outcome instead of both passing the precondition.
        let _guard = self.write_lock.lock().await;
        if self.is_logged_in() {
            return Err(UserError::AlreadyLoggedIn);
        }
        if self.is_anonymous() {
            return Err(UserError::AlreadyAnonymous);
        }

        debug!("signing in anonymously");
        self.backend.sign_in_anonymously().await?;
        Ok(())
    }

    /// Register a new account with an email and password.
    ///
    /// When the current user is anonymous, the account is upgraded in place
    /// by linking a password credential instead of creating a fresh one.
    ///
    /// # Errors
    ///
    /// [`UserError::AlreadyLoggedIn`] when a non-anonymous user is signed in;
    /// otherwise the mapped backend failure, e.g.
    /// [`UserError::EmailAlreadyInUse`] or [`UserError::WeakPassword`].
    pub async fn register(&self, email: &str, password: &str) -> Result<(), UserError> {
        let _guard = self.write_lock.lock().await;
        match self.backend.current_user() {
            Some(user) if !user.is_anonymous => Err(UserError::AlreadyLoggedIn),
            Some(_) => self.link_anonymous_account_locked(email, password).await,
            None => {
                debug!("creating a new password account");
                self.backend.create_user(email, password).await?;
                Ok(())
            }
        }
    }

    /// Link a password credential to the current anonymous user, upgrading
    /// it in place without changing its id.
    ///
    /// # Errors
    ///
    /// [`UserError::NoUser`] when no anonymous user is signed in; otherwise
    /// the mapped backend failure.
    pub async fn link_anonymous_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(), UserError> {
        let _guard = self.write_lock.lock().await;
        self.link_anonymous_account_locked(email, password).await
    }

    /// The linking body, shared with [`register`](Self::register). The caller
    /// must hold the write lock.
    async fn link_anonymous_account_locked(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(), UserError> {
        let Some(user) = self.backend.current_user() else {
            return Err(UserError::NoUser);
        };
        if !user.is_anonymous {
            return Err(UserError::NoUser);
        }

        debug!("linking a password credential to anonymous user");
        self.backend
            .link(&Credential::password(email, password))
            .await?;
        // Linking does not fire a native change notification.
        self.force_refresh();
        Ok(())
    }

    /// Sign out the current user.
    ///
    /// With `reset_to_anonymous`, a fresh anonymous session is created right
    /// after, so the caller is never left without a session.
    ///
    /// # Errors
    ///
    /// [`UserError::AlreadyAnonymous`] when resetting while already
    /// anonymous; otherwise the mapped backend failure.
    pub async fn logout(&self, reset_to_anonymous: bool) -> Result<(), UserError> {
        let _guard = self.write_lock.lock().await;
        if reset_to_anonymous && self.is_anonymous() {
            return Err(UserError::AlreadyAnonymous);
        }

        debug!("signing out (reset_to_anonymous: {reset_to_anonymous})");
        self.backend.sign_out().await?;
        if reset_to_anonymous {
            self.backend.sign_in_anonymously().await?;
        }
        Ok(())
    }

    /// Whether an account already exists for the given email address.
    ///
    /// # Errors
    ///
    /// The mapped backend failure, e.g. [`UserError::InvalidEmail`].
    pub async fn account_exists(&self, email: &str) -> Result<bool, UserError> {
        let methods = self.backend.sign_in_methods(email).await?;
        Ok(!methods.is_empty())
    }

    /// A fresh access token for the current user, or `None` when signed out.
    ///
    /// # Errors
    ///
    /// The mapped backend failure, e.g. [`UserError::ExpiredToken`].
    pub async fn access_token(&self) -> Result<Option<String>, UserError> {
        Ok(self.backend.access_token().await?)
    }

    /// Offer a redirect URL to the provider flow currently in flight.
    ///
    /// Returns `true` when a pending flow consumed the URL. Call this from
    /// the application's URL-open entry point to resume suspended external
    /// flows.
    #[must_use]
    pub fn handle_url(&self, url: &Url) -> bool {
        let pending = match self.pending_login.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        pending.is_some_and(|provider| provider.handle_url(url))
    }

    /// Run a provider flow with the pending-handler reference set for the
    /// duration, clearing it even when the flow fails or is dropped.
    pub(crate) async fn acquire_credential(
        &self,
        provider: &Arc<dyn LoginProvider>,
    ) -> Result<Credential, UserError> {
        if let Ok(mut pending) = self.pending_login.lock() {
            *pending = Some(Arc::clone(provider));
        }
        let _reset = PendingFlowReset { manager: self };
        provider.sign_in().await
    }

    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }

    pub(crate) fn write_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.write_lock
    }
}

impl<B: AuthBackend> Drop for UserManager<B> {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Clears the pending provider reference when a flow ends, including by
/// cancellation.
struct PendingFlowReset<'a, B: AuthBackend> {
    manager: &'a UserManager<B>,
}

impl<B: AuthBackend> Drop for PendingFlowReset<'_, B> {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.manager.pending_login.lock() {
            *pending = None;
        }
    }
}
