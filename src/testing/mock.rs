//! Mock implementations of external dependencies
//!
//! [`MockBackend`] is an in-memory identity backend. It models the behaviors
//! the engine depends on: account lookup by email, email-already-in-use
//! conflicts on linking, single-use token consumption, recent-login trust
//! rules for deletion, and the backend's silence about successful links.

use crate::backend::{AuthBackend, BackendError, BackendErrorCode};
use crate::errors::UserError;
use crate::models::{Credential, Provider, UserData};
use crate::providers::LoginProvider;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;

/// Channel capacity for mock change notifications.
const EVENT_CAPACITY: usize = 16;

/// An account stored in the mock backend.
#[derive(Debug, Clone)]
pub struct MockAccount {
    pub id: String,
    pub email: String,
    pub password: Option<String>,
    pub display_name: Option<String>,
    pub providers: Vec<Provider>,
    pub disabled: bool,
}

#[derive(Default)]
struct MockState {
    accounts: HashMap<String, MockAccount>,
    current: Option<UserData>,
    consumed_tokens: HashSet<String>,
    verification_emails: Vec<String>,
    recent_authentication: bool,
    anonymous_counter: usize,
    latency: Option<Duration>,
    fail_next_sign_in: Option<BackendError>,
    fail_next_link: Option<BackendError>,
    fail_next_profile_update: Option<BackendError>,
    fail_next_delete: Option<BackendError>,
}

/// In-memory fake of the backend identity SDK.
pub struct MockBackend {
    state: Mutex<MockState>,
    events: broadcast::Sender<Option<UserData>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// An empty backend with no accounts and no session.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(MockState::default()),
            events,
        }
    }

    /// A backend pre-seeded with the given accounts.
    #[must_use]
    pub fn with_accounts(accounts: Vec<MockAccount>) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.lock_state();
            for account in accounts {
                state.accounts.insert(account.email.clone(), account);
            }
        }
        backend
    }

    /// Script a failure for the next sign-in call.
    pub fn fail_next_sign_in(&self, error: BackendError) {
        self.lock_state().fail_next_sign_in = Some(error);
    }

    /// Script a failure for the next link call.
    pub fn fail_next_link(&self, error: BackendError) {
        self.lock_state().fail_next_link = Some(error);
    }

    /// Script a failure for the next profile update.
    pub fn fail_next_profile_update(&self, error: BackendError) {
        self.lock_state().fail_next_profile_update = Some(error);
    }

    /// Script a failure for the next account deletion.
    pub fn fail_next_delete(&self, error: BackendError) {
        self.lock_state().fail_next_delete = Some(error);
    }

    /// Make the next sensitive operation demand a fresh authentication.
    pub fn expire_recent_login(&self) {
        self.lock_state().recent_authentication = false;
    }

    /// Delay every subsequent authentication call by the given duration, so
    /// tests can interleave concurrent operations.
    pub fn set_latency(&self, latency: Duration) {
        self.lock_state().latency = Some(latency);
    }

    /// The addresses verification messages were sent to, in order.
    #[must_use]
    pub fn verification_emails(&self) -> Vec<String> {
        self.lock_state().verification_emails.clone()
    }

    /// The stored account for an email address, for assertions.
    #[must_use]
    pub fn account(&self, email: &str) -> Option<MockAccount> {
        self.lock_state().accounts.get(email).cloned()
    }

    /// How many accounts the backend holds.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.lock_state().accounts.len()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MockState> {
        // Test-only code: a poisoned lock means a test already panicked.
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn emit(&self, snapshot: Option<UserData>) {
        let _ = self.events.send(snapshot);
    }

    /// The state lock is not held across the sleep.
    async fn simulate_latency(&self) {
        let latency = self.lock_state().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn snapshot_for(account: &MockAccount) -> UserData {
        UserData {
            id: Some(account.id.clone()),
            email: Some(account.email.clone()),
            display_name: account.display_name.clone(),
            is_anonymous: false,
            providers: account.providers.clone(),
            created_at: Some(Utc::now()),
            last_sign_in: Some(Utc::now()),
        }
    }

    /// Verify a credential against stored accounts, consuming single-use
    /// tokens along the way. Returns the matched account's email.
    fn verify_credential(
        state: &mut MockState,
        credential: &Credential,
    ) -> Result<String, BackendError> {
        if let Credential::Apple { id_token, nonce, .. } = credential {
            if nonce.as_deref().is_none_or(str::is_empty) {
                return Err(BackendError::new(BackendErrorCode::InvalidCredential));
            }
            if !state.consumed_tokens.insert(id_token.clone()) {
                // A nonce-bound token only verifies once.
                return Err(BackendError::new(BackendErrorCode::InvalidCredential));
            }
        }

        let email = credential.email().to_string();
        match state.accounts.get(&email) {
            None => {
                if credential.provider() == Provider::Password {
                    return Err(BackendError::new(BackendErrorCode::UserNotFound));
                }
                // Federated sign-in auto-creates the account.
                let account = MockAccount {
                    id: format!("user-{}", uuid::Uuid::new_v4()),
                    email: email.clone(),
                    password: None,
                    display_name: credential.full_name().map(ToString::to_string),
                    providers: vec![credential.provider()],
                    disabled: false,
                };
                state.accounts.insert(email.clone(), account);
            }
            Some(account) => {
                if account.disabled {
                    return Err(BackendError::new(BackendErrorCode::UserDisabled));
                }
                if let Credential::Password { password, .. } = credential {
                    if account.password.as_deref() != Some(password) {
                        return Err(BackendError::new(BackendErrorCode::WrongPassword));
                    }
                }
            }
        }
        Ok(email)
    }
}

#[async_trait]
impl AuthBackend for MockBackend {
    fn current_user(&self) -> Option<UserData> {
        self.lock_state().current.clone()
    }

    async fn sign_in_anonymously(&self) -> Result<UserData, BackendError> {
        self.simulate_latency().await;
        let mut state = self.lock_state();
        state.anonymous_counter += 1;
        let user = UserData {
            id: Some(format!("anon-{}", state.anonymous_counter)),
            email: None,
            display_name: None,
            is_anonymous: true,
            providers: Vec::new(),
            created_at: Some(Utc::now()),
            last_sign_in: Some(Utc::now()),
        };
        state.current = Some(user.clone());
        state.recent_authentication = true;
        drop(state);
        self.emit(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in(&self, credential: &Credential) -> Result<UserData, BackendError> {
        self.simulate_latency().await;
        let mut state = self.lock_state();
        if let Some(error) = state.fail_next_sign_in.take() {
            return Err(error);
        }

        let email = Self::verify_credential(&mut state, credential)?;
        let account = state
            .accounts
            .get(&email)
            .cloned()
            .ok_or_else(|| BackendError::new(BackendErrorCode::UserNotFound))?;
        let user = Self::snapshot_for(&account);
        state.current = Some(user.clone());
        state.recent_authentication = true;
        drop(state);
        self.emit(Some(user.clone()));
        Ok(user)
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<UserData, BackendError> {
        self.simulate_latency().await;
        let mut state = self.lock_state();
        if state.accounts.contains_key(email) {
            return Err(BackendError::new(BackendErrorCode::EmailAlreadyInUse));
        }
        if password.len() < 6 {
            return Err(BackendError::with_message(
                BackendErrorCode::WeakPassword,
                "Password should be at least 6 characters",
            ));
        }
        let account = MockAccount {
            id: format!("user-{}", uuid::Uuid::new_v4()),
            email: email.to_string(),
            password: Some(password.to_string()),
            display_name: None,
            providers: vec![Provider::Password],
            disabled: false,
        };
        let user = Self::snapshot_for(&account);
        state.accounts.insert(email.to_string(), account);
        state.current = Some(user.clone());
        state.recent_authentication = true;
        drop(state);
        self.emit(Some(user.clone()));
        Ok(user)
    }

    async fn link(&self, credential: &Credential) -> Result<UserData, BackendError> {
        self.simulate_latency().await;
        let mut state = self.lock_state();
        if let Some(error) = state.fail_next_link.take() {
            return Err(error);
        }

        let Some(current) = state.current.clone() else {
            return Err(BackendError::with_message(
                BackendErrorCode::Other,
                "no current user to link to",
            ));
        };

        // A failed link still consumes nonce-bound tokens.
        if let Credential::Apple { id_token, .. } = credential {
            state.consumed_tokens.insert(id_token.clone());
        }

        let email = credential.email().to_string();
        if let Some(existing) = state.accounts.get(&email) {
            if Some(&existing.id) != current.id.as_ref() {
                return Err(BackendError::new(BackendErrorCode::EmailAlreadyInUse));
            }
        }
        if current.providers.contains(&credential.provider()) {
            return Err(BackendError::new(BackendErrorCode::ProviderAlreadyLinked));
        }

        let mut account = state.accounts.remove(&email).unwrap_or_else(|| MockAccount {
            id: current.id.clone().unwrap_or_default(),
            email: email.clone(),
            password: None,
            display_name: current.display_name.clone(),
            providers: current.providers.clone(),
            disabled: false,
        });
        if let Credential::Password { password, .. } = credential {
            account.password = Some(password.clone());
        }
        account.providers.push(credential.provider());

        // The id is preserved: the account is upgraded in place.
        let user = Self::snapshot_for(&account);
        state.accounts.insert(email, account);
        state.current = Some(user.clone());
        drop(state);
        // Deliberately no event: the real SDK stays silent about links.
        Ok(user)
    }

    async fn reauthenticate(&self, credential: &Credential) -> Result<(), BackendError> {
        let mut state = self.lock_state();
        let Some(current) = state.current.clone() else {
            return Err(BackendError::with_message(
                BackendErrorCode::Other,
                "no current user to re-authenticate",
            ));
        };
        if current.email.as_deref() != Some(credential.email()) {
            return Err(BackendError::new(BackendErrorCode::UserMismatch));
        }
        Self::verify_credential(&mut state, credential)?;
        state.recent_authentication = true;
        Ok(())
    }

    async fn update_profile(&self, display_name: Option<&str>) -> Result<(), BackendError> {
        let mut state = self.lock_state();
        if let Some(error) = state.fail_next_profile_update.take() {
            return Err(error);
        }
        let Some(current) = state.current.as_mut() else {
            return Err(BackendError::with_message(
                BackendErrorCode::Other,
                "no current user to update",
            ));
        };
        current.display_name = display_name.map(ToString::to_string);
        let email = current.email.clone();
        if let Some(account) = email.and_then(|email| state.accounts.get_mut(&email)) {
            account.display_name = display_name.map(ToString::to_string);
        }
        Ok(())
    }

    async fn update_email(&self, new_email: &str) -> Result<(), BackendError> {
        let mut state = self.lock_state();
        if !new_email.contains('@') {
            return Err(BackendError::new(BackendErrorCode::InvalidEmail));
        }
        let Some(current) = state.current.clone() else {
            return Err(BackendError::with_message(
                BackendErrorCode::Other,
                "no current user to update",
            ));
        };
        if state.accounts.contains_key(new_email) {
            return Err(BackendError::new(BackendErrorCode::EmailAlreadyInUse));
        }
        if let Some(old_email) = current.email {
            if let Some(mut account) = state.accounts.remove(&old_email) {
                account.email = new_email.to_string();
                state.accounts.insert(new_email.to_string(), account);
            }
        }
        if let Some(current) = state.current.as_mut() {
            current.email = Some(new_email.to_string());
        }
        Ok(())
    }

    async fn verify_before_update_email(&self, new_email: &str) -> Result<(), BackendError> {
        let mut state = self.lock_state();
        if !new_email.contains('@') {
            return Err(BackendError::new(BackendErrorCode::InvalidEmail));
        }
        let Some(current) = state.current.as_ref() else {
            return Err(BackendError::with_message(
                BackendErrorCode::Other,
                "no current user to update",
            ));
        };
        let current_id = current.id.clone();
        if let Some(existing) = state.accounts.get(new_email) {
            if Some(&existing.id) != current_id.as_ref() {
                return Err(BackendError::new(BackendErrorCode::EmailAlreadyInUse));
            }
        }
        // The address itself only changes after out-of-band confirmation.
        state.verification_emails.push(new_email.to_string());
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> Result<(), BackendError> {
        let mut state = self.lock_state();
        if new_password.len() < 6 {
            return Err(BackendError::with_message(
                BackendErrorCode::WeakPassword,
                "Password should be at least 6 characters",
            ));
        }
        let Some(email) = state.current.as_ref().and_then(|user| user.email.clone()) else {
            return Err(BackendError::with_message(
                BackendErrorCode::Other,
                "no current user to update",
            ));
        };
        if let Some(account) = state.accounts.get_mut(&email) {
            account.password = Some(new_password.to_string());
        }
        Ok(())
    }

    async fn delete_current_user(&self) -> Result<(), BackendError> {
        let mut state = self.lock_state();
        if let Some(error) = state.fail_next_delete.take() {
            return Err(error);
        }
        let Some(current) = state.current.take() else {
            return Err(BackendError::with_message(
                BackendErrorCode::Other,
                "no current user to delete",
            ));
        };
        if !state.recent_authentication {
            state.current = Some(current);
            return Err(BackendError::new(BackendErrorCode::RequiresRecentLogin));
        }
        if let Some(email) = current.email {
            state.accounts.remove(&email);
        }
        drop(state);
        self.emit(None);
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let mut state = self.lock_state();
        state.current = None;
        drop(state);
        self.emit(None);
        Ok(())
    }

    async fn sign_in_methods(&self, email: &str) -> Result<Vec<Provider>, BackendError> {
        if !email.contains('@') {
            return Err(BackendError::new(BackendErrorCode::InvalidEmail));
        }
        let state = self.lock_state();
        Ok(state
            .accounts
            .get(email)
            .map(|account| account.providers.clone())
            .unwrap_or_default())
    }

    async fn access_token(&self) -> Result<Option<String>, BackendError> {
        let state = self.lock_state();
        Ok(state
            .current
            .as_ref()
            .and_then(|user| user.id.as_ref())
            .map(|id| format!("token-{id}")))
    }

    fn subscribe(&self) -> broadcast::Receiver<Option<UserData>> {
        self.events.subscribe()
    }
}

/// A provider flow with scripted outcomes.
///
/// Each [`sign_in`](LoginProvider::sign_in) call pops the next scripted
/// result, which also makes it a convenient re-acquisition path in tests.
pub struct MockLoginProvider {
    name: &'static str,
    results: Mutex<VecDeque<Result<Credential, UserError>>>,
    acquisitions: AtomicUsize,
}

impl MockLoginProvider {
    /// An empty provider; script results before use.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            results: Mutex::new(VecDeque::new()),
            acquisitions: AtomicUsize::new(0),
        }
    }

    /// Script a successful acquisition.
    pub fn push_credential(&self, credential: Credential) {
        if let Ok(mut results) = self.results.lock() {
            results.push_back(Ok(credential));
        }
    }

    /// Script a failed acquisition.
    pub fn push_failure(&self, error: UserError) {
        if let Ok(mut results) = self.results.lock() {
            results.push_back(Err(error));
        }
    }

    /// How many times the flow has been run.
    #[must_use]
    pub fn acquisition_count(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LoginProvider for MockLoginProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn sign_in(&self) -> Result<Credential, UserError> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        let next = self
            .results
            .lock()
            .ok()
            .and_then(|mut results| results.pop_front());
        next.unwrap_or_else(|| {
            Err(UserError::Unknown(Some(
                "no scripted credential left".to_string(),
            )))
        })
    }
}
