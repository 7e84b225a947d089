//! Credential login and anonymous-account reconciliation
//!
//! This is the heart of the crate: given a credential and whatever session
//! currently exists, decide between a direct sign-in, an in-place upgrade of
//! an anonymous account, or a migration that discards the anonymous account
//! in favor of the existing one.

use super::UserManager;
use crate::backend::{AuthBackend, BackendErrorCode};
use crate::errors::UserError;
use crate::models::{Credential, LoginDescriptor, MigrationAllowance};
use crate::providers::LoginProvider;
use log::{debug, info, warn};
use std::sync::Arc;

/// Caller-controlled knobs for a login flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginOptions {
    /// Propagate the credential's full name to the user profile after a
    /// successful sign-in. The extra profile update is part of the flow: if
    /// it fails, the whole login fails, even though authentication itself
    /// succeeded.
    pub update_display_name: bool,
    /// The caller's stance on migrating data away from an anonymous account.
    pub allow_migration: MigrationAllowance,
    /// When a migration has already destroyed the anonymous account and the
    /// replacement sign-in fails, create a fresh anonymous session instead
    /// of leaving no session at all. The failure is then reported as
    /// [`UserError::AutomaticLinkingFailed`].
    pub reset_to_anonymous_on_failure: bool,
}

impl LoginOptions {
    /// Options for a plain email & password login: propagate the display
    /// name, with the given migration allowance.
    #[must_use]
    pub fn email_login(allow_migration: MigrationAllowance) -> Self {
        Self {
            update_display_name: true,
            allow_migration,
            reset_to_anonymous_on_failure: false,
        }
    }
}

impl<B: AuthBackend + 'static> UserManager<B> {
    /// Sign in with an email and password.
    ///
    /// Shorthand for [`login`](Self::login) with display-name propagation
    /// enabled.
    ///
    /// # Errors
    ///
    /// See [`login`](Self::login).
    pub async fn login_with_email(
        &self,
        email: &str,
        password: &str,
        allow_migration: MigrationAllowance,
    ) -> Result<LoginDescriptor, UserError> {
        self.login(
            Credential::password(email, password),
            LoginOptions::email_login(allow_migration),
        )
        .await
    }

    /// Sign in with a credential, reconciling any current session.
    ///
    /// - No session: signs in directly.
    /// - Non-anonymous session: links the credential to the current user,
    ///   adding a sign-in method without changing the user id.
    /// - Anonymous session: links first; when the credential's account
    ///   already exists, migrates to it according to
    ///   [`LoginOptions::allow_migration`] by deleting the anonymous user
    ///   and signing in with the credential.
    ///
    /// # Errors
    ///
    /// - [`UserError::MigrationRequired`] when a migration is needed but the
    ///   allowance is [`MigrationAllowance::Undecided`]; the anonymous
    ///   session is left untouched and the credential is carried inside the
    ///   error for a later retry.
    /// - [`UserError::DuplicatedCredentials`] when the migration consumed a
    ///   single-use credential and no re-acquisition path exists. Acquire a
    ///   fresh credential and sign in again; the anonymous account is
    ///   already gone.
    /// - [`UserError::AutomaticLinkingFailed`] when the replacement sign-in
    ///   failed after the anonymous account was destroyed and
    ///   [`LoginOptions::reset_to_anonymous_on_failure`] was set.
    /// - [`UserError::EmailAlreadyInUse`] when linking to a non-anonymous
    ///   user collides with an existing account; migration never applies to
    ///   non-anonymous sessions.
    /// - Any other mapped backend failure.
    pub async fn login(
        &self,
        credential: Credential,
        options: LoginOptions,
    ) -> Result<LoginDescriptor, UserError> {
        self.login_reacquiring(credential, options, None).await
    }

    /// Acquire a credential from an external provider flow and sign in with
    /// it, reusing the provider as the re-acquisition path for single-use
    /// credentials.
    ///
    /// While the flow is in flight, redirect URLs offered to
    /// [`handle_url`](Self::handle_url) are routed to it.
    ///
    /// # Errors
    ///
    /// The provider flow's failure, or any error from
    /// [`login`](Self::login).
    #[allow(clippy::needless_pass_by_value)] // The flow outlives the caller's reference
    pub async fn login_with_provider(
        &self,
        provider: Arc<dyn LoginProvider>,
        options: LoginOptions,
    ) -> Result<LoginDescriptor, UserError> {
        info!("starting {} sign-in flow", provider.name());
        let credential = self.acquire_credential(&provider).await?;
        self.login_reacquiring(credential, options, Some(&provider))
            .await
    }

    async fn login_reacquiring(
        &self,
        credential: Credential,
        options: LoginOptions,
        reacquire: Option<&Arc<dyn LoginProvider>>,
    ) -> Result<LoginDescriptor, UserError> {
        let _guard = self.write_lock().lock().await;

        let full_name = credential.full_name().map(ToString::to_string);
        let perform_migration = options.allow_migration.performs_migration();

        let descriptor = match self.backend().current_user() {
            None => {
                debug!("no session; signing in directly with {}", credential.provider());
                let user = self.backend().sign_in(&credential).await?;
                LoginDescriptor {
                    full_name: full_name.clone(),
                    perform_migration,
                    old_user_id: None,
                    new_user_id: user.id,
                }
            }
            Some(current) => {
                debug!(
                    "linking {} credential to current {} user",
                    credential.provider(),
                    if current.is_anonymous { "anonymous" } else { "authenticated" },
                );
                match self.backend().link(&credential).await {
                    Ok(user) => {
                        // The backend stays silent about successful links.
                        self.force_refresh();
                        LoginDescriptor {
                            full_name: full_name.clone(),
                            perform_migration,
                            old_user_id: None,
                            new_user_id: user.id,
                        }
                    }
                    Err(error)
                        if error.code == BackendErrorCode::EmailAlreadyInUse
                            && current.is_anonymous =>
                    {
                        // With email enumeration protection enabled, this is
                        // the only signal that the account already exists.
                        self.migrate(credential, &options, current.id, reacquire)
                            .await?
                    }
                    Err(error) => return Err(error.into()),
                }
            }
        };

        if options.update_display_name {
            if let Some(name) = descriptor
                .full_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
            {
                debug!("propagating display name to the user profile");
                self.backend().update_profile(Some(name)).await?;
                self.force_refresh();
            }
        }

        Ok(descriptor)
    }

    /// Discard the current anonymous user and sign in with the credential's
    /// existing account. Only called after a link attempt reported that the
    /// account exists.
    async fn migrate(
        &self,
        credential: Credential,
        options: &LoginOptions,
        old_user_id: Option<String>,
        reacquire: Option<&Arc<dyn LoginProvider>>,
    ) -> Result<LoginDescriptor, UserError> {
        if !options.allow_migration.is_decided() {
            // Fail early: a migration would be required, but the caller is
            // unprepared. The session is left untouched.
            debug!("account exists and migration is undecided; aborting");
            return Err(UserError::MigrationRequired(Box::new(credential)));
        }

        info!(
            "migrating anonymous user {:?} to an existing {} account",
            old_user_id,
            credential.provider(),
        );
        self.backend().delete_current_user().await?;

        // The failed link attempt consumed single-use credentials; those
        // must be re-acquired from the provider flow before signing in.
        let credential = if credential.is_reusable() {
            credential
        } else if let Some(provider) = reacquire {
            info!("re-acquiring a fresh {} credential", provider.name());
            self.acquire_credential(provider).await?
        } else {
            return Err(UserError::DuplicatedCredentials);
        };

        match self.backend().sign_in(&credential).await {
            Ok(user) => Ok(LoginDescriptor {
                full_name: credential.full_name().map(ToString::to_string),
                perform_migration: options.allow_migration.performs_migration(),
                old_user_id,
                new_user_id: user.id,
            }),
            Err(error) => {
                let cause = UserError::from(error);
                if !options.reset_to_anonymous_on_failure {
                    // The anonymous account is already gone; the caller
                    // asked for no safety net.
                    return Err(cause);
                }

                warn!("replacement sign-in failed after migration: {cause}");
                let anonymous = self.backend().sign_in_anonymously().await?;
                Err(UserError::AutomaticLinkingFailed {
                    descriptor: LoginDescriptor {
                        full_name: credential.full_name().map(ToString::to_string),
                        perform_migration: true,
                        old_user_id,
                        new_user_id: anonymous.id,
                    },
                    cause: Box::new(cause),
                })
            }
        }
    }
}
