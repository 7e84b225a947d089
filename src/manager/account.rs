//! Profile updates, re-authentication, deletion, and password management

use super::UserManager;
use crate::backend::AuthBackend;
use crate::errors::UserError;
use crate::models::{Credential, UserData};
use crate::providers::LoginProvider;
use log::debug;
use std::sync::Arc;

impl<B: AuthBackend + 'static> UserManager<B> {
    /// Update the current user's profile from the given snapshot.
    ///
    /// Only the display name is written back; the other fields are owned by
    /// the backend.
    ///
    /// # Errors
    ///
    /// [`UserError::NoUser`] when nobody is signed in; otherwise the mapped
    /// backend failure.
    pub async fn update(&self, user: &UserData) -> Result<(), UserError> {
        let _guard = self.write_lock().lock().await;
        if self.backend().current_user().is_none() {
            return Err(UserError::NoUser);
        }

        self.backend()
            .update_profile(user.display_name.as_deref())
            .await?;
        // Profile changes do not fire a native change notification.
        self.force_refresh();
        Ok(())
    }

    /// Update the current user's profile through a closure over the current
    /// snapshot.
    ///
    /// # Errors
    ///
    /// [`UserError::NoUser`] when nobody is signed in; otherwise the mapped
    /// backend failure.
    pub async fn update_with<F>(&self, configure: F) -> Result<(), UserError>
    where
        F: FnOnce(UserData) -> UserData + Send,
    {
        let Some(current) = self.backend().current_user() else {
            return Err(UserError::NoUser);
        };
        self.update(&configure(current)).await
    }

    /// Change the current user's email address.
    ///
    /// # Errors
    ///
    /// [`UserError::NoUser`] when nobody is signed in;
    /// [`UserError::AuthenticationConfirmationRequired`] when the backend
    /// demands a recent sign-in; otherwise the mapped backend failure.
    pub async fn update_email(&self, new_email: &str) -> Result<(), UserError> {
        let _guard = self.write_lock().lock().await;
        if self.backend().current_user().is_none() {
            return Err(UserError::NoUser);
        }

        self.backend().update_email(new_email).await?;
        self.force_refresh();
        Ok(())
    }

    /// Ask the backend to verify the new email address before switching to
    /// it.
    ///
    /// A verification message is sent to `new_email`; the account only
    /// changes once the user confirms it, so no snapshot is published here.
    ///
    /// # Errors
    ///
    /// [`UserError::NoUser`] when nobody is signed in;
    /// [`UserError::InvalidEmail`] or [`UserError::EmailAlreadyInUse`] for a
    /// rejected address; otherwise the mapped backend failure.
    pub async fn verify_and_change_email(&self, new_email: &str) -> Result<(), UserError> {
        let _guard = self.write_lock().lock().await;
        if self.backend().current_user().is_none() {
            return Err(UserError::NoUser);
        }

        debug!("requesting email verification for an address change");
        self.backend().verify_before_update_email(new_email).await?;
        Ok(())
    }

    /// Set or update the current user's password.
    ///
    /// When a password provider is already linked, the password is updated
    /// in place. Otherwise a new password credential is linked using the
    /// user's existing email address, reusing the linking failure taxonomy.
    ///
    /// # Errors
    ///
    /// [`UserError::NoUser`] when nobody is signed in;
    /// [`UserError::InvalidEmail`] when setting a first password on a user
    /// without an email; otherwise the mapped backend failure.
    pub async fn update_password(&self, new_password: &str) -> Result<(), UserError> {
        let _guard = self.write_lock().lock().await;
        let Some(user) = self.backend().current_user() else {
            return Err(UserError::NoUser);
        };

        if user.has_password() {
            debug!("updating the existing password credential");
            self.backend().update_password(new_password).await?;
        } else {
            // Setting a first password is a link of a new credential.
            let Some(email) = user.email else {
                return Err(UserError::InvalidEmail);
            };
            debug!("linking a first password credential");
            self.backend()
                .link(&Credential::password(&email, new_password))
                .await?;
            self.force_refresh();
        }
        Ok(())
    }

    /// Re-assert that the current user owns the credential.
    ///
    /// The backend requires a recent confirmation before sensitive
    /// mutations such as [`delete_user`](Self::delete_user). Confirmation
    /// never creates, deletes, or links identities, and calling it multiple
    /// times is harmless.
    ///
    /// # Errors
    ///
    /// [`UserError::NoUser`] when nobody is signed in;
    /// [`UserError::WrongUser`] when the credential belongs to a different
    /// account; otherwise the mapped backend failure.
    pub async fn confirm_authentication(&self, credential: &Credential) -> Result<(), UserError> {
        if self.backend().current_user().is_none() {
            return Err(UserError::NoUser);
        }
        self.backend().reauthenticate(credential).await?;
        Ok(())
    }

    /// Acquire a credential from a provider flow and confirm authentication
    /// with it.
    ///
    /// # Errors
    ///
    /// The provider flow's failure, or any error from
    /// [`confirm_authentication`](Self::confirm_authentication).
    #[allow(clippy::needless_pass_by_value)] // The flow outlives the caller's reference
    pub async fn confirm_authentication_with_provider(
        &self,
        provider: Arc<dyn LoginProvider>,
    ) -> Result<(), UserError> {
        let credential = self.acquire_credential(&provider).await?;
        self.confirm_authentication(&credential).await
    }

    /// Delete the current user's account.
    ///
    /// With `reset_to_anonymous`, a fresh anonymous session is created right
    /// after, so the caller is never left without a session.
    ///
    /// # Errors
    ///
    /// [`UserError::NoUser`] when nobody is signed in;
    /// [`UserError::AuthenticationConfirmationRequired`] when the backend
    /// demands a recent sign-in before deletion; otherwise the mapped
    /// backend failure.
    pub async fn delete_user(&self, reset_to_anonymous: bool) -> Result<(), UserError> {
        let _guard = self.write_lock().lock().await;
        if self.backend().current_user().is_none() {
            return Err(UserError::NoUser);
        }

        debug!("deleting the current user (reset_to_anonymous: {reset_to_anonymous})");
        self.backend().delete_current_user().await?;
        if reset_to_anonymous {
            self.backend().sign_in_anonymously().await?;
        }
        Ok(())
    }
}
