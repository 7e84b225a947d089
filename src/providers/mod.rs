//! External sign-in provider flows
//!
//! A [`LoginProvider`] wraps whatever platform machinery produces a
//! credential for a federated provider: a browser redirect, a native system
//! sheet, a device-code prompt. The engine treats it as a black box that
//! yields one [`Credential`] asynchronously. The same provider instance also
//! serves as the re-acquisition path when a single-use credential is consumed
//! by a failed link attempt.
//!
//! Provider-specific helpers for assembling credentials from raw flow
//! artifacts live in [`google`] and [`apple`].

pub mod apple;
pub mod google;

use crate::errors::UserError;
use crate::models::Credential;
use async_trait::async_trait;
use url::Url;

pub use apple::{AppleSignIn, AppleTokens, SignInNonce};
pub use google::{GoogleSignIn, GoogleTokens};

/// An external flow that produces a credential, asynchronously, once.
///
/// Cancellation propagates by dropping the future returned by
/// [`sign_in`](LoginProvider::sign_in).
#[async_trait]
pub trait LoginProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Run the external flow and return the acquired credential.
    ///
    /// # Errors
    ///
    /// Returns the flow's failure, e.g. the user dismissed the sheet or the
    /// provider returned no usable email.
    async fn sign_in(&self) -> Result<Credential, UserError>;

    /// Offer a redirect URL to a suspended flow.
    ///
    /// Returns `true` when this provider consumed the URL. The default
    /// implementation handles nothing; providers driven by browser redirects
    /// override it.
    fn handle_url(&self, url: &Url) -> bool {
        let _ = url;
        false
    }
}
