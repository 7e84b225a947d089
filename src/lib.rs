#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

//! authlink - reactive account reconciliation over an identity backend
//!
//! This crate wraps an identity backend behind the [`AuthBackend`] trait and
//! layers a [`UserManager`] on top that handles the annoying part of
//! anonymous-first sign-in: reconciling a device-local anonymous account with
//! a permanent one when the user finally authenticates. Sign-ins either
//! upgrade the anonymous account in place or migrate to the existing account,
//! under an explicit caller [`MigrationAllowance`].
//!
//! Identity changes are published on a broadcast feed (see
//! [`UserManager::subscribe`]), including the changes the backend itself does
//! not announce.

pub mod backend;
pub mod errors;
pub mod manager;
pub mod models;
pub mod providers;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::{AuthBackend, BackendError, BackendErrorCode};
pub use errors::UserError;
pub use manager::{LoginOptions, UserManager};
pub use models::{Credential, LoginDescriptor, MigrationAllowance, Provider, UserData};
pub use providers::{AppleSignIn, GoogleSignIn, LoginProvider};
pub use settings::AuthlinkSettings;

/// Crate version, as baked in at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
