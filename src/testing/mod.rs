//! Testing utilities for authlink
//!
//! This module provides an in-memory [`MockBackend`] that behaves like the
//! real identity backend closely enough to exercise every reconciliation
//! path, plus builders for seeding it with accounts and a scriptable
//! [`MockLoginProvider`] for provider-flow tests.
//!
//! Available in unit tests and, with the `testing` feature, to integration
//! tests and downstream crates.

pub mod builders;
pub mod mock;

pub use builders::{apple_credential, google_credential, MockAccountBuilder};
pub use mock::{MockAccount, MockBackend, MockLoginProvider};
