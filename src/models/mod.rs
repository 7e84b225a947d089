//! Core data types shared across the crate
//!
//! This module provides the credential union, the identity session snapshot,
//! and the result descriptor returned by every login flow.

pub mod credential;
pub mod descriptor;
pub mod user;

pub use credential::{Credential, MigrationAllowance, Provider};
pub use descriptor::LoginDescriptor;
pub use user::UserData;
