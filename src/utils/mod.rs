//! Small shared utilities

pub mod crypto;
