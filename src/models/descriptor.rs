//! Login result descriptor

/// The result of a completed login flow.
///
/// Created once per successful flow and never mutated. When
/// `perform_migration` is `true`, the caller should detach application data
/// from `old_user_id` and attach it to `new_user_id`; the engine only signals
/// that a migration is needed, it does not move data itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginDescriptor {
    /// Full user name inherited from the sign-in method, when available.
    pub full_name: Option<String>,
    /// Echoes the migration allowance the caller passed in.
    pub perform_migration: bool,
    /// The id of the anonymous account that was discarded, when one was.
    pub old_user_id: Option<String>,
    /// The id of the identity signed in as a result of the flow.
    pub new_user_id: Option<String>,
}
