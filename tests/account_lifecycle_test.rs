//! Integration tests for registration, profile updates, re-authentication,
//! deletion, and the identity feed

use authlink::testing::{google_credential, MockAccountBuilder, MockBackend};
use authlink::{
    Credential, LoginOptions, MigrationAllowance, Provider, UserData, UserError, UserManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const EMAIL: &str = "user@example.com";
const PASSWORD: &str = "correct horse";

fn manager_over(backend: MockBackend) -> (Arc<MockBackend>, UserManager<MockBackend>) {
    let backend = Arc::new(backend);
    let manager = UserManager::new(Arc::clone(&backend));
    (backend, manager)
}

async fn next_snapshot(feed: &mut broadcast::Receiver<Option<UserData>>) -> Option<UserData> {
    tokio::time::timeout(Duration::from_secs(1), feed.recv())
        .await
        .expect("feed should deliver within a second")
        .expect("feed should stay open")
}

#[tokio::test]
async fn test_register_creates_a_password_account() {
    let (backend, manager) = manager_over(MockBackend::new());

    manager.register(EMAIL, PASSWORD).await.expect("register");

    assert!(manager.is_logged_in());
    let account = backend.account(EMAIL).expect("account stored");
    assert!(account.providers.contains(&Provider::Password));
}

#[tokio::test]
async fn test_register_while_anonymous_upgrades_in_place() {
    let (_, manager) = manager_over(MockBackend::new());
    manager.login_anonymously().await.expect("anonymous login");
    let anonymous_id = manager.user().and_then(|user| user.id);

    manager.register(EMAIL, PASSWORD).await.expect("register");

    // Same identity, no longer anonymous.
    let user = manager.user().expect("still signed in");
    assert_eq!(user.id, anonymous_id);
    assert!(!user.is_anonymous);
    assert!(user.has_password());
}

#[tokio::test]
async fn test_register_rejects_weak_passwords() {
    let (_, manager) = manager_over(MockBackend::new());

    let error = manager
        .register(EMAIL, "short")
        .await
        .expect_err("weak password");

    match error {
        UserError::WeakPassword(reason) => assert!(reason.is_some()),
        other => panic!("expected WeakPassword, got {other:?}"),
    }
}

#[tokio::test]
async fn test_register_while_logged_in_is_rejected() {
    let (_, manager) = manager_over(MockBackend::new());
    manager.register(EMAIL, PASSWORD).await.expect("register");

    let error = manager
        .register("other@example.com", PASSWORD)
        .await
        .expect_err("already logged in");
    assert!(matches!(error, UserError::AlreadyLoggedIn));
}

#[tokio::test]
async fn test_anonymous_login_guards() {
    let (_, manager) = manager_over(MockBackend::new());

    manager.login_anonymously().await.expect("anonymous login");
    assert!(matches!(
        manager.login_anonymously().await,
        Err(UserError::AlreadyAnonymous)
    ));

    manager.register(EMAIL, PASSWORD).await.expect("register");
    assert!(matches!(
        manager.login_anonymously().await,
        Err(UserError::AlreadyLoggedIn)
    ));
}

#[tokio::test]
async fn test_concurrent_anonymous_logins_only_create_one_session() {
    let (backend, manager) = manager_over(MockBackend::new());
    backend.set_latency(Duration::from_millis(20));

    let outcomes = tokio::join!(manager.login_anonymously(), manager.login_anonymously());

    // Exactly one call wins; the other observes the session it created.
    let outcomes = [outcomes.0, outcomes.1];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(UserError::AlreadyAnonymous))));
    assert_eq!(
        manager.user().and_then(|user| user.id),
        Some("anon-1".to_string())
    );
}

#[tokio::test]
async fn test_concurrent_registrations_guard_under_the_lock() {
    let (backend, manager) = manager_over(MockBackend::new());
    backend.set_latency(Duration::from_millis(20));

    let outcomes = tokio::join!(
        manager.register(EMAIL, PASSWORD),
        manager.register(EMAIL, PASSWORD)
    );

    // The loser fails the logged-in guard, not the email-conflict check.
    let outcomes = [outcomes.0, outcomes.1];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(UserError::AlreadyLoggedIn))));
    assert_eq!(backend.account_count(), 1);
}

#[tokio::test]
async fn test_logout_can_reset_to_a_fresh_anonymous_session() {
    let (_, manager) = manager_over(MockBackend::new());
    manager.register(EMAIL, PASSWORD).await.expect("register");

    manager.logout(true).await.expect("logout");

    assert!(manager.is_anonymous());
    assert!(!manager.is_logged_in());
}

#[tokio::test]
async fn test_logout_reset_while_anonymous_is_rejected() {
    let (_, manager) = manager_over(MockBackend::new());
    manager.login_anonymously().await.expect("anonymous login");

    assert!(matches!(
        manager.logout(true).await,
        Err(UserError::AlreadyAnonymous)
    ));
    // A plain sign-out is still allowed.
    manager.logout(false).await.expect("plain logout");
    assert!(manager.user().is_none());
}

#[tokio::test]
async fn test_profile_update_is_published_on_the_feed() {
    let (_, manager) = manager_over(MockBackend::new());
    let mut feed = manager.subscribe();

    manager.register(EMAIL, PASSWORD).await.expect("register");
    let created = next_snapshot(&mut feed).await.expect("signed-in snapshot");
    assert_eq!(created.display_name, None);

    manager
        .update_with(|user| UserData {
            display_name: Some("Grace Hopper".to_string()),
            ..user
        })
        .await
        .expect("update");

    let updated = next_snapshot(&mut feed).await.expect("updated snapshot");
    assert_eq!(updated.display_name, Some("Grace Hopper".to_string()));
}

#[tokio::test]
async fn test_linking_an_anonymous_account_is_published_on_the_feed() {
    let (_, manager) = manager_over(MockBackend::new());
    let mut feed = manager.subscribe();

    manager.login_anonymously().await.expect("anonymous login");
    let anonymous = next_snapshot(&mut feed).await.expect("anonymous snapshot");
    assert!(anonymous.is_anonymous);

    manager
        .link_anonymous_account(EMAIL, PASSWORD)
        .await
        .expect("link");

    // The backend stays silent about links; the engine publishes anyway.
    let linked = next_snapshot(&mut feed).await.expect("linked snapshot");
    assert!(!linked.is_anonymous);
    assert_eq!(linked.id, anonymous.id);
    assert_eq!(linked.email, Some(EMAIL.to_string()));
}

#[tokio::test]
async fn test_signing_out_publishes_an_empty_snapshot() {
    let (_, manager) = manager_over(MockBackend::new());
    let mut feed = manager.subscribe();

    manager.register(EMAIL, PASSWORD).await.expect("register");
    assert!(next_snapshot(&mut feed).await.is_some());

    manager.logout(false).await.expect("logout");
    assert_eq!(next_snapshot(&mut feed).await, None);
}

#[tokio::test]
async fn test_update_email_rekeys_the_account() {
    let (_, manager) = manager_over(MockBackend::new());
    manager.register(EMAIL, PASSWORD).await.expect("register");

    manager
        .update_email("renamed@example.com")
        .await
        .expect("update email");

    assert!(!manager.account_exists(EMAIL).await.expect("lookup"));
    assert!(manager
        .account_exists("renamed@example.com")
        .await
        .expect("lookup"));
    assert_eq!(
        manager.user().and_then(|user| user.email),
        Some("renamed@example.com".to_string())
    );
}

#[tokio::test]
async fn test_verify_and_change_email_defers_the_switch() {
    let (backend, manager) = manager_over(MockBackend::new());
    manager.register(EMAIL, PASSWORD).await.expect("register");

    manager
        .verify_and_change_email("renamed@example.com")
        .await
        .expect("verification request");

    // The message went out, but the address only changes on confirmation.
    assert_eq!(
        backend.verification_emails(),
        vec!["renamed@example.com".to_string()]
    );
    assert_eq!(
        manager.user().and_then(|user| user.email),
        Some(EMAIL.to_string())
    );
    assert!(manager.account_exists(EMAIL).await.expect("lookup"));

    assert!(matches!(
        manager.verify_and_change_email("not-an-email").await,
        Err(UserError::InvalidEmail)
    ));
}

#[tokio::test]
async fn test_verify_and_change_email_requires_a_session() {
    let (_, manager) = manager_over(MockBackend::new());
    assert!(matches!(
        manager.verify_and_change_email("new@example.com").await,
        Err(UserError::NoUser)
    ));
}

#[tokio::test]
async fn test_update_password_replaces_an_existing_password() {
    let (backend, manager) = manager_over(MockBackend::new());
    manager.register(EMAIL, PASSWORD).await.expect("register");

    manager
        .update_password("a new password")
        .await
        .expect("update password");

    assert_eq!(
        backend.account(EMAIL).and_then(|account| account.password),
        Some("a new password".to_string())
    );
}

#[tokio::test]
async fn test_update_password_links_a_first_password_credential() {
    let backend = MockBackend::with_accounts(vec![MockAccountBuilder::new(EMAIL)
        .id("user-google")
        .provider(Provider::Google)
        .build()]);
    let (backend, manager) = manager_over(backend);
    manager
        .login(google_credential(EMAIL, None), LoginOptions::default())
        .await
        .expect("google login");
    assert!(!manager.user().expect("signed in").has_password());

    manager
        .update_password("a new password")
        .await
        .expect("set password");

    let account = backend.account(EMAIL).expect("account stored");
    assert!(account.providers.contains(&Provider::Password));
    assert_eq!(account.password, Some("a new password".to_string()));
    assert!(manager.user().expect("signed in").has_password());
}

#[tokio::test]
async fn test_update_without_session_is_rejected() {
    let (_, manager) = manager_over(MockBackend::new());

    assert!(matches!(
        manager.update_email("new@example.com").await,
        Err(UserError::NoUser)
    ));
    assert!(matches!(
        manager.update_password("a new password").await,
        Err(UserError::NoUser)
    ));
    assert!(matches!(
        manager.update_with(|user| user).await,
        Err(UserError::NoUser)
    ));
}

#[tokio::test]
async fn test_confirm_authentication_is_idempotent() {
    let (_, manager) = manager_over(MockBackend::new());
    manager.register(EMAIL, PASSWORD).await.expect("register");
    let before = manager.user().expect("signed in");

    let credential = Credential::password(EMAIL, PASSWORD);
    manager
        .confirm_authentication(&credential)
        .await
        .expect("first confirmation");
    manager
        .confirm_authentication(&credential)
        .await
        .expect("second confirmation");

    // Confirmation never creates, deletes, or links identities.
    let after = manager.user().expect("still signed in");
    assert_eq!(after.id, before.id);
    assert_eq!(after.providers, before.providers);
}

#[tokio::test]
async fn test_confirm_authentication_rejects_a_foreign_credential() {
    let backend = MockBackend::with_accounts(vec![MockAccountBuilder::new("other@example.com")
        .id("user-other")
        .password("other password")
        .build()]);
    let (_, manager) = manager_over(backend);
    manager.register(EMAIL, PASSWORD).await.expect("register");

    let error = manager
        .confirm_authentication(&Credential::password("other@example.com", "other password"))
        .await
        .expect_err("foreign credential");
    assert!(matches!(error, UserError::WrongUser));
}

#[tokio::test]
async fn test_deletion_demands_a_recent_authentication() {
    let (backend, manager) = manager_over(MockBackend::new());
    manager.register(EMAIL, PASSWORD).await.expect("register");
    backend.expire_recent_login();

    let error = manager
        .delete_user(false)
        .await
        .expect_err("stale session cannot delete");
    assert!(matches!(
        error,
        UserError::AuthenticationConfirmationRequired
    ));
    // The account and session survive the refusal.
    assert!(manager.is_logged_in());
    assert!(backend.account(EMAIL).is_some());

    manager
        .confirm_authentication(&Credential::password(EMAIL, PASSWORD))
        .await
        .expect("confirmation");
    manager.delete_user(true).await.expect("delete");

    assert!(backend.account(EMAIL).is_none());
    assert!(manager.is_anonymous());
}

#[tokio::test]
async fn test_account_exists_checks_sign_in_methods() {
    let (_, manager) = manager_over(seeded());

    assert!(manager.account_exists(EMAIL).await.expect("lookup"));
    assert!(!manager
        .account_exists("nobody@example.com")
        .await
        .expect("lookup"));
    assert!(matches!(
        manager.account_exists("not-an-email").await,
        Err(UserError::InvalidEmail)
    ));
}

#[tokio::test]
async fn test_access_token_follows_the_session() {
    let (_, manager) = manager_over(seeded());

    assert_eq!(manager.access_token().await.expect("token"), None);

    manager
        .login_with_email(EMAIL, PASSWORD, MigrationAllowance::Undecided)
        .await
        .expect("login");
    assert_eq!(
        manager.access_token().await.expect("token"),
        Some("token-user-1".to_string())
    );

    manager.logout(false).await.expect("logout");
    assert_eq!(manager.access_token().await.expect("token"), None);
}

fn seeded() -> MockBackend {
    MockBackend::with_accounts(vec![MockAccountBuilder::new(EMAIL)
        .id("user-1")
        .password(PASSWORD)
        .build()])
}
