//! Password-reset token lifecycle.

use chrono::TimeDelta;

use raving_reviews_catalog::ports::UserRepository;
use raving_reviews_catalog::{CatalogError, UnknownEmailPolicy};
use raving_reviews_integration_tests::{PASSWORD, TestContext, settings};

const NEW_PASSWORD: &str = "a much better password";

async fn requested(ctx: &TestContext, email: &str) -> String {
    ctx.catalog
        .password_reset()
        .request_password_reset(email)
        .await
        .expect("Failed to request reset");
    ctx.mailer.last_token().expect("reset mail sent")
}

// ============================================================================
// Request
// ============================================================================

#[tokio::test]
async fn test_request_mails_reset_link() {
    let ctx = TestContext::new();
    ctx.register("wes@example.com").await;

    let token = requested(&ctx, "Wes@Example.com").await;

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 1);
    let mail = sent.first().expect("one mail");
    assert_eq!(mail.to.to_string(), "wes@example.com");
    assert_eq!(mail.subject, "Password Reset");
    assert_eq!(
        mail.reset_url,
        format!("https://raving.example/account/reset/{token}")
    );
    assert_eq!(token.len(), 40);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn test_unknown_email_is_concealed_by_default() {
    let ctx = TestContext::new();

    ctx.catalog
        .password_reset()
        .request_password_reset("nobody@example.com")
        .await
        .expect("concealed");

    assert!(ctx.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_unknown_email_can_be_disclosed() {
    let mut settings = settings();
    settings.unknown_email_policy = UnknownEmailPolicy::Disclose;
    let ctx = TestContext::with_settings(settings);

    let err = ctx
        .catalog
        .password_reset()
        .request_password_reset("nobody@example.com")
        .await
        .expect_err("disclosed");

    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn test_malformed_email_is_rejected() {
    let ctx = TestContext::new();

    let err = ctx
        .catalog
        .password_reset()
        .request_password_reset("not an email")
        .await
        .expect_err("invalid email");

    assert!(err.validation().is_some_and(|v| v.has("email")));
}

#[tokio::test]
async fn test_mail_failure_leaves_token_usable() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;

    // Capture a token, then break the mailer for the next request.
    let first = requested(&ctx, "wes@example.com").await;
    ctx.mailer.set_failing(true);
    let err = ctx
        .catalog
        .password_reset()
        .request_password_reset("wes@example.com")
        .await
        .expect_err("mail fails");
    assert!(matches!(err, CatalogError::Delivery(_)));

    // The failed request replaced the first token with one that was stored
    // but never mailed.
    let reset = ctx.catalog.password_reset();
    assert!(matches!(
        reset.validate_reset_token(&first).await,
        Err(CatalogError::InvalidOrExpired)
    ));
    let stored = UserRepository::get(ctx.backend.as_ref(), user.id)
        .await
        .expect("lookup")
        .and_then(|u| u.pending_reset)
        .expect("token stored");
    assert!(reset.validate_reset_token(&stored.token).await.is_ok());
}

#[tokio::test]
async fn test_new_request_supersedes_old_token() {
    let ctx = TestContext::new();
    ctx.register("wes@example.com").await;

    let first = requested(&ctx, "wes@example.com").await;
    let second = requested(&ctx, "wes@example.com").await;

    assert_ne!(first, second);
    let reset = ctx.catalog.password_reset();
    assert!(reset.validate_reset_token(&first).await.is_err());
    assert!(reset.validate_reset_token(&second).await.is_ok());
}

// ============================================================================
// Expiry
// ============================================================================

#[tokio::test]
async fn test_token_expires_after_an_hour() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    let token = requested(&ctx, "wes@example.com").await;
    let reset = ctx.catalog.password_reset();

    ctx.clock.advance_seconds(3599);
    let holder = reset.validate_reset_token(&token).await.expect("still valid");
    assert_eq!(holder.id, user.id);

    ctx.clock.advance_seconds(1);
    assert!(matches!(
        reset.validate_reset_token(&token).await,
        Err(CatalogError::InvalidOrExpired)
    ));
    let err = reset
        .consume_reset_token(&token, NEW_PASSWORD, NEW_PASSWORD)
        .await
        .expect_err("expired");
    assert!(matches!(err, CatalogError::InvalidOrExpired));
}

#[tokio::test]
async fn test_overflowing_lifetime_is_a_config_error() {
    let mut settings = settings();
    // Long enough to push the expiry past the last representable year.
    settings.reset_token_ttl = TimeDelta::try_days(100_000_000).expect("fits in TimeDelta");
    let ctx = TestContext::with_settings(settings);
    let user = ctx.register("wes@example.com").await;

    let err = ctx
        .catalog
        .password_reset()
        .request_password_reset("wes@example.com")
        .await
        .expect_err("expiry overflows");

    assert!(matches!(err, CatalogError::Config(_)));
    assert!(ctx.mailer.sent().is_empty());
    let stored = UserRepository::get(ctx.backend.as_ref(), user.id)
        .await
        .expect("lookup")
        .expect("user exists");
    assert!(stored.pending_reset.is_none());
}

// ============================================================================
// Consume
// ============================================================================

#[tokio::test]
async fn test_consume_changes_password_and_logs_in() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    let token = requested(&ctx, "wes@example.com").await;

    let session = ctx
        .catalog
        .password_reset()
        .consume_reset_token(&token, NEW_PASSWORD, NEW_PASSWORD)
        .await
        .expect("consume");

    assert_eq!(session.id, user.id);
    assert_eq!(ctx.sessions.issued().len(), 1);

    let accounts = ctx.catalog.accounts();
    assert!(accounts.authenticate("wes@example.com", NEW_PASSWORD).await.is_ok());
    assert!(matches!(
        accounts.authenticate("wes@example.com", PASSWORD).await,
        Err(CatalogError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_token_works_exactly_once() {
    let ctx = TestContext::new();
    ctx.register("wes@example.com").await;
    let token = requested(&ctx, "wes@example.com").await;
    let reset = ctx.catalog.password_reset();

    reset
        .consume_reset_token(&token, NEW_PASSWORD, NEW_PASSWORD)
        .await
        .expect("first use");
    let err = reset
        .consume_reset_token(&token, "yet another password", "yet another password")
        .await
        .expect_err("second use");

    assert!(matches!(err, CatalogError::InvalidOrExpired));
    assert!(
        ctx.catalog
            .accounts()
            .authenticate("wes@example.com", NEW_PASSWORD)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_concurrent_consumes_succeed_once() {
    let ctx = TestContext::new();
    ctx.register("wes@example.com").await;
    let token = requested(&ctx, "wes@example.com").await;
    let reset = ctx.catalog.password_reset();

    let (a, b) = tokio::join!(
        reset.consume_reset_token(&token, NEW_PASSWORD, NEW_PASSWORD),
        reset.consume_reset_token(&token, NEW_PASSWORD, NEW_PASSWORD),
    );

    assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
}

#[tokio::test]
async fn test_mismatched_passwords_keep_token() {
    let ctx = TestContext::new();
    ctx.register("wes@example.com").await;
    let token = requested(&ctx, "wes@example.com").await;
    let reset = ctx.catalog.password_reset();

    let err = reset
        .consume_reset_token(&token, NEW_PASSWORD, "something else entirely")
        .await
        .expect_err("mismatch");
    assert!(err.validation().is_some_and(|v| v.has("password-confirm")));

    assert!(reset.validate_reset_token(&token).await.is_ok());
}

#[tokio::test]
async fn test_session_failure_still_consumes_token() {
    let ctx = TestContext::new();
    ctx.register("wes@example.com").await;
    let token = requested(&ctx, "wes@example.com").await;
    ctx.sessions.set_failing(true);

    let err = ctx
        .catalog
        .password_reset()
        .consume_reset_token(&token, NEW_PASSWORD, NEW_PASSWORD)
        .await
        .expect_err("session fails");

    assert!(matches!(err, CatalogError::Session(_)));
    assert!(
        ctx.catalog
            .password_reset()
            .validate_reset_token(&token)
            .await
            .is_err()
    );
    assert!(
        ctx.catalog
            .accounts()
            .authenticate("wes@example.com", NEW_PASSWORD)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_unknown_token_is_invalid() {
    let ctx = TestContext::new();

    let err = ctx
        .catalog
        .password_reset()
        .validate_reset_token("deadbeef")
        .await
        .expect_err("unknown token");

    assert!(matches!(err, CatalogError::InvalidOrExpired));
}
