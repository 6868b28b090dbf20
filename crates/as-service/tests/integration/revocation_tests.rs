//! Integration tests for token revocation (RFC 7009)

use as_service::models::RegistryDocument;
use as_test_utils::*;
use reqwest::StatusCode;
use serde_json::Value;

fn two_issuer_registry(key_a: &TestKeyPair, key_b: &TestKeyPair) -> RegistryDocument {
    RegistryBuilder::new()
        .public_client(TEST_ISSUER_A)
        .public_client(TEST_ISSUER_B)
        .trusted_key(key_a.trusted_key_entry(TEST_ISSUER_A, TEST_KEY_ID_A))
        .trusted_key(key_b.trusted_key_entry(TEST_ISSUER_B, TEST_KEY_ID_B))
        .build()
}

#[tokio::test]
async fn test_revoked_token_introspects_inactive() -> Result<(), anyhow::Error> {
    // Arrange
    let key_a = test_ed25519_key(1)?;
    let key_b = test_ed25519_key(2)?;
    let server = TestAuthServer::spawn(two_issuer_registry(&key_a, &key_b)).await?;

    let assertion_a = || AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key_a);
    let target = server.issue_token(&assertion_a(), Some(TEST_SCOPE)).await?;
    let revoker = server.issue_token(&assertion_a(), Some(TEST_SCOPE)).await?;
    let observer = server
        .issue_token(
            &AssertionBuilder::new(TEST_ISSUER_B, TEST_KEY_ID_B).sign(&key_b),
            None,
        )
        .await?;

    let before: Value = server
        .introspect(&observer, &target, None)
        .await?
        .json()
        .await?;
    before.assert_active();

    // Act
    let response = server.revoke(&revoker, &target).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("no-store")
    );
    assert!(response.text().await?.is_empty());

    let after: Value = server
        .introspect(&observer, &target, None)
        .await?
        .json()
        .await?;
    after.assert_inactive();

    Ok(())
}

#[tokio::test]
async fn test_revoked_token_cannot_authenticate() -> Result<(), anyhow::Error> {
    let key_a = test_ed25519_key(1)?;
    let key_b = test_ed25519_key(2)?;
    let server = TestAuthServer::spawn(two_issuer_registry(&key_a, &key_b)).await?;

    let token_a = server
        .issue_token(
            &AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key_a),
            None,
        )
        .await?;
    let other_a = server
        .issue_token(
            &AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key_a),
            None,
        )
        .await?;
    let token_b = server
        .issue_token(
            &AssertionBuilder::new(TEST_ISSUER_B, TEST_KEY_ID_B).sign(&key_b),
            None,
        )
        .await?;

    let response = server.revoke(&other_a, &token_a).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = server.introspect(&token_a, &token_b, None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_revoke_unknown_token_succeeds() -> Result<(), anyhow::Error> {
    let key_a = test_ed25519_key(1)?;
    let key_b = test_ed25519_key(2)?;
    let server = TestAuthServer::spawn(two_issuer_registry(&key_a, &key_b)).await?;
    let caller = server
        .issue_token(
            &AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key_a),
            None,
        )
        .await?;

    let response = server.revoke(&caller, "never-issued").await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_revoke_token_of_other_client_is_refused() -> Result<(), anyhow::Error> {
    let key_a = test_ed25519_key(1)?;
    let key_b = test_ed25519_key(2)?;
    let server = TestAuthServer::spawn(two_issuer_registry(&key_a, &key_b)).await?;
    let token_a = server
        .issue_token(
            &AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key_a),
            None,
        )
        .await?;
    let token_b = server
        .issue_token(
            &AssertionBuilder::new(TEST_ISSUER_B, TEST_KEY_ID_B).sign(&key_b),
            None,
        )
        .await?;

    let response = server.revoke(&token_b, &token_a).await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "unauthorized_client");

    // Still usable by another client.
    let response = server.introspect(&token_b, &token_a, None).await?;
    let body: Value = response.json().await?;
    body.assert_active();

    Ok(())
}

#[tokio::test]
async fn test_revoke_without_bearer_is_unauthorized() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn(RegistryDocument::default()).await?;

    let response = server
        .client()
        .post(format!("{}/oauth2/revoke", server.url()))
        .form(&[("token", "anything")])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
