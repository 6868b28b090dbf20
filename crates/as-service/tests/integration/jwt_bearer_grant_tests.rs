//! Integration tests for the JWT bearer grant (RFC 7523)
//!
//! Every test runs a real server on a random port and talks to it over HTTP.

use as_service::config::MIN_BCRYPT_COST;
use as_service::crypto::hash_client_secret;
use as_service::models::{RegistryDocument, JWT_BEARER_GRANT_TYPE};
use as_test_utils::*;
use reqwest::StatusCode;
use serde_json::Value;

/// Registry trusting one Ed25519 key for issuer A, which is also a public client.
fn single_issuer_registry(key: &TestKeyPair) -> RegistryDocument {
    RegistryBuilder::new()
        .public_client(TEST_ISSUER_A)
        .trusted_key(key.trusted_key_entry(TEST_ISSUER_A, TEST_KEY_ID_A))
        .build()
}

async fn error_body(response: reqwest::Response) -> Result<(StatusCode, Value), anyhow::Error> {
    let status = response.status();
    let body: Value = response.json().await?;
    Ok((status, body))
}

// ============================================================================
// Successful grants
// ============================================================================

#[tokio::test]
async fn test_grant_issues_token() -> Result<(), anyhow::Error> {
    // Arrange
    let key = test_ed25519_key(1)?;
    let server = TestAuthServer::spawn(single_issuer_registry(&key)).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key);

    // Act
    let response = server.request_token(&assertion, Some(TEST_SCOPE)).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("no-store")
    );

    let body: Value = response.json().await?;
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 3600);
    assert_eq!(body["scope"], TEST_SCOPE);

    let token = body["access_token"]
        .as_str()
        .map(ToString::to_string)
        .unwrap_or_default();
    token
        .assert_valid_jwt()
        .assert_has_scope(TEST_SCOPE)
        .assert_for_subject(TEST_SUBJECT)
        .assert_for_client(TEST_ISSUER_A)
        .assert_has_audience(TEST_TOKEN_URL)
        .assert_expires_in(3600);

    assert_eq!(server.store().len().await, 1);

    Ok(())
}

#[tokio::test]
async fn test_grant_without_scope_grants_client_scopes() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(1)?;
    let server = TestAuthServer::spawn(single_issuer_registry(&key)).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key);

    let response = server.request_token(&assertion, None).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["scope"], TEST_SCOPE);

    Ok(())
}

#[tokio::test]
async fn test_grant_with_disallowed_scope_grants_nothing() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(1)?;
    let server = TestAuthServer::spawn(single_issuer_registry(&key)).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key);

    let response = server.request_token(&assertion, Some("admin")).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["scope"], "");

    Ok(())
}

#[tokio::test]
async fn test_grant_with_es256_assertion() -> Result<(), anyhow::Error> {
    let key = test_es256_key()?;
    let server = TestAuthServer::spawn(single_issuer_registry(&key)).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key);

    let response = server.request_token(&assertion, Some(TEST_SCOPE)).await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_grant_with_single_string_audience() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(1)?;
    let server = TestAuthServer::spawn(single_issuer_registry(&key)).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A)
        .single_audience(TEST_TOKEN_URL)
        .sign(&key);

    let token = server.issue_token(&assertion, Some(TEST_SCOPE)).await?;

    token.assert_has_audience(TEST_TOKEN_URL);

    Ok(())
}

#[tokio::test]
async fn test_issued_token_is_verifiable_with_jwks() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(1)?;
    let server = TestAuthServer::spawn(single_issuer_registry(&key)).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key);
    let token = server.issue_token(&assertion, Some(TEST_SCOPE)).await?;

    let jwks: Value = reqwest::get(format!("{}/.well-known/jwks.json", server.url()))
        .await?
        .json()
        .await?;

    let header = jsonwebtoken::decode_header(&token)?;
    let jwk = &jwks["keys"][0];
    assert_eq!(header.kid.as_deref(), jwk["kid"].as_str());
    token.assert_signed_by(jwk["kid"].as_str().unwrap_or_default());

    Ok(())
}

// ============================================================================
// Rejected assertions
// ============================================================================

#[tokio::test]
async fn test_grant_rejects_signature_from_other_key() -> Result<(), anyhow::Error> {
    let trusted = test_ed25519_key(1)?;
    let attacker = test_ed25519_key(2)?;
    let server = TestAuthServer::spawn(single_issuer_registry(&trusted)).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&attacker);

    let (status, body) = error_body(server.request_token(&assertion, None).await?).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_grant");
    assert_eq!(body["error_kind"], "signature_invalid");
    assert!(server.store().is_empty().await);

    Ok(())
}

#[tokio::test]
async fn test_grant_rejects_algorithm_mismatch() -> Result<(), anyhow::Error> {
    // Key ID is registered as Ed25519 but the assertion is signed with ES256.
    let trusted = test_ed25519_key(1)?;
    let other = test_es256_key()?;
    let server = TestAuthServer::spawn(single_issuer_registry(&trusted)).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&other);

    let (status, body) = error_body(server.request_token(&assertion, None).await?).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_grant");
    assert_eq!(body["error_kind"], "signature_invalid");

    Ok(())
}

#[tokio::test]
async fn test_grant_rejects_unknown_key_id() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(1)?;
    let server = TestAuthServer::spawn(single_issuer_registry(&key)).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, "no-such-key").sign(&key);

    let (status, body) = error_body(server.request_token(&assertion, None).await?).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_grant");
    assert_eq!(body["error_kind"], "signature_invalid");

    Ok(())
}

#[tokio::test]
async fn test_grant_rejects_missing_key_id() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(1)?;
    let server = TestAuthServer::spawn(single_issuer_registry(&key)).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A)
        .without_key_id()
        .sign(&key);

    let (status, body) = error_body(server.request_token(&assertion, None).await?).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_kind"], "signature_invalid");

    Ok(())
}

#[tokio::test]
async fn test_grant_rejects_expired_assertion() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(1)?;
    let server = TestAuthServer::spawn(single_issuer_registry(&key)).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A)
        .issued_in(-7200)
        .expires_in(-3600)
        .sign(&key);

    let (status, body) = error_body(server.request_token(&assertion, None).await?).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_grant");
    assert_eq!(body["error_kind"], "assertion_expired");

    Ok(())
}

#[tokio::test]
async fn test_grant_rejects_audience_without_token_url() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(1)?;
    let server = TestAuthServer::spawn(single_issuer_registry(&key)).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A)
        .audience(&["https://resource.example"])
        .sign(&key);

    let (status, body) = error_body(server.request_token(&assertion, None).await?).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_grant");
    assert_eq!(body["error_kind"], "invalid_assertion");

    Ok(())
}

#[tokio::test]
async fn test_grant_rejects_missing_subject() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(1)?;
    let server = TestAuthServer::spawn(single_issuer_registry(&key)).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A)
        .without_subject()
        .sign(&key);

    let (status, body) = error_body(server.request_token(&assertion, None).await?).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_grant");

    Ok(())
}

#[tokio::test]
async fn test_grant_rejects_replayed_assertion() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(1)?;
    let server = TestAuthServer::spawn(single_issuer_registry(&key)).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A)
        .jti("replay-me")
        .sign(&key);

    let first = server.request_token(&assertion, Some(TEST_SCOPE)).await?;
    assert_eq!(first.status(), StatusCode::OK);

    let (status, body) = error_body(server.request_token(&assertion, Some(TEST_SCOPE)).await?).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_grant");
    assert_eq!(server.store().len().await, 1);

    Ok(())
}

#[tokio::test]
async fn test_same_jti_from_different_issuers_is_not_a_replay() -> Result<(), anyhow::Error> {
    let key_a = test_ed25519_key(1)?;
    let key_b = test_ed25519_key(2)?;
    let registry = RegistryBuilder::new()
        .public_client(TEST_ISSUER_A)
        .public_client(TEST_ISSUER_B)
        .trusted_key(key_a.trusted_key_entry(TEST_ISSUER_A, TEST_KEY_ID_A))
        .trusted_key(key_b.trusted_key_entry(TEST_ISSUER_B, TEST_KEY_ID_B))
        .build();
    let server = TestAuthServer::spawn(registry).await?;

    let from_a = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A)
        .jti("shared-jti")
        .sign(&key_a);
    let from_b = AssertionBuilder::new(TEST_ISSUER_B, TEST_KEY_ID_B)
        .jti("shared-jti")
        .sign(&key_b);

    server.issue_token(&from_a, None).await?;
    server.issue_token(&from_b, None).await?;

    assert_eq!(server.store().len().await, 2);

    Ok(())
}

#[tokio::test]
async fn test_grant_rejects_garbage_assertion() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(1)?;
    let server = TestAuthServer::spawn(single_issuer_registry(&key)).await?;

    let (status, body) = error_body(server.request_token("not-a-jwt", None).await?).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_grant");

    Ok(())
}

// ============================================================================
// Malformed requests
// ============================================================================

#[tokio::test]
async fn test_unsupported_grant_type() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn(RegistryDocument::default()).await?;

    let response = server
        .client()
        .post(format!("{}/oauth2/token", server.url()))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;
    let (status, body) = error_body(response).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unsupported_grant_type");

    Ok(())
}

#[tokio::test]
async fn test_missing_assertion() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn(RegistryDocument::default()).await?;

    let response = server
        .client()
        .post(format!("{}/oauth2/token", server.url()))
        .form(&[("grant_type", JWT_BEARER_GRANT_TYPE)])
        .send()
        .await?;
    let (status, body) = error_body(response).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    Ok(())
}

#[tokio::test]
async fn test_missing_grant_type() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn(RegistryDocument::default()).await?;

    let response = server
        .client()
        .post(format!("{}/oauth2/token", server.url()))
        .form(&[("assertion", "a.b.c")])
        .send()
        .await?;
    let (status, body) = error_body(response).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    Ok(())
}

// ============================================================================
// Client authentication
// ============================================================================

#[tokio::test]
async fn test_unregistered_issuer_is_invalid_client() -> Result<(), anyhow::Error> {
    // The key is trusted but no client is registered under the issuer.
    let key = test_ed25519_key(1)?;
    let registry = RegistryBuilder::new()
        .trusted_key(key.trusted_key_entry(TEST_ISSUER_A, TEST_KEY_ID_A))
        .build();
    let server = TestAuthServer::spawn(registry).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key);

    let response = server.request_token(&assertion, None).await?;
    assert!(response.headers().contains_key("www-authenticate"));
    let (status, body) = error_body(response).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_client");

    Ok(())
}

#[tokio::test]
async fn test_client_auth_required_when_not_skipped() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(1)?;
    let mut config = TestAuthServer::test_config();
    config.skip_client_auth = false;
    let server = TestAuthServer::spawn_with_config(config, single_issuer_registry(&key)).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key);

    let (status, body) = error_body(server.request_token(&assertion, None).await?).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_client");

    Ok(())
}

#[tokio::test]
async fn test_confidential_client_with_basic_auth() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(1)?;
    let secret_hash = hash_client_secret(TEST_CLIENT_SECRET, MIN_BCRYPT_COST)?;
    let registry = RegistryBuilder::new()
        .confidential_client(TEST_CONFIDENTIAL_CLIENT, &secret_hash)
        .trusted_key(key.trusted_key_entry(TEST_ISSUER_A, TEST_KEY_ID_A))
        .build();
    let mut config = TestAuthServer::test_config();
    config.skip_client_auth = false;
    let server = TestAuthServer::spawn_with_config(config, registry).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key);

    let response = server
        .client()
        .post(format!("{}/oauth2/token", server.url()))
        .basic_auth(TEST_CONFIDENTIAL_CLIENT, Some(TEST_CLIENT_SECRET))
        .form(&[
            ("grant_type", JWT_BEARER_GRANT_TYPE),
            ("assertion", assertion.as_str()),
            ("scope", TEST_SCOPE),
        ])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    let token = body["access_token"]
        .as_str()
        .map(ToString::to_string)
        .unwrap_or_default();
    token
        .assert_for_client(TEST_CONFIDENTIAL_CLIENT)
        .assert_for_subject(TEST_SUBJECT);

    Ok(())
}

#[tokio::test]
async fn test_confidential_client_wrong_secret() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(1)?;
    let secret_hash = hash_client_secret(TEST_CLIENT_SECRET, MIN_BCRYPT_COST)?;
    let registry = RegistryBuilder::new()
        .confidential_client(TEST_CONFIDENTIAL_CLIENT, &secret_hash)
        .trusted_key(key.trusted_key_entry(TEST_ISSUER_A, TEST_KEY_ID_A))
        .build();
    let server = TestAuthServer::spawn(registry).await?;
    let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key);

    let response = server
        .client()
        .post(format!("{}/oauth2/token", server.url()))
        .form(&[
            ("grant_type", JWT_BEARER_GRANT_TYPE),
            ("assertion", assertion.as_str()),
            ("client_id", TEST_CONFIDENTIAL_CLIENT),
            ("client_secret", "wrong-secret"),
        ])
        .send()
        .await?;
    let (status, body) = error_body(response).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_client");
    assert!(server.store().is_empty().await);

    Ok(())
}
