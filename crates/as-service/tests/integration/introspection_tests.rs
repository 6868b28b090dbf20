//! Integration tests for token introspection (RFC 7662)
//!
//! Two issuers, A and B, each registered as a public client. Tokens issued
//! to one client are introspected with a token of the other.

use as_service::models::RegistryDocument;
use as_test_utils::*;
use reqwest::StatusCode;
use serde_json::Value;

struct TwoClients {
    server: TestAuthServer,
    token_a: String,
    token_b: String,
}

fn two_issuer_registry(key_a: &TestKeyPair, key_b: &TestKeyPair) -> RegistryDocument {
    RegistryBuilder::new()
        .public_client(TEST_ISSUER_A)
        .public_client(TEST_ISSUER_B)
        .trusted_key(key_a.trusted_key_entry(TEST_ISSUER_A, TEST_KEY_ID_A))
        .trusted_key(key_b.trusted_key_entry(TEST_ISSUER_B, TEST_KEY_ID_B))
        .build()
}

async fn two_clients() -> Result<TwoClients, anyhow::Error> {
    let key_a = test_ed25519_key(1)?;
    let key_b = test_ed25519_key(2)?;
    let server = TestAuthServer::spawn(two_issuer_registry(&key_a, &key_b)).await?;

    let token_a = server
        .issue_token(
            &AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key_a),
            Some(TEST_SCOPE),
        )
        .await?;
    let token_b = server
        .issue_token(
            &AssertionBuilder::new(TEST_ISSUER_B, TEST_KEY_ID_B).sign(&key_b),
            Some(TEST_SCOPE),
        )
        .await?;

    Ok(TwoClients {
        server,
        token_a,
        token_b,
    })
}

#[tokio::test]
async fn test_introspect_active_token() -> Result<(), anyhow::Error> {
    // Arrange
    let ctx = two_clients().await?;

    // Act
    let response = ctx
        .server
        .introspect(&ctx.token_b, &ctx.token_a, Some(TEST_SCOPE))
        .await?;

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
    body.assert_active().assert_scope_contains(TEST_SCOPE);
    assert_eq!(body["client_id"], TEST_ISSUER_A);
    assert_eq!(body["sub"], TEST_SUBJECT);
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["iss"], TEST_TOKEN_URL);
    assert_eq!(body["aud"], serde_json::json!(TEST_AUDIENCES));

    let exp = body["exp"].as_i64().unwrap_or_default();
    let iat = body["iat"].as_i64().unwrap_or_default();
    assert_eq!(exp - iat, 3600);

    Ok(())
}

#[tokio::test]
async fn test_introspect_without_scope_filter() -> Result<(), anyhow::Error> {
    let ctx = two_clients().await?;

    let body: Value = ctx
        .server
        .introspect(&ctx.token_b, &ctx.token_a, None)
        .await?
        .json()
        .await?;

    body.assert_active();

    Ok(())
}

#[tokio::test]
async fn test_introspect_with_unrelated_scope_is_inactive() -> Result<(), anyhow::Error> {
    let ctx = two_clients().await?;

    let response = ctx
        .server
        .introspect(&ctx.token_b, &ctx.token_a, Some("foo"))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    body.assert_inactive();

    Ok(())
}

#[tokio::test]
async fn test_introspect_unknown_token_is_inactive() -> Result<(), anyhow::Error> {
    let ctx = two_clients().await?;

    let body: Value = ctx
        .server
        .introspect(&ctx.token_b, "never-issued", None)
        .await?
        .json()
        .await?;

    body.assert_inactive();

    Ok(())
}

#[tokio::test]
async fn test_self_introspection_is_unauthorized() -> Result<(), anyhow::Error> {
    let ctx = two_clients().await?;

    let response = ctx
        .server
        .introspect(&ctx.token_a, &ctx.token_a, None)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "invalid_token");

    Ok(())
}

#[tokio::test]
async fn test_same_client_introspection_is_unauthorized() -> Result<(), anyhow::Error> {
    // A second token of client A may not introspect the first.
    let key_a = test_ed25519_key(1)?;
    let key_b = test_ed25519_key(2)?;
    let server = TestAuthServer::spawn(two_issuer_registry(&key_a, &key_b)).await?;
    let first = server
        .issue_token(
            &AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key_a),
            None,
        )
        .await?;
    let second = server
        .issue_token(
            &AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key_a),
            None,
        )
        .await?;

    let response = server.introspect(&second, &first, None).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_introspect_without_bearer_is_unauthorized() -> Result<(), anyhow::Error> {
    let ctx = two_clients().await?;

    let response = ctx
        .server
        .client()
        .post(format!("{}/oauth2/introspect", ctx.server.url()))
        .form(&[("token", ctx.token_a.as_str())])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response
        .headers()
        .get("www-authenticate")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(challenge.starts_with("Bearer"));

    Ok(())
}

#[tokio::test]
async fn test_introspect_with_unknown_caller_is_unauthorized() -> Result<(), anyhow::Error> {
    let ctx = two_clients().await?;

    let response = ctx
        .server
        .introspect("not-a-token", &ctx.token_a, None)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_introspect_missing_token_parameter() -> Result<(), anyhow::Error> {
    let ctx = two_clients().await?;

    let response = ctx
        .server
        .client()
        .post(format!("{}/oauth2/introspect", ctx.server.url()))
        .bearer_auth(&ctx.token_b)
        .form(&[("scope", TEST_SCOPE)])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "invalid_request");

    Ok(())
}

#[tokio::test]
async fn test_audience_overlap_boundary_still_requires_distinct_clients() -> Result<(), anyhow::Error> {
    let key_a = test_ed25519_key(1)?;
    let key_b = test_ed25519_key(2)?;
    let mut config = TestAuthServer::test_config();
    config.require_audience_overlap = true;
    let server =
        TestAuthServer::spawn_with_config(config, two_issuer_registry(&key_a, &key_b)).await?;

    let token_a = server
        .issue_token(
            &AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A)
                .audience(&[TEST_TOKEN_URL, "https://resource-a.example"])
                .sign(&key_a),
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
            &AssertionBuilder::new(TEST_ISSUER_B, TEST_KEY_ID_B)
                .audience(&[TEST_TOKEN_URL, "https://resource-b.example"])
                .sign(&key_b),
            None,
        )
        .await?;

    // Every assertion names the token endpoint, so the audiences overlap there.
    let response = server.introspect(&token_b, &token_a, None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    body.assert_active();

    let response = server.introspect(&other_a, &token_a, None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
