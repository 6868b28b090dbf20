//! Integration tests for the operational endpoints: health, JWKS and metrics.

use as_service::models::RegistryDocument;
use as_test_utils::TestAuthServer;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestAuthServer::spawn(RegistryDocument::default()).await?;

    // Act
    let response = reqwest::get(format!("{}/health", server.url())).await?;

    // Assert
    assert_eq!(
        response.status(),
        StatusCode::OK,
        "Health check should return 200 OK"
    );
    assert_eq!(response.text().await?, "OK", "Health check body should be 'OK'");

    Ok(())
}

#[tokio::test]
async fn test_jwks_publishes_signing_key() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn(RegistryDocument::default()).await?;

    let response = reqwest::get(format!("{}/.well-known/jwks.json", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let cache_control = response
        .headers()
        .get("cache-control")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cache_control.contains("max-age"));

    let jwks: Value = response.json().await?;
    let keys = jwks["keys"].as_array().cloned().unwrap_or_default();
    assert_eq!(keys.len(), 1, "Exactly one signing key is published");

    let jwk = keys.first().cloned().unwrap_or_default();
    assert_eq!(jwk["kty"], "OKP");
    assert_eq!(jwk["crv"], "Ed25519");
    assert_eq!(jwk["alg"], "EdDSA");
    assert_eq!(jwk["use"], "sig");
    assert!(jwk["kid"].is_string());
    assert!(jwk.get("d").is_none(), "Private key material must not leak");

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_served() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn(RegistryDocument::default()).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_not_found() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn(RegistryDocument::default()).await?;

    let response = reqwest::get(format!("{}/oauth2/authorize", server.url())).await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}
