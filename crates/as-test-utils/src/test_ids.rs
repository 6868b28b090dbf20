//! Fixed test identifiers for deterministic tests

/// Token endpoint URL the test server requires in every assertion `aud`.
pub const TEST_TOKEN_URL: &str = "https://auth.test/oauth2/token";

/// Audience carried by default test assertions.
pub const TEST_AUDIENCES: [&str; 2] = [TEST_TOKEN_URL, "https://resource.example"];

pub const TEST_SCOPE: &str = "read";
pub const TEST_SUBJECT: &str = "user-42";

// Issuers double as client IDs when client authentication is skipped.
pub const TEST_ISSUER_A: &str = "test-issuer-a";
pub const TEST_ISSUER_B: &str = "test-issuer-b";

// Assertion key IDs
pub const TEST_KEY_ID_A: &str = "issuer-a-key-1";
pub const TEST_KEY_ID_B: &str = "issuer-b-key-1";

// Confidential client
pub const TEST_CONFIDENTIAL_CLIENT: &str = "confidential-client";
pub const TEST_CLIENT_SECRET: &str = "test-secret-do-not-use-in-production";
