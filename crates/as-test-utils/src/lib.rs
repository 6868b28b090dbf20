//! # AS Test Utilities
//!
//! Shared test utilities for the authorization server.
//!
//! This crate provides:
//! - Key fixtures (deterministic Ed25519, fresh ES256)
//! - Builders for signed assertions and registry documents
//! - Server test harness (TestAuthServer for E2E tests)
//! - Fixed test identifiers
//! - Custom assertions (TokenAssertions, IntrospectionAssertions)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use as_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let key = test_ed25519_key(1)?;
//!     let registry = RegistryBuilder::new()
//!         .public_client(TEST_ISSUER_A)
//!         .trusted_key(key.trusted_key_entry(TEST_ISSUER_A, TEST_KEY_ID_A))
//!         .build();
//!     let server = TestAuthServer::spawn(registry).await?;
//!
//!     let assertion = AssertionBuilder::new(TEST_ISSUER_A, TEST_KEY_ID_A).sign(&key);
//!     let token = server.issue_token(&assertion, Some(TEST_SCOPE)).await?;
//!
//!     token.assert_valid_jwt().assert_has_scope(TEST_SCOPE);
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod builders;
pub mod crypto_fixtures;
pub mod server_harness;
pub mod test_ids;

// Re-export commonly used items
pub use assertions::*;
pub use builders::*;
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use test_ids::*;
