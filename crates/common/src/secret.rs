//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Use these types for
//! every value that grants access on its own: bearer tokens, signed assertions,
//! client secrets and private key material.
//!
//! `SecretBox<T>` and `SecretString` implement `Debug` with redaction, so a
//! struct that derives `Debug` while holding a secret still logs safely.
//! Secrets are zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct IntrospectionCall {
//!     caller_token: SecretString,
//!     target_token: SecretString,
//! }
//!
//! let call = IntrospectionCall {
//!     caller_token: SecretString::from("caller-secret-value"),
//!     target_token: SecretString::from("target"),
//! };
//!
//! assert!(!format!("{call:?}").contains("caller-secret-value"));
//! assert_eq!(call.target_token.expose_secret(), "target");
//! ```
//!
//! # Usage Guidelines
//!
//! Use `SecretString` for:
//! - Access tokens presented as bearer credentials
//! - JWT bearer assertions
//! - OAuth client secrets
//! - Base64-encoded signing keys loaded from the environment
//!
//! Use `SecretBox<Vec<u8>>` for decoded private key material.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
