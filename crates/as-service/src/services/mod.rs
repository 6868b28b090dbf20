//! Business logic layer.
//!
//! - `assertion_validator` - JWT bearer assertion verification
//! - `authorization_boundary` - Who may introspect which token
//! - `client_service` - Client authentication on token requests
//! - `grant_service` - Access token issuance
//! - `introspection_service` - RFC 7662 introspection
//! - `key_management_service` - Access token signing key and JWKS
//! - `revocation_service` - RFC 7009 revocation

pub mod assertion_validator;
pub mod authorization_boundary;
pub mod client_service;
pub mod grant_service;
pub mod introspection_service;
pub mod key_management_service;
pub mod revocation_service;
