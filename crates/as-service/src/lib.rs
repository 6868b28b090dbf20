//! Authorization Server (AS) Library
//!
//! Implements the OAuth 2.0 JWT Bearer grant (RFC 7523) and token
//! introspection (RFC 7662), plus revocation (RFC 7009) of the tokens it issues.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - Cryptographic operations (assertion verification, token signing)
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `middleware` - Bearer credential extraction
//! - `models` - Data models
//! - `observability` - Metrics and log correlation
//! - `repositories` - Key registry, client registry and token store
//! - `routes` - Router construction
//! - `services` - Business logic layer
//! - `tasks` - Background tasks

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod tasks;
