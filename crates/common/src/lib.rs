//! Common utilities and types shared across the authorization server crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (size limits, header/claim peeking, time checks)
pub mod jwt;

/// Module for OAuth 2.0 scope and audience set handling
pub mod scope;
