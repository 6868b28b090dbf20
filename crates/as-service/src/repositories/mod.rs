//! Storage and registry layer.
//!
//! - `access_tokens` - Postgres token store
//! - `clients` - Static client registry
//! - `key_registry` - Trusted assertion issuer keys
//! - `token_store` - Token store contract and in-memory implementation

pub mod access_tokens;
pub mod clients;
pub mod key_registry;
pub mod token_store;

pub use access_tokens::PgTokenStore;
pub use clients::ClientRegistry;
pub use key_registry::{KeyRegistry, StaticKeyRegistry};
pub use token_store::{MemoryTokenStore, TokenStore};
