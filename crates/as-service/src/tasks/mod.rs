pub mod token_purge;

pub use token_purge::start_token_purge;
