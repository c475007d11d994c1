//! bookvote-core — domain types and pure logic for the book ballot.
//!
//! Nothing in here touches the network or the database. The state store
//! and the web layer build on these types.

pub mod config;
pub mod cookie;
pub mod import;
pub mod secret;
pub mod tally;
pub mod types;

pub use config::BookvoteConfig;
pub use cookie::VoteCookie;
pub use secret::AdminSecret;
pub use tally::{Tally, tally};
pub use types::*;
