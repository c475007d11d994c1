//! bookvote-state — embedded state store for the book ballot.
//!
//! Backed by [redb](https://docs.rs/redb). Holds the Book Store, the Vote
//! Store and the Vote Epoch in one database file, so every mutation is a
//! single ACID write transaction instead of a whole-file rewrite.
//!
//! Values are JSON-serialized into redb's `&[u8]` value columns. A value
//! that no longer deserializes is treated as corruption: the owning table
//! is cleared and the load returns an empty collection.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across request handlers.

pub mod error;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use store::StateStore;
