//! redb table definitions for the bookvote state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized).

use redb::TableDefinition;

/// Ballot books keyed by zero-padded import position, so key order is import order.
pub const BOOKS: TableDefinition<&str, &[u8]> = TableDefinition::new("books");

/// Vote allocations keyed by voter id.
pub const VOTES: TableDefinition<&str, &[u8]> = TableDefinition::new("votes");

/// Singleton values such as the vote epoch.
pub const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

/// `META` key holding the current vote epoch.
pub const VOTE_EPOCH_KEY: &str = "vote_epoch";

/// Key for the book at `position`.
pub fn book_key(position: usize) -> String {
    format!("{position:08}")
}
