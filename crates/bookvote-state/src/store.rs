//! StateStore — redb-backed persistence for books, votes and the vote epoch.
//!
//! Books are replaced wholesale on import, votes accumulate one insert at a
//! time until a reset, and the epoch only ever moves forward. The store
//! supports both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{
    Database, DatabaseError, ReadableDatabase, ReadableTable, StorageError, TableDefinition,
    WriteTransaction,
};
use tracing::{debug, info, warn};

use bookvote_core::{Allocation, Book, INITIAL_EPOCH, VoteBook, VoteEpoch, VoterId};

use crate::error::{StateError, StateResult};
use crate::tables::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(open_error)?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Like [`StateStore::open`], but a file redb cannot read as a database
    /// is moved aside to `*.corrupt` and replaced by a fresh database.
    pub fn open_or_repair(path: &Path) -> StateResult<Self> {
        match Self::open(path) {
            Err(StateError::Corrupted(reason)) => {
                let quarantine = path.with_extension("redb.corrupt");
                warn!(?path, ?quarantine, %reason, "database corrupted, starting with empty state");
                std::fs::rename(path, &quarantine)?;
                Self::open(path)
            }
            other => other,
        }
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(BOOKS).map_err(map_err!(Table))?;
        txn.open_table(VOTES).map_err(map_err!(Table))?;
        txn.open_table(META).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Books ──────────────────────────────────────────────────────

    /// All books in import order. Empty when nothing was imported yet.
    ///
    /// A record that fails to deserialize empties the whole table.
    pub fn load_books(&self) -> StateResult<Vec<Book>> {
        let loaded: Result<Vec<Book>, serde_json::Error> = {
            let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
            let table = txn.open_table(BOOKS).map_err(map_err!(Table))?;
            let mut books = Vec::new();
            let mut failure = None;
            for entry in table.iter().map_err(map_err!(Read))? {
                let (_, value) = entry.map_err(map_err!(Read))?;
                match serde_json::from_slice(value.value()) {
                    Ok(book) => books.push(book),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            failure.map_or(Ok(books), Err)
        };

        match loaded {
            Ok(books) => Ok(books),
            Err(e) => {
                warn!(error = %e, "corrupt book record, resetting book store to empty");
                self.clear(BOOKS)?;
                Ok(Vec::new())
            }
        }
    }

    /// Replace the whole book list with `books`.
    pub fn save_books(&self, books: &[Book]) -> StateResult<()> {
        let encoded = books
            .iter()
            .map(serde_json::to_vec)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_err!(Serialize))?;

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        clear_table(&txn, BOOKS)?;
        {
            let mut table = txn.open_table(BOOKS).map_err(map_err!(Table))?;
            for (position, value) in encoded.iter().enumerate() {
                table
                    .insert(book_key(position).as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        info!(count = books.len(), "book store replaced");
        Ok(())
    }

    // ── Votes ──────────────────────────────────────────────────────

    /// Every stored allocation keyed by voter id.
    ///
    /// A record that fails to deserialize empties the whole table.
    pub fn load_votes(&self) -> StateResult<VoteBook> {
        let loaded: Result<VoteBook, serde_json::Error> = {
            let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
            let table = txn.open_table(VOTES).map_err(map_err!(Table))?;
            let mut votes = VoteBook::new();
            let mut failure = None;
            for entry in table.iter().map_err(map_err!(Read))? {
                let (key, value) = entry.map_err(map_err!(Read))?;
                match serde_json::from_slice::<Allocation>(value.value()) {
                    Ok(allocation) => {
                        votes.insert(key.value().to_string(), allocation);
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            failure.map_or(Ok(votes), Err)
        };

        match loaded {
            Ok(votes) => Ok(votes),
            Err(e) => {
                warn!(error = %e, "corrupt vote record, resetting vote store to empty");
                self.clear(VOTES)?;
                Ok(VoteBook::new())
            }
        }
    }

    /// Store one voter's allocation. Returns the epoch the vote was recorded in.
    pub fn record_vote(&self, voter: &VoterId, allocation: &Allocation) -> StateResult<VoteEpoch> {
        let value = serde_json::to_vec(allocation).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let epoch = read_epoch(&txn)?;
        {
            let mut table = txn.open_table(VOTES).map_err(map_err!(Table))?;
            table
                .insert(voter.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%voter, epoch, entries = allocation.len(), "vote recorded");
        Ok(epoch)
    }

    // ── Epoch ──────────────────────────────────────────────────────

    /// Current vote epoch; [`INITIAL_EPOCH`] until the first reset.
    pub fn vote_epoch(&self) -> StateResult<VoteEpoch> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(META).map_err(map_err!(Table))?;
        let epoch = table
            .get(VOTE_EPOCH_KEY)
            .map_err(map_err!(Read))?
            .map_or(INITIAL_EPOCH, |guard| decode_epoch(guard.value()));
        Ok(epoch)
    }

    /// Drop every vote and advance the epoch, atomically. Returns the new epoch.
    pub fn reset_votes(&self) -> StateResult<VoteEpoch> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let cleared = clear_table(&txn, VOTES)?;
        let epoch = read_epoch(&txn)?.saturating_add(1);
        {
            let mut table = txn.open_table(META).map_err(map_err!(Table))?;
            let value = serde_json::to_vec(&epoch).map_err(map_err!(Serialize))?;
            table
                .insert(VOTE_EPOCH_KEY, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        info!(cleared, epoch, "votes reset");
        Ok(epoch)
    }

    fn clear(&self, def: TableDefinition<&str, &[u8]>) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        clear_table(&txn, def)?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    #[cfg(test)]
    fn put_raw(&self, def: TableDefinition<&str, &[u8]>, key: &str, value: &[u8]) {
        let txn = self.db.begin_write().unwrap();
        {
            let mut table = txn.open_table(def).unwrap();
            table.insert(key, value).unwrap();
        }
        txn.commit().unwrap();
    }
}

/// Remove every row of `def` inside `txn`. Returns how many were removed.
fn clear_table(txn: &WriteTransaction, def: TableDefinition<&str, &[u8]>) -> StateResult<usize> {
    let mut table = txn.open_table(def).map_err(map_err!(Table))?;
    let keys: Vec<String> = table
        .iter()
        .map_err(map_err!(Read))?
        .filter_map(|entry| {
            let (key, _) = entry.ok()?;
            Some(key.value().to_string())
        })
        .collect();
    for key in &keys {
        table.remove(key.as_str()).map_err(map_err!(Write))?;
    }
    Ok(keys.len())
}

fn read_epoch(txn: &WriteTransaction) -> StateResult<VoteEpoch> {
    let table = txn.open_table(META).map_err(map_err!(Table))?;
    let epoch = table
        .get(VOTE_EPOCH_KEY)
        .map_err(map_err!(Read))?
        .map_or(INITIAL_EPOCH, |guard| decode_epoch(guard.value()));
    Ok(epoch)
}

fn decode_epoch(raw: &[u8]) -> VoteEpoch {
    serde_json::from_slice(raw).unwrap_or_else(|e| {
        warn!(error = %e, "corrupt vote epoch, falling back to {INITIAL_EPOCH}");
        INITIAL_EPOCH
    })
}

/// redb reports a file that is not a database as an `InvalidData` or
/// `UnexpectedEof` I/O error rather than as `Corrupted`.
fn open_error(e: DatabaseError) -> StateError {
    match e {
        DatabaseError::Storage(StorageError::Corrupted(reason)) => StateError::Corrupted(reason),
        DatabaseError::Storage(StorageError::Io(io))
            if matches!(
                io.kind(),
                std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof
            ) =>
        {
            StateError::Corrupted(io.to_string())
        }
        other => StateError::Open(other.to_string()),
    }
}
