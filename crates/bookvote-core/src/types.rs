//! Shared types used across bookvote crates.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Monotonic counter tagging every issued vote cookie.
pub type VoteEpoch = u64;

/// Epoch a fresh ballot starts at.
pub const INITIAL_EPOCH: VoteEpoch = 1;

/// A book on the ballot. The title doubles as the join key against votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    /// URL or path of the cover image; empty when none was given.
    #[serde(default)]
    pub cover: String,
}

impl Book {
    pub fn new(title: impl Into<String>, author: impl Into<String>, cover: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            cover: cover.into(),
        }
    }
}

/// One voter's submission: book title to points, kept exactly as submitted.
///
/// Values are usually number-like strings from a form post but may be any
/// JSON value; the tally engine decides what counts.
pub type Allocation = BTreeMap<String, serde_json::Value>;

/// All stored submissions keyed by voter id.
pub type VoteBook = BTreeMap<String, Allocation>;

/// Opaque identifier handed to a voter inside the vote cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterId(String);

impl VoterId {
    /// Draw 16 bytes from the operating system CSPRNG.
    pub fn generate() -> Result<Self, getrandom::Error> {
        let mut buf = [0u8; 16];
        getrandom::getrandom(&mut buf)?;
        Ok(Self(hex::encode(buf)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VoterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for VoterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
