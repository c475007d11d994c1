//! The `voted` cookie.
//!
//! Value format is `<voterId>-<epoch>`. Only the epoch suffix is ever
//! compared: a cookie blocks voting exactly when its suffix equals the
//! current epoch, whatever voter id precedes it.

use std::fmt;

use crate::types::{VoteEpoch, VoterId};

/// Default cookie name.
pub const VOTE_COOKIE: &str = "voted";

/// Default lifetime of an issued cookie.
pub const DEFAULT_MAX_AGE_DAYS: u64 = 365;

/// A vote cookie about to be issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteCookie {
    pub voter_id: VoterId,
    pub epoch: VoteEpoch,
}

impl VoteCookie {
    pub fn new(voter_id: VoterId, epoch: VoteEpoch) -> Self {
        Self { voter_id, epoch }
    }

    /// Full `Set-Cookie` header value.
    pub fn set_cookie_header(&self, name: &str, max_age_days: u64) -> String {
        format!(
            "{name}={self}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
            max_age_days.saturating_mul(24 * 60 * 60)
        )
    }
}

impl fmt::Display for VoteCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.voter_id, self.epoch)
    }
}

/// Whether a presented cookie value marks the visitor as having voted in `epoch`.
pub fn blocks_voting(value: &str, epoch: VoteEpoch) -> bool {
    value
        .rsplit_once('-')
        .is_some_and(|(_, suffix)| suffix == epoch.to_string())
}

/// Find cookie `name` across one or more `Cookie` header values.
pub fn find_cookie<'a, I>(headers: I, name: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    headers
        .into_iter()
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"'))
}
