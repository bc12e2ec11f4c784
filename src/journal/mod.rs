//! Journal backend capability
//!
//! The scan engine never reads journal files itself. It talks to a
//! [`Journal`] session obtained from a [`JournalSource`], installs equality
//! matches, seeks by cursor and walks entries forward. Match semantics are
//! those of the systemd journal library:
//!
//! - matches on the same field within one term are ORed
//! - matches on different fields within one term are ANDed
//! - [`Journal::add_disjunction`] starts a new term ORed with the previous ones
//! - [`Journal::add_conjunction`] starts a new group ANDed with the previous ones
//!
//! Sessions release their resources on drop.

pub mod export;
pub mod memory;
#[cfg(feature = "systemd")]
pub mod systemd;

pub use export::ExportSource;
pub use memory::{MemoryEntry, MemorySession, MemoryStore};

use crate::filter::Scope;
use std::fmt;
use thiserror::Error;

/// Opaque position token issued by the journal, addressing one entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Cursor(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of moving the read pointer forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The read pointer moved onto a new entry
    Entry,
    /// No further entries; the read pointer stays where it was
    End,
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("failed to {op}: {reason}")]
    Backend { op: &'static str, reason: String },

    #[error("cursor '{0}' is not known to this journal")]
    InvalidCursor(String),
}

impl JournalError {
    pub fn backend(op: &'static str, reason: impl Into<String>) -> Self {
        JournalError::Backend {
            op,
            reason: reason.into(),
        }
    }
}

/// An open, exclusively owned view of the journal
pub trait Journal {
    fn add_match(&mut self, field: &str, value: &str) -> Result<(), JournalError>;

    fn add_disjunction(&mut self) -> Result<(), JournalError>;

    fn add_conjunction(&mut self) -> Result<(), JournalError>;

    /// Limit returned field sizes to `bytes`; zero removes the limit
    fn set_data_threshold(&mut self, bytes: usize) -> Result<(), JournalError>;

    /// Position the session so that the next [`Journal::next`] lands on the
    /// entry addressed by `cursor`
    fn seek_cursor(&mut self, cursor: &Cursor) -> Result<(), JournalError>;

    /// Whether the current entry is the one addressed by `cursor`
    fn test_cursor(&mut self, cursor: &Cursor) -> Result<bool, JournalError>;

    fn next(&mut self) -> Result<Advance, JournalError>;

    /// Value of `name` in the current entry, if the entry carries it
    fn field(&mut self, name: &str) -> Result<Option<String>, JournalError>;

    /// Cursor of the current entry
    fn cursor(&mut self) -> Result<Cursor, JournalError>;
}

/// Something that can open journal sessions
pub trait JournalSource {
    type Session: Journal;

    fn open(&self, scope: Scope) -> Result<Self::Session, JournalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_display_is_raw_token() {
        let cursor = Cursor::new("s=abc;i=1f");
        assert_eq!(cursor.to_string(), "s=abc;i=1f");
        assert_eq!(cursor.as_str(), "s=abc;i=1f");
    }
}
