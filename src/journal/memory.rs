use super::{Advance, Cursor, Journal, JournalError, JournalSource};
use crate::filter::Scope;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Field size limit applied by a fresh session, matching the journal library
pub const DEFAULT_DATA_THRESHOLD: usize = 64 * 1024;

/// One stored journal record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEntry {
    cursor: Cursor,
    fields: BTreeMap<String, String>,
}

impl MemoryEntry {
    pub fn new(cursor: Cursor) -> Self {
        Self {
            cursor,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// An in-process journal: an ordered list of entries plus a store id that
/// makes its cursors meaningless to any other store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    id: String,
    entries: Vec<MemoryEntry>,
    open_sessions: Rc<Cell<usize>>,
    last_scope: Cell<Option<Scope>>,
}

impl MemoryStore {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn from_entries(id: impl Into<String>, entries: Vec<MemoryEntry>) -> Self {
        Self {
            entries,
            ..Self::new(id)
        }
    }

    /// Append an entry, issuing the next cursor of this store
    pub fn append<'a>(&mut self, fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Cursor {
        let cursor = Cursor::new(format!("s={};i={:x}", self.id, self.entries.len() + 1));
        let entry = fields
            .into_iter()
            .fold(MemoryEntry::new(cursor.clone()), |entry, (name, value)| {
                entry.with_field(name, value)
            });
        self.entries.push(entry);
        cursor
    }

    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    /// Sessions opened from this store that have not been dropped yet
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.get()
    }

    /// Scope passed to the most recent `open`
    pub fn last_scope(&self) -> Option<Scope> {
        self.last_scope.get()
    }
}

impl JournalSource for MemoryStore {
    type Session = MemorySession;

    fn open(&self, scope: Scope) -> Result<MemorySession, JournalError> {
        self.last_scope.set(Some(scope));
        self.open_sessions.set(self.open_sessions.get() + 1);
        Ok(MemorySession {
            entries: self.entries.clone(),
            matches: MatchTree::default(),
            position: Position::Head,
            data_threshold: DEFAULT_DATA_THRESHOLD,
            open_sessions: Rc::clone(&self.open_sessions),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Head,
    /// Seeked; the next advance lands on the first matching entry at or after this index
    Before(usize),
    At(usize),
}

type Term = BTreeMap<String, Vec<String>>;

/// Installed matches: AND over groups, OR over the terms of a group, AND
/// across fields of a term, OR across values of one field.
#[derive(Debug, Default)]
struct MatchTree {
    groups: Vec<Vec<Term>>,
}

impl MatchTree {
    fn add_match(&mut self, field: &str, value: &str) {
        if self.groups.is_empty() {
            self.groups.push(Vec::new());
        }
        let last = self.groups.len() - 1;
        let group = &mut self.groups[last];
        if group.is_empty() {
            group.push(Term::new());
        }
        let term = group.len() - 1;
        group[term]
            .entry(field.to_string())
            .or_default()
            .push(value.to_string());
    }

    fn add_disjunction(&mut self) {
        if let Some(group) = self.groups.last_mut()
            && group.last().is_some_and(|term| !term.is_empty())
        {
            group.push(Term::new());
        }
    }

    fn add_conjunction(&mut self) {
        if self
            .groups
            .last()
            .is_some_and(|group| group.iter().any(|term| !term.is_empty()))
        {
            self.groups.push(Vec::new());
        }
    }

    fn matches(&self, entry: &MemoryEntry) -> bool {
        self.groups.iter().all(|group| {
            let mut terms = group.iter().filter(|term| !term.is_empty()).peekable();
            terms.peek().is_none()
                || terms.any(|term| {
                    term.iter().all(|(field, values)| {
                        entry
                            .get(field)
                            .is_some_and(|actual| values.iter().any(|v| v == actual))
                    })
                })
        })
    }
}

/// A session over a snapshot of a [`MemoryStore`]
#[derive(Debug)]
pub struct MemorySession {
    entries: Vec<MemoryEntry>,
    matches: MatchTree,
    position: Position,
    data_threshold: usize,
    open_sessions: Rc<Cell<usize>>,
}

impl MemorySession {
    fn current(&self, op: &'static str) -> Result<&MemoryEntry, JournalError> {
        match self.position {
            Position::At(idx) => Ok(&self.entries[idx]),
            _ => Err(JournalError::backend(
                op,
                "the read pointer is not positioned at a valid entry",
            )),
        }
    }
}

impl Journal for MemorySession {
    fn add_match(&mut self, field: &str, value: &str) -> Result<(), JournalError> {
        if field.is_empty() {
            return Err(JournalError::backend("add match", "field name is empty"));
        }
        self.matches.add_match(field, value);
        Ok(())
    }

    fn add_disjunction(&mut self) -> Result<(), JournalError> {
        self.matches.add_disjunction();
        Ok(())
    }

    fn add_conjunction(&mut self) -> Result<(), JournalError> {
        self.matches.add_conjunction();
        Ok(())
    }

    fn set_data_threshold(&mut self, bytes: usize) -> Result<(), JournalError> {
        self.data_threshold = bytes;
        Ok(())
    }

    fn seek_cursor(&mut self, cursor: &Cursor) -> Result<(), JournalError> {
        let idx = self
            .entries
            .iter()
            .position(|entry| entry.cursor() == cursor)
            .ok_or_else(|| JournalError::InvalidCursor(cursor.to_string()))?;
        self.position = Position::Before(idx);
        Ok(())
    }

    fn test_cursor(&mut self, cursor: &Cursor) -> Result<bool, JournalError> {
        Ok(self.current("test cursor")?.cursor() == cursor)
    }

    fn next(&mut self) -> Result<Advance, JournalError> {
        let start = match self.position {
            Position::Head => 0,
            Position::Before(idx) => idx,
            Position::At(idx) => idx + 1,
        };
        let found = self.entries[start.min(self.entries.len())..]
            .iter()
            .position(|entry| self.matches.matches(entry));
        match found {
            Some(offset) => {
                self.position = Position::At(start + offset);
                Ok(Advance::Entry)
            }
            None => Ok(Advance::End),
        }
    }

    fn field(&mut self, name: &str) -> Result<Option<String>, JournalError> {
        let threshold = self.data_threshold;
        let value = self.current("get field")?.get(name);
        Ok(value.map(|v| truncate(v, threshold).to_string()))
    }

    fn cursor(&mut self) -> Result<Cursor, JournalError> {
        Ok(self.current("get cursor")?.cursor().clone())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.open_sessions.set(self.open_sessions.get().saturating_sub(1));
    }
}

fn truncate(value: &str, limit: usize) -> &str {
    if limit == 0 || value.len() <= limit {
        return value;
    }
    let mut end = limit;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new("test");
        store.append([("MESSAGE", "one"), ("PRIORITY", "3"), ("UNIT", "a.service")]);
        store.append([("MESSAGE", "two"), ("PRIORITY", "6"), ("UNIT", "b.service")]);
        store.append([("MESSAGE", "three"), ("PRIORITY", "2"), ("_SYSTEMD_UNIT", "b.service")]);
        store
    }

    fn messages(session: &mut MemorySession) -> Vec<String> {
        let mut out = Vec::new();
        while session.next().unwrap() == Advance::Entry {
            out.push(session.field("MESSAGE").unwrap().unwrap());
        }
        out
    }

    #[test]
    fn test_cursors_are_scoped_to_store() {
        let store = store();
        assert_eq!(store.entries()[0].cursor().as_str(), "s=test;i=1");
        assert_eq!(store.entries()[2].cursor().as_str(), "s=test;i=3");
    }

    #[test]
    fn test_no_matches_yields_everything() {
        let mut session = store().open(Scope::LocalSystem).unwrap();
        assert_eq!(messages(&mut session), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_same_field_matches_are_ored() {
        let mut session = store().open(Scope::LocalSystem).unwrap();
        session.add_match("PRIORITY", "2").unwrap();
        session.add_match("PRIORITY", "3").unwrap();
        assert_eq!(messages(&mut session), vec!["one", "three"]);
    }

    #[test]
    fn test_disjunction_then_conjunction() {
        let mut session = store().open(Scope::LocalSystem).unwrap();
        session.add_match("_SYSTEMD_UNIT", "b.service").unwrap();
        session.add_disjunction().unwrap();
        session.add_match("UNIT", "b.service").unwrap();
        session.add_conjunction().unwrap();
        session.add_match("PRIORITY", "6").unwrap();
        assert_eq!(messages(&mut session), vec!["two"]);
    }

    #[test]
    fn test_seek_lands_on_cursor_entry() {
        let store = store();
        let cursor = store.entries()[1].cursor().clone();
        let mut session = store.open(Scope::LocalSystem).unwrap();
        session.seek_cursor(&cursor).unwrap();
        assert_eq!(session.next().unwrap(), Advance::Entry);
        assert!(session.test_cursor(&cursor).unwrap());
        assert_eq!(session.field("MESSAGE").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn test_unknown_cursor_is_rejected() {
        let mut session = store().open(Scope::LocalSystem).unwrap();
        let err = session.seek_cursor(&Cursor::new("s=other;i=1")).unwrap_err();
        assert!(matches!(err, JournalError::InvalidCursor(_)));
    }

    #[test]
    fn test_end_keeps_last_position() {
        let mut session = store().open(Scope::LocalSystem).unwrap();
        messages(&mut session);
        assert_eq!(session.next().unwrap(), Advance::End);
        assert_eq!(session.cursor().unwrap().as_str(), "s=test;i=3");
    }

    #[test]
    fn test_reads_before_first_entry_fail() {
        let mut session = store().open(Scope::LocalSystem).unwrap();
        assert!(session.cursor().is_err());
        assert!(session.field("MESSAGE").is_err());
    }

    #[test]
    fn test_data_threshold_truncates_until_disabled() {
        let long = "x".repeat(DEFAULT_DATA_THRESHOLD + 10);
        let mut store = MemoryStore::new("big");
        store.append([("MESSAGE", long.as_str())]);

        let mut session = store.open(Scope::LocalSystem).unwrap();
        session.next().unwrap();
        assert_eq!(
            session.field("MESSAGE").unwrap().unwrap().len(),
            DEFAULT_DATA_THRESHOLD
        );

        session.set_data_threshold(0).unwrap();
        assert_eq!(session.field("MESSAGE").unwrap().unwrap().len(), long.len());
    }

    #[test]
    fn test_session_release_is_tracked() {
        let store = store();
        {
            let _a = store.open(Scope::LocalUser).unwrap();
            let _b = store.open(Scope::LocalUser).unwrap();
            assert_eq!(store.open_sessions(), 2);
        }
        assert_eq!(store.open_sessions(), 0);
        assert_eq!(store.last_scope(), Some(Scope::LocalUser));
    }
}
