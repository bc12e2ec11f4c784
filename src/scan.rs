//! Incremental scan over the journal
//!
//! A scan opens a session, installs the structural query, resumes after the
//! saved cursor and feeds every new entry's message through the [`Matcher`].
//! The entry a saved cursor points at was delivered by the previous run and
//! is skipped, so each entry is counted exactly once across runs.
//!
//! [`Matcher`]: crate::filter::Matcher

use crate::config::FieldNames;
use crate::errors::CheckError;
use crate::filter::FilterSpec;
use crate::journal::{Advance, Cursor, Journal, JournalError, JournalSource};
use crate::query::{Query, build_query};
use std::io::Write;
use tracing::{debug, info, trace};

/// Placeholder printed for entries that carry no unit field
pub const NO_UNIT: &str = "(null)";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanResult {
    pub match_count: u64,
    /// Position of the last entry read; `None` when the scan saw no new entries
    pub next_cursor: Option<Cursor>,
}

impl ScanResult {
    fn nothing_new() -> Self {
        Self::default()
    }
}

pub struct Scanner<'a> {
    spec: &'a FilterSpec,
    fields: &'a FieldNames,
    query: Query,
}

impl<'a> Scanner<'a> {
    pub fn new(spec: &'a FilterSpec, fields: &'a FieldNames) -> Self {
        Self {
            spec,
            fields,
            query: build_query(spec, fields),
        }
    }

    /// Scan everything after `last`, writing one line per match to `out`
    /// unless it is `None`.
    ///
    /// The session is dropped before returning on every path.
    pub fn run<S: JournalSource>(
        &self,
        source: &S,
        last: Option<&Cursor>,
        out: Option<&mut dyn Write>,
    ) -> Result<ScanResult, CheckError> {
        let mut journal = source.open(self.spec.scope)?;
        journal.set_data_threshold(0)?;
        self.query.install(&mut journal)?;
        debug!(query = %self.query, scope = ?self.spec.scope, "installed journal matches");

        self.run_session(&mut journal, last, out)
    }

    /// Scan an already configured session
    pub fn run_session<J: Journal>(
        &self,
        journal: &mut J,
        last: Option<&Cursor>,
        mut out: Option<&mut dyn Write>,
    ) -> Result<ScanResult, CheckError> {
        if let Some(cursor) = last
            && !self.skip_delivered(journal, cursor)?
        {
            debug!(%cursor, "no entries after saved cursor");
            return Ok(ScanResult::nothing_new());
        }

        let mut seen = 0u64;
        let mut matched = 0u64;
        while journal.next()? == Advance::Entry {
            seen += 1;
            let message = journal.field(&self.fields.message)?.unwrap_or_default();
            if !self.spec.matcher.matches(&message) {
                trace!(%message, "rejected by patterns");
                continue;
            }
            matched += 1;
            trace!(%message, "matched");

            if let Some(out) = out.as_mut() {
                let unit = self.display_unit(journal)?;
                writeln!(out, "{}: {}", unit.as_deref().unwrap_or(NO_UNIT), message)
                    .map_err(CheckError::Output)?;
            }
        }

        if let Some(out) = out.as_mut() {
            out.flush().map_err(CheckError::Output)?;
        }

        if seen == 0 {
            debug!("journal has no new entries");
            return Ok(ScanResult::nothing_new());
        }

        let next_cursor = journal.cursor()?;
        info!(seen, matched, cursor = %next_cursor, "scan finished");
        Ok(ScanResult {
            match_count: matched,
            next_cursor: Some(next_cursor),
        })
    }

    /// Seek to `cursor` and step over the entry it addresses.
    ///
    /// Returns `false` when the journal ends at that entry.
    fn skip_delivered<J: Journal>(
        &self,
        journal: &mut J,
        cursor: &Cursor,
    ) -> Result<bool, CheckError> {
        let invalid = || CheckError::CursorInvalid {
            cursor: cursor.clone(),
        };

        journal.seek_cursor(cursor).map_err(|e| match e {
            JournalError::InvalidCursor(_) => invalid(),
            other => other.into(),
        })?;
        if journal.next()? == Advance::End {
            return Ok(false);
        }
        if !journal.test_cursor(cursor)? {
            return Err(invalid());
        }
        debug!(%cursor, "resuming after saved cursor");
        Ok(true)
    }

    fn display_unit<J: Journal>(&self, journal: &mut J) -> Result<Option<String>, CheckError> {
        for name in &self.fields.display_unit {
            if let Some(unit) = journal.field(name)? {
                return Ok(Some(unit));
            }
        }
        Ok(None)
    }
}
