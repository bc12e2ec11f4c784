//! Local journal access through libsystemd

use super::{Advance, Cursor, Journal, JournalError, JournalSource};
use crate::filter::Scope;
use systemd::journal::{self as sd, JournalSeek};

/// Opens the journals of the local machine
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemdSource;

impl JournalSource for SystemdSource {
    type Session = SystemdSession;

    fn open(&self, scope: Scope) -> Result<SystemdSession, JournalError> {
        let mut options = sd::OpenOptions::default();
        options.local_only(true);
        match scope {
            Scope::LocalSystem => options.system(true),
            Scope::LocalUser => options.current_user(true),
        };
        let journal = options.open().map_err(|e| describe("open journal", e))?;
        Ok(SystemdSession { journal })
    }
}

pub struct SystemdSession {
    journal: sd::Journal,
}

impl Journal for SystemdSession {
    fn add_match(&mut self, field: &str, value: &str) -> Result<(), JournalError> {
        self.journal
            .match_add(field, value)
            .map(|_| ())
            .map_err(|e| describe("add match", e))
    }

    fn add_disjunction(&mut self) -> Result<(), JournalError> {
        self.journal
            .match_or()
            .map(|_| ())
            .map_err(|e| describe("add disjunction", e))
    }

    fn add_conjunction(&mut self) -> Result<(), JournalError> {
        self.journal
            .match_and()
            .map(|_| ())
            .map_err(|e| describe("add conjunction", e))
    }

    fn set_data_threshold(&mut self, bytes: usize) -> Result<(), JournalError> {
        self.journal
            .set_data_threshold(bytes)
            .map_err(|e| describe("set data threshold", e))
    }

    fn seek_cursor(&mut self, cursor: &Cursor) -> Result<(), JournalError> {
        self.journal
            .seek(JournalSeek::Cursor {
                cursor: cursor.as_str().to_string(),
            })
            .map(|_| ())
            .map_err(|e| match e.raw_os_error() {
                Some(libc::EINVAL) => JournalError::InvalidCursor(cursor.to_string()),
                _ => describe("seek to the cursor", e),
            })
    }

    fn test_cursor(&mut self, cursor: &Cursor) -> Result<bool, JournalError> {
        self.journal
            .test_cursor(cursor.as_str())
            .map_err(|e| describe("test the cursor", e))
    }

    fn next(&mut self) -> Result<Advance, JournalError> {
        match self.journal.next() {
            Ok(0) => Ok(Advance::End),
            Ok(_) => Ok(Advance::Entry),
            Err(e) => Err(describe("move next", e)),
        }
    }

    fn field(&mut self, name: &str) -> Result<Option<String>, JournalError> {
        match self.journal.get_data(name) {
            Ok(Some(data)) => Ok(data
                .value()
                .map(|value| String::from_utf8_lossy(value).into_owned())),
            Ok(None) => Ok(None),
            Err(e) if e.raw_os_error() == Some(libc::ENOENT) => Ok(None),
            Err(e) => Err(describe("get field", e)),
        }
    }

    fn cursor(&mut self) -> Result<Cursor, JournalError> {
        self.journal
            .cursor()
            .map(Cursor::new)
            .map_err(|e| describe("get cursor", e))
    }
}

/// Error descriptions from sd_journal_get_data(3)
fn errno_description(errno: i32) -> Option<&'static str> {
    Some(match errno {
        libc::EINVAL => "One of the required parameters is NULL or invalid",
        libc::ECHILD => "The journal object was created in a different process, library or module instance",
        libc::EADDRNOTAVAIL => "The read pointer is not positioned at a valid entry",
        libc::ENOENT => "The current entry does not include the specified field",
        libc::ENOMEM => "Memory allocation failed",
        libc::ENOBUFS => "A compressed entry is too large",
        libc::E2BIG => "The data field is too large for this computer architecture",
        libc::EPROTONOSUPPORT => {
            "The journal is compressed with an unsupported method or the journal uses an unsupported feature"
        }
        libc::EBADMSG => "The journal is corrupted",
        libc::EIO => "An I/O error was reported by the kernel",
        _ => return None,
    })
}

fn describe(op: &'static str, err: std::io::Error) -> JournalError {
    let reason = err
        .raw_os_error()
        .and_then(errno_description)
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());
    JournalError::backend(op, reason)
}
