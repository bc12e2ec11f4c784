//! Persistence of the resume cursor between invocations
//!
//! The state file holds the raw cursor text and nothing else. It is replaced
//! atomically: the new cursor is written to a temporary file next to the
//! target, synced, and renamed over it.

use crate::journal::Cursor;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to load cursor from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to save cursor to {path}: {source}")]
    Save {
        path: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cursor saved by the previous run, or `None` if nothing was saved yet
    pub fn load(&self) -> Result<Option<Cursor>, StateError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim_end();
                Ok((!token.is_empty()).then(|| Cursor::new(token)))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StateError::Load {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }

    /// Durably replace the saved cursor
    pub fn save(&self, cursor: &Cursor) -> Result<(), StateError> {
        self.write_atomically(cursor.as_str())
            .map_err(|source| StateError::Save {
                path: self.path.display().to_string(),
                source,
            })
    }

    fn write_atomically(&self, contents: &str) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o644))?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        #[cfg(unix)]
        fs::File::open(dir)?.sync_all()?;
        Ok(())
    }
}
