use crate::config::ConfigError;
use crate::filter::FilterError;
use crate::journal::{Cursor, JournalError};
use crate::state::StateError;
use thiserror::Error;

/// Broad class of a failure, which decides the exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The operator asked for something invalid; no scan was attempted
    Usage,
    /// The journal, the state file or stdout failed
    Resource,
    /// The saved cursor does not address an entry of this journal
    CursorInvalid,
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(
        "saved cursor '{cursor}' does not match any entry of the journal; \
         remove the state file to start over"
    )]
    CursorInvalid { cursor: Cursor },

    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

impl CheckError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CheckError::Filter(_) | CheckError::Config(_) => ErrorClass::Usage,
            CheckError::Journal(JournalError::InvalidCursor(_)) | CheckError::CursorInvalid { .. } => {
                ErrorClass::CursorInvalid
            }
            CheckError::Journal(_) | CheckError::State(_) | CheckError::Output(_) => {
                ErrorClass::Resource
            }
        }
    }
}
