use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building a daily mail report.
///
/// `Auth`, `Io`, `Protocol` and `Timeout` abort the current account.
/// `Folder` only skips the folder that could not be selected, and `Decode`
/// is collected as a warning next to the record it belongs to.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("authentication failed for {account}: {reason}")]
    Auth { account: String, reason: String },

    #[error("unable to select folder '{folder}': {reason}")]
    Folder { folder: String, reason: String },

    #[error("unable to decode message: {reason}")]
    Decode { reason: String },

    #[error("unable to write report {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IMAP protocol error: {0}")]
    Protocol(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("invalid target date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

impl ReportError {
    pub fn decode(reason: impl Into<String>) -> Self {
        ReportError::Decode { reason: reason.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io { path: path.into(), source }
    }

    /// True for errors that only affect the folder being scanned.
    pub fn is_folder_scoped(&self) -> bool {
        matches!(self, ReportError::Folder { .. })
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
