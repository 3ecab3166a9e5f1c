/// Common structures shared by the fetcher, the decoder and the report writer
use std::fmt;

use chrono::{DateTime, FixedOffset};

use crate::error::ReportError;

/// Direction of a message relative to the authenticated account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailType {
    Sent,
    Received,
}

impl MailType {
    /// `Sent` when the sender address contains the account address.
    ///
    /// Containment rather than equality: a sender such as
    /// `someone.user@x.com.example` classifies as `Sent` for account `user@x.com`.
    pub fn classify(from: &str, account: &str) -> Self {
        if from.contains(account) {
            MailType::Sent
        } else {
            MailType::Received
        }
    }
}

impl fmt::Display for MailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailType::Sent => f.write_str("Sent"),
            MailType::Received => f.write_str("Received"),
        }
    }
}

/// A mailbox address as reported in the IMAP envelope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    /// `mailbox@host`
    pub address: String,
    /// Display name, empty when the sender did not set one
    pub name: String,
}

impl Address {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }
}

/// Message metadata available without downloading the body
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    pub date: Option<DateTime<FixedOffset>>,
    pub from: Option<Address>,
    pub to: Option<Address>,
}

/// One FETCH response, as streamed by a mail session
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub sequence: u32,
    pub uid: Option<u32>,
    pub flags: Vec<String>,
    pub envelope: Envelope,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    /// Reserved, never populated
    pub size: Option<u64>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            size: None,
        }
    }
}

/// One processed message, ready to be written to the report
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub date: DateTime<FixedOffset>,
    pub from: String,
    pub from_name: String,
    pub to: String,
    pub to_name: String,
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub mail_type: MailType,
}

/// Inclusive range of sequence numbers requested from a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: u32,
    pub end: u32,
}

impl FetchWindow {
    /// Window over the last `size` messages of a folder holding `exists` messages.
    ///
    /// Returns `None` when the folder is empty or the window size is zero.
    pub fn last(exists: u32, size: u32) -> Option<Self> {
        if exists == 0 || size == 0 {
            return None;
        }
        let start = exists.saturating_sub(size - 1).max(1);
        Some(FetchWindow { start, end: exists })
    }

    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// IMAP sequence set, e.g. `501:1000`
    pub fn sequence_set(&self) -> String {
        format!("{}:{}", self.start, self.end)
    }
}

/// Result of scanning one folder
#[derive(Debug, Default)]
pub struct FolderReport {
    pub folder: String,
    pub scanned: usize,
    pub records: Vec<MessageRecord>,
    pub warnings: Vec<ReportError>,
    /// Fatal error that cut the window short; `records` holds what was
    /// accepted before it
    pub error: Option<ReportError>,
}

/// Result of processing one account
#[derive(Debug)]
pub struct AccountSummary {
    pub account: String,
    pub scanned: usize,
    pub records_written: usize,
    pub warnings: usize,
    pub skipped_folders: Vec<String>,
    pub report_path: std::path::PathBuf,
}
