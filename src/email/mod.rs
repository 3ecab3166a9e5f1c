pub mod common;
pub mod session;

// Re-export commonly used items
pub use common::{
    AccountSummary, Address, Attachment, Envelope, FetchWindow, FolderReport, MailType,
    MessageRecord, RawMessage,
};
pub use session::{MailConnector, MailSession, MessageStream};
