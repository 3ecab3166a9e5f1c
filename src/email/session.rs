use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::credentials::Credentials;
use crate::error::Result;
use super::common::{FetchWindow, RawMessage};

/// Lazy, finite, non-restartable sequence of fetched messages
pub type MessageStream<'a> = BoxStream<'a, Result<RawMessage>>;

/// An authenticated mail session (one per account and run)
pub trait MailSession: Send {
    /// Select a folder and return the number of messages it holds
    fn select<'a>(&'a mut self, folder: &'a str) -> BoxFuture<'a, Result<u32>>;

    /// Fetch envelope, flags and full body for every message of the window.
    ///
    /// The stream borrows the session: it has to be drained or dropped
    /// before the next command is sent.
    fn fetch<'a>(&'a mut self, window: FetchWindow) -> BoxFuture<'a, Result<MessageStream<'a>>>;

    /// Close the session on the server side
    fn logout(&mut self) -> BoxFuture<'_, Result<()>>;
}

/// Opens authenticated sessions for an account
pub trait MailConnector: Send + Sync {
    type Session: MailSession;

    fn connect<'a>(&'a self, credentials: &'a Credentials) -> BoxFuture<'a, Result<Self::Session>>;
}
