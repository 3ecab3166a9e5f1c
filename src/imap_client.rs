use std::future::Future;
use std::time::Duration;

use async_imap::imap_proto;
use async_imap::types::{Fetch, Flag};
use async_imap::Session;
use chrono::{DateTime, FixedOffset};
use futures::future::BoxFuture;
use futures::stream::StreamExt;
use log::{debug, info, warn};
use mail_parser::MessageParser;
use tokio::net::TcpStream;
use tokio_native_tls::{native_tls, TlsStream};
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use crate::config::ImapConfig;
use crate::credentials::Credentials;
use crate::email::{Address, Envelope, FetchWindow, MailConnector, MailSession, MessageStream, RawMessage};
use crate::error::{ReportError, Result};

const FETCH_QUERY: &str = "(UID FLAGS ENVELOPE BODY.PEEK[])";

type ImapSession = Session<Compat<TlsStream<TcpStream>>>;

/// Run a network call under the configured deadline
pub(crate) async fn with_deadline<T, F>(limit: Duration, operation: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ReportError::Timeout {
            operation: operation.to_string(),
            seconds: limit.as_secs(),
        }),
    }
}

pub struct ImapClient {
    session: ImapSession,
    timeout: Duration,
}

impl ImapClient {
    pub async fn new(config: &ImapConfig, credentials: &Credentials) -> Result<Self> {
        info!("🔌 Connexion au serveur IMAP {}:{} ({})", config.server, config.port, credentials.email);

        let auth_error = |reason: String| ReportError::Auth {
            account: credentials.email.clone(),
            reason,
        };

        let connect = async {
            let tcp_stream = TcpStream::connect((config.server.as_str(), config.port))
                .await
                .map_err(|e| auth_error(format!("unable to reach server: {}", e)))?;

            let connector = native_tls::TlsConnector::new()
                .map_err(|e| auth_error(format!("unable to initialise TLS: {}", e)))?;
            let tls_stream = tokio_native_tls::TlsConnector::from(connector)
                .connect(&config.server, tcp_stream)
                .await
                .map_err(|e| auth_error(format!("TLS handshake failed: {}", e)))?;

            let client = async_imap::Client::new(tls_stream.compat());
            client
                .login(&credentials.email, &credentials.password)
                .await
                .map_err(|(e, _client)| auth_error(format!("login rejected: {}", e)))
        };

        let session = match tokio::time::timeout(config.timeout, connect).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(auth_error(format!(
                    "no answer from server within {}s",
                    config.timeout.as_secs()
                )))
            }
        };

        info!("✅ Connecté en tant que {}", credentials.email);
        Ok(ImapClient {
            session,
            timeout: config.timeout,
        })
    }

    pub async fn select_folder(&mut self, folder: &str) -> Result<u32> {
        debug!("Sélection du dossier {}", folder);
        let mailbox = with_deadline(self.timeout, "SELECT", async {
            self.session.select(folder).await.map_err(|e| ReportError::Folder {
                folder: folder.to_string(),
                reason: e.to_string(),
            })
        })
        .await?;

        info!("📬 Dossier {} sélectionné ({} messages)", folder, mailbox.exists);
        Ok(mailbox.exists)
    }

    pub async fn fetch_window(&mut self, window: FetchWindow) -> Result<MessageStream<'_>> {
        let sequence_set = window.sequence_set();
        debug!("FETCH {} {}", sequence_set, FETCH_QUERY);

        let responses = with_deadline(self.timeout, "FETCH", async move {
            self.session
                .fetch(sequence_set.clone(), FETCH_QUERY)
                .await
                .map_err(|e| ReportError::Protocol(format!("FETCH {} failed: {}", sequence_set, e)))
        })
        .await?;

        let stream = responses.map(|response| {
            response
                .map(|fetch| raw_message_from_fetch(&fetch))
                .map_err(|e| ReportError::Protocol(format!("invalid FETCH response: {}", e)))
        });
        Ok(stream.boxed())
    }

    pub async fn logout(&mut self) -> Result<()> {
        info!("👋 Déconnexion du serveur IMAP");
        with_deadline(self.timeout, "LOGOUT", async {
            self.session
                .logout()
                .await
                .map_err(|e| ReportError::Protocol(format!("LOGOUT failed: {}", e)))
        })
        .await
    }
}

impl MailSession for ImapClient {
    fn select<'a>(&'a mut self, folder: &'a str) -> BoxFuture<'a, Result<u32>> {
        Box::pin(self.select_folder(folder))
    }

    fn fetch<'a>(&'a mut self, window: FetchWindow) -> BoxFuture<'a, Result<MessageStream<'a>>> {
        Box::pin(self.fetch_window(window))
    }

    fn logout(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(ImapClient::logout(self))
    }
}

/// Opens [`ImapClient`] sessions against the configured server
pub struct ImapConnector {
    config: ImapConfig,
}

impl ImapConnector {
    pub fn new(config: ImapConfig) -> Self {
        Self { config }
    }
}

impl MailConnector for ImapConnector {
    type Session = ImapClient;

    fn connect<'a>(&'a self, credentials: &'a Credentials) -> BoxFuture<'a, Result<ImapClient>> {
        Box::pin(ImapClient::new(&self.config, credentials))
    }
}

fn raw_message_from_fetch(fetch: &Fetch) -> RawMessage {
    let envelope = fetch
        .envelope()
        .map(envelope_from_imap)
        .unwrap_or_default();

    let flags = fetch.flags().map(|flag| flag_name(&flag)).collect();

    RawMessage {
        sequence: fetch.message,
        uid: fetch.uid,
        flags,
        envelope,
        body: fetch.body().map(|b| b.to_vec()),
    }
}

fn envelope_from_imap(envelope: &imap_proto::Envelope<'_>) -> Envelope {
    let date = envelope
        .date
        .as_ref()
        .map(|raw| String::from_utf8_lossy(raw).to_string())
        .and_then(|raw| {
            let parsed = parse_envelope_date(&raw);
            if parsed.is_none() {
                warn!("⚠️  Date d'enveloppe illisible '{}'", raw);
            }
            parsed
        });

    let first = |addresses: &Option<Vec<imap_proto::Address<'_>>>| {
        addresses.as_ref().and_then(|list| list.first()).map(address_from_imap)
    };

    Envelope {
        date,
        from: first(&envelope.from),
        to: first(&envelope.to),
    }
}

fn address_from_imap(address: &imap_proto::Address<'_>) -> Address {
    let text = |part: &Option<std::borrow::Cow<'_, [u8]>>| {
        part.as_ref()
            .map(|b| String::from_utf8_lossy(b).to_string())
            .unwrap_or_default()
    };

    let mailbox = text(&address.mailbox);
    let host = text(&address.host);
    let name = address
        .name
        .as_ref()
        .map(|raw| decode_header_value(raw))
        .unwrap_or_default();

    Address::new(format!("{}@{}", mailbox, host), name)
}

fn flag_name(flag: &Flag<'_>) -> String {
    match flag {
        Flag::Seen => "\\Seen".to_string(),
        Flag::Answered => "\\Answered".to_string(),
        Flag::Flagged => "\\Flagged".to_string(),
        Flag::Deleted => "\\Deleted".to_string(),
        Flag::Draft => "\\Draft".to_string(),
        Flag::Recent => "\\Recent".to_string(),
        Flag::Custom(name) => name.to_string(),
        other => format!("{:?}", other),
    }
}

/// Parse an RFC 2822 envelope date, keeping the sender's offset
///
/// Trailing comments such as `(UTC)` or `(PST)` are ignored.
pub fn parse_envelope_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(raw) {
        return Some(date);
    }

    let without_comment = match raw.rfind('(') {
        Some(pos) if raw.ends_with(')') => raw[..pos].trim_end(),
        _ => raw,
    };
    DateTime::parse_from_rfc2822(without_comment).ok()
}

/// Decode RFC 2047 encoded words in a header value (display names)
pub fn decode_header_value(raw: &[u8]) -> String {
    let value = String::from_utf8_lossy(raw);
    if !value.contains("=?") {
        return value.trim().to_string();
    }

    let mut header = b"Subject: ".to_vec();
    header.extend_from_slice(raw);
    header.extend_from_slice(b"\r\n\r\n");

    MessageParser::default()
        .parse(&header[..])
        .and_then(|message| message.subject().map(|s| s.trim().to_string()))
        .unwrap_or_else(|| value.trim().to_string())
}
