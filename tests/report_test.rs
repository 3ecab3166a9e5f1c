use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};

use chrono::DateTime;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};

use mailreport::config::Config;
use mailreport::credentials::Credentials;
use mailreport::email::{
    Address, Envelope, FetchWindow, MailConnector, MailSession, MailType, MessageRecord,
    MessageStream, RawMessage,
};
use mailreport::error::{ReportError, Result};
use mailreport::pipeline::ReportPipeline;
use mailreport::progress::Progress;
use mailreport::report_writer::ReportWriter;

/// In-memory mailbox standing in for an IMAP server
#[derive(Clone, Default)]
struct FakeMailbox {
    folders: HashMap<String, Vec<RawMessage>>,
    fetched: Arc<Mutex<Vec<String>>>,
}

struct FakeSession {
    mailbox: FakeMailbox,
    selected: String,
}

impl MailSession for FakeSession {
    fn select<'a>(&'a mut self, folder: &'a str) -> BoxFuture<'a, Result<u32>> {
        Box::pin(async move {
            let count = self
                .mailbox
                .folders
                .get(folder)
                .map(|messages| messages.len() as u32)
                .ok_or_else(|| ReportError::Folder {
                    folder: folder.to_string(),
                    reason: "unknown folder".to_string(),
                })?;
            self.selected = folder.to_string();
            Ok(count)
        })
    }

    fn fetch<'a>(&'a mut self, window: FetchWindow) -> BoxFuture<'a, Result<MessageStream<'a>>> {
        Box::pin(async move {
            self.mailbox
                .fetched
                .lock()
                .unwrap()
                .push(format!("{} {}", self.selected, window.sequence_set()));
            let messages = self.mailbox.folders[&self.selected]
                [(window.start - 1) as usize..window.end as usize]
                .to_vec();
            Ok(stream::iter(messages.into_iter().map(Ok)).boxed())
        })
    }

    fn logout(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

struct FakeConnector {
    mailbox: FakeMailbox,
}

impl MailConnector for FakeConnector {
    type Session = FakeSession;

    fn connect<'a>(&'a self, _credentials: &'a Credentials) -> BoxFuture<'a, Result<FakeSession>> {
        Box::pin(async move {
            Ok(FakeSession {
                mailbox: self.mailbox.clone(),
                selected: String::new(),
            })
        })
    }
}

fn plain_message(sequence: u32, date: &str, from: &str, body: &str) -> RawMessage {
    RawMessage {
        sequence,
        uid: Some(sequence),
        flags: Vec::new(),
        envelope: Envelope {
            date: Some(DateTime::parse_from_rfc2822(date).unwrap()),
            from: Some(Address::new(from, "")),
            to: Some(Address::new("user@x.com", "User")),
        },
        body: Some(
            format!(
                "From: {}\r\nTo: user@x.com\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
                from, body
            )
            .into_bytes(),
        ),
    }
}

fn config_for(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.report.output_dir = dir.to_string_lossy().to_string();
    config
}

#[tokio::test]
async fn test_end_to_end_single_received_record() {
    let dir = tempfile::tempdir().unwrap();
    let mut mailbox = FakeMailbox::default();
    mailbox.folders.insert(
        "INBOX".to_string(),
        vec![
            plain_message(1, "Fri, 01 Mar 2024 09:30:00 +0000", "friend@y.com", "Hello"),
            plain_message(2, "Sat, 02 Mar 2024 07:00:00 +0000", "noreply@z.com", "Newsletter"),
        ],
    );
    mailbox.folders.insert("[Gmail]/Sent Mail".to_string(), Vec::new());

    let pipeline = ReportPipeline::new(config_for(dir.path()));
    let connector = FakeConnector { mailbox: mailbox.clone() };
    let (progress, mut updates) = Progress::channel();

    let summaries = pipeline
        .run(&connector, &[Credentials::new("user@x.com", "secret")], "2024-03-01", &progress)
        .await
        .expect("Pipeline failed");
    drop(progress);

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].scanned, 2);
    assert_eq!(summaries[0].records_written, 1);
    assert!(summaries[0].skipped_folders.is_empty());

    let report = fs::read_to_string(dir.path().join("20240301.txt")).expect("Report not written");
    assert_eq!(
        report,
        "========================================================\n\n\
         Mail Type: Received\n\
         Sender address: friend@y.com\n\
         Sender name: \n\
         Receiver address: user@x.com\n\
         Receiver name: User\n\
         Date: 2024-03-01 09:30:00\n\
         Content: Hello\n\n"
    );

    // Only the sent folder is empty, so one FETCH for the inbox
    assert_eq!(*mailbox.fetched.lock().unwrap(), vec!["INBOX 1:2".to_string()]);

    let mut statuses = Vec::new();
    while let Some(update) = updates.recv().await {
        statuses.push(update);
    }
    let last = statuses.last().unwrap();
    assert_eq!(last.status, "Done");
    assert_eq!(last.fraction, 1.0);
    assert!(statuses.iter().any(|u| u.status == "Writing report for user@x.com..."));
}

#[tokio::test]
async fn test_sent_and_received_are_merged_by_date() {
    let dir = tempfile::tempdir().unwrap();
    let mut mailbox = FakeMailbox::default();
    mailbox.folders.insert(
        "INBOX".to_string(),
        vec![plain_message(1, "Fri, 01 Mar 2024 15:00:00 +0000", "friend@y.com", "Reply")],
    );
    mailbox.folders.insert(
        "[Gmail]/Sent Mail".to_string(),
        vec![plain_message(1, "Fri, 01 Mar 2024 11:00:00 +0000", "user@x.com", "Question")],
    );

    let pipeline = ReportPipeline::new(config_for(dir.path()));
    let connector = FakeConnector { mailbox };

    pipeline
        .run(&connector, &[Credentials::new("user@x.com", "secret")], "2024-03-01", &Progress::disabled())
        .await
        .expect("Pipeline failed");

    let report = fs::read_to_string(dir.path().join("20240301.txt")).unwrap();
    let sent = report.find("Mail Type: Sent").expect("Sent record missing");
    let received = report.find("Mail Type: Received").expect("Received record missing");
    assert!(sent < received, "Records must be ordered by date");
}

#[tokio::test]
async fn test_keyword_filter_excludes_automated_senders() {
    let dir = tempfile::tempdir().unwrap();
    let mut mailbox = FakeMailbox::default();
    mailbox.folders.insert(
        "INBOX".to_string(),
        vec![
            plain_message(1, "Fri, 01 Mar 2024 09:00:00 +0000", "jobs@glassdoor.com", "Offers"),
            plain_message(2, "Fri, 01 Mar 2024 10:00:00 +0000", "friend@y.com", "Hi"),
        ],
    );
    mailbox.folders.insert("[Gmail]/Sent Mail".to_string(), Vec::new());

    let pipeline = ReportPipeline::new(config_for(dir.path()));
    let connector = FakeConnector { mailbox };

    let summaries = tokio_test::assert_ok!(
        pipeline
            .run(&connector, &[Credentials::new("user@x.com", "secret")], "2024-03-01", &Progress::disabled())
            .await
    );

    assert_eq!(summaries[0].records_written, 1);
    let report = fs::read_to_string(dir.path().join("20240301.txt")).unwrap();
    assert!(!report.contains("glassdoor"));
}

fn record(date: &str, from: &str, content: &str) -> MessageRecord {
    MessageRecord {
        date: DateTime::parse_from_rfc3339(date).unwrap(),
        from: from.to_string(),
        from_name: "Name".to_string(),
        to: "user@x.com".to_string(),
        to_name: String::new(),
        content: content.to_string(),
        attachments: Vec::new(),
        mail_type: MailType::Received,
    }
}

#[tokio::test]
async fn test_unknown_date_format_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ReportPipeline::new(config_for(dir.path()));
    let connector = FakeConnector { mailbox: FakeMailbox::default() };

    let result = pipeline
        .run(&connector, &[Credentials::new("user@x.com", "secret")], "03/01/2024", &Progress::disabled())
        .await;

    tokio_test::assert_err!(&result);
    assert!(matches!(result, Err(ReportError::InvalidDate(_))));
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none(), "No report expected");
}

#[test]
fn test_writer_appends_runs() {
    let r1 = vec![record("2024-03-01T09:00:00+00:00", "a@y.com", "first")];
    let r2 = vec![
        record("2024-03-01T12:00:00+00:00", "b@y.com", "second"),
        record("2024-03-01T08:00:00+00:00", "c@y.com", "third"),
    ];

    // Each run on its own gives the expected blocks
    let alone_1 = tempfile::tempdir().unwrap();
    let path_1 = ReportWriter::new(alone_1.path()).write(r1.clone(), "2024-03-01").unwrap();
    let alone_2 = tempfile::tempdir().unwrap();
    let path_2 = ReportWriter::new(alone_2.path()).write(r2.clone(), "2024-03-01").unwrap();

    let both = tempfile::tempdir().unwrap();
    let writer = ReportWriter::new(both.path());
    writer.write(r1, "2024-03-01").unwrap();
    let path = writer.write(r2, "2024-03-01").unwrap();

    let expected = fs::read_to_string(path_1).unwrap() + &fs::read_to_string(path_2).unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), expected);
}
