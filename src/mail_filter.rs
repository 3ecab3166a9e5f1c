use log::debug;

use crate::email::Envelope;

/// Sender fragments that identify automated or marketing mail
pub const DEFAULT_FILTER_KEYWORDS: &[&str] = &[
    "voice.google.com",
    "noreply",
    "donotreply",
    "no-reply",
    "mailtrack.io",
    "dice.com",
    "medium.com",
    "jobot.com",
    "lensa.com",
    "experteer.com",
    "calendly.com",
    "linkedin.com",
    "indeed.com",
    "glassdoor.com",
];

/// Date + sender predicate applied to envelopes before any body is decoded
#[derive(Debug, Clone)]
pub struct MailFilter {
    keywords: Vec<String>,
}

impl Default for MailFilter {
    fn default() -> Self {
        Self::new(DEFAULT_FILTER_KEYWORDS.iter().map(|k| k.to_string()).collect())
    }
}

impl MailFilter {
    pub fn new(keywords: Vec<String>) -> Self {
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Keep a message dated `target_date` (YYYY-MM-DD, in the offset reported
    /// by the server) whose first sender matches none of the keywords
    pub fn accept(&self, envelope: &Envelope, target_date: &str) -> bool {
        accept(envelope, target_date, &self.keywords)
    }

    /// First keyword contained in `sender`, if any (case-sensitive)
    pub fn excluded_by<'a>(&'a self, sender: &str) -> Option<&'a str> {
        excluded_by(sender, &self.keywords)
    }
}

pub fn accept<K: AsRef<str>>(envelope: &Envelope, target_date: &str, excluded_keywords: &[K]) -> bool {
    let Some(date) = envelope.date else {
        return false;
    };
    if date.format("%Y-%m-%d").to_string() != target_date {
        return false;
    }

    let sender = envelope.from.as_ref().map(|a| a.address.as_str()).unwrap_or("");
    if let Some(keyword) = excluded_by(sender, excluded_keywords) {
        debug!("Message de {} exclu par le filtre '{}'", sender, keyword);
        return false;
    }

    true
}

fn excluded_by<'a, K: AsRef<str>>(sender: &str, keywords: &'a [K]) -> Option<&'a str> {
    keywords
        .iter()
        .map(|k| k.as_ref())
        .find(|keyword| sender.contains(keyword))
}
