use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;

use crate::mail_filter::DEFAULT_FILTER_KEYWORDS;

#[derive(Debug, Clone)]
pub struct Config {
    pub imap: ImapConfig,
    pub report: ReportConfig,
    pub filter_keywords: Vec<String>,
    pub credentials_path: String,
}

#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub server: String,
    pub port: u16,
    pub inbox_folder: String,
    pub sent_folder: String,
    /// Number of most recent messages scanned per folder
    pub fetch_window: u32,
    /// Deadline applied to every network call
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub output_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            imap: ImapConfig {
                server: "imap.gmail.com".to_string(),
                port: 993,
                inbox_folder: "INBOX".to_string(),
                sent_folder: "[Gmail]/Sent Mail".to_string(),
                fetch_window: 500,
                timeout: Duration::from_secs(30),
            },
            report: ReportConfig {
                output_dir: ".".to_string(),
            },
            filter_keywords: DEFAULT_FILTER_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            credentials_path: "credentials.json".to_string(),
        }
    }
}

impl Config {
    /// Load the configuration from environment variables (after `.env`)
    pub fn new() -> Result<Self> {
        let defaults = Config::default();

        let filter_keywords = match std::env::var("FILTER_KEYWORDS") {
            Ok(list) => parse_keywords(&list),
            Err(_) => defaults.filter_keywords,
        };
        debug!("{} filtre(s) d'expéditeur chargé(s)", filter_keywords.len());

        let fetch_window: u32 = env_parse("FETCH_WINDOW", defaults.imap.fetch_window)?;
        if fetch_window == 0 {
            anyhow::bail!("FETCH_WINDOW doit être au moins 1");
        }

        Ok(Config {
            imap: ImapConfig {
                server: env_or("IMAP_SERVER", defaults.imap.server),
                port: env_parse("IMAP_PORT", defaults.imap.port)?,
                inbox_folder: env_or("INBOX_FOLDER", defaults.imap.inbox_folder),
                sent_folder: env_or("SENT_FOLDER", defaults.imap.sent_folder),
                fetch_window,
                timeout: Duration::from_secs(env_parse(
                    "NETWORK_TIMEOUT_SECS",
                    defaults.imap.timeout.as_secs(),
                )?),
            },
            report: ReportConfig {
                output_dir: env_or("OUTPUT_DIR", defaults.report.output_dir),
            },
            filter_keywords,
            credentials_path: env_or("CREDENTIALS_FILE", defaults.credentials_path),
        })
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Valeur invalide pour {}: '{}'", name, value)),
        Err(_) => Ok(default),
    }
}

/// Comma separated keyword list, blanks ignored
pub fn parse_keywords(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
