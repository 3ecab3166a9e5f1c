// Library exports for mailreport crate
// This allows tests and the binary to use the modules

pub mod config;
pub mod credentials;
pub mod email;
pub mod error;
pub mod progress;

// IMAP access and message scanning
pub mod fetcher;
pub mod imap_client;
pub mod mail_filter;

// Message decoding and report output
pub mod content_extractor;
pub mod mime_decoder;
pub mod report_writer;

pub mod pipeline;
