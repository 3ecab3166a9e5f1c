use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::email::MessageRecord;
use crate::error::{ReportError, Result};

pub const RECORD_SEPARATOR: &str = "========================================================";

/// Appends daily report blocks to `<output_dir>/<YYYYMMDD>.txt`
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Report path for a `YYYY-MM-DD` date
    pub fn report_path(&self, target_date: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.txt", target_date.replace('-', "")))
    }

    /// Sort `records` by date (stable) and append them to the date's report
    ///
    /// The file is created when missing and never truncated, so running twice
    /// for the same date accumulates both record sets.
    pub fn write(&self, mut records: Vec<MessageRecord>, target_date: &str) -> Result<PathBuf> {
        records.sort_by_key(|record| record.date);

        let path = self.report_path(target_date);
        fs::create_dir_all(&self.output_dir).map_err(|e| ReportError::io(&self.output_dir, e))?;

        if path.exists() {
            info!("📝 Ajout au fichier existant {}...", path.display());
        } else {
            info!("📝 Création du fichier {}...", path.display());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ReportError::io(&path, e))?;

        let mut writer = BufWriter::new(file);
        for record in &records {
            Self::write_record(&mut writer, record).map_err(|e| ReportError::io(&path, e))?;
        }
        writer.flush().map_err(|e| ReportError::io(&path, e))?;

        info!("✅ {} enregistrement(s) écrits dans {}", records.len(), path.display());
        Ok(path)
    }

    fn write_record<W: Write>(writer: &mut W, record: &MessageRecord) -> std::io::Result<()> {
        debug!("Écriture du message de {} du {}", record.from, record.date);

        write!(writer, "{}\n\n", RECORD_SEPARATOR)?;
        writeln!(writer, "Mail Type: {}", record.mail_type)?;
        writeln!(writer, "Sender address: {}", record.from)?;
        writeln!(writer, "Sender name: {}", record.from_name)?;
        writeln!(writer, "Receiver address: {}", record.to)?;
        writeln!(writer, "Receiver name: {}", record.to_name)?;
        writeln!(writer, "Date: {}", record.date.format("%Y-%m-%d %H:%M:%S"))?;
        for (i, attachment) in record.attachments.iter().enumerate() {
            writeln!(writer, "Attached file{} name: {}", i + 1, attachment.filename)?;
        }
        write!(writer, "Content: {}\n\n", record.content)?;
        Ok(())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::{Attachment, MailType};
    use chrono::DateTime;

    fn record(date: &str, from: &str, content: &str) -> MessageRecord {
        MessageRecord {
            date: DateTime::parse_from_rfc3339(date).unwrap(),
            from: from.to_string(),
            from_name: String::new(),
            to: "user@x.com".to_string(),
            to_name: "User".to_string(),
            content: content.to_string(),
            attachments: Vec::new(),
            mail_type: MailType::Received,
        }
    }

    #[test]
    fn test_report_path_strips_separators() {
        let writer = ReportWriter::new("/var/reports");
        assert_eq!(writer.report_path("2024-03-01"), PathBuf::from("/var/reports/20240301.txt"));
    }

    #[test]
    fn test_block_layout() {
        let mut rec = record("2024-03-01T09:15:07+01:00", "friend@y.com", "Hello");
        rec.from_name = "Friend".to_string();
        rec.attachments = vec![Attachment::new("a.pdf"), Attachment::new("b.png")];

        let mut out = Vec::new();
        ReportWriter::write_record(&mut out, &rec).unwrap();

        let expected = "========================================================\n\n\
                        Mail Type: Received\n\
                        Sender address: friend@y.com\n\
                        Sender name: Friend\n\
                        Receiver address: user@x.com\n\
                        Receiver name: User\n\
                        Date: 2024-03-01 09:15:07\n\
                        Attached file1 name: a.pdf\n\
                        Attached file2 name: b.png\n\
                        Content: Hello\n\n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_records_sorted_with_stable_ties() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let records = vec![
            record("2024-03-01T12:00:00+00:00", "late@y.com", "late"),
            record("2024-03-01T08:00:00+00:00", "first-tie@y.com", "tie 1"),
            record("2024-03-01T08:00:00+00:00", "second-tie@y.com", "tie 2"),
            record("2024-03-01T07:00:00+00:00", "early@y.com", "early"),
        ];
        let path = writer.write(records, "2024-03-01").unwrap();

        let text = fs::read_to_string(path).unwrap();
        let order: Vec<&str> = text
            .lines()
            .filter_map(|l| l.strip_prefix("Content: "))
            .collect();
        assert_eq!(order, vec!["early", "tie 1", "tie 2", "late"]);
    }

    #[test]
    fn test_empty_run_still_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("nested"));
        let path = writer.write(Vec::new(), "2024-03-01").unwrap();
        assert!(path.exists());
        assert_eq!(fs::read_to_string(path).unwrap(), "");
    }
}
