use std::time::Duration;

use futures::stream::StreamExt;
use log::{debug, info, warn};

use crate::email::{FetchWindow, FolderReport, MailSession, MailType, MessageRecord, RawMessage};
use crate::error::{ReportError, Result};
use crate::imap_client::with_deadline;
use crate::mail_filter::MailFilter;
use crate::mime_decoder::MimeDecoder;
use crate::progress::Progress;

/// Scans the most recent messages of a folder and keeps those of one day
pub struct MailFetcher<'f> {
    filter: &'f MailFilter,
    window_size: u32,
    timeout: Duration,
}

impl<'f> MailFetcher<'f> {
    pub fn new(filter: &'f MailFilter, window_size: u32, timeout: Duration) -> Self {
        Self {
            filter,
            window_size,
            timeout,
        }
    }

    /// Select `folder`, stream its fetch window and build a record for every
    /// accepted message
    ///
    /// `progress` advances by `1 / window` after each scanned message, kept
    /// or not. Only a SELECT failure is returned as `Err`. A FETCH, stream or
    /// deadline failure stops the window and is stored in
    /// [`FolderReport::error`], next to the records accepted before it.
    pub async fn fetch_folder<S: MailSession + ?Sized>(
        &self,
        session: &mut S,
        folder: &str,
        account: &str,
        target_date: &str,
        progress: &Progress,
        status: &str,
    ) -> Result<FolderReport> {
        info!("📂 Récupération des messages de {}...", folder);
        progress.report(0.0, status);

        let exists = session.select(folder).await?;
        let mut report = FolderReport {
            folder: folder.to_string(),
            ..Default::default()
        };

        let Some(window) = FetchWindow::last(exists, self.window_size) else {
            info!("Dossier {} vide", folder);
            progress.report(1.0, status);
            return Ok(report);
        };
        info!(
            "🔎 Analyse des messages {} de {} ({} message(s))",
            window.sequence_set(),
            folder,
            window.len()
        );

        let step = 1.0 / window.len() as f64;
        let mut messages = match session.fetch(window).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("❌ FETCH impossible sur {}: {}", folder, e);
                report.error = Some(e);
                return Ok(report);
            }
        };

        loop {
            let next = with_deadline(self.timeout, "FETCH response", async {
                Ok::<_, ReportError>(messages.next().await)
            })
            .await;

            let message = match next {
                Ok(Some(Ok(message))) => message,
                Ok(None) => break,
                Ok(Some(Err(e))) | Err(e) => {
                    warn!(
                        "❌ Lecture de {} interrompue après {} message(s): {}",
                        folder, report.scanned, e
                    );
                    report.error = Some(e);
                    break;
                }
            };
            report.scanned += 1;

            if let Some(record) = self.process_message(message, account, target_date, &mut report.warnings) {
                report.records.push(record);
            }

            progress.report(report.scanned as f64 * step, status);
        }

        info!(
            "Traitement de {} terminé: {} analysé(s), {} retenu(s), {} avertissement(s)",
            folder,
            report.scanned,
            report.records.len(),
            report.warnings.len()
        );
        Ok(report)
    }

    /// Filter one message and decode it when accepted
    pub fn process_message(
        &self,
        message: RawMessage,
        account: &str,
        target_date: &str,
        warnings: &mut Vec<ReportError>,
    ) -> Option<MessageRecord> {
        if !self.filter.accept(&message.envelope, target_date) {
            return None;
        }
        // Dates are always present on accepted envelopes
        let date = message.envelope.date?;

        let (from, from_name) = message
            .envelope
            .from
            .map(|a| (a.address, a.name))
            .unwrap_or_default();
        let (to, to_name) = message
            .envelope
            .to
            .map(|a| (a.address, a.name))
            .unwrap_or_default();

        debug!("Message {} de {} retenu", message.sequence, from);

        let decoded = match &message.body {
            Some(body) => MimeDecoder::decode(body),
            None => {
                warn!("⚠️  Message {} sans corps", message.sequence);
                Default::default()
            }
        };

        for warning in decoded.warnings {
            warn!("⚠️  Message {} de {}: {}", message.sequence, from, warning);
            warnings.push(warning);
        }

        let mail_type = MailType::classify(&from, account);
        Some(MessageRecord {
            date,
            from,
            from_name,
            to,
            to_name,
            content: decoded.content,
            attachments: decoded.attachments,
            mail_type,
        })
    }
}
