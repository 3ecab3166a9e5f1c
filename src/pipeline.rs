use chrono::NaiveDate;
use log::{error, info, warn};

use crate::config::Config;
use crate::credentials::Credentials;
use crate::email::{AccountSummary, MailConnector, MailSession, MessageRecord};
use crate::error::{ReportError, Result};
use crate::fetcher::MailFetcher;
use crate::mail_filter::MailFilter;
use crate::progress::Progress;
use crate::report_writer::ReportWriter;

/// Sequences authenticate → received folder → sent folder → report
pub struct ReportPipeline {
    config: Config,
    filter: MailFilter,
    writer: ReportWriter,
}

impl ReportPipeline {
    pub fn new(config: Config) -> Self {
        let filter = MailFilter::new(config.filter_keywords.clone());
        let writer = ReportWriter::new(&config.report.output_dir);
        ReportPipeline {
            config,
            filter,
            writer,
        }
    }

    pub fn writer(&self) -> &ReportWriter {
        &self.writer
    }

    /// Process every account in order and append their records to the
    /// report of `target_date`
    ///
    /// Stops at the first fatal error; reports already written by earlier
    /// accounts are kept.
    pub async fn run<C: MailConnector>(
        &self,
        connector: &C,
        accounts: &[Credentials],
        target_date: &str,
        progress: &Progress,
    ) -> Result<Vec<AccountSummary>> {
        validate_date(target_date)?;
        info!("🚀 Rapport du {} ({} compte(s))", target_date, accounts.len());

        let mut summaries = Vec::with_capacity(accounts.len());
        let share = 1.0 / accounts.len().max(1) as f64;

        for (index, account) in accounts.iter().enumerate() {
            let account_progress = progress.scoped(index as f64 * share, share);
            account_progress.report(0.0, format!("Connecting as {}...", account.email));

            let mut session = connector.connect(account).await.map_err(|e| {
                error!("❌ Impossible d'ouvrir une session pour {}: {}", account.email, e);
                e
            })?;

            let result = self
                .process_account(&mut session, &account.email, target_date, &account_progress)
                .await;

            // Déconnexion dans tous les cas
            if let Err(e) = session.logout().await {
                warn!("⚠️  Échec de la déconnexion de {}: {}", account.email, e);
            }

            match result {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    error!("❌ Erreur lors du traitement de {}: {}", account.email, e);
                    return Err(e);
                }
            }
        }

        progress.report(1.0, "Done");
        info!("✅ Rapport du {} terminé", target_date);
        Ok(summaries)
    }

    /// Fetch the received then the sent folder of an authenticated session
    /// and append the merged records to the date's report
    ///
    /// When a folder is cut short by a fatal error, the sent folder is not
    /// scanned, the records accepted so far are still written and the error
    /// is returned afterwards.
    pub async fn process_account<S: MailSession + ?Sized>(
        &self,
        session: &mut S,
        account: &str,
        target_date: &str,
        progress: &Progress,
    ) -> Result<AccountSummary> {
        info!("📧 Traitement des emails de {}", account);

        let fetcher = MailFetcher::new(&self.filter, self.config.imap.fetch_window, self.config.imap.timeout);
        let folders = [
            (
                self.config.imap.inbox_folder.as_str(),
                format!("Fetching received emails for {}...", account),
            ),
            (
                self.config.imap.sent_folder.as_str(),
                format!("Fetching sent emails for {}...", account),
            ),
        ];

        let mut records: Vec<MessageRecord> = Vec::new();
        let mut scanned = 0;
        let mut warnings = 0;
        let mut skipped_folders = Vec::new();
        let mut fatal = None;

        for (index, (folder, status)) in folders.iter().enumerate() {
            let folder_progress = progress.scoped(index as f64 * 0.5, 0.5);
            match fetcher
                .fetch_folder(&mut *session, folder, account, target_date, &folder_progress, status)
                .await
            {
                Ok(report) => {
                    scanned += report.scanned;
                    warnings += report.warnings.len();
                    records.extend(report.records);
                    if report.error.is_some() {
                        fatal = report.error;
                        break;
                    }
                }
                Err(e) if e.is_folder_scoped() => {
                    warn!("⚠️  Dossier ignoré pour {}: {}", account, e);
                    skipped_folders.push(folder.to_string());
                    folder_progress.report(1.0, status.as_str());
                }
                Err(e) => {
                    fatal = Some(e);
                    break;
                }
            }
        }

        progress.report(1.0, format!("Writing report for {}...", account));
        let records_written = records.len();
        let report_path = self.writer.write(records, target_date)?;
        info!(
            "💾 Emails écrits dans le fichier: {} enregistrement(s) sur {} message(s) analysé(s)",
            records_written, scanned
        );

        if let Some(e) = fatal {
            warn!(
                "⚠️  Rapport partiel pour {}: {} enregistrement(s) écrits avant l'erreur",
                account, records_written
            );
            return Err(e);
        }

        Ok(AccountSummary {
            account: account.to_string(),
            scanned,
            records_written,
            warnings,
            skipped_folders,
            report_path,
        })
    }
}

/// Check that `target_date` is a real `YYYY-MM-DD` calendar date
pub fn validate_date(target_date: &str) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(target_date, "%Y-%m-%d")
        .map_err(|_| ReportError::InvalidDate(target_date.to_string()))?;
    // Reject non-padded forms such as 2024-3-1, which never match envelope dates
    if date.format("%Y-%m-%d").to_string() != target_date {
        return Err(ReportError::InvalidDate(target_date.to_string()));
    }
    Ok(date)
}
