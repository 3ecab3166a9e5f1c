use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::{error, info, warn};

use mailreport::config::Config;
use mailreport::credentials::{CredentialStore, Credentials};
use mailreport::imap_client::ImapConnector;
use mailreport::pipeline::{validate_date, ReportPipeline};
use mailreport::progress::Progress;

#[derive(Parser)]
#[command(name = "mailreport")]
#[command(about = "Exporte dans un rapport texte les emails reçus et envoyés un jour donné")]
#[command(version = "0.1.0")]
struct Args {
    /// Date du rapport au format YYYY-MM-DD (par défaut: aujourd'hui)
    #[arg(short, long)]
    date: Option<String>,

    /// Adresse email du compte à traiter (sinon: comptes sauvegardés)
    #[arg(short, long, requires = "password")]
    email: Option<String>,

    /// Mot de passe (ou mot de passe d'application) du compte
    #[arg(short, long, requires = "email")]
    password: Option<String>,

    /// Sauvegarder le compte donné dans le fichier de credentials
    #[arg(long, requires = "email")]
    save: bool,

    /// Répertoire de sortie des rapports
    #[arg(short = 'o', long)]
    output_dir: Option<String>,

    /// Vérifier la configuration sans se connecter
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger le fichier .env s'il existe
    dotenv::dotenv().ok();

    // Parser les arguments CLI
    let args = Args::parse();

    // Initialiser le logging
    env_logger::init();

    info!("🚀 Démarrage de mailreport");

    // Charger la configuration
    let mut config = Config::new()?;
    if let Some(output_dir) = &args.output_dir {
        config.report.output_dir = output_dir.clone();
    }

    let store = CredentialStore::new(&config.credentials_path);

    // Si demandé, vérifier seulement la configuration
    if args.check_config {
        println!("✅ Configuration valide !");
        println!("📧 Serveur IMAP: {}:{}", config.imap.server, config.imap.port);
        println!("📥 Dossier reçus: {}", config.imap.inbox_folder);
        println!("📤 Dossier envoyés: {}", config.imap.sent_folder);
        println!("🔎 Fenêtre: {} derniers messages", config.imap.fetch_window);
        println!("⏱️  Timeout réseau: {}s", config.imap.timeout.as_secs());
        println!("🚫 Filtres: {}", config.filter_keywords.join(", "));
        println!("🔑 Credentials: {}", config.credentials_path);
        println!("📁 Répertoire rapports: {}", config.report.output_dir);
        return Ok(());
    }

    let target_date = match args.date {
        Some(date) => date,
        None => Local::now().format("%Y-%m-%d").to_string(),
    };
    validate_date(&target_date).with_context(|| format!("Date invalide: {}", target_date))?;

    // Comptes: celui de la ligne de commande, sinon ceux sauvegardés
    let accounts = match (args.email, args.password) {
        (Some(email), Some(password)) => {
            let credentials = Credentials::new(email, password);
            if args.save {
                store.save(&credentials)?;
            }
            vec![credentials]
        }
        _ => store.load()?,
    };

    if accounts.is_empty() {
        error!("❌ Aucun compte configuré");
        anyhow::bail!(
            "Aucun compte: utilisez --email/--password ou renseignez {}",
            config.credentials_path
        );
    }

    let connector = ImapConnector::new(config.imap.clone());
    let pipeline = Arc::new(ReportPipeline::new(config));
    let (progress, mut updates) = Progress::channel();

    // Le pipeline tourne dans sa propre tâche, celle-ci n'affiche que la progression
    let task = {
        let pipeline = Arc::clone(&pipeline);
        let target_date = target_date.clone();
        tokio::spawn(async move {
            pipeline
                .run(&connector, &accounts, &target_date, &progress)
                .await
        })
    };

    while let Some(update) = updates.recv().await {
        println!("[{:>3.0}%] {}", update.fraction * 100.0, update.status);
    }

    let summaries = match task.await.context("Tâche de traitement interrompue")? {
        Ok(summaries) => summaries,
        Err(e) => {
            error!("❌ Erreur lors du traitement des emails: {}", e);
            return Err(e.into());
        }
    };

    for summary in &summaries {
        if !summary.skipped_folders.is_empty() {
            warn!(
                "⚠️  {}: dossiers ignorés: {}",
                summary.account,
                summary.skipped_folders.join(", ")
            );
        }
        info!(
            "✅ {}: {} emails analysés, {} écrits dans {}",
            summary.account,
            summary.scanned,
            summary.records_written,
            summary.report_path.display()
        );
    }

    Ok(())
}
