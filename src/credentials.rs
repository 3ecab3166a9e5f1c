use std::fmt;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"********")
            .finish()
    }
}

/// JSON list of saved accounts (`[{"email": ..., "password": ...}]`)
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Saved accounts, or an empty list when the file does not exist yet
    pub fn load(&self) -> Result<Vec<Credentials>> {
        if !self.path.exists() {
            debug!("Pas de fichier de credentials {:?}", self.path);
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Impossible de lire le fichier de credentials {:?}", self.path))?;
        let accounts: Vec<Credentials> = serde_json::from_str(&content)
            .with_context(|| format!("Fichier de credentials invalide {:?}", self.path))?;

        debug!("{} compte(s) chargé(s) depuis {:?}", accounts.len(), self.path);
        Ok(accounts)
    }

    /// Append an account to the saved list
    pub fn save(&self, credentials: &Credentials) -> Result<()> {
        if credentials.email.is_empty() {
            anyhow::bail!("L'email ne peut pas être vide");
        }
        if credentials.password.is_empty() {
            anyhow::bail!("Le mot de passe ne peut pas être vide");
        }

        let mut accounts = self.load()?;
        accounts.push(credentials.clone());

        let json = serde_json::to_string_pretty(&accounts)
            .context("Impossible de sérialiser les credentials")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Impossible d'écrire le fichier de credentials {:?}", self.path))?;

        info!("🔑 Credentials sauvegardés pour {}", credentials.email);
        Ok(())
    }
}
