use crate::error::{AppError, AppResult};
use crate::models::StoredCredential;
use crate::utils::fs::{remove_if_exists, write_private};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

const DATA_DIR: &str = ".metricgate";
const CREDENTIALS_FILE: &str = "credentials.json";

pub fn get_data_dir() -> Result<PathBuf, String> {
    fn ensure_dir(path: &PathBuf) -> Result<(), String> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| format!("failed_to_create_data_dir: {}", e))?;
        }
        Ok(())
    }
    if let Ok(env_path) = std::env::var("DATA_DIR") {
        if !env_path.trim().is_empty() {
            let data_dir = PathBuf::from(env_path);
            ensure_dir(&data_dir)?;
            return Ok(data_dir);
        }
    }
    if cfg!(test) {
        let data_dir =
            std::env::temp_dir().join(format!(".metricgate-test-{}", std::process::id()));
        ensure_dir(&data_dir)?;
        return Ok(data_dir);
    }

    if let Some(home) = dirs::home_dir() {
        let data_dir = home.join(DATA_DIR);
        if ensure_dir(&data_dir).is_ok() {
            return Ok(data_dir);
        }
    }
    let fallback_dir = std::env::temp_dir().join(DATA_DIR);
    ensure_dir(&fallback_dir)?;
    Ok(fallback_dir)
}

/// Owner-only JSON file holding the API key next to the permission cache.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CREDENTIALS_FILE),
        }
    }

    pub fn from_data_dir() -> AppResult<Self> {
        let dir = get_data_dir().map_err(AppError::Credential)?;
        Ok(Self::new(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files read as "no credential".
    pub fn load(&self) -> Option<StoredCredential> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to read credential file {:?}: {}", self.path, e);
                }
                return None;
            }
        };
        match serde_json::from_str::<StoredCredential>(&content) {
            Ok(credential) if !credential.api_key.trim().is_empty() => Some(credential),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Ignoring unparseable credential file: {}", e);
                None
            }
        }
    }

    /// Stores `api_key`, keeping the original `created_at` when the key is unchanged.
    pub fn save(&self, api_key: &str) -> AppResult<StoredCredential> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AppError::Credential("api_key_must_not_be_empty".to_string()));
        }
        let credential = match self.load() {
            Some(existing) if existing.api_key == api_key => existing,
            _ => StoredCredential::new(api_key.to_string()),
        };
        self.write(&credential)?;
        tracing::info!("Credential saved to {:?}", self.path);
        Ok(credential)
    }

    /// Updates only `last_validated`; a missing credential is left alone.
    pub fn touch_validated(&self, api_key: &str) -> AppResult<bool> {
        let Some(mut credential) = self.load() else {
            return Ok(false);
        };
        if credential.api_key != api_key {
            return Ok(false);
        }
        credential.last_validated = Some(Utc::now());
        self.write(&credential)?;
        Ok(true)
    }

    pub fn clear(&self) -> AppResult<()> {
        if remove_if_exists(&self.path)? {
            tracing::info!("Credential file removed");
        }
        Ok(())
    }

    fn write(&self, credential: &StoredCredential) -> AppResult<()> {
        let content = serde_json::to_vec_pretty(credential)?;
        write_private(&self.path, &content)
            .map_err(|e| AppError::Credential(format!("failed_to_save_credential: {}", e)))
    }
}
