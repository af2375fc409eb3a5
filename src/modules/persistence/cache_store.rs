use crate::error::{AppError, AppResult};
use crate::models::{CacheMetadata, CacheRecord, ParsedLimits, PermissionSummary, Tier};
use crate::modules::auth::credential::get_data_dir;
use crate::utils::fs::{remove_if_exists, write_private};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

pub const CACHE_VERSION: &str = "1.0";
pub const CREDENTIAL_PREFIX_LEN: usize = 8;
const CACHE_FILE_STEM: &str = "permissions_cache";

pub fn credential_prefix(api_key: &str) -> String {
    api_key.chars().take(CREDENTIAL_PREFIX_LEN).collect()
}

fn normalize_url(service_url: &str) -> &str {
    service_url.trim().trim_end_matches('/')
}

fn url_digest(service_url: &str) -> String {
    let digest = Sha256::digest(normalize_url(service_url).as_bytes());
    digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Why a stored record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheRejection {
    Version,
    ServiceUrl,
    Account,
    Expired,
}

/// One permission snapshot file per service URL inside the cache directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    ttl: Duration,
}

impl CacheStore {
    pub fn new(dir: impl AsRef<Path>, ttl_days: u32) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            ttl: Duration::days(i64::from(ttl_days)),
        }
    }

    pub fn from_data_dir(ttl_days: u32) -> AppResult<Self> {
        let dir = get_data_dir().map_err(AppError::Cache)?;
        Ok(Self::new(dir, ttl_days))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn path_for(&self, service_url: &str) -> PathBuf {
        self.dir
            .join(format!("{}-{}.json", CACHE_FILE_STEM, url_digest(service_url)))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn build_record(
        &self,
        service_url: &str,
        api_key: &str,
        raw_response: serde_json::Value,
        parsed: ParsedLimits,
        summary: PermissionSummary,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> CacheRecord {
        CacheRecord {
            version: CACHE_VERSION.to_string(),
            metadata: CacheMetadata {
                service_url: normalize_url(service_url).to_string(),
                credential_prefix: credential_prefix(api_key),
                cached_at: now,
                expires_at: now + self.ttl,
                tier,
            },
            raw_response,
            parsed,
            summary,
        }
    }

    pub fn check(
        &self,
        record: &CacheRecord,
        service_url: &str,
        prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<(), CacheRejection> {
        if record.version != CACHE_VERSION {
            return Err(CacheRejection::Version);
        }
        if normalize_url(&record.metadata.service_url) != normalize_url(service_url) {
            return Err(CacheRejection::ServiceUrl);
        }
        if record.metadata.credential_prefix != prefix {
            return Err(CacheRejection::Account);
        }
        let deadline = record
            .metadata
            .expires_at
            .min(record.metadata.cached_at + self.ttl);
        if now >= deadline {
            return Err(CacheRejection::Expired);
        }
        Ok(())
    }

    pub fn is_valid(
        &self,
        record: &CacheRecord,
        service_url: &str,
        prefix: &str,
        now: DateTime<Utc>,
    ) -> bool {
        match self.check(record, service_url, prefix, now) {
            Ok(()) => true,
            Err(reason) => {
                tracing::info!(reason = ?reason, "Permission cache rejected");
                false
            }
        }
    }

    /// `None` for a missing, unreadable or structurally invalid file.
    pub fn read(&self, service_url: &str) -> Option<CacheRecord> {
        let path = self.path_for(service_url);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to read permission cache {:?}: {}", path, e);
                }
                return None;
            }
        };
        match serde_json::from_str::<CacheRecord>(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Discarding unparseable permission cache: {}", e);
                None
            }
        }
    }

    pub fn write(&self, record: &CacheRecord) -> AppResult<PathBuf> {
        let path = self.path_for(&record.metadata.service_url);
        let content = serde_json::to_vec_pretty(record)?;
        write_private(&path, &content)
            .map_err(|e| AppError::Cache(format!("failed_to_write_permission_cache: {}", e)))?;
        tracing::info!(
            tier = %record.metadata.tier,
            expires_at = %record.metadata.expires_at,
            "Permission cache written"
        );
        Ok(path)
    }

    pub fn invalidate(&self, service_url: &str) -> AppResult<()> {
        if remove_if_exists(&self.path_for(service_url))? {
            tracing::info!("Permission cache invalidated");
        }
        Ok(())
    }

    /// Removes every permission cache file in the directory, whatever URL produced it.
    pub fn clear_all(&self) -> AppResult<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut removed = 0usize;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(CACHE_FILE_STEM) && name.ends_with(".json") {
                if remove_if_exists(&entry.path())? {
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            tracing::info!(removed, "Permission caches cleared");
        }
        Ok(removed)
    }
}
