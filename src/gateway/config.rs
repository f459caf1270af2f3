use crate::storage::StoreConfig;
use anyhow::{Context, Result};
use std::env;

const MEGABYTE: usize = 1024 * 1024;

/// Upload limits enforced by the asset endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Per-file size limit in bytes
    pub max_file_bytes: usize,
    /// Files accepted by one multi-file upload
    pub max_files: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 50 * MEGABYTE,
            max_files: 10,
        }
    }
}

impl UploadLimits {
    /// Request body ceiling: a full multi-file upload plus multipart framing.
    pub fn body_limit(&self) -> usize {
        self.max_file_bytes
            .saturating_mul(self.max_files)
            .saturating_add(MEGABYTE)
    }
}

/// Backup gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreConfig,
    pub limits: UploadLimits,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            store: StoreConfig::default(),
            limits: UploadLimits::default(),
        }
    }
}

impl GatewayConfig {
    /// Reads `BACKUP_*` variables, loading a `.env` file first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let host = env::var("BACKUP_HOST").unwrap_or(defaults.host);

        let port = match env::var("BACKUP_PORT") {
            Ok(raw) => raw.parse::<u16>().context("BACKUP_PORT must be a valid u16")?,
            Err(_) => defaults.port,
        };

        let store = env::var("BACKUP_DATA_DIR")
            .map(StoreConfig::new)
            .unwrap_or(defaults.store);

        let max_file_bytes = match env::var("BACKUP_MAX_UPLOAD_MB") {
            Ok(raw) => {
                raw.parse::<usize>()
                    .context("BACKUP_MAX_UPLOAD_MB must be a positive integer")?
                    * MEGABYTE
            }
            Err(_) => defaults.limits.max_file_bytes,
        };

        let max_files = match env::var("BACKUP_MAX_FILES") {
            Ok(raw) => raw
                .parse::<usize>()
                .context("BACKUP_MAX_FILES must be a positive integer")?,
            Err(_) => defaults.limits.max_files,
        };

        if max_file_bytes == 0 || max_files == 0 {
            anyhow::bail!("upload limits must be greater than zero");
        }

        Ok(Self {
            host,
            port,
            store,
            limits: UploadLimits {
                max_file_bytes,
                max_files,
            },
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
