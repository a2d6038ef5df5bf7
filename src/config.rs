use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub presign_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub timeout_secs: u64,
    pub tesseract_bin: String,
    pub tesseract_langs: String,
}

impl WorkerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 100,
            timeout_secs: 120,
            tesseract_bin: "tesseract".into(),
            tesseract_langs: "eng+ind".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    pub retention_days: i64,
    pub interval_secs: u64,
    pub batch_size: i64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            retention_days: 30,
            interval_secs: 24 * 60 * 60,
            batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub worker: WorkerConfig,
    pub cleanup: CleanupConfig,
    pub off_base_url: String,
}

pub const DEFAULT_OFF_BASE_URL: &str = "https://world.openfoodfacts.org/api/v0/product";

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "nutrisnap".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "nutrisnap-users".into()),
        };
        let storage = StorageConfig {
            endpoint: std::env::var("MINIO_ENDPOINT")?,
            bucket: std::env::var("MINIO_BUCKET").unwrap_or_else(|_| "nutrisnap".into()),
            access_key: std::env::var("MINIO_ACCESS_KEY")?,
            secret_key: std::env::var("MINIO_SECRET_KEY")?,
            region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
            presign_ttl_secs: env_or("PRESIGN_TTL_SECS", 15 * 60),
        };

        let defaults = WorkerConfig::default();
        let worker = WorkerConfig {
            workers: env_or("OCR_WORKERS", defaults.workers).max(1),
            queue_capacity: env_or("OCR_QUEUE_CAPACITY", defaults.queue_capacity).max(1),
            timeout_secs: env_or("OCR_TIMEOUT_SECS", defaults.timeout_secs),
            tesseract_bin: std::env::var("TESSERACT_BIN").unwrap_or(defaults.tesseract_bin),
            tesseract_langs: std::env::var("TESSERACT_LANGS").unwrap_or(defaults.tesseract_langs),
        };

        let defaults = CleanupConfig::default();
        let cleanup = CleanupConfig {
            retention_days: env_or("IMAGE_RETENTION_DAYS", defaults.retention_days),
            interval_secs: env_or("CLEANUP_INTERVAL_SECS", defaults.interval_secs),
            batch_size: env_or("CLEANUP_BATCH_SIZE", defaults.batch_size),
        };

        Ok(Self {
            database_url,
            jwt,
            storage,
            worker,
            cleanup,
            off_base_url: std::env::var("OFF_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OFF_BASE_URL.into()),
        })
    }
}

/// Reads a numeric variable, falling back to `default` when unset or malformed.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_numbers_fall_back_to_default() {
        std::env::set_var("NUTRISNAP_TEST_BAD_NUMBER", "two");
        assert_eq!(env_or("NUTRISNAP_TEST_BAD_NUMBER", 7usize), 7);
        std::env::set_var("NUTRISNAP_TEST_GOOD_NUMBER", "12");
        assert_eq!(env_or("NUTRISNAP_TEST_GOOD_NUMBER", 7usize), 12);
        assert_eq!(env_or("NUTRISNAP_TEST_UNSET_NUMBER", 3u64), 3);
    }

    #[test]
    fn worker_defaults() {
        let w = WorkerConfig::default();
        assert_eq!(w.queue_capacity, 100);
        assert_eq!(w.timeout(), Duration::from_secs(120));
        assert_eq!(w.tesseract_langs, "eng+ind");
    }
}
