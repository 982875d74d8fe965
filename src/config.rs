//! Configuration types for catalog-dl
//!
//! The configuration is persisted as a JSON document. A missing file falls
//! back to the defaults below, which are then written back out so operators
//! have a file to edit.

use crate::error::{Error, Result};
use crate::types::Store;
use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};
use utoipa::ToSchema;

/// Placeholder written over secrets before configuration leaves the process
pub const REDACTED: &str = "***REDACTED***";

/// Largest accepted worker or concurrency limit (the admission semaphore's capacity)
pub const MAX_WORKER_LIMIT: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Download behavior configuration (directories, concurrency, progress)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Destination directory for finalized files (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Scratch directory for partial downloads (default: "./temp")
    ///
    /// Must differ from `download_dir` so a partial file is never visible
    /// under a final name.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Maximum simultaneously running downloads (default: 3)
    #[serde(default = "default_max_concurrent", alias = "maxDownloadWorkers")]
    pub max_concurrent_downloads: usize,

    /// Upper bound on pooled HTTP connections per host (default: 5)
    #[serde(default = "default_max_global_workers", alias = "maxGlobalWorkers")]
    pub max_global_workers: usize,

    /// Minimum progress advance, in percentage points, between reports (default: 10)
    #[serde(default = "default_progress_step")]
    pub progress_step_percent: u8,

    /// Read buffer size for the streaming loop in bytes (default: 32 KiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            temp_dir: default_temp_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            max_global_workers: default_max_global_workers(),
            progress_step_percent: default_progress_step(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Catalog service connection settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CatalogConfig {
    /// Which catalog backend to resolve tracks against
    #[serde(default)]
    pub store: Store,

    /// Public hostname accepted in submitted track URLs
    #[serde(default = "default_public_host")]
    pub public_host: String,

    /// API base URL of the Beatport backend
    #[serde(default = "default_beatport_base_url")]
    pub beatport_base_url: String,

    /// API base URL of the Beatsource backend
    #[serde(default = "default_beatsource_base_url")]
    pub beatsource_base_url: String,

    /// Requested quality tier (default: "lossless")
    #[serde(default = "default_quality")]
    pub quality: String,

    /// Per-request timeout for catalog API calls in seconds (default: 40)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Optional HTTP proxy for catalog traffic
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// OAuth client id sent with token refresh requests
    #[serde(default)]
    pub client_id: Option<String>,

    /// Pre-provisioned access token
    #[serde(default)]
    pub access_token: Option<String>,

    /// Pre-provisioned refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            store: Store::default(),
            public_host: default_public_host(),
            beatport_base_url: default_beatport_base_url(),
            beatsource_base_url: default_beatsource_base_url(),
            quality: default_quality(),
            request_timeout_secs: default_request_timeout_secs(),
            proxy_url: None,
            client_id: None,
            access_token: None,
            refresh_token: None,
        }
    }
}

impl CatalogConfig {
    /// Per-request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// API base URL for a store
    pub fn base_url(&self, store: Store) -> &str {
        match store {
            Store::Beatport => &self.beatport_base_url,
            Store::Beatsource => &self.beatsource_base_url,
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Optional API key; when set, requests must carry a matching X-Api-Key header
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser extensions and web frontends (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins ("*" allows any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Serve Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: false,
        }
    }
}

/// Main configuration document
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Catalog connection settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Load the configuration at `path`, writing defaults there if it does not exist
    pub fn load_or_init(path: &Path) -> Result<Self> {
        match std::fs::read(path) {
            Ok(bytes) => {
                let config: Config =
                    serde_json::from_slice(&bytes).map_err(|e| Error::Config {
                        message: format!("failed to parse {}: {}", path.display(), e),
                        key: None,
                    })?;
                config.validate()?;
                tracing::info!(path = %path.display(), "Loaded configuration");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Config::default();
                match config.save(path) {
                    Ok(()) => {
                        tracing::info!(path = %path.display(), "Wrote default configuration")
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to write default configuration")
                    }
                }
                Ok(config)
            }
            Err(e) => Err(Error::Config {
                message: format!("failed to read {}: {}", path.display(), e),
                key: None,
            }),
        }
    }

    /// Persist the configuration as pretty JSON.
    ///
    /// Written to a sibling temp file first and renamed over `path`, so a
    /// crash mid-write never leaves a truncated document behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = temp_sibling(path);
        std::fs::write(&tmp_path, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Async variant of [`Config::save`] for use on the runtime
    pub async fn save_async(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = temp_sibling(path);
        tokio::fs::write(&tmp_path, serde_json::to_vec_pretty(self)?).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    /// Check invariants that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be greater than 0".to_string(),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }
        if self.download.max_concurrent_downloads > MAX_WORKER_LIMIT {
            return Err(Error::Config {
                message: format!("max_concurrent_downloads must not exceed {}", MAX_WORKER_LIMIT),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }
        if self.download.max_global_workers == 0 {
            return Err(Error::Config {
                message: "max_global_workers must be greater than 0".to_string(),
                key: Some("max_global_workers".to_string()),
            });
        }
        if self.download.max_global_workers > MAX_WORKER_LIMIT {
            return Err(Error::Config {
                message: format!("max_global_workers must not exceed {}", MAX_WORKER_LIMIT),
                key: Some("max_global_workers".to_string()),
            });
        }
        if self.download.chunk_size == 0 {
            return Err(Error::Config {
                message: "chunk_size must be greater than 0".to_string(),
                key: Some("chunk_size".to_string()),
            });
        }
        if self.download.temp_dir == self.download.download_dir {
            return Err(Error::Config {
                message: "temp_dir must differ from download_dir".to_string(),
                key: Some("temp_dir".to_string()),
            });
        }
        Ok(())
    }

    /// Copy of the configuration with credentials replaced by [`REDACTED`]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for secret in [
            &mut config.catalog.access_token,
            &mut config.catalog.refresh_token,
            &mut config.api.api_key,
        ] {
            if secret.is_some() {
                *secret = Some(REDACTED.to_string());
            }
        }
        config
    }
}

/// Body of `PUT|POST /config`
///
/// Accepts either the flat fields or the full configuration document as
/// returned by `GET /config`; flat fields win when both are present. Other
/// sections of the document are ignored. Values are signed so non-positive
/// submissions are rejected with a validation message instead of a parse
/// error.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ConfigUpdate {
    /// New concurrency limit (required, must be > 0)
    #[serde(default, alias = "maxDownloadWorkers")]
    pub max_concurrent_downloads: Option<i64>,

    /// New connection pool bound (must be > 0 when present)
    #[serde(default, alias = "maxGlobalWorkers")]
    pub max_global_workers: Option<i64>,

    /// The `download` section of a full configuration document
    #[serde(default)]
    pub download: Option<DownloadLimits>,
}

/// Runtime-changeable subset of [`DownloadConfig`]
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct DownloadLimits {
    /// See [`DownloadConfig::max_concurrent_downloads`]
    #[serde(default, alias = "maxDownloadWorkers")]
    pub max_concurrent_downloads: Option<i64>,

    /// See [`DownloadConfig::max_global_workers`]
    #[serde(default, alias = "maxGlobalWorkers")]
    pub max_global_workers: Option<i64>,
}

impl ConfigUpdate {
    /// Parse a request body, reporting malformed JSON or mistyped values as
    /// [`Error::Config`]
    pub fn from_json(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| Error::Config {
            message: format!("Invalid configuration document: {}", e),
            key: None,
        })
    }

    /// Validate the update, returning the accepted (max_concurrent_downloads, max_global_workers)
    pub fn validate(&self) -> Result<(usize, Option<usize>)> {
        let nested = self.download.as_ref();
        let max_concurrent = self
            .max_concurrent_downloads
            .or_else(|| nested.and_then(|d| d.max_concurrent_downloads));
        let max_global = self
            .max_global_workers
            .or_else(|| nested.and_then(|d| d.max_global_workers));

        let max_concurrent = match max_concurrent {
            Some(v) => checked_limit(v, "max_concurrent_downloads")?,
            None => return Err(invalid_limit("max_concurrent_downloads")),
        };
        let max_global = max_global
            .map(|v| checked_limit(v, "max_global_workers"))
            .transpose()?;

        Ok((max_concurrent, max_global))
    }
}

/// Accept `1..=MAX_WORKER_LIMIT`
fn checked_limit(value: i64, key: &str) -> Result<usize> {
    usize::try_from(value)
        .ok()
        .filter(|v| (1..=MAX_WORKER_LIMIT).contains(v))
        .ok_or_else(|| invalid_limit(key))
}

fn invalid_limit(key: &str) -> Error {
    Error::Config {
        message: format!("Invalid {} value", key),
        key: Some(key.to_string()),
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    PathBuf::from(tmp_name)
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_max_concurrent() -> usize {
    3
}

fn default_max_global_workers() -> usize {
    5
}

fn default_progress_step() -> u8 {
    10
}

fn default_chunk_size() -> usize {
    32 * 1024
}

fn default_public_host() -> String {
    "www.beatport.com".to_string()
}

fn default_beatport_base_url() -> String {
    "https://api.beatport.com/v4".to_string()
}

fn default_beatsource_base_url() -> String {
    "https://api.beatsource.com/v4".to_string()
}

fn default_quality() -> String {
    "lossless".to_string()
}

fn default_request_timeout_secs() -> u64 {
    40
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.download.max_concurrent_downloads, 3);
        assert_eq!(config.download.max_global_workers, 5);
        assert_eq!(config.download.chunk_size, 32 * 1024);
        assert_eq!(config.download.progress_step_percent, 10);
        assert_eq!(config.catalog.request_timeout(), Duration::from_secs(40));
        assert_eq!(config.catalog.public_host, "www.beatport.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_writes_defaults_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config::load_or_init(&path).unwrap();
        assert_eq!(config.download.max_concurrent_downloads, 3);
        assert!(path.exists(), "defaults should be written back");

        let reloaded = Config::load_or_init(&path).unwrap();
        assert_eq!(reloaded.download.max_concurrent_downloads, 3);
    }

    #[test]
    fn save_then_load_round_trips_concurrency() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.download.max_concurrent_downloads = 7;
        config.save(&path).unwrap();

        let loaded = Config::load_or_init(&path).unwrap();
        assert_eq!(loaded.download.max_concurrent_downloads, 7);
        assert!(!dir.path().join("config.json.tmp").exists());
    }

    #[test]
    fn worker_aliases_are_accepted() {
        let config: Config = serde_json::from_str(
            r#"{"download": {"maxGlobalWorkers": 8, "maxDownloadWorkers": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.download.max_global_workers, 8);
        assert_eq!(config.download.max_concurrent_downloads, 2);
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Config::load_or_init(&path).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn zero_concurrency_in_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"download": {"max_concurrent_downloads": 0}}"#).unwrap();

        assert!(Config::load_or_init(&path).is_err());
    }

    #[test]
    fn update_rejects_non_positive_values() {
        for value in [Some(0), Some(-3), None] {
            let update = ConfigUpdate {
                max_concurrent_downloads: value,
                ..Default::default()
            };
            assert!(update.validate().is_err(), "{value:?} should be rejected");
        }

        let update = ConfigUpdate {
            max_concurrent_downloads: Some(4),
            max_global_workers: Some(0),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update: ConfigUpdate = serde_json::from_str(r#"{"maxDownloadWorkers": 4}"#).unwrap();
        assert_eq!(update.validate().unwrap(), (4, None));
    }

    #[test]
    fn update_rejects_limits_beyond_semaphore_capacity() {
        let update = ConfigUpdate {
            max_concurrent_downloads: Some(i64::MAX),
            ..Default::default()
        };
        let err = update.validate().unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(ref k), .. } if k == "max_concurrent_downloads"));

        let update = ConfigUpdate {
            max_concurrent_downloads: Some(2),
            max_global_workers: Some(i64::MAX),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn oversized_limit_in_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            format!(r#"{{"download": {{"max_concurrent_downloads": {}}}}}"#, i64::MAX),
        )
        .unwrap();

        let err = Config::load_or_init(&path).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn update_reads_the_full_document() {
        let mut document = serde_json::to_value(Config::default()).unwrap();
        document["download"]["max_concurrent_downloads"] = 5.into();
        document["download"]["max_global_workers"] = 9.into();

        let update = ConfigUpdate::from_json(document.to_string().as_bytes()).unwrap();
        assert_eq!(update.validate().unwrap(), (5, Some(9)));

        let update = ConfigUpdate::from_json(
            br#"{"max_concurrent_downloads": 2, "download": {"max_concurrent_downloads": 7}}"#,
        )
        .unwrap();
        assert_eq!(update.validate().unwrap(), (2, None));
    }

    #[test]
    fn mistyped_update_is_a_config_error() {
        let bodies: [&[u8]; 3] = [br#"{"max_concurrent_downloads": "abc"}"#, b"{ nope", b""];
        for body in bodies {
            let err = ConfigUpdate::from_json(body).unwrap_err();
            assert!(matches!(err, Error::Config { .. }));
        }
    }

    #[tokio::test]
    async fn async_save_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.download.max_global_workers = 11;
        config.save_async(&path).await.unwrap();

        let loaded = Config::load_or_init(&path).unwrap();
        assert_eq!(loaded.download.max_global_workers, 11);
        assert!(!dir.path().join("nested").join("config.json.tmp").exists());
    }

    #[test]
    fn redaction_hides_credentials_only() {
        let mut config = Config::default();
        config.catalog.access_token = Some("access".into());
        config.catalog.refresh_token = Some("refresh".into());
        config.api.api_key = Some("key".into());

        let redacted = config.redacted();
        assert_eq!(redacted.catalog.access_token.as_deref(), Some(REDACTED));
        assert_eq!(redacted.catalog.refresh_token.as_deref(), Some(REDACTED));
        assert_eq!(redacted.api.api_key.as_deref(), Some(REDACTED));
        assert!(redacted.catalog.client_id.is_none());
    }
}
