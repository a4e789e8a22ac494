//! kfseq configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main kfseq configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KfseqConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Artifact storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Artifact retention policy
    #[serde(default)]
    pub retention: RetentionConfig,

    /// External publisher configuration
    #[serde(default)]
    pub publish: PublishConfig,
}

impl KfseqConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the store cannot honour
    pub fn validate(&self) -> crate::Result<()> {
        if self.retention.retention_secs == 0 {
            return Err(crate::Error::Config(
                "retention.retention_secs must be greater than zero".to_string(),
            ));
        }
        if self.retention.auto_sweep && self.retention.sweep_interval_secs == 0 {
            return Err(crate::Error::Config(
                "retention.sweep_interval_secs must be greater than zero when auto_sweep is on"
                    .to_string(),
            ));
        }
        if let Some(endpoint) = &self.publish.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(crate::Error::Config(format!(
                    "publish.endpoint must be an http(s) URL, got '{}'",
                    endpoint
                )));
            }
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,

    /// Base URL used when building download links. Derived from the
    /// request `Host` header when unset.
    pub public_base_url: Option<String>,

    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
            public_base_url: None,
            max_body_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Where artifact documents are physically kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    /// Byte blobs held in process memory
    Memory,
    /// One file per artifact under `base_dir`
    Disk,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend
    pub backend: StorageBackendKind,

    /// Directory for the disk backend
    pub base_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs_next::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kfseq")
            .join("artifacts");

        Self {
            backend: StorageBackendKind::Memory,
            base_dir: base,
        }
    }
}

/// Artifact retention configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Maximum artifact lifetime in seconds
    pub retention_secs: u64,

    /// Interval between periodic sweeps in seconds
    pub sweep_interval_secs: u64,

    /// Delay between a successful download and deletion, in seconds
    pub download_grace_secs: u64,

    /// Run the periodic sweep loop while serving
    pub auto_sweep: bool,
}

impl RetentionConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn download_grace(&self) -> Duration {
        Duration::from_secs(self.download_grace_secs)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_secs: 3600,
            sweep_interval_secs: 600,
            download_grace_secs: 3600,
            auto_sweep: true,
        }
    }
}

/// External publisher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Upload endpoint; publishing is disabled when unset
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Description used when a publish request omits one
    pub default_description: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 60,
            default_description: "Created with Studio Lite Animator".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KfseqConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.backend, StorageBackendKind::Memory);
        assert_eq!(config.retention.retention(), Duration::from_secs(3600));
        assert_eq!(config.retention.sweep_interval(), Duration::from_secs(600));
        assert!(config.publish.endpoint.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: KfseqConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [retention]
            retention_secs = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.retention.retention_secs, 120);
        assert_eq!(config.retention.download_grace_secs, 3600);
    }

    #[test]
    fn test_storage_backend_serialize() {
        let config: StorageConfig = toml::from_str(
            r#"
            backend = "disk"
            base_dir = "/tmp/kfseq"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, StorageBackendKind::Disk);
        assert_eq!(config.base_dir, PathBuf::from("/tmp/kfseq"));
    }

    #[test]
    fn test_validate_rejects_zero_retention() {
        let mut config = KfseqConfig::default();
        config.retention.retention_secs = 0;
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut config = KfseqConfig::default();
        config.publish.endpoint = Some("ftp://example.com".to_string());
        assert!(config.validate().is_err());

        config.publish.endpoint = Some("https://uploads.example.com/v1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("kfseq.toml");
        std::fs::write(&path, "[storage]\nbackend = \"disk\"\n").unwrap();

        let config = KfseqConfig::load(&path).unwrap();
        assert_eq!(config.storage.backend, StorageBackendKind::Disk);
    }

    #[test]
    fn test_round_trip_toml() {
        let config = KfseqConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: KfseqConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.publish.default_description, config.publish.default_description);
    }
}
