//! Application Configuration
//!
//! YAML configuration with sensible defaults. A missing config file is not
//! an error; the defaults describe a fully working local deployment.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Object storage configuration
    pub storage: StorageConfig,
    /// Private-object access gate configuration
    pub private_access: PrivateAccessConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Number of worker threads
    pub workers: usize,
    /// Maximum payload size in bytes
    pub max_payload_size: u64,
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Filesystem directory all objects live under
    pub base_path: String,
    /// URL mount name objects are served beneath (`/<mount>/...`)
    pub mount: String,
    /// Optional path prefix inserted between the root and object directories
    pub prefix: Option<String>,
    /// Overrides the `/<mount>` base when building public URLs
    pub base_url: Option<String>,
    /// Verbose logging of candidate matching during delete
    pub debug: bool,
    /// Reject uploads whose directory hint sanitizes to nothing
    pub strict_hints: bool,
    /// Remove empty ancestor directories after a successful delete
    pub prune_dirs: bool,
    /// Remove empty metadata folders after a successful delete
    pub prune_folders: bool,
    /// Reuse the virtual folder hint as the physical hint when none is given
    pub reuse_virtual_hint: bool,
    /// URL path segment marking the start of the object path at delete time;
    /// defaults to the mount name when unset
    pub url_marker: Option<String>,
    /// Prefix stored filenames with a random token so names are not guessable
    pub random_names: bool,
    /// SQLite database file backing the metadata-folder store
    pub folder_db_path: String,
}

/// Private-object access gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateAccessConfig {
    /// Enable the private folder and its access gate
    pub enabled: bool,
    /// Name of the private folder under the storage root
    pub folder_name: String,
    /// Signed-URL lifetime in seconds (minimum 1)
    pub ttl_secs: i64,
    /// Shared secret for URL signing; empty disables signed URLs
    pub secret: String,
    /// Principal field compared against the owner path segment
    pub owner_field: String,
    /// Bearer tokens accepted as privileged callers
    pub privileged_tokens: Vec<String>,
    /// Bearer token to subject mapping for ordinary callers
    pub user_tokens: HashMap<String, String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Path to log configuration file
    pub config_file: String,
}

impl AppConfig {
    /// Load configuration from `config.yaml`, use defaults if not found
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from("config.yaml")
    }

    /// Load configuration from a specific file, use defaults if not found
    pub fn load_from(config_path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        if Path::new(config_path).exists() {
            let content = fs::read_to_string(config_path)?;
            let config: AppConfig = serde_yaml::from_str(&content)?;
            info!("Loaded configuration from {}", config_path);
            Ok(config)
        } else {
            warn!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// The effective delete-time URL marker
    pub fn url_marker(&self) -> &str {
        self.storage.url_marker.as_deref().unwrap_or(&self.storage.mount)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 9720,
                workers: 4,
                max_payload_size: 268435456, // 256MB
            },
            storage: StorageConfig {
                base_path: "./data/uploads".to_string(),
                mount: "uploads".to_string(),
                prefix: None,
                base_url: None,
                debug: false,
                strict_hints: false,
                prune_dirs: true,
                prune_folders: true,
                reuse_virtual_hint: false,
                url_marker: None,
                random_names: false,
                folder_db_path: "./data/folders.sqlite".to_string(),
            },
            private_access: PrivateAccessConfig {
                enabled: true,
                folder_name: "private".to_string(),
                ttl_secs: crate::signing::DEFAULT_TTL_SECS,
                secret: String::new(),
                owner_field: "id".to_string(),
                privileged_tokens: Vec::new(),
                user_tokens: HashMap::new(),
            },
            logging: LoggingConfig {
                config_file: "server_log.yaml".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_consistent() {
        let config = AppConfig::default();
        assert_eq!(config.storage.mount, "uploads");
        assert_eq!(config.url_marker(), "uploads");
        assert_eq!(config.private_access.folder_name, "private");
        assert!(config.private_access.ttl_secs >= crate::signing::MIN_TTL_SECS);
    }

    #[test]
    fn test_marker_override() {
        let mut config = AppConfig::default();
        config.storage.url_marker = Some("files".to_string());
        assert_eq!(config.url_marker(), "files");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from("/nonexistent/vault-drive-config.yaml").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = AppConfig::default();
        config.storage.strict_hints = true;
        config.private_access.secret = "s3cret".to_string();

        let mut file = fs::File::create(&path).unwrap();
        file.write_all(serde_yaml::to_string(&config).unwrap().as_bytes())
            .unwrap();

        let loaded = AppConfig::load_from(path.to_str().unwrap()).unwrap();
        assert!(loaded.storage.strict_hints);
        assert_eq!(loaded.private_access.secret, "s3cret");
    }
}
