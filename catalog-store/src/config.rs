//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `CATALOG_`, nested keys split on `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/catalog-store/{service_name}/config.toml
//! 4. System directory: /etc/catalog-store/{service_name}/config.toml
//! 5. Default values
//!
//! # Example
//!
//! ```toml
//! [service]
//! name = "catalog"
//! log_format = "pretty"
//!
//! [pagination]
//! default_limit = 20
//!
//! [audit]
//! failure_policy = "tolerate"
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::audit::AuditConfig;
use crate::error::Result;
use crate::repository::SortOrder;

const CONFIG_PREFIX: &str = "catalog-store";
const ENV_PREFIX: &str = "CATALOG_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Pagination defaults and limits
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Audit hook configuration
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Human-readable multi-line output
    Pretty,
}

/// Pagination defaults and limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when a request has none (or a non-positive one)
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Upper bound for the page size
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,

    /// Sort field used when a request has none
    #[serde(default = "default_sort_by")]
    pub default_sort_by: String,

    /// Sort direction used when a request has none
    #[serde(default = "default_sort_order")]
    pub default_sort_order: SortOrder,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            default_sort_by: default_sort_by(),
            default_sort_order: default_sort_order(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_limit() -> u32 {
    10
}

fn default_max_limit() -> u32 {
    100
}

fn default_sort_by() -> String {
    "createdAt".to_string()
}

fn default_sort_order() -> SortOrder {
    SortOrder::Desc
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The service name is inferred from the running binary's file name.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| CONFIG_PREFIX.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so later merges override
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the XDG and system directories. Environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Returns candidate config paths, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_PREFIX);
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Ok(path) = xdg_dirs.place_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(CONFIG_PREFIX)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: CONFIG_PREFIX.to_string(),
                log_level: default_log_level(),
                log_format: LogFormat::default(),
                environment: default_environment(),
            },
            pagination: PaginationConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditFailurePolicy;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.service.log_format, LogFormat::Json);
        assert_eq!(config.pagination.default_limit, 10);
        assert_eq!(config.pagination.max_limit, 100);
        assert_eq!(config.pagination.default_sort_by, "createdAt");
        assert_eq!(config.pagination.default_sort_order, SortOrder::Desc);
        assert!(config.audit.enabled);
        assert_eq!(config.audit.failure_policy, AuditFailurePolicy::Propagate);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[service]
name = "catalog"
log_format = "pretty"

[pagination]
default_limit = 25
default_sort_order = "asc"

[audit]
failure_policy = "tolerate"
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.service.name, "catalog");
        assert_eq!(config.service.log_format, LogFormat::Pretty);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.pagination.default_limit, 25);
        assert_eq!(config.pagination.max_limit, 100);
        assert_eq!(config.pagination.default_sort_order, SortOrder::Asc);
        assert_eq!(config.audit.failure_policy, AuditFailurePolicy::Tolerate);
        assert!(config.audit.enabled);
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.pagination.default_limit, 10);
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pagination]\ndefault_limit = \"lots\"").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(_)));
    }
}
