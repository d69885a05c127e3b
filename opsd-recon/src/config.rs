//! Service configuration
//!
//! Resolution priority: environment variables, then the shared TOML config
//! file, then compiled defaults.

use opsd_common::{config as common_config, Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// opsd-recon runtime configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    /// The company's own email domain; meetings on it classify as internal
    pub company_domain: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5810,
            database_path: common_config::default_database_path(),
            company_domain: String::new(),
        }
    }
}

/// `[recon]` section of the shared config file
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    database_path: Option<PathBuf>,
    company_domain: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    recon: FileConfig,
}

impl ServiceConfig {
    /// Load configuration with env > file > default priority
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = common_config::config_file_path() {
            if path.exists() {
                let contents = std::fs::read_to_string(&path)?;
                let file: ConfigFile = toml::from_str(&contents)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
                if let Some(host) = file.recon.host {
                    config.host = host;
                }
                if let Some(port) = file.recon.port {
                    config.port = port;
                }
                if let Some(db) = file.recon.database_path {
                    config.database_path = db;
                }
                if let Some(domain) = file.recon.company_domain {
                    config.company_domain = domain;
                }
            }
        }

        if let Ok(host) = std::env::var("OPSD_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("OPSD_PORT") {
            config.port = port
                .parse()
                .map_err(|_| Error::Config(format!("Invalid OPSD_PORT: {}", port)))?;
        }
        if let Ok(db) = std::env::var("OPSD_DATABASE") {
            config.database_path = PathBuf::from(db);
        }
        if let Ok(domain) = std::env::var("OPSD_COMPANY_DOMAIN") {
            config.company_domain = domain;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5810);
        assert!(config.company_domain.is_empty());
    }

    #[test]
    fn test_file_section_parses() {
        let file: ConfigFile = toml::from_str(
            r#"
            [recon]
            port = 6000
            company_domain = "meridianworks.io"
            "#,
        )
        .unwrap();
        assert_eq!(file.recon.port, Some(6000));
        assert_eq!(file.recon.company_domain.as_deref(), Some("meridianworks.io"));
    }
}
