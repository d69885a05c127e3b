//! Configuration path resolution shared across services
//!
//! Services resolve their settings with the priority order:
//! 1. Environment variables (highest)
//! 2. TOML config file (`~/.config/opsd/config.toml`)
//! 3. Compiled defaults (fallback)

use std::path::PathBuf;

/// Platform data directory for OPSD state (database lives here)
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("opsd"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/opsd"))
}

/// Default SQLite database location
pub fn default_database_path() -> PathBuf {
    default_data_dir().join("opsd.db")
}

/// Platform config file location, if the config directory is resolvable
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("opsd").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_path_under_data_dir() {
        let db = default_database_path();
        assert!(db.starts_with(default_data_dir()));
        assert_eq!(db.file_name().unwrap(), "opsd.db");
    }
}
