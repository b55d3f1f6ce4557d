//! Configuration loading and resolution.
//!
//! Supports a TOML config file, environment variables, and CLI overrides
//! with a defined priority order (CLI > env > TOML > defaults).

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{DdlsyncError, Result};

/// Helper macro to apply an optional owned value directly to a target field.
///
/// Replaces: `if let Some(v) = $opt { $target = v; }`
macro_rules! apply_option {
    ($opt:expr => $target:expr) => {
        if let Some(v) = $opt {
            $target = v;
        }
    };
}

/// Helper macro to clone a borrowed optional value directly to a target field.
///
/// Replaces: `if let Some(ref v) = $opt { $target = v.clone(); }`
macro_rules! apply_option_clone {
    ($opt:expr => $target:expr) => {
        if let Some(ref v) = $opt {
            $target = v.clone();
        }
    };
}

const DEFAULT_CONFIG_FILE: &str = "ddlsync.toml";

/// Server-wide defaults used to resolve inherited character sets and collations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    pub character_set_server: String,
    pub collation_server: String,
    /// Default collation of every known character set.
    pub charset_collations: HashMap<String, String>,
    /// `Y` or `N`.
    pub default_encryption: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        let charset_collations = [
            ("utf8mb4", "utf8mb4_0900_ai_ci"),
            ("utf8mb3", "utf8mb3_general_ci"),
            ("utf8", "utf8_general_ci"),
            ("latin1", "latin1_swedish_ci"),
            ("ascii", "ascii_general_ci"),
            ("binary", "binary"),
            ("utf16", "utf16_general_ci"),
            ("utf32", "utf32_general_ci"),
            ("ucs2", "ucs2_general_ci"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        GlobalConfig {
            character_set_server: "utf8mb4".to_string(),
            collation_server: "utf8mb4_0900_ai_ci".to_string(),
            charset_collations,
            default_encryption: "N".to_string(),
        }
    }
}

impl GlobalConfig {
    /// The default collation of `charset`, if the server knows it.
    pub fn default_collation_for(&self, charset: &str) -> Option<&str> {
        let found = self
            .charset_collations
            .get(&charset.to_lowercase())
            .map(String::as_str);
        if found.is_none() {
            log::warn!("No default collation configured; charset={}", charset);
        }
        found
    }
}

/// Which databases take part in a comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSettings {
    /// When non-empty, `CREATE DATABASE` of any other name is rejected.
    pub databases: Vec<String>,
}

/// Top-level ddlsync configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DdlsyncConfig {
    pub server: GlobalConfig,
    pub schema: SchemaSettings,
}

// ── TOML deserialization structs ──

#[derive(Deserialize, Default)]
struct TomlConfig {
    server: Option<TomlServerConfig>,
    schema: Option<TomlSchemaSettings>,
}

#[derive(Deserialize, Default)]
struct TomlServerConfig {
    character_set_server: Option<String>,
    collation_server: Option<String>,
    default_encryption: Option<String>,
    charset_collations: Option<HashMap<String, String>>,
}

#[derive(Deserialize, Default)]
struct TomlSchemaSettings {
    databases: Option<Vec<String>>,
}

/// CLI overrides that take highest priority.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override the databases taking part in the comparison.
    pub databases: Option<Vec<String>>,
    /// Override the server character set.
    pub character_set_server: Option<String>,
    /// Override the server collation.
    pub collation_server: Option<String>,
}

impl DdlsyncConfig {
    /// Load configuration with the following priority (highest wins):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. TOML config file
    /// 4. Built-in defaults
    pub fn load(config_path: Option<&str>, overrides: &CliOverrides) -> Result<Self> {
        let mut config = DdlsyncConfig::default();

        // Layer 3: TOML config file
        let toml_path = config_path.unwrap_or(DEFAULT_CONFIG_FILE);
        if let Ok(content) = std::fs::read_to_string(toml_path) {
            let toml_config: TomlConfig = toml::from_str(&content).map_err(|e| {
                DdlsyncError::ConfigError(format!(
                    "Failed to parse config file '{}': {}",
                    toml_path, e
                ))
            })?;
            config.apply_toml(toml_config);
            log::debug!("Loaded config file; path={}", toml_path);
        } else if config_path.is_some() {
            return Err(DdlsyncError::ConfigError(format!(
                "Config file '{}' not found",
                toml_path
            )));
        }

        // Layer 2: Environment variables
        config.apply_env();

        // Layer 1: CLI overrides
        config.apply_cli(overrides);

        config.validate()?;
        Ok(config)
    }

    fn apply_toml(&mut self, toml: TomlConfig) {
        if let Some(s) = toml.server {
            apply_option!(s.character_set_server => self.server.character_set_server);
            apply_option!(s.collation_server => self.server.collation_server);
            apply_option!(s.default_encryption => self.server.default_encryption);
            if let Some(pairs) = s.charset_collations {
                self.server.charset_collations.extend(pairs);
            }
        }

        if let Some(s) = toml.schema {
            apply_option!(s.databases => self.schema.databases);
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("DDLSYNC_CHARACTER_SET_SERVER") {
            self.server.character_set_server = v;
        }
        if let Ok(v) = std::env::var("DDLSYNC_COLLATION_SERVER") {
            self.server.collation_server = v;
        }
        if let Ok(v) = std::env::var("DDLSYNC_DEFAULT_ENCRYPTION") {
            self.server.default_encryption = v;
        }
        if let Ok(v) = std::env::var("DDLSYNC_DATABASES") {
            self.schema.databases = split_list(&v);
        }
    }

    fn apply_cli(&mut self, overrides: &CliOverrides) {
        apply_option_clone!(overrides.databases => self.schema.databases);
        apply_option_clone!(overrides.character_set_server => self.server.character_set_server);
        apply_option_clone!(overrides.collation_server => self.server.collation_server);
    }

    fn validate(&self) -> Result<()> {
        if self.server.character_set_server.is_empty() {
            return Err(DdlsyncError::ConfigError(
                "character_set_server must not be empty".to_string(),
            ));
        }
        if self.server.collation_server.is_empty() {
            return Err(DdlsyncError::ConfigError(
                "collation_server must not be empty".to_string(),
            ));
        }
        match self.server.default_encryption.as_str() {
            "Y" | "N" => Ok(()),
            other => Err(DdlsyncError::ConfigError(format!(
                "Invalid default_encryption '{}'. Use 'Y' or 'N'.",
                other
            ))),
        }
    }
}

/// Split a comma-separated list, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DdlsyncConfig::default();
        assert_eq!(config.server.character_set_server, "utf8mb4");
        assert_eq!(config.server.collation_server, "utf8mb4_0900_ai_ci");
        assert_eq!(config.server.default_encryption, "N");
        assert!(config.schema.databases.is_empty());
        assert_eq!(
            config.server.default_collation_for("LATIN1"),
            Some("latin1_swedish_ci")
        );
        assert_eq!(config.server.default_collation_for("klingon"), None);
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
[server]
character_set_server = "latin1"
collation_server = "latin1_swedish_ci"

[server.charset_collations]
cp1251 = "cp1251_general_ci"

[schema]
databases = ["app", "audit"]
"#;

        let toml_config: TomlConfig = toml::from_str(toml_str).unwrap();
        let mut config = DdlsyncConfig::default();
        config.apply_toml(toml_config);

        assert_eq!(config.server.character_set_server, "latin1");
        assert_eq!(config.server.collation_server, "latin1_swedish_ci");
        assert_eq!(
            config.server.default_collation_for("cp1251"),
            Some("cp1251_general_ci")
        );
        assert_eq!(
            config.server.default_collation_for("utf8mb4"),
            Some("utf8mb4_0900_ai_ci")
        );
        assert_eq!(config.schema.databases, vec!["app", "audit"]);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = DdlsyncConfig::default();
        let overrides = CliOverrides {
            databases: Some(vec!["db1".to_string()]),
            character_set_server: Some("utf8mb3".to_string()),
            collation_server: None,
        };

        config.apply_cli(&overrides);

        assert_eq!(config.schema.databases, vec!["db1"]);
        assert_eq!(config.server.character_set_server, "utf8mb3");
        assert_eq!(config.server.collation_server, "utf8mb4_0900_ai_ci");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[schema]\ndatabases = [\"shop\"]").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = DdlsyncConfig::load(
            Some(&path),
            &CliOverrides {
                databases: Some(vec!["billing".to_string()]),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.schema.databases, vec!["billing"]);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let err = DdlsyncConfig::load(path.to_str(), &CliOverrides::default()).unwrap_err();
        assert!(matches!(err, DdlsyncError::ConfigError(ref m) if m.contains("not found")));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\ncharacter_set_server = ").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let err = DdlsyncConfig::load(Some(&path), &CliOverrides::default()).unwrap_err();
        assert!(matches!(err, DdlsyncError::ConfigError(ref m) if m.contains("Failed to parse")));
    }

    #[test]
    fn test_invalid_encryption_rejected() {
        let mut config = DdlsyncConfig::default();
        config.server.default_encryption = "maybe".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }
}
