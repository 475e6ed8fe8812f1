use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::backend::database::DatabaseBackendConfig;
use crate::import::ImportSettings;
use crate::models::{AddressType, CustomFieldDefinition, Department, PatronGroup, ServicePoint};

lazy_static! {
    static ref ENV_VAR_PATTERN: Regex =
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").unwrap();
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<SeedConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendConfig {
    #[serde(rename = "type")]
    pub backend_type: String,
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(rename = "type")]
    pub db_type: String,
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImportConfig {
    /// Tag applied to imported accounts when a batch names no source type
    #[serde(default = "default_source_type")]
    pub default_source_type: String,
    /// Upper bound on records reconciled at the same time
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_source_type() -> String {
    "import".to_string()
}

fn default_max_concurrency() -> usize {
    1
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_source_type: default_source_type(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl ImportConfig {
    pub fn settings(&self) -> ImportSettings {
        ImportSettings {
            default_source_type: self.default_source_type.clone(),
            max_concurrency: self.max_concurrency,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_access_log")]
    pub access_log: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_access_log() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            access_log: default_access_log(),
        }
    }
}

/// Reference data inserted into the directory at startup
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub struct SeedConfig {
    #[serde(default)]
    pub patron_groups: Vec<PatronGroup>,
    #[serde(default)]
    pub address_types: Vec<AddressType>,
    #[serde(default)]
    pub service_points: Vec<ServicePoint>,
    #[serde(default)]
    pub departments: Vec<Department>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldDefinition>,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, String> {
        let path = config_path.as_ref();

        if !path.exists() {
            return Err(format!("Configuration file not found: {}", path.display()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let expanded_content = Self::expand_env_vars(&content)?;

        let app_config: AppConfig = serde_yaml::from_str(&expanded_content)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Zero-config mode: in-memory directory on localhost
    pub fn default_config() -> Self {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            backend: BackendConfig {
                backend_type: "database".to_string(),
                database: Some(DatabaseConfig {
                    db_type: "sqlite".to_string(),
                    url: ":memory:".to_string(),
                    max_connections: 1,
                }),
            },
            import: ImportConfig::default(),
            logging: LoggingConfig::default(),
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.backend.backend_type != "database" {
            return Err(format!(
                "Unsupported backend type: {}",
                self.backend.backend_type
            ));
        }
        self.database_backend_config()?;

        if self.import.max_concurrency == 0 {
            return Err("import.max_concurrency must be greater than 0".to_string());
        }
        if self.import.default_source_type.trim().is_empty() {
            return Err("import.default_source_type cannot be empty".to_string());
        }

        Ok(())
    }

    /// Storage settings for `BackendFactory`
    pub fn database_backend_config(&self) -> Result<DatabaseBackendConfig, String> {
        let database = self
            .backend
            .database
            .as_ref()
            .ok_or_else(|| "Database configuration is required".to_string())?;

        let config = match database.db_type.to_lowercase().as_str() {
            "sqlite" => DatabaseBackendConfig::sqlite(database.url.clone())
                .with_max_connections(database.max_connections),
            other => return Err(format!("Unsupported database type: {}", other)),
        };
        config.validate()?;

        Ok(config)
    }

    /// Expand environment variables in format ${VAR_NAME} or ${VAR_NAME:-default}
    fn expand_env_vars(content: &str) -> Result<String, String> {
        let mut missing = None;
        let expanded = ENV_VAR_PATTERN.replace_all(content, |caps: &Captures| {
            let name = &caps[1];
            match std::env::var(name) {
                Ok(value) => value,
                Err(_) => match caps.get(2) {
                    Some(default) => default.as_str().to_string(),
                    None => {
                        missing.get_or_insert_with(|| name.to_string());
                        String::new()
                    }
                },
            }
        });

        match missing {
            Some(name) => Err(format!(
                "Environment variable {} not found and no default provided",
                name
            )),
            None => Ok(expanded.into_owned()),
        }
    }
}
