use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, Result};
use crate::domain::loan::IngestionConfig;
use crate::infrastructure::sheets::SheetsCredentials;

pub const CONFIG_FILE: &str = "biblio.toml";

/// Variables read without a prefix, as the deployment already defines them
const SHARED_ENV_KEYS: [&str; 4] = [
    "DATABASE_URL",
    "SHEET_USO_COMPUTADORAS",
    "GOOGLE_API_KEY",
    "GOOGLE_ACCESS_TOKEN",
];

/// Prefix for every other setting, e.g. `BIBLIO_PORT`
const ENV_PREFIX: &str = "BIBLIO_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    /// Default usage-form spreadsheet when a request does not name one
    pub sheet_uso_computadoras: Option<String>,
    pub sheet_range: String,
    pub google_api_key: Option<String>,
    pub google_access_token: Option<String>,
    pub sheets_base_url: String,
    pub min_year: i32,
    pub preview_size: usize,
    pub max_connections: u32,
    pub cors_origin: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: "127.0.0.1".to_string(),
            port: 8000,
            sheet_uso_computadoras: None,
            sheet_range: "A:Z".to_string(),
            google_api_key: None,
            google_access_token: None,
            sheets_base_url: "https://sheets.googleapis.com/v4".to_string(),
            min_year: 2020,
            preview_size: 20,
            max_connections: 5,
            cors_origin: None,
        }
    }
}

impl AppConfig {
    /// Defaults, then `biblio.toml`, then the process environment (after `.env`)
    pub fn load() -> Result<Self> {
        // A missing .env is fine; real deployments set the environment directly
        let _ = dotenvy::dotenv();
        Self::figment(CONFIG_FILE).extract().map_err(AppError::from)
    }

    pub fn figment(config_file: &str) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_file))
            .merge(Env::raw().only(&SHARED_ENV_KEYS))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// The loan endpoints cannot run without a database
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| AppError::ConfigError("DATABASE_URL is not configured".to_string()))
    }

    /// An access token wins over an API key when both are set
    pub fn sheets_credentials(&self) -> Option<SheetsCredentials> {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());

        non_empty(&self.google_access_token)
            .map(SheetsCredentials::AccessToken)
            .or_else(|| non_empty(&self.google_api_key).map(SheetsCredentials::ApiKey))
    }

    pub fn ingestion_config(&self) -> IngestionConfig {
        IngestionConfig {
            min_year: self.min_year,
            preview_size: self.preview_size,
            ..IngestionConfig::default()
        }
    }
}
