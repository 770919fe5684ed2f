use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::domain::error::Result;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::connect_loan_store;
use crate::infrastructure::sheets::GoogleSheetsClient;
use crate::interfaces::http::{start_server, HttpState};

/// Load configuration, connect the collaborators and serve until shutdown
pub async fn run() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = AppConfig::load()?;
    let database_url = config.require_database_url()?;

    let store = connect_loan_store(database_url, config.max_connections).await?;
    let sheets = Arc::new(GoogleSheetsClient::new(
        config.sheets_base_url.clone(),
        config.sheets_credentials(),
    ));
    if config.sheets_credentials().is_none() {
        warn!("No Google credentials configured; usage endpoints will fail until one is set");
    }

    let state = HttpState::new(store, sheets, &config);
    start_server(state, &config)?.await?;

    info!("HTTP server stopped");
    Ok(())
}
