pub mod loans;
pub mod postgres;
pub mod sqlite;

use std::sync::Arc;

use crate::domain::error::{AppError, Result};
use loans::LoanStore;
use postgres::PgLoanStore;
use sqlite::SqliteLoanStore;

/// Open the loan store matching the URL scheme and make sure its table exists
pub async fn connect_loan_store(database_url: &str, max_connections: u32) -> Result<Arc<dyn LoanStore>> {
    let store: Arc<dyn LoanStore> = if database_url.starts_with("postgres://")
        || database_url.starts_with("postgresql://")
    {
        Arc::new(PgLoanStore::connect(database_url, max_connections).await?)
    } else if database_url.starts_with("sqlite:") {
        Arc::new(SqliteLoanStore::connect(database_url, max_connections).await?)
    } else {
        return Err(AppError::ConfigError(format!(
            "Unsupported database_url scheme: {}",
            database_url.split(':').next().unwrap_or_default()
        )));
    };

    store.init_schema().await?;
    Ok(store)
}
