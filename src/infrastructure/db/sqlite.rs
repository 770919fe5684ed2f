use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Connection, SqliteConnection};
use std::str::FromStr;
use tracing::{info, warn};

use super::loans::{InsertSummary, LoanAggregates, LoanStore};
use crate::domain::error::{AppError, Result};
use crate::domain::loan::CleanLoanRecord;
use crate::domain::statistics::LoanStatistics;

const CREATE_LOANS_TABLE: &str = "CREATE TABLE IF NOT EXISTS koha_prestamos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    anio INTEGER,
    mes INTEGER CHECK (mes BETWEEN 1 AND 12),
    biblioteca TEXT,
    carrera TEXT,
    titulo TEXT,
    total_transacciones INTEGER CHECK (total_transacciones >= 0),
    fecha_carga DATETIME DEFAULT CURRENT_TIMESTAMP
)";

const INSERT_LOAN: &str = "INSERT INTO koha_prestamos (anio, mes, biblioteca, carrera, titulo, total_transacciones)
     VALUES (?, ?, ?, ?, ?, ?)";

/// SQLite-backed loan store for local runs and tests
pub struct SqliteLoanStore {
    pool: SqlitePool,
}

impl SqliteLoanStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to parse connection string: {}", e))
            })?
            .create_if_missing(true);

        let pool = pool_options(database_url, max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        info!(database_url, "Connected to SQLite loan store");
        Ok(Self { pool })
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// An in-memory database lives and dies with its single connection,
/// so that connection is never retired by the pool.
fn pool_options(database_url: &str, max_connections: u32) -> SqlitePoolOptions {
    if is_in_memory(database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections)
    }
}

async fn insert_record(conn: &mut SqliteConnection, record: &CleanLoanRecord) -> sqlx::Result<()> {
    sqlx::query(INSERT_LOAN)
        .bind(record.year)
        .bind(record.month)
        .bind(record.library.as_str())
        .bind(&record.program)
        .bind(&record.title)
        .bind(record.transaction_count)
        .execute(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl LoanStore for SqliteLoanStore {
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(CREATE_LOANS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create table: {}", e)))?;
        Ok(())
    }

    async fn insert(&self, record: &CleanLoanRecord) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        insert_record(&mut conn, record)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to insert loan: {}", e)))
    }

    async fn insert_all(&self, records: &[CleanLoanRecord]) -> Result<InsertSummary> {
        let mut summary = InsertSummary::default();
        let mut tx = self.pool.begin().await?;

        for (idx, record) in records.iter().enumerate() {
            let mut savepoint = Connection::begin(&mut *tx).await?;
            match insert_record(&mut savepoint, record).await {
                Ok(()) => {
                    savepoint.commit().await?;
                    summary.inserted += 1;
                }
                Err(e) => {
                    warn!(record = idx, error = %e, "Failed to insert loan record");
                    savepoint.rollback().await?;
                    summary.failed += 1;
                }
            }
        }

        tx.commit().await?;
        info!(inserted = summary.inserted, failed = summary.failed, "Stored loan records");
        Ok(summary)
    }

    async fn loan_statistics(&self) -> Result<LoanStatistics> {
        let total_records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM koha_prestamos")
            .fetch_one(&self.pool)
            .await?;

        let total_transactions: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(total_transacciones), 0) FROM koha_prestamos")
                .fetch_one(&self.pool)
                .await?;

        let by_library: Vec<(String, i64)> = sqlx::query_as(
            "SELECT biblioteca, COALESCE(SUM(total_transacciones), 0) AS total
             FROM koha_prestamos
             WHERE biblioteca IS NOT NULL
             GROUP BY biblioteca
             ORDER BY total DESC, biblioteca",
        )
        .fetch_all(&self.pool)
        .await?;

        let by_year: Vec<(i32, i64)> = sqlx::query_as(
            "SELECT anio, COALESCE(SUM(total_transacciones), 0) AS total
             FROM koha_prestamos
             WHERE anio IS NOT NULL
             GROUP BY anio
             ORDER BY anio",
        )
        .fetch_all(&self.pool)
        .await?;

        let by_month: Vec<(i32, i64)> = sqlx::query_as(
            "SELECT mes, COALESCE(SUM(total_transacciones), 0) AS total
             FROM koha_prestamos
             WHERE mes IS NOT NULL
             GROUP BY mes
             ORDER BY mes",
        )
        .fetch_all(&self.pool)
        .await?;

        let top_titles: Vec<(String, i64)> = sqlx::query_as(
            "SELECT titulo, COALESCE(SUM(total_transacciones), 0) AS total
             FROM koha_prestamos
             WHERE titulo IS NOT NULL
             GROUP BY titulo
             ORDER BY total DESC, titulo
             LIMIT 10",
        )
        .fetch_all(&self.pool)
        .await?;

        let top_programs: Vec<(String, i64)> = sqlx::query_as(
            "SELECT carrera, COALESCE(SUM(total_transacciones), 0) AS total
             FROM koha_prestamos
             WHERE carrera IS NOT NULL
             GROUP BY carrera
             ORDER BY total DESC, carrera
             LIMIT 10",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(LoanAggregates {
            total_records,
            total_transactions,
            by_library,
            by_year,
            by_month,
            top_titles,
            top_programs,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::statistics::loan_statistics;
    use crate::domain::loan::LibraryCode;

    async fn memory_store() -> SqliteLoanStore {
        let store = SqliteLoanStore::connect("sqlite::memory:", 4).await.unwrap();
        store.init_schema().await.unwrap();
        store
    }

    fn loan(year: i32, month: i32, library: LibraryCode, program: &str, title: &str, total: i32) -> CleanLoanRecord {
        CleanLoanRecord {
            year,
            month,
            library,
            program: program.to_string(),
            title: title.to_string(),
            transaction_count: total,
        }
    }

    fn sample() -> Vec<CleanLoanRecord> {
        vec![
            loan(2021, 2, LibraryCode::Cen, "Derecho", "Código Civil", 4),
            loan(2023, 2, LibraryCode::Cu, "Medicina", "Anatomía", 9),
            loan(2023, 11, LibraryCode::Cen, "Ingeniería en Sistemas", "Cálculo", 6),
            loan(2022, 7, LibraryCode::Iit, "Derecho", "Código Civil", 1),
            loan(2022, 7, LibraryCode::Icsa, "Medicina", "Fisiología", 6),
        ]
    }

    #[tokio::test]
    async fn test_round_trip_matches_in_memory_statistics() {
        let store = memory_store().await;
        let records = sample();

        let summary = store.insert_all(&records).await.unwrap();
        assert_eq!(summary, InsertSummary { inserted: 5, failed: 0 });

        let persisted = store.loan_statistics().await.unwrap();
        assert_eq!(persisted, loan_statistics(&records));
    }

    #[tokio::test]
    async fn test_failed_insert_does_not_abort_batch() {
        let store = memory_store().await;
        let mut records = sample();
        records[1].transaction_count = -3;

        let summary = store.insert_all(&records).await.unwrap();
        assert_eq!(summary, InsertSummary { inserted: 4, failed: 1 });

        let stats = store.loan_statistics().await.unwrap();
        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.total_transactions, 17);
    }

    #[tokio::test]
    async fn test_empty_store_statistics() {
        let store = memory_store().await;
        let stats = store.loan_statistics().await.unwrap();

        assert_eq!(stats, LoanStatistics::default());
    }

    #[tokio::test]
    async fn test_single_insert() {
        let store = memory_store().await;
        store
            .insert(&loan(2024, 5, LibraryCode::Dmnc, "Música", "Armonía", 2))
            .await
            .unwrap();

        let stats = store.loan_statistics().await.unwrap();
        assert_eq!(stats.total_records, 1);
        assert_eq!(stats.by_library[0].label, "DMNC");
    }

    #[test]
    fn test_in_memory_pool_keeps_its_connection() {
        let options = pool_options("sqlite::memory:", 4);
        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_idle_timeout(), None);
        assert_eq!(options.get_max_lifetime(), None);

        let options = pool_options("sqlite://loans.db", 4);
        assert_eq!(options.get_max_connections(), 4);
        assert!(options.get_idle_timeout().is_some());
    }
}
