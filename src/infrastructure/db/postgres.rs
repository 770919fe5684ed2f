use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Connection, PgConnection};
use std::time::Duration;
use tracing::{info, warn};

use super::loans::{InsertSummary, LoanAggregates, LoanStore};
use crate::domain::error::{AppError, Result};
use crate::domain::loan::CleanLoanRecord;
use crate::domain::statistics::LoanStatistics;

const CREATE_LOANS_TABLE: &str = "CREATE TABLE IF NOT EXISTS koha_prestamos (
    id SERIAL PRIMARY KEY,
    anio INTEGER,
    mes INTEGER CHECK (mes BETWEEN 1 AND 12),
    biblioteca TEXT,
    carrera TEXT,
    titulo TEXT,
    total_transacciones INTEGER CHECK (total_transacciones >= 0),
    fecha_carga TIMESTAMP DEFAULT NOW()
)";

const INSERT_LOAN: &str = "INSERT INTO koha_prestamos (anio, mes, biblioteca, carrera, titulo, total_transacciones)
     VALUES ($1, $2, $3, $4, $5, $6)";

/// PostgreSQL-backed loan store (production sink)
pub struct PgLoanStore {
    pool: PgPool,
}

impl PgLoanStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to PostgreSQL: {}", e)))?;

        info!(max_connections, "Connected to PostgreSQL loan store");
        Ok(Self { pool })
    }
}

async fn insert_record(conn: &mut PgConnection, record: &CleanLoanRecord) -> sqlx::Result<()> {
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
impl LoanStore for PgLoanStore {
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
            // Savepoint per row: a failed statement would otherwise abort the whole transaction
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
             ORDER BY total DESC, biblioteca COLLATE \"C\"",
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
             ORDER BY total DESC, titulo COLLATE \"C\"
             LIMIT 10",
        )
        .fetch_all(&self.pool)
        .await?;

        let top_programs: Vec<(String, i64)> = sqlx::query_as(
            "SELECT carrera, COALESCE(SUM(total_transacciones), 0) AS total
             FROM koha_prestamos
             WHERE carrera IS NOT NULL
             GROUP BY carrera
             ORDER BY total DESC, carrera COLLATE \"C\"
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
