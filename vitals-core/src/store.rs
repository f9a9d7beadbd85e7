//! Durable store gateway (C4). Runtime `sqlx::query(...).bind(...)` style
//! throughout — grounded on `ferrex-core`'s `postgres_simple.rs`, chosen
//! over the compile-time-checked `query!` macro style used elsewhere in the
//! teacher because this workspace has no `sqlx-data.json` offline cache to
//! verify against.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::error::ErrorKind;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::domain::{AnomalyKind, Reading};
use crate::error::{PhysioError, Result};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS vitals_events (
    id BIGSERIAL PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    timestamp TIMESTAMPTZ NOT NULL,
    hr INTEGER NOT NULL,
    bp_sys INTEGER NOT NULL,
    bp_dia INTEGER NOT NULL,
    spo2 INTEGER NOT NULL,
    rr INTEGER NOT NULL,
    temp DOUBLE PRECISION NOT NULL,
    UNIQUE (patient_id, timestamp)
);

CREATE TABLE IF NOT EXISTS anomalies (
    id BIGSERIAL PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    anomaly_type TEXT NOT NULL,
    score DOUBLE PRECISION NOT NULL,
    timestamp TIMESTAMPTZ NOT NULL,
    details JSONB NOT NULL,
    UNIQUE (patient_id, timestamp, anomaly_type)
);
"#;

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .finish()
    }
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(10);
        let min_connections = std::env::var("DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(2);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .max_lifetime(Duration::from_secs(1800))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await
            .map_err(|e| PhysioError::StorageUnavailable(format!("postgres connect failed: {e}")))?;

        info!(
            "postgres pool initialized, max_connections={}, min_connections={}",
            max_connections, min_connections
        );

        Ok(Self { pool })
    }

    /// Creates the schema if it does not already exist. Idempotent; safe to
    /// call on every startup.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| PhysioError::StorageUnavailable(format!("schema init failed: {e}")))?;
        Ok(())
    }

    /// C4: `commit(reading) -> event_id`. Upserts the patient row and
    /// inserts the event row in one transaction. A unique-constraint
    /// violation on `(patient_id, timestamp)` surfaces as
    /// [`PhysioError::DuplicatePersisted`], not a generic storage error —
    /// the orchestrator (C6) treats it as a successful duplicate.
    pub async fn commit(&self, reading: &Reading) -> Result<i64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PhysioError::StorageUnavailable(format!("begin tx failed: {e}")))?;

        sqlx::query("INSERT INTO patients (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(&reading.patient_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| PhysioError::StorageUnavailable(format!("patient upsert failed: {e}")))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO vitals_events (patient_id, timestamp, hr, bp_sys, bp_dia, spo2, rr, temp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&reading.patient_id)
        .bind(reading.timestamp)
        .bind(reading.hr)
        .bind(reading.bp_sys)
        .bind(reading.bp_dia)
        .bind(reading.spo2)
        .bind(reading.rr)
        .bind(reading.temp)
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(sqlx::Error::Database(db_err)) if db_err.kind() == ErrorKind::UniqueViolation => {
                tx.rollback().await.ok();
                return Err(PhysioError::DuplicatePersisted);
            }
            Err(e) => {
                return Err(PhysioError::StorageUnavailable(format!(
                    "event insert failed: {e}"
                )));
            }
        };

        tx.commit()
            .await
            .map_err(|e| PhysioError::StorageUnavailable(format!("commit failed: {e}")))?;

        Ok(row.get::<i64, _>("id"))
    }

    /// Persists an anomaly row. Idempotent on `(patient_id, timestamp,
    /// anomaly_type)` — redelivery after a crash between classification and
    /// ack is harmless.
    pub async fn insert_anomaly(
        &self,
        patient_id: &str,
        kind: AnomalyKind,
        score: f64,
        timestamp: DateTime<Utc>,
        details: &serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO anomalies (patient_id, anomaly_type, score, timestamp, details)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (patient_id, timestamp, anomaly_type) DO NOTHING
            "#,
        )
        .bind(patient_id)
        .bind(kind.as_str())
        .bind(score)
        .bind(timestamp)
        .bind(details)
        .execute(&self.pool)
        .await
        .map_err(|e| PhysioError::Processing(format!("anomaly insert failed: {e}")))?;

        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| PhysioError::StorageUnavailable(e.to_string()))?;
        Ok(())
    }
}
