use crate::errors::Result;
use crate::metrics::STORAGE_FAILURES_TOTAL;
use crate::model::{Device, HealthRecord, NewReading};
use crate::store::Store;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

const DEVICE_COLUMNS: &str = "id, device_id, account_id, created_at, last_active";
const RECORD_COLUMNS: &str = "device_id, spo2, pulse, temperature, recorded_at";

pub async fn make_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await?;

    info!("Database connection established");
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    Ok(pool)
}

/// PostgreSQL-backed `Store`
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Count and log a failed statement before handing it back to the caller.
fn observe<T>(op: &str, result: std::result::Result<T, sqlx::Error>) -> Result<T> {
    result.map_err(|e| {
        STORAGE_FAILURES_TOTAL.inc();
        error!("Database {} failed: {}", op, e);
        e.into()
    })
}

#[async_trait]
impl Store for PgStore {
    async fn upsert_device(&self, device_id: &str, account_id: &str) -> Result<Device> {
        let query = format!(
            "INSERT INTO devices (id, device_id, account_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (device_id) DO UPDATE
             SET account_id = EXCLUDED.account_id
             RETURNING {}",
            DEVICE_COLUMNS
        );

        let result = sqlx::query_as::<_, Device>(&query)
            .bind(Uuid::new_v4())
            .bind(device_id)
            .bind(account_id)
            .fetch_one(&self.pool)
            .await;
        observe("device upsert", result)
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<Device>> {
        let query = format!("SELECT {} FROM devices WHERE device_id = $1", DEVICE_COLUMNS);

        let result = sqlx::query_as::<_, Device>(&query)
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await;
        observe("device lookup", result)
    }

    async fn devices_for_account(&self, account_id: &str) -> Result<Vec<Device>> {
        let query = format!(
            "SELECT {} FROM devices
             WHERE account_id = $1
             ORDER BY last_active DESC",
            DEVICE_COLUMNS
        );

        let result = sqlx::query_as::<_, Device>(&query)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await;
        observe("device listing", result)
    }

    async fn insert_record(&self, reading: &NewReading) -> Result<HealthRecord> {
        // The CTE keeps the last_active bump and the insert in one statement
        let query = format!(
            "WITH touched AS (
                 UPDATE devices SET last_active = NOW() WHERE device_id = $1
             )
             INSERT INTO health_records (device_id, spo2, pulse, temperature)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            RECORD_COLUMNS
        );

        let result = sqlx::query_as::<_, HealthRecord>(&query)
            .bind(&reading.device_id)
            .bind(reading.spo2)
            .bind(reading.pulse)
            .bind(reading.temperature)
            .fetch_one(&self.pool)
            .await;
        observe("record insert", result)
    }

    async fn latest_record(&self, device_id: &str) -> Result<Option<HealthRecord>> {
        let query = format!(
            "SELECT {} FROM health_records
             WHERE device_id = $1
             ORDER BY recorded_at DESC
             LIMIT 1",
            RECORD_COLUMNS
        );

        let result = sqlx::query_as::<_, HealthRecord>(&query)
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await;
        observe("latest record lookup", result)
    }

    async fn recent_records(&self, device_id: &str, limit: i64) -> Result<Vec<HealthRecord>> {
        let query = format!(
            "SELECT {} FROM health_records
             WHERE device_id = $1
             ORDER BY recorded_at DESC
             LIMIT $2",
            RECORD_COLUMNS
        );

        let result = sqlx::query_as::<_, HealthRecord>(&query)
            .bind(device_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await;
        observe("recent records lookup", result)
    }

    async fn records_since(
        &self,
        device_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<HealthRecord>> {
        let query = format!(
            "SELECT {} FROM health_records
             WHERE device_id = $1
               AND ($2::timestamptz IS NULL OR recorded_at >= $2)
             ORDER BY recorded_at DESC",
            RECORD_COLUMNS
        );

        let result = sqlx::query_as::<_, HealthRecord>(&query)
            .bind(device_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await;
        observe("filtered records lookup", result)
    }
}
