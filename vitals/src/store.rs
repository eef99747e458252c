use crate::errors::Result;
use crate::model::{Device, HealthRecord, NewReading};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistence seam for devices and health records.
///
/// Every method maps to exactly one statement against the backing store.
/// Identifiers reaching this layer are already validated and trimmed.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a device, or move an existing one to `account_id`.
    async fn upsert_device(&self, device_id: &str, account_id: &str) -> Result<Device>;

    async fn find_device(&self, device_id: &str) -> Result<Option<Device>>;

    /// Devices for an account, most recently active first.
    async fn devices_for_account(&self, account_id: &str) -> Result<Vec<Device>>;

    /// Store a reading and bump the owning device's `last_active`.
    async fn insert_record(&self, reading: &NewReading) -> Result<HealthRecord>;

    async fn latest_record(&self, device_id: &str) -> Result<Option<HealthRecord>>;

    /// Newest first, at most `limit` rows.
    async fn recent_records(&self, device_id: &str, limit: i64) -> Result<Vec<HealthRecord>>;

    /// Newest first. `since = None` returns everything for the device.
    async fn records_since(
        &self,
        device_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<HealthRecord>>;
}
