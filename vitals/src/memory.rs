use crate::errors::Result;
use crate::model::{Device, HealthRecord, NewReading};
use crate::store::Store;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// In-process `Store` backed by vectors.
///
/// Timestamps come from a clock that never repeats, so ordering by
/// `last_active` or `recorded_at` is deterministic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    queries: Arc<AtomicUsize>,
}

#[derive(Debug, Default)]
struct Inner {
    devices: Vec<Device>,
    records: Vec<HealthRecord>,
    last_tick: Option<DateTime<Utc>>,
}

impl Inner {
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_tick {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_tick = Some(next);
        next
    }

    fn newest_first(&self, device_id: &str) -> Vec<HealthRecord> {
        let mut records: Vec<HealthRecord> = self
            .records
            .iter()
            .filter(|r| r.device_id == device_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        records
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record with an explicit timestamp, bypassing the clock.
    pub fn seed_record(&self, record: HealthRecord) {
        self.lock().records.push(record);
    }

    /// Number of store calls served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn device_count(&self) -> usize {
        self.lock().devices.len()
    }

    pub fn record_count(&self) -> usize {
        self.lock().records.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means another test thread panicked mid-write
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self) -> MutexGuard<'_, Inner> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.lock()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_device(&self, device_id: &str, account_id: &str) -> Result<Device> {
        let mut inner = self.begin();

        if let Some(device) = inner.devices.iter_mut().find(|d| d.device_id == device_id) {
            device.account_id = account_id.to_string();
            return Ok(device.clone());
        }

        let now = inner.tick();
        let device = Device {
            id: Uuid::new_v4(),
            device_id: device_id.to_string(),
            account_id: account_id.to_string(),
            created_at: now,
            last_active: now,
        };
        inner.devices.push(device.clone());
        Ok(device)
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<Device>> {
        let inner = self.begin();
        Ok(inner.devices.iter().find(|d| d.device_id == device_id).cloned())
    }

    async fn devices_for_account(&self, account_id: &str) -> Result<Vec<Device>> {
        let inner = self.begin();
        let mut devices: Vec<Device> = inner
            .devices
            .iter()
            .filter(|d| d.account_id == account_id)
            .cloned()
            .collect();
        devices.sort_by(|a, b| b.last_active.cmp(&a.last_active));
        Ok(devices)
    }

    async fn insert_record(&self, reading: &NewReading) -> Result<HealthRecord> {
        let mut inner = self.begin();
        let now = inner.tick();

        if let Some(device) = inner
            .devices
            .iter_mut()
            .find(|d| d.device_id == reading.device_id)
        {
            device.last_active = now;
        }

        let record = HealthRecord {
            device_id: reading.device_id.clone(),
            spo2: reading.spo2,
            pulse: reading.pulse,
            temperature: reading.temperature,
            recorded_at: now,
        };
        inner.records.push(record.clone());
        Ok(record)
    }

    async fn latest_record(&self, device_id: &str) -> Result<Option<HealthRecord>> {
        let inner = self.begin();
        Ok(inner.newest_first(device_id).into_iter().next())
    }

    async fn recent_records(&self, device_id: &str, limit: i64) -> Result<Vec<HealthRecord>> {
        let inner = self.begin();
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(inner.newest_first(device_id).into_iter().take(limit).collect())
    }

    async fn records_since(
        &self,
        device_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<HealthRecord>> {
        let inner = self.begin();
        Ok(inner
            .newest_first(device_id)
            .into_iter()
            .filter(|r| since.map_or(true, |cutoff| r.recorded_at >= cutoff))
            .collect())
    }
}
