use crate::errors::{Error, Result};
use crate::metrics::{FILTERED_RECORDS, INVALID_RECORDS_TOTAL, RECORDS_INGESTED_TOTAL};
use crate::model::{FilteredRecordSet, HealthRecord, NewReading};
use crate::store::Store;
use crate::validate::{require_id, validate};
use crate::window::TimeWindow;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_RECENT_LIMIT: i64 = 5;
pub const MAX_RECENT_LIMIT: i64 = 100;

/// Ingest and query biometric readings
#[derive(Clone)]
pub struct HealthRecords {
    store: Arc<dyn Store>,
}

impl HealthRecords {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Validates and stores a reading. Nothing is written if validation fails.
    pub async fn ingest(&self, reading: NewReading) -> Result<HealthRecord> {
        if let Err(e) = validate(&reading) {
            // Logged once at the HTTP boundary
            INVALID_RECORDS_TOTAL.inc();
            return Err(e);
        }

        let reading = NewReading {
            device_id: reading.device_id.trim().to_string(),
            ..reading
        };
        let record = self.store.insert_record(&reading).await?;
        RECORDS_INGESTED_TOTAL.inc();
        debug!("Stored reading for device {}", record.device_id);
        Ok(record)
    }

    pub async fn get_latest(&self, device_id: &str) -> Result<HealthRecord> {
        let device_id = require_id("deviceId", device_id)?;

        self.store
            .latest_record(device_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No records found for device {}", device_id)))
    }

    /// Up to `limit` newest records. Defaults to 5 and is capped at 100.
    pub async fn get_recent(
        &self,
        device_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<HealthRecord>> {
        let device_id = require_id("deviceId", device_id)?;
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT);
        if limit < 1 {
            return Err(Error::Validation(format!(
                "limit must be at least 1, got {}",
                limit
            )));
        }

        self.store
            .recent_records(device_id, limit.min(MAX_RECENT_LIMIT))
            .await
    }

    /// Records inside `window` with their averages.
    ///
    /// `window` is parsed before the store is touched, so an unknown filter
    /// never reaches the database.
    pub async fn get_filtered(&self, device_id: &str, window: &str) -> Result<FilteredRecordSet> {
        let device_id = require_id("deviceId", device_id)?;
        let window: TimeWindow = window.parse()?;

        let records = self
            .store
            .records_since(device_id, window.cutoff(Utc::now()))
            .await?;
        FILTERED_RECORDS.observe(records.len() as f64);
        debug!(
            "Window {} for device {} matched {} records",
            window,
            device_id,
            records.len()
        );

        Ok(FilteredRecordSet::new(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::registry::DeviceRegistry;
    use chrono::{DateTime, Duration};
    use rand::Rng;
    use std::collections::HashSet;

    fn service() -> (HealthRecords, MemoryStore) {
        let store = MemoryStore::new();
        (HealthRecords::new(Arc::new(store.clone())), store)
    }

    fn reading(device_id: &str, spo2: i32, pulse: i32, temperature: f64) -> NewReading {
        NewReading {
            device_id: device_id.to_string(),
            spo2,
            pulse,
            temperature,
        }
    }

    fn aged(device_id: &str, spo2: i32, recorded_at: DateTime<Utc>) -> HealthRecord {
        HealthRecord {
            device_id: device_id.to_string(),
            spo2,
            pulse: 70,
            temperature: 98.0,
            recorded_at,
        }
    }

    #[tokio::test]
    async fn test_ingest_then_latest() {
        let (records, _) = service();
        let stored = records.ingest(reading("dev-1", 98, 72, 98.6)).await.unwrap();
        let latest = records.get_latest("dev-1").await.unwrap();

        assert_eq!(stored, latest);
        assert_eq!(latest.spo2, 98);
        assert_eq!(latest.pulse, 72);
        assert_eq!(latest.temperature, 98.6);
    }

    #[tokio::test]
    async fn test_sampled_valid_readings_round_trip() {
        let (records, _) = service();
        let mut rng = rand::thread_rng();

        for _ in 0..200 {
            let spo2 = rng.gen_range(0..=100);
            let pulse = rng.gen_range(0..=300);
            let temperature = rng.gen_range(95.0..=106.0);
            records
                .ingest(reading("dev-rng", spo2, pulse, temperature))
                .await
                .unwrap();

            let latest = records.get_latest("dev-rng").await.unwrap();
            assert_eq!(
                (latest.spo2, latest.pulse, latest.temperature),
                (spo2, pulse, temperature)
            );
        }
    }

    #[tokio::test]
    async fn test_invalid_reading_is_not_persisted() {
        let (records, store) = service();
        for bad in [
            reading("dev-1", 101, 72, 98.6),
            reading("dev-1", 98, -1, 98.6),
            reading("dev-1", 98, 72, 107.0),
            reading("", 98, 72, 98.6),
        ] {
            assert!(matches!(records.ingest(bad).await, Err(Error::Validation(_))));
        }
        assert_eq!(store.record_count(), 0);
        assert_eq!(store.query_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_reading_is_counted() {
        let (records, _) = service();
        let before = INVALID_RECORDS_TOTAL.get();
        let result = records.ingest(reading("dev-1", 98, 72, 110.0)).await;

        assert!(matches!(result, Err(Error::Validation(msg)) if msg.contains("temperature")));
        assert!(INVALID_RECORDS_TOTAL.get() >= before + 1.0);
    }

    #[tokio::test]
    async fn test_ingest_trims_device_id() {
        let (records, _) = service();
        records.ingest(reading("  dev-1 ", 97, 65, 97.9)).await.unwrap();
        assert_eq!(records.get_latest("dev-1").await.unwrap().device_id, "dev-1");
    }

    #[tokio::test]
    async fn test_latest_without_records() {
        let (records, _) = service();
        assert!(matches!(
            records.get_latest("dev-1").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            records.get_latest("").await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_recent_limits() {
        let (records, _) = service();
        for pulse in 60..70 {
            records.ingest(reading("dev-1", 98, pulse, 98.6)).await.unwrap();
        }

        let recent = records.get_recent("dev-1", None).await.unwrap();
        let pulses: Vec<i32> = recent.iter().map(|r| r.pulse).collect();
        assert_eq!(pulses, vec![69, 68, 67, 66, 65]);

        assert_eq!(records.get_recent("dev-1", Some(3)).await.unwrap().len(), 3);
        assert_eq!(records.get_recent("dev-1", Some(1000)).await.unwrap().len(), 10);
        assert!(records.get_recent("dev-2", None).await.unwrap().is_empty());
        assert!(matches!(
            records.get_recent("dev-1", Some(0)).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_registered_scenario() {
        let store = MemoryStore::new();
        let registry = DeviceRegistry::new(Arc::new(store.clone()));
        let records = HealthRecords::new(Arc::new(store));

        registry.register("dev-1", "acc-1").await.unwrap();
        let stored = records.ingest(reading("dev-1", 98, 72, 98.6)).await.unwrap();
        assert_eq!(records.get_latest("dev-1").await.unwrap(), stored);

        let set = records.get_filtered("dev-1", "7d").await.unwrap();
        assert_eq!(set.records, vec![stored]);
        assert_eq!(set.average.spo2, 98.0);
        assert_eq!(set.average.pulse, 72.0);
        assert_eq!(set.average.temperature, 98.6);
    }

    #[tokio::test]
    async fn test_filtered_empty_device() {
        let (records, _) = service();
        for window in TimeWindow::ALL {
            let set = records.get_filtered("dev-1", window.as_str()).await.unwrap();
            assert!(set.records.is_empty());
            assert_eq!(set.average.spo2, 0.0);
            assert_eq!(set.average.pulse, 0.0);
            assert_eq!(set.average.temperature, 0.0);
        }
    }

    #[tokio::test]
    async fn test_filtered_rejects_unknown_window_before_storage() {
        let (records, store) = service();
        assert!(matches!(
            records.get_filtered("dev-1", "2d").await,
            Err(Error::Validation(_))
        ));
        assert_eq!(store.query_count(), 0);
    }

    #[tokio::test]
    async fn test_filtered_windows() {
        let (records, store) = service();
        let now = Utc::now();
        for (days, spo2) in [(1, 99), (10, 98), (60, 97), (200, 96), (400, 95), (800, 94)] {
            store.seed_record(aged("dev-1", spo2, now - Duration::days(days)));
        }
        store.seed_record(aged("dev-2", 90, now));

        let spo2s = |set: &FilteredRecordSet| -> Vec<i32> {
            set.records.iter().map(|r| r.spo2).collect()
        };

        let week = records.get_filtered("dev-1", "7d").await.unwrap();
        assert_eq!(spo2s(&week), vec![99]);

        let month = records.get_filtered("dev-1", "30d").await.unwrap();
        assert_eq!(spo2s(&month), vec![99, 98]);
        assert_eq!(month.average.spo2, 98.5);

        let half_year = records.get_filtered("dev-1", "6m").await.unwrap();
        assert_eq!(spo2s(&half_year), vec![99, 98, 97]);

        let year = records.get_filtered("dev-1", "1y").await.unwrap();
        assert_eq!(spo2s(&year), vec![99, 98, 97, 96]);

        let all = records.get_filtered("dev-1", "all").await.unwrap();
        assert_eq!(spo2s(&all), vec![99, 98, 97, 96, 95, 94]);
        assert_eq!(all.average.spo2, 96.5);
    }

    #[tokio::test]
    async fn test_all_window_covers_narrower_windows() {
        let (records, store) = service();
        let now = Utc::now();
        for days in [0, 3, 15, 45, 150, 250, 380, 700] {
            store.seed_record(aged("dev-1", 95, now - Duration::days(days)));
        }

        let all: HashSet<_> = records
            .get_filtered("dev-1", "all")
            .await
            .unwrap()
            .records
            .into_iter()
            .map(|r| r.recorded_at)
            .collect();

        let mut union = HashSet::new();
        for window in &TimeWindow::ALL[..4] {
            let set = records.get_filtered("dev-1", window.as_str()).await.unwrap();
            union.extend(set.records.into_iter().map(|r| r.recorded_at));
        }

        assert!(union.is_subset(&all));
        assert_eq!(all.len(), 8);
        // Only records older than the widest bounded window are exclusive to "all"
        let older_than_a_year = all
            .iter()
            .filter(|ts| **ts < now - Duration::days(365))
            .count();
        assert_eq!(all.len() - union.len(), older_than_a_year);
    }
}
