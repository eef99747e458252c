use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered sensor unit and the account that owns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: Uuid,
    pub device_id: String,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// Device registration request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDevice {
    pub device_id: String,
    pub account_id: String,
}

/// One biometric sample as submitted by a device, before the server stamps it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReading {
    pub device_id: String,
    pub spo2: i32,
    pub pulse: i32,
    pub temperature: f64,
}

/// A stored biometric sample. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    pub device_id: String,
    pub spo2: i32,
    pub pulse: i32,
    pub temperature: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Averages {
    pub spo2: f64,
    pub pulse: f64,
    pub temperature: f64,
}

impl Averages {
    /// Arithmetic mean of each field. All zero for an empty slice.
    pub fn of(records: &[HealthRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let (spo2, pulse, temperature) = records.iter().fold((0.0, 0.0, 0.0), |(s, p, t), r| {
            (s + f64::from(r.spo2), p + f64::from(r.pulse), t + r.temperature)
        });
        let count = records.len() as f64;

        Self {
            spo2: spo2 / count,
            pulse: pulse / count,
            temperature: temperature / count,
        }
    }
}

/// Records inside a time window, newest first, with their averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredRecordSet {
    pub records: Vec<HealthRecord>,
    pub average: Averages,
}

impl FilteredRecordSet {
    pub fn new(records: Vec<HealthRecord>) -> Self {
        let average = Averages::of(&records);
        Self { records, average }
    }
}
