use crate::errors::{Error, Result};
use crate::model::NewReading;

pub const SPO2_MIN: i32 = 0;
pub const SPO2_MAX: i32 = 100;
pub const PULSE_MIN: i32 = 0;
pub const PULSE_MAX: i32 = 300;
pub const TEMP_MIN: f64 = 95.0;
pub const TEMP_MAX: f64 = 106.0;

/// Rejects blank identifiers. `field` names the parameter in the error.
pub fn require_id<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    Ok(trimmed)
}

/// Validates a reading against physiological bounds.
///
/// Every violated bound is reported, not just the first one.
pub fn validate(reading: &NewReading) -> Result<()> {
    let mut problems = Vec::new();

    if reading.device_id.trim().is_empty() {
        problems.push("deviceId cannot be empty".to_string());
    }

    if !(SPO2_MIN..=SPO2_MAX).contains(&reading.spo2) {
        problems.push(format!(
            "spo2 {} out of range [{}, {}]",
            reading.spo2, SPO2_MIN, SPO2_MAX
        ));
    }

    if !(PULSE_MIN..=PULSE_MAX).contains(&reading.pulse) {
        problems.push(format!(
            "pulse {} out of range [{}, {}]",
            reading.pulse, PULSE_MIN, PULSE_MAX
        ));
    }

    // NaN fails `contains`, which is what we want
    if !(TEMP_MIN..=TEMP_MAX).contains(&reading.temperature) {
        problems.push(format!(
            "temperature {} out of range [{}, {}]",
            reading.temperature, TEMP_MIN, TEMP_MAX
        ));
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(problems.join("; ")))
    }
}
