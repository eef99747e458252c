use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref DEVICES_REGISTERED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "vitals_devices_registered_total",
        "Total device registrations, including re-registrations"
    ))
    .unwrap();
    pub static ref RECORDS_INGESTED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "vitals_records_ingested_total",
        "Total health records stored"
    ))
    .unwrap();
    pub static ref INVALID_RECORDS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "vitals_invalid_records_total",
        "Total health records rejected by validation"
    ))
    .unwrap();
    pub static ref STORAGE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "vitals_storage_failures_total",
        "Total failed database statements"
    ))
    .unwrap();
    pub static ref FILTERED_RECORDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "vitals_filtered_records",
            "Number of records returned by windowed queries"
        )
        .buckets(vec![0.0, 1.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0])
    )
    .unwrap();
}

/// Register every collector with `REGISTRY`. Call once at startup.
pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(DEVICES_REGISTERED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECORDS_INGESTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(INVALID_RECORDS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORAGE_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FILTERED_RECORDS.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
