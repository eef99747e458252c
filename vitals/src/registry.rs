use crate::errors::{Error, Result};
use crate::metrics::DEVICES_REGISTERED_TOTAL;
use crate::model::Device;
use crate::store::Store;
use crate::validate::require_id;
use std::sync::Arc;
use tracing::{debug, info};

/// Device-to-account associations
#[derive(Clone)]
pub struct DeviceRegistry {
    store: Arc<dyn Store>,
}

impl DeviceRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Registers `device_id` under `account_id`, re-homing it if already known.
    pub async fn register(&self, device_id: &str, account_id: &str) -> Result<Device> {
        let device_id = require_id("deviceId", device_id)?;

        // Stored trimmed so `list_by_account` finds it under the same spelling
        let device = self
            .store
            .upsert_device(device_id, account_id.trim())
            .await?;
        DEVICES_REGISTERED_TOTAL.inc();
        info!(
            "Registered device {} to account {}",
            device.device_id, device.account_id
        );
        Ok(device)
    }

    pub async fn get_by_id(&self, device_id: &str) -> Result<Device> {
        let device_id = require_id("deviceId", device_id)?;

        self.store
            .find_device(device_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Device {} not found", device_id)))
    }

    pub async fn list_by_account(&self, account_id: &str) -> Result<Vec<Device>> {
        let account_id = require_id("accountId", account_id)?;

        let devices = self.store.devices_for_account(account_id).await?;
        debug!("Account {} has {} devices", account_id, devices.len());
        Ok(devices)
    }
}
