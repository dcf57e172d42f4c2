use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::adapters::device_repository::{DeviceRecord, DeviceRepository};
use crate::runtime::contract::{DeviceDeletion, DeviceRegistration, OperationTag, QueueRecord};
use crate::runtime::error::{DispatchError, RegistryError};
use crate::runtime::registry::{Strategy, StrategyRegistry};

/// Upserts the device row, so replaying a registration is harmless.
pub struct RegisterDeviceStrategy {
    repository: Arc<dyn DeviceRepository>,
}

impl RegisterDeviceStrategy {
    pub fn new(repository: Arc<dyn DeviceRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Strategy for RegisterDeviceStrategy {
    async fn execute(&self, record: &QueueRecord) -> Result<(), DispatchError> {
        let registration: DeviceRegistration = record.decode_payload()?;
        let device = DeviceRecord::from(registration);
        if device.device_token.is_empty() {
            return Err(DispatchError::validation("deviceToken cannot be empty"));
        }

        self.repository
            .upsert_device(&device)
            .await
            .map_err(|error| DispatchError::downstream(format!("failed to upsert device: {error}")))?;

        debug!(
            component = "device_registry",
            event = "device_registered",
            record_id = %record.record_identifier,
            platform = %device.platform
        );
        Ok(())
    }
}

/// Deletes the device row if present; an absent row counts as success.
pub struct DeleteDeviceStrategy {
    repository: Arc<dyn DeviceRepository>,
}

impl DeleteDeviceStrategy {
    pub fn new(repository: Arc<dyn DeviceRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Strategy for DeleteDeviceStrategy {
    async fn execute(&self, record: &QueueRecord) -> Result<(), DispatchError> {
        let deletion: DeviceDeletion = record.decode_payload()?;
        let device_token = deletion.device_token.trim();
        if device_token.is_empty() {
            return Err(DispatchError::validation("deviceToken cannot be empty"));
        }

        let existed = self
            .repository
            .delete_device(deletion.platform, device_token)
            .await
            .map_err(|error| DispatchError::downstream(format!("failed to delete device: {error}")))?;

        if existed {
            debug!(
                component = "device_registry",
                event = "device_deleted",
                record_id = %record.record_identifier,
                platform = %deletion.platform
            );
        } else {
            info!(
                component = "device_registry",
                event = "device_already_absent",
                record_id = %record.record_identifier,
                platform = %deletion.platform
            );
        }
        Ok(())
    }
}

pub fn device_registry(
    repository: Arc<dyn DeviceRepository>,
) -> Result<StrategyRegistry, RegistryError> {
    Ok(StrategyRegistry::builder()
        .register(
            OperationTag::RegisterDevice,
            RegisterDeviceStrategy::new(Arc::clone(&repository)),
        )?
        .register(
            OperationTag::DeleteDevice,
            DeleteDeviceStrategy::new(repository),
        )?
        .build())
}
