use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::runtime::contract::{DeviceRegistration, Platform};

/// Stored form of a registered device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub device_token: String,
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl From<DeviceRegistration> for DeviceRecord {
    fn from(registration: DeviceRegistration) -> Self {
        Self {
            device_token: registration.device_token.trim().to_string(),
            platform: registration.platform,
            user_id: registration.user_id,
            locale: registration.locale,
        }
    }
}

/// Device rows keyed by `(platform, token)`.
///
/// `upsert_device` must leave the same state however often it is repeated,
/// and `delete_device` must succeed when the device is already gone.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn upsert_device(&self, device: &DeviceRecord) -> Result<(), String>;

    /// Returns whether a row existed before the call.
    async fn delete_device(&self, platform: Platform, device_token: &str) -> Result<bool, String>;
}

/// Object key of a device row. Tokens are hashed so arbitrary token
/// characters never leak into the key path.
pub fn device_object_key(prefix: &str, platform: Platform, device_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(device_token.as_bytes());
    format!(
        "{}/platform={}/{:x}.json",
        prefix.trim_matches('/'),
        platform.path_segment(),
        hasher.finalize()
    )
}
