//! In-memory adapters for handler tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::adapters::chunk_store::ChunkStore;
use crate::adapters::device_repository::{DeviceRecord, DeviceRepository};
use crate::adapters::push_gateway::PushGateway;
use crate::adapters::queue::QueuePublisher;
use crate::runtime::contract::{Platform, PushMessage};

#[derive(Default)]
pub(crate) struct MemoryDeviceRepository {
    rows: Mutex<BTreeMap<(Platform, String), DeviceRecord>>,
    failing_tokens: HashSet<String>,
}

impl MemoryDeviceRepository {
    pub(crate) fn failing_for(tokens: &[&str]) -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            failing_tokens: tokens.iter().map(|token| token.to_string()).collect(),
        }
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<(Platform, String), DeviceRecord> {
        self.rows.lock().expect("poisoned mutex").clone()
    }

    pub(crate) fn seed(&self, device: DeviceRecord) {
        self.rows
            .lock()
            .expect("poisoned mutex")
            .insert((device.platform, device.device_token.clone()), device);
    }

    fn check(&self, device_token: &str) -> Result<(), String> {
        if self.failing_tokens.contains(device_token) {
            return Err(format!("simulated repository failure for {device_token}"));
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceRepository for MemoryDeviceRepository {
    async fn upsert_device(&self, device: &DeviceRecord) -> Result<(), String> {
        self.check(&device.device_token)?;
        self.seed(device.clone());
        Ok(())
    }

    async fn delete_device(&self, platform: Platform, device_token: &str) -> Result<bool, String> {
        self.check(device_token)?;
        Ok(self
            .rows
            .lock()
            .expect("poisoned mutex")
            .remove(&(platform, device_token.to_string()))
            .is_some())
    }
}

#[derive(Default)]
pub(crate) struct MemoryChunkStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryChunkStore {
    pub(crate) fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .keys()
            .cloned()
            .collect()
    }

    pub(crate) fn body(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().expect("poisoned mutex").get(key).cloned()
    }

    pub(crate) fn seed_object(&self, key: &str, body: &[u8]) {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .insert(key.to_string(), body.to_vec());
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn put_chunk(&self, key: &str, body: &[u8]) -> Result<(), String> {
        self.seed_object(key, body);
        Ok(())
    }

    async fn get_chunk(&self, key: &str) -> Result<Vec<u8>, String> {
        self.body(key)
            .ok_or_else(|| format!("no chunk stored under {key}"))
    }
}

#[derive(Default)]
pub(crate) struct CapturingPublisher {
    published: Mutex<Vec<(String, String)>>,
    failing_queue: Option<String>,
}

impl CapturingPublisher {
    pub(crate) fn failing_for(queue_url: &str) -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            failing_queue: Some(queue_url.to_string()),
        }
    }

    pub(crate) fn published(&self) -> Vec<(String, String)> {
        self.published.lock().expect("poisoned mutex").clone()
    }
}

#[async_trait]
impl QueuePublisher for CapturingPublisher {
    async fn publish(&self, queue_url: &str, body: &str) -> Result<(), String> {
        if self.failing_queue.as_deref() == Some(queue_url) {
            return Err(format!("simulated publish failure for {queue_url}"));
        }
        self.published
            .lock()
            .expect("poisoned mutex")
            .push((queue_url.to_string(), body.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Delivery {
    Single {
        platform: Platform,
        device_token: String,
    },
    Bulk {
        platform: Platform,
        device_tokens: Vec<String>,
    },
}

#[derive(Default)]
pub(crate) struct RecordingGateway {
    deliveries: Mutex<Vec<Delivery>>,
    rejected_tokens: HashSet<String>,
}

impl RecordingGateway {
    pub(crate) fn rejecting(tokens: &[&str]) -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            rejected_tokens: tokens.iter().map(|token| token.to_string()).collect(),
        }
    }

    pub(crate) fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().expect("poisoned mutex").clone()
    }
}

#[async_trait]
impl PushGateway for RecordingGateway {
    async fn send(
        &self,
        platform: Platform,
        device_token: &str,
        _message: &PushMessage,
    ) -> Result<(), String> {
        if self.rejected_tokens.contains(device_token) {
            return Err(format!("provider rejected token {device_token}"));
        }
        self.deliveries
            .lock()
            .expect("poisoned mutex")
            .push(Delivery::Single {
                platform,
                device_token: device_token.to_string(),
            });
        Ok(())
    }

    async fn send_bulk(
        &self,
        platform: Platform,
        device_tokens: &[String],
        _message: &PushMessage,
    ) -> Result<(), String> {
        if let Some(rejected) = device_tokens
            .iter()
            .find(|token| self.rejected_tokens.contains(token.as_str()))
        {
            return Err(format!("provider rejected token {rejected}"));
        }
        self.deliveries
            .lock()
            .expect("poisoned mutex")
            .push(Delivery::Bulk {
                platform,
                device_tokens: device_tokens.to_vec(),
            });
        Ok(())
    }
}
