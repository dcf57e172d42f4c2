use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::adapters::chunk_store::ChunkStore;
use crate::adapters::push_gateway::PushGateway;
use crate::runtime::chunk::{Chunk, ChunkKey};
use crate::runtime::contract::{OperationTag, PushToAllPayload, PushToSelectedPayload, QueueRecord};
use crate::runtime::error::{DispatchError, RegistryError};
use crate::runtime::registry::{Strategy, StrategyRegistry};

/// Loads the referenced recipient chunk and sends the message to every token
/// in it with one bulk request.
pub struct PushToAllStrategy {
    store: Arc<dyn ChunkStore>,
    gateway: Arc<dyn PushGateway>,
}

impl PushToAllStrategy {
    pub fn new(store: Arc<dyn ChunkStore>, gateway: Arc<dyn PushGateway>) -> Self {
        Self { store, gateway }
    }
}

#[async_trait]
impl Strategy for PushToAllStrategy {
    async fn execute(&self, record: &QueueRecord) -> Result<(), DispatchError> {
        let payload: PushToAllPayload = record.decode_payload()?;
        let key = ChunkKey::parse(&payload.chunk_key)?;
        if key.platform() != payload.platform {
            return Err(DispatchError::validation(format!(
                "chunk {key} does not belong to platform {}",
                payload.platform
            )));
        }

        let body = self.store.get_chunk(&payload.chunk_key).await.map_err(|error| {
            DispatchError::downstream(format!("failed to load chunk {key}: {error}"))
        })?;
        let chunk = Chunk::from_body(key, &body)?;
        debug!(
            component = "push_sender",
            event = "chunk_loaded",
            record_id = %record.record_identifier,
            chunk_key = %chunk.key(),
            fingerprint = %chunk.fingerprint(),
            recipients = chunk.tokens().len()
        );

        self.gateway
            .send_bulk(payload.platform, chunk.tokens(), &payload.message)
            .await
            .map_err(|error| {
                DispatchError::downstream(format!("bulk push for {} failed: {error}", chunk.key()))
            })?;

        info!(
            component = "push_sender",
            event = "chunk_pushed",
            record_id = %record.record_identifier,
            platform = %payload.platform,
            severity = payload.message.severity.ordinal(),
            recipients = chunk.tokens().len()
        );
        Ok(())
    }
}

/// Sends the message to each listed device token. The first rejected token
/// fails the record, so a redelivery may repeat pushes already sent.
pub struct PushToSelectedStrategy {
    gateway: Arc<dyn PushGateway>,
}

impl PushToSelectedStrategy {
    pub fn new(gateway: Arc<dyn PushGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Strategy for PushToSelectedStrategy {
    async fn execute(&self, record: &QueueRecord) -> Result<(), DispatchError> {
        let payload: PushToSelectedPayload = record.decode_payload()?;
        if payload.recipients.is_empty() {
            return Err(DispatchError::validation("recipients cannot be empty"));
        }
        if payload
            .recipients
            .iter()
            .any(|device_token| device_token.trim().is_empty())
        {
            return Err(DispatchError::validation("recipients cannot contain empty tokens"));
        }

        for device_token in &payload.recipients {
            self.gateway
                .send(payload.platform, device_token.trim(), &payload.message)
                .await
                .map_err(|error| DispatchError::downstream(format!("push failed: {error}")))?;
        }

        info!(
            component = "push_sender",
            event = "selected_pushed",
            record_id = %record.record_identifier,
            platform = %payload.platform,
            severity = payload.message.severity.ordinal(),
            recipients = payload.recipients.len()
        );
        Ok(())
    }
}

pub fn push_sender_registry(
    store: Arc<dyn ChunkStore>,
    gateway: Arc<dyn PushGateway>,
) -> Result<StrategyRegistry, RegistryError> {
    Ok(StrategyRegistry::builder()
        .register(
            OperationTag::PushToAll,
            PushToAllStrategy::new(store, gateway.clone()),
        )?
        .register(
            OperationTag::PushToSelected,
            PushToSelectedStrategy::new(gateway),
        )?
        .build())
}
