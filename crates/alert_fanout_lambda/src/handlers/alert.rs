//! Ingest side: turns alert events into push work on the routed queues and
//! seeds recipient chunks.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::adapters::chunk_store::ChunkStore;
use crate::adapters::queue::QueuePublisher;
use crate::runtime::chunk::{build_key, generate_chunks, plan_chunks};
use crate::runtime::config::ChunkingConfig;
use crate::runtime::contract::{
    AlertEvent, OperationTag, PushMessage, PushToAllPayload, PushToSelectedPayload, QueueMessage,
    QueueRecord, SeedChunksPayload,
};
use crate::runtime::error::{DispatchError, RegistryError};
use crate::runtime::flow::{route, FlowControlMode, FlowRoutingConfig, QueueDestination};
use crate::runtime::registry::{Strategy, StrategyRegistry};
use crate::runtime::severity::{classify, SeverityLevel};

/// Classifies an alert, routes it and publishes the resulting push messages.
///
/// In `all` mode one `push-to-all` message is published per chunk index; in
/// `selected` mode the event's recipients for each platform are published in
/// groups of at most `chunk_size`. A retried record publishes its messages
/// again, which downstream tolerates under at-least-once delivery.
pub struct PublishAlertStrategy {
    flow: FlowRoutingConfig,
    chunking: ChunkingConfig,
    publisher: Arc<dyn QueuePublisher>,
}

impl PublishAlertStrategy {
    pub fn new(
        flow: FlowRoutingConfig,
        chunking: ChunkingConfig,
        publisher: Arc<dyn QueuePublisher>,
    ) -> Self {
        Self {
            flow,
            chunking,
            publisher,
        }
    }

    fn validate(&self, event: &AlertEvent) -> Result<(), DispatchError> {
        if event.provider.trim().is_empty() {
            return Err(DispatchError::validation("provider cannot be empty"));
        }
        if event.platforms.is_empty() {
            return Err(DispatchError::validation("platforms cannot be empty"));
        }
        if self.flow.mode == FlowControlMode::Selected
            && !event.recipients.iter().any(|recipient| {
                event.platforms.contains(&recipient.platform)
                    && !recipient.device_token.trim().is_empty()
            })
        {
            return Err(DispatchError::validation(
                "selected flow control requires a recipient on a routed platform",
            ));
        }
        Ok(())
    }

    fn messages_for(
        &self,
        event: &AlertEvent,
        severity: SeverityLevel,
        destination: &QueueDestination,
        published_at: &str,
    ) -> Result<Vec<QueueMessage>, DispatchError> {
        let message = PushMessage {
            alert_id: event.alert_id.clone(),
            title: event.title.clone(),
            body: event.body.clone(),
            severity,
        };

        match destination.mode {
            FlowControlMode::All => (1..=self.chunking.chunk_count)
                .map(|sequence_index| {
                    let key = build_key(
                        &event.provider,
                        destination.platform,
                        severity,
                        sequence_index,
                    )?;
                    QueueMessage::new(
                        OperationTag::PushToAll,
                        PushToAllPayload {
                            chunk_key: key.object_key(),
                            platform: destination.platform,
                            message: message.clone(),
                        },
                        Some(published_at.to_string()),
                    )
                })
                .collect(),
            FlowControlMode::Selected => {
                let tokens: Vec<String> = event
                    .recipients
                    .iter()
                    .filter(|recipient| recipient.platform == destination.platform)
                    .map(|recipient| recipient.device_token.trim().to_string())
                    .filter(|token| !token.is_empty())
                    .collect();

                plan_chunks(tokens.len(), self.chunking.chunk_size)?
                    .into_iter()
                    .map(|span| {
                        QueueMessage::new(
                            OperationTag::PushToSelected,
                            PushToSelectedPayload {
                                platform: destination.platform,
                                recipients: tokens[span.start_index..span.end_index_exclusive]
                                    .to_vec(),
                                message: message.clone(),
                            },
                            Some(published_at.to_string()),
                        )
                    })
                    .collect()
            }
        }
    }
}

#[async_trait]
impl Strategy for PublishAlertStrategy {
    async fn execute(&self, record: &QueueRecord) -> Result<(), DispatchError> {
        let event: AlertEvent = record.decode_payload()?;
        self.validate(&event)?;

        let severity = classify(&event.severity);
        let published_at = Utc::now().to_rfc3339();
        let destinations = route(&self.flow, &event);

        let mut published = 0usize;
        for destination in &destinations {
            let messages = self.messages_for(&event, severity, destination, &published_at)?;
            if messages.is_empty() {
                info!(
                    component = "alert_ingest",
                    event = "no_recipients_for_platform",
                    record_id = %record.record_identifier,
                    platform = %destination.platform
                );
            }
            for message in messages {
                self.publisher
                    .publish(&destination.queue_url, &message.to_body())
                    .await
                    .map_err(|error| {
                        DispatchError::downstream(format!(
                            "failed to publish {} message for {}: {error}",
                            message.operation_tag, destination.platform
                        ))
                    })?;
                published += 1;
            }
        }

        info!(
            component = "alert_ingest",
            event = "alert_published",
            record_id = %record.record_identifier,
            provider = %event.provider,
            severity = severity.ordinal(),
            mode = self.flow.mode.as_str(),
            destinations = destinations.len(),
            messages = published
        );
        Ok(())
    }
}

/// Writes the generated recipient chunks for one provider/platform/severity.
/// Chunk contents are deterministic, so re-seeding rewrites identical objects.
pub struct SeedChunksStrategy {
    chunking: ChunkingConfig,
    store: Arc<dyn ChunkStore>,
}

impl SeedChunksStrategy {
    pub fn new(chunking: ChunkingConfig, store: Arc<dyn ChunkStore>) -> Self {
        Self { chunking, store }
    }
}

#[async_trait]
impl Strategy for SeedChunksStrategy {
    async fn execute(&self, record: &QueueRecord) -> Result<(), DispatchError> {
        let payload: SeedChunksPayload = record.decode_payload()?;
        let severity = classify(&payload.severity);
        let chunks = generate_chunks(
            &payload.provider,
            payload.platform,
            severity,
            self.chunking.chunk_count,
            self.chunking.chunk_size,
        )?;

        for chunk in &chunks {
            let key = chunk.key().object_key();
            self.store
                .put_chunk(&key, &chunk.to_body())
                .await
                .map_err(|error| {
                    DispatchError::downstream(format!("failed to store chunk {key}: {error}"))
                })?;
            debug!(
                component = "alert_ingest",
                event = "chunk_written",
                record_id = %record.record_identifier,
                chunk_key = %key,
                fingerprint = %chunk.fingerprint()
            );
        }

        info!(
            component = "alert_ingest",
            event = "chunks_seeded",
            record_id = %record.record_identifier,
            chunks = chunks.len()
        );
        Ok(())
    }
}

pub fn alert_ingest_registry(
    flow: FlowRoutingConfig,
    chunking: ChunkingConfig,
    publisher: Arc<dyn QueuePublisher>,
    store: Arc<dyn ChunkStore>,
) -> Result<StrategyRegistry, RegistryError> {
    Ok(StrategyRegistry::builder()
        .register(
            OperationTag::PublishAlert,
            PublishAlertStrategy::new(flow, chunking, publisher),
        )?
        .register(
            OperationTag::SeedChunks,
            SeedChunksStrategy::new(chunking, store),
        )?
        .build())
}
