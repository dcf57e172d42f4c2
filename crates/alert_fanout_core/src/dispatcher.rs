//! Sequential batch dispatch with per-record failure isolation.
//!
//! Records are processed one at a time in delivery order. Each record ends as
//! exactly one [`BatchItemResult`]; a failure is logged and recorded, never
//! propagated, so the queue only redelivers the records that failed.

use std::time::Instant as StdInstant;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::contract::{BatchItemResult, BatchResponse, InboundRecord, QueueRecord};
use crate::error::DispatchError;
use crate::registry::StrategyRegistry;

#[derive(Debug, Clone, Copy)]
pub struct BatchDispatcher<'a> {
    registry: &'a StrategyRegistry,
}

impl<'a> BatchDispatcher<'a> {
    pub fn new(registry: &'a StrategyRegistry) -> Self {
        Self { registry }
    }

    pub async fn process_batch(&self, records: &[InboundRecord]) -> BatchResponse {
        self.process_batch_until(records, None).await
    }

    /// Like [`Self::process_batch`], but records still pending when `deadline`
    /// passes are reported failed instead of being started.
    pub async fn process_batch_until(
        &self,
        records: &[InboundRecord],
        deadline: Option<Instant>,
    ) -> BatchResponse {
        let results = self.process_batch_detailed(records, deadline).await;
        let response = BatchResponse::from_results(&results);
        if let Some(partial) = response.partial_failure() {
            warn!(
                component = "batch_dispatcher",
                event = "batch_partially_failed",
                failed = partial.failed,
                total = partial.total,
                "{partial}"
            );
        }
        response
    }

    pub async fn process_batch_detailed(
        &self,
        records: &[InboundRecord],
        deadline: Option<Instant>,
    ) -> Vec<BatchItemResult> {
        let started_at = StdInstant::now();
        info!(
            component = "batch_dispatcher",
            event = "batch_started",
            batch_size = records.len()
        );

        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let outcome = self.process_record(record, deadline).await;
            if let Err(error) = &outcome {
                warn!(
                    component = "batch_dispatcher",
                    event = "record_failed",
                    record_id = %record.record_identifier,
                    error_kind = error.kind(),
                    error = %error
                );
            }
            results.push(BatchItemResult {
                record_identifier: record.record_identifier.clone(),
                succeeded: outcome.is_ok(),
            });
        }

        let failed = results.iter().filter(|result| !result.succeeded).count();
        info!(
            component = "batch_dispatcher",
            event = "batch_completed",
            batch_size = records.len(),
            succeeded = records.len() - failed,
            failed,
            duration_ms = started_at.elapsed().as_millis() as u64
        );
        results
    }

    async fn process_record(
        &self,
        record: &InboundRecord,
        deadline: Option<Instant>,
    ) -> Result<(), DispatchError> {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(DispatchError::DeadlineExceeded);
        }

        let queue_record = QueueRecord::parse(record)?;
        let strategy = self.registry.resolve(&queue_record.operation_tag)?;
        debug!(
            component = "batch_dispatcher",
            event = "record_started",
            record_id = %queue_record.record_identifier,
            operation = %queue_record.operation_tag
        );

        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, strategy.execute(&queue_record))
                .await
                .map_err(|_| DispatchError::DeadlineExceeded)?,
            None => strategy.execute(&queue_record).await,
        }
    }
}
