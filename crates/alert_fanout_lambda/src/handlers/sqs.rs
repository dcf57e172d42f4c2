//! SQS batch invocation plumbing shared by every Lambda binary.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::error::{InitError, SqsEventError};
use crate::runtime::contract::{BatchResponse, InboundRecord};
use crate::runtime::dispatcher::BatchDispatcher;
use crate::runtime::registry::StrategyRegistry;

/// State built once per process and reused by every invocation it serves.
#[derive(Debug)]
pub struct ProcessResources {
    pub registry: StrategyRegistry,
    pub deadline_margin: Duration,
}

/// Partial batch response understood by the SQS event source mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsBatchResponse {
    pub batch_item_failures: Vec<SqsBatchItemFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsBatchItemFailure {
    pub item_identifier: String,
}

impl From<&BatchResponse> for SqsBatchResponse {
    fn from(response: &BatchResponse) -> Self {
        Self {
            batch_item_failures: response
                .failed_record_identifiers
                .iter()
                .map(|identifier| SqsBatchItemFailure {
                    item_identifier: identifier.clone(),
                })
                .collect(),
        }
    }
}

pub fn decode_sqs_records(event: &Value) -> Result<Vec<InboundRecord>, SqsEventError> {
    let records = event
        .get("Records")
        .and_then(Value::as_array)
        .ok_or(SqsEventError::MissingRecords)?;

    records
        .iter()
        .enumerate()
        .map(|(position, record)| {
            let record_identifier = record
                .get("messageId")
                .and_then(Value::as_str)
                .filter(|identifier| !identifier.is_empty())
                .ok_or(SqsEventError::MissingMessageId(position))?;
            Ok(InboundRecord {
                record_identifier: record_identifier.to_string(),
                body: record.get("body").and_then(Value::as_str).map(str::to_string),
            })
        })
        .collect()
}

/// Converts the Lambda context deadline (milliseconds since the epoch) into
/// a dispatch deadline that leaves `margin` for writing the response.
///
/// A margin at least as long as the remaining time is cut to half of it.
pub fn dispatch_deadline(context_deadline_ms: u64, margin: Duration) -> Option<Instant> {
    if context_deadline_ms == 0 {
        return None;
    }

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0);
    let remaining = Duration::from_millis(context_deadline_ms.saturating_sub(now_ms));
    let margin = if !remaining.is_zero() && margin >= remaining {
        warn!(
            component = "sqs_handler",
            event = "deadline_margin_exceeds_remaining_time",
            margin_ms = margin.as_millis() as u64,
            remaining_ms = remaining.as_millis() as u64
        );
        remaining / 2
    } else {
        margin
    };
    Some(Instant::now() + remaining.saturating_sub(margin))
}

/// Runs one SQS invocation: decodes the batch, initialises the process
/// resources on first use and dispatches every record.
///
/// A failed initialisation is not cached, so the next invocation retries it;
/// meanwhile the current batch is reported entirely failed.
pub async fn handle_sqs_invocation<F, Fut>(
    resources: &OnceCell<ProcessResources>,
    init: F,
    event: &Value,
    context_deadline_ms: u64,
) -> Result<SqsBatchResponse, SqsEventError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<ProcessResources, InitError>>,
{
    let records = decode_sqs_records(event).map_err(|decode_error| {
        error!(
            component = "sqs_handler",
            event = "malformed_event",
            error = %decode_error
        );
        decode_error
    })?;

    let resources = match resources.get_or_try_init(init).await {
        Ok(resources) => resources,
        Err(init_error) => {
            error!(
                component = "sqs_handler",
                event = "initialization_failed",
                batch_size = records.len(),
                error = %init_error
            );
            return Ok(SqsBatchResponse::from(&BatchResponse::all_failed(&records)));
        }
    };

    let deadline = dispatch_deadline(context_deadline_ms, resources.deadline_margin);
    let response = BatchDispatcher::new(&resources.registry)
        .process_batch_until(&records, deadline)
        .await;

    info!(
        component = "sqs_handler",
        event = "invocation_completed",
        batch_size = records.len(),
        failed = response.failed_record_identifiers.len()
    );
    Ok(SqsBatchResponse::from(&response))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::runtime::contract::{OperationTag, QueueRecord};
    use crate::runtime::error::{ConfigError, DispatchError};
    use crate::runtime::registry::Strategy;

    use super::*;

    struct CountingStrategy {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Strategy for CountingStrategy {
        async fn execute(&self, record: &QueueRecord) -> Result<(), DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if record.payload.get("poison").is_some() {
                return Err(DispatchError::validation("poison record"));
            }
            Ok(())
        }
    }

    fn sqs_event(bodies: &[(&str, Value)]) -> Value {
        json!({
            "Records": bodies
                .iter()
                .map(|(id, body)| json!({
                    "messageId": id,
                    "eventSource": "aws:sqs",
                    "body": body,
                }))
                .collect::<Vec<_>>()
        })
    }

    fn seed_body(poison: bool) -> Value {
        let payload = if poison {
            json!({"poison": true})
        } else {
            json!({})
        };
        Value::from(json!({"operationTag": "seed-chunks", "payload": payload}).to_string())
    }

    fn resources_with(strategy: Arc<CountingStrategy>) -> ProcessResources {
        ProcessResources {
            registry: StrategyRegistry::builder()
                .register(OperationTag::SeedChunks, strategy)
                .expect("registration should pass")
                .build(),
            deadline_margin: Duration::from_millis(0),
        }
    }

    #[test]
    fn decodes_message_ids_and_string_bodies() {
        let event = sqs_event(&[("m-1", Value::from("{}")), ("m-2", json!(42))]);
        let records = decode_sqs_records(&event).expect("event should decode");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_identifier, "m-1");
        assert_eq!(records[0].body.as_deref(), Some("{}"));
        assert_eq!(records[1].body, None);
    }

    #[test]
    fn rejects_events_without_records_or_message_ids() {
        assert_eq!(
            decode_sqs_records(&json!({"detail": {}})),
            Err(SqsEventError::MissingRecords)
        );
        assert_eq!(
            decode_sqs_records(&json!({"Records": [{"messageId": "a", "body": "{}"}, {"body": "{}"}]})),
            Err(SqsEventError::MissingMessageId(1))
        );
    }

    #[test]
    fn batch_response_maps_to_item_failures() {
        let response = BatchResponse::all_failed(&[InboundRecord::new("x", "{}")]);
        assert_eq!(
            serde_json::to_value(SqsBatchResponse::from(&response)).expect("should serialize"),
            json!({"batchItemFailures": [{"itemIdentifier": "x"}]})
        );
    }

    #[test]
    fn deadline_leaves_margin_and_zero_means_unbounded() {
        assert!(dispatch_deadline(0, Duration::from_millis(500)).is_none());

        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after epoch")
            .as_millis() as u64;
        let deadline = dispatch_deadline(now_ms + 10_000, Duration::from_millis(2_000))
            .expect("deadline should be set");
        let remaining = deadline.saturating_duration_since(Instant::now());
        assert!(remaining <= Duration::from_millis(8_000));
        assert!(remaining > Duration::from_millis(6_000));

        let past = dispatch_deadline(now_ms.saturating_sub(5_000), Duration::from_millis(100))
            .expect("deadline should be set");
        assert!(past <= Instant::now());
    }

    #[test]
    fn oversized_margin_is_capped_to_half_the_remaining_time() {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after epoch")
            .as_millis() as u64;
        let deadline = dispatch_deadline(now_ms + 1_000, Duration::from_millis(5_000))
            .expect("deadline should be set");
        let remaining = deadline.saturating_duration_since(Instant::now());
        assert!(remaining <= Duration::from_millis(500));
        assert!(remaining > Duration::from_millis(250));
    }

    #[tokio::test]
    async fn malformed_envelope_fails_the_invocation() {
        let cell = OnceCell::new();
        let error = handle_sqs_invocation(
            &cell,
            || async { Err(InitError::Client("unused".to_string())) },
            &json!({"Records": [{"body": "{}"}]}),
            0,
        )
        .await
        .expect_err("invocation should fail");
        assert_eq!(error, SqsEventError::MissingMessageId(0));
        assert!(cell.get().is_none());
    }

    #[tokio::test]
    async fn initializes_resources_once_across_invocations() {
        let strategy = Arc::new(CountingStrategy {
            calls: AtomicUsize::new(0),
        });
        let cell = OnceCell::new();
        let init_calls = AtomicUsize::new(0);
        let event = sqs_event(&[("a", seed_body(false)), ("b", seed_body(true))]);

        for _ in 0..2 {
            let response = handle_sqs_invocation(
                &cell,
                || async {
                    init_calls.fetch_add(1, Ordering::SeqCst);
                    Ok(resources_with(Arc::clone(&strategy)))
                },
                &event,
                0,
            )
            .await
            .expect("invocation should complete");

            assert_eq!(
                response.batch_item_failures,
                vec![SqsBatchItemFailure {
                    item_identifier: "b".to_string()
                }]
            );
        }

        assert_eq!(init_calls.load(Ordering::SeqCst), 1);
        assert_eq!(strategy.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn failed_initialization_fails_whole_batch_and_is_retried() {
        let cell = OnceCell::new();
        let event = sqs_event(&[("a", seed_body(false)), ("b", seed_body(false))]);

        let failed = handle_sqs_invocation(
            &cell,
            || async { Err(InitError::Config(ConfigError::Missing("CHUNK_BUCKET"))) },
            &event,
            0,
        )
        .await
        .expect("invocation should complete");
        let failed_ids: Vec<&str> = failed
            .batch_item_failures
            .iter()
            .map(|failure| failure.item_identifier.as_str())
            .collect();
        assert_eq!(failed_ids, vec!["a", "b"]);
        assert!(cell.get().is_none());

        let strategy = Arc::new(CountingStrategy {
            calls: AtomicUsize::new(0),
        });
        let recovered = handle_sqs_invocation(
            &cell,
            || async { Ok(resources_with(Arc::clone(&strategy))) },
            &event,
            0,
        )
        .await
        .expect("invocation should complete");
        assert!(recovered.batch_item_failures.is_empty());
    }
}
