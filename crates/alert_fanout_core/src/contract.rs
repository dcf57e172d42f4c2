use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DispatchError, PartialBatchFailure};
use crate::flow::FlowControlMode;
use crate::severity::SeverityLevel;

pub const MESSAGE_SCHEMA_VERSION: &str = "v1";

/// Push platform. Serialized as `FCM`/`APNS`; any casing and surrounding
/// whitespace is accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Platform {
    Fcm,
    Apns,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Self::Fcm, Self::Apns];

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim();
        Self::ALL
            .into_iter()
            .find(|platform| platform.path_segment().eq_ignore_ascii_case(normalized))
    }

    /// Lowercase form used inside storage keys.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Fcm => "fcm",
            Self::Apns => "apns",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fcm => f.write_str("FCM"),
            Self::Apns => f.write_str("APNS"),
        }
    }
}

impl TryFrom<String> for Platform {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown platform '{value}'"))
    }
}

impl From<Platform> for String {
    fn from(value: Platform) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationTag {
    RegisterDevice,
    DeleteDevice,
    PushToAll,
    PushToSelected,
    PublishAlert,
    SeedChunks,
}

impl OperationTag {
    pub const ALL: [OperationTag; 6] = [
        Self::RegisterDevice,
        Self::DeleteDevice,
        Self::PushToAll,
        Self::PushToSelected,
        Self::PublishAlert,
        Self::SeedChunks,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegisterDevice => "register-device",
            Self::DeleteDevice => "delete-device",
            Self::PushToAll => "push-to-all",
            Self::PushToSelected => "push-to-selected",
            Self::PublishAlert => "publish-alert",
            Self::SeedChunks => "seed-chunks",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim();
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(normalized))
    }

    /// Push operation carried by a message that only names its flow-control mode.
    pub fn for_flow_mode(mode: FlowControlMode) -> Self {
        match mode {
            FlowControlMode::All => Self::PushToAll,
            FlowControlMode::Selected => Self::PushToSelected,
        }
    }
}

impl std::fmt::Display for OperationTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record as delivered by the queue, before its body is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRecord {
    pub record_identifier: String,
    /// `None` when the queue delivered a body that is not a string.
    pub body: Option<String>,
}

impl InboundRecord {
    pub fn new(record_identifier: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            record_identifier: record_identifier.into(),
            body: Some(body.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageEnvelope {
    #[serde(rename = "operationTag", alias = "operationType", default)]
    operation_tag: Option<String>,
    #[serde(rename = "flowControlMode", default)]
    flow_control_mode: Option<String>,
    #[serde(default)]
    payload: Value,
}

/// A validated queue record: identifier, operation tag and an object payload
/// whose shape is checked by the strategy that handles it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueRecord {
    pub record_identifier: String,
    pub operation_tag: String,
    pub payload: Value,
}

impl QueueRecord {
    pub fn parse(record: &InboundRecord) -> Result<Self, DispatchError> {
        let body = record
            .body
            .as_deref()
            .ok_or_else(|| DispatchError::validation("record body must be a string"))?;

        let envelope: MessageEnvelope = serde_json::from_str(body)
            .map_err(|error| DispatchError::validation(format!("malformed message body: {error}")))?;

        let operation_tag = match (envelope.operation_tag, envelope.flow_control_mode) {
            (Some(tag), _) if !tag.trim().is_empty() => tag.trim().to_string(),
            (_, Some(mode)) => FlowControlMode::parse(&mode)
                .map(|mode| OperationTag::for_flow_mode(mode).as_str().to_string())
                .ok_or_else(|| {
                    DispatchError::validation(format!("unrecognized flowControlMode '{mode}'"))
                })?,
            _ => {
                return Err(DispatchError::validation(
                    "message must carry operationTag or flowControlMode",
                ));
            }
        };

        if !envelope.payload.is_object() {
            return Err(DispatchError::validation("payload must be a JSON object"));
        }

        Ok(Self {
            record_identifier: record.record_identifier.clone(),
            operation_tag,
            payload: envelope.payload,
        })
    }

    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, DispatchError> {
        T::deserialize(&self.payload).map_err(|error| {
            DispatchError::validation(format!(
                "invalid {} payload: {error}",
                self.operation_tag
            ))
        })
    }
}

/// Message published to a downstream queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    pub operation_tag: OperationTag,
    pub schema_version: String,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

impl QueueMessage {
    pub fn new(
        operation_tag: OperationTag,
        payload: impl Serialize,
        published_at: Option<String>,
    ) -> Result<Self, DispatchError> {
        let payload = serde_json::to_value(payload).map_err(|error| {
            DispatchError::validation(format!("failed to encode {operation_tag} payload: {error}"))
        })?;
        Ok(Self {
            operation_tag,
            schema_version: MESSAGE_SCHEMA_VERSION.to_string(),
            payload,
            published_at,
        })
    }

    pub fn to_body(&self) -> String {
        stable_contract_json(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemResult {
    pub record_identifier: String,
    pub succeeded: bool,
}

/// Identifiers of the records the queue must redeliver, in delivery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub failed_record_identifiers: Vec<String>,
    #[serde(skip)]
    total_records: usize,
}

impl BatchResponse {
    pub fn from_results(results: &[BatchItemResult]) -> Self {
        Self {
            failed_record_identifiers: results
                .iter()
                .filter(|result| !result.succeeded)
                .map(|result| result.record_identifier.clone())
                .collect(),
            total_records: results.len(),
        }
    }

    /// Conservative response for an invocation that could not process any record.
    pub fn all_failed(records: &[InboundRecord]) -> Self {
        Self {
            failed_record_identifiers: records
                .iter()
                .map(|record| record.record_identifier.clone())
                .collect(),
            total_records: records.len(),
        }
    }

    pub fn is_full_success(&self) -> bool {
        self.failed_record_identifiers.is_empty()
    }

    pub fn partial_failure(&self) -> Option<PartialBatchFailure> {
        (!self.is_full_success()).then(|| PartialBatchFailure {
            failed: self.failed_record_identifiers.len(),
            total: self.total_records.max(self.failed_record_identifiers.len()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    pub device_token: String,
    pub platform: Platform,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDeletion {
    pub device_token: String,
    pub platform: Platform,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub platform: Platform,
    pub device_token: String,
}

/// Inbound alert to be fanned out to push queues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    #[serde(default)]
    pub alert_id: Option<String>,
    pub provider: String,
    #[serde(default)]
    pub severity: String,
    pub platforms: Vec<Platform>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    #[serde(default)]
    pub alert_id: Option<String>,
    pub title: String,
    pub body: String,
    pub severity: SeverityLevel,
}

impl PushMessage {
    pub fn is_urgent(&self) -> bool {
        self.severity.is_urgent()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PushToAllPayload {
    pub chunk_key: String,
    pub platform: Platform,
    pub message: PushMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PushToSelectedPayload {
    pub platform: Platform,
    pub recipients: Vec<String>,
    pub message: PushMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeedChunksPayload {
    pub provider: String,
    pub platform: Platform,
    #[serde(default)]
    pub severity: String,
}

pub fn stable_contract_json(value: impl Serialize) -> String {
    serde_json::to_string(&value).expect("serialization of contract value should not fail")
}
