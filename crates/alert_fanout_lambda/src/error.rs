use thiserror::Error;

use crate::runtime::error::{ConfigError, RegistryError};

/// The invocation payload could not be read as an SQS batch at all. The
/// whole invocation fails and the queue redelivers every record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqsEventError {
    #[error("SQS event must include Records array")]
    MissingRecords,

    #[error("SQS record at position {0} has no messageId")]
    MissingMessageId(usize),
}

/// Building the process-wide resources failed before any record ran.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("strategy registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("failed to build client: {0}")]
    Client(String),
}
