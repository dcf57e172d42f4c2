use thiserror::Error;

/// Why a single queue record failed.
///
/// Every variant is record-local: the dispatcher converts it into a failed
/// batch item and moves on to the next record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no strategy registered for operation '{0}'")]
    UnknownOperation(String),

    #[error("downstream call failed: {0}")]
    Downstream(String),

    #[error("invocation deadline reached before the record completed")]
    DeadlineExceeded,
}

impl DispatchError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn downstream(message: impl Into<String>) -> Self {
        Self::Downstream(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UnknownOperation(_) => "unknown_operation",
            Self::Downstream(_) => "downstream",
            Self::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

/// Aggregate signal that some, but not necessarily all, records of a batch
/// failed. It is reported to the queue, never raised as an invocation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{failed} of {total} records failed")]
pub struct PartialBatchFailure {
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("provider must be a non-empty path segment, got '{0}'")]
    InvalidProvider(String),

    #[error("sequence index must start at 1, got {0}")]
    InvalidSequenceIndex(usize),

    #[error("{name} must be a positive integer")]
    NonPositive { name: &'static str },

    #[error("malformed chunk key '{0}'")]
    MalformedKey(String),

    #[error("malformed chunk body: {0}")]
    MalformedBody(String),

    #[error("chunk holds {actual} tokens, limit is {limit}")]
    Oversized { actual: usize, limit: usize },
}

impl From<ChunkError> for DispatchError {
    fn from(error: ChunkError) -> Self {
        Self::Validation(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),

    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("operation '{0}' is already registered")]
    DuplicateOperation(&'static str),
}
