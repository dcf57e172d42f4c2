//! Deterministic addressing and layout of recipient chunks.
//!
//! A chunk is stored once under `{provider}/{platform}/{severity}/{index}.json`
//! and read once per consumer. Sequence indices are supplied by the caller,
//! start at 1 and increase by one, so keys for a `(provider, platform,
//! severity)` triple never collide.

use sha2::{Digest, Sha256};

use crate::contract::Platform;
use crate::error::ChunkError;
use crate::severity::SeverityLevel;

pub const CHUNK_OBJECT_EXTENSION: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    provider: String,
    platform: Platform,
    severity: SeverityLevel,
    sequence_index: usize,
}

impl ChunkKey {
    pub fn new(
        provider: &str,
        platform: Platform,
        severity: SeverityLevel,
        sequence_index: usize,
    ) -> Result<Self, ChunkError> {
        let provider = provider.trim();
        if provider.is_empty() || provider.contains('/') {
            return Err(ChunkError::InvalidProvider(provider.to_string()));
        }
        if sequence_index == 0 {
            return Err(ChunkError::InvalidSequenceIndex(sequence_index));
        }

        Ok(Self {
            provider: provider.to_string(),
            platform,
            severity,
            sequence_index,
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn severity(&self) -> SeverityLevel {
        self.severity
    }

    pub fn sequence_index(&self) -> usize {
        self.sequence_index
    }

    pub fn object_key(&self) -> String {
        format!(
            "{}/{}/{}/{}.{CHUNK_OBJECT_EXTENSION}",
            self.provider,
            self.platform.path_segment(),
            self.severity.ordinal(),
            self.sequence_index,
        )
    }

    pub fn parse(key: &str) -> Result<Self, ChunkError> {
        let malformed = || ChunkError::MalformedKey(key.to_string());

        let segments: Vec<&str> = key.split('/').collect();
        let [provider, platform, severity, file_name] = segments.as_slice() else {
            return Err(malformed());
        };

        let platform = Platform::ALL
            .into_iter()
            .find(|candidate| candidate.path_segment() == *platform)
            .ok_or_else(malformed)?;
        let severity = severity
            .parse::<u8>()
            .ok()
            .and_then(SeverityLevel::from_ordinal)
            .ok_or_else(malformed)?;
        let sequence_index = file_name
            .strip_suffix(&format!(".{CHUNK_OBJECT_EXTENSION}"))
            .and_then(|index| index.parse::<usize>().ok())
            .ok_or_else(malformed)?;

        Self::new(provider, platform, severity, sequence_index).map_err(|_| malformed())
    }
}

impl std::fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.object_key())
    }
}

pub fn build_key(
    provider: &str,
    platform: Platform,
    severity: SeverityLevel,
    sequence_index: usize,
) -> Result<ChunkKey, ChunkError> {
    ChunkKey::new(provider, platform, severity, sequence_index)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub sequence_index: usize,
    pub start_index: usize,
    pub end_index_exclusive: usize,
}

impl ChunkSpan {
    pub fn len(&self) -> usize {
        self.end_index_exclusive - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Splits `total_units` into contiguous spans of `chunk_size`; only the last
/// span may be shorter.
pub fn plan_chunks(total_units: usize, chunk_size: usize) -> Result<Vec<ChunkSpan>, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::NonPositive { name: "chunk_size" });
    }

    let chunk_count = total_units.div_ceil(chunk_size);
    let mut spans = Vec::with_capacity(chunk_count);
    let mut cursor = 0usize;
    for offset in 0..chunk_count {
        let end_index_exclusive = (cursor + chunk_size).min(total_units);
        spans.push(ChunkSpan {
            sequence_index: offset + 1,
            start_index: cursor,
            end_index_exclusive,
        });
        cursor = end_index_exclusive;
    }

    Ok(spans)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    key: ChunkKey,
    tokens: Vec<String>,
}

impl Chunk {
    pub fn new(key: ChunkKey, tokens: Vec<String>, chunk_size: usize) -> Result<Self, ChunkError> {
        if tokens.len() > chunk_size {
            return Err(ChunkError::Oversized {
                actual: tokens.len(),
                limit: chunk_size,
            });
        }
        Ok(Self { key, tokens })
    }

    pub fn key(&self) -> &ChunkKey {
        &self.key
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// JSON array of the chunk's tokens.
    pub fn to_body(&self) -> Vec<u8> {
        serde_json::to_vec(&self.tokens).expect("serialization of string array should not fail")
    }

    pub fn from_body(key: ChunkKey, body: &[u8]) -> Result<Self, ChunkError> {
        let tokens: Vec<String> = serde_json::from_slice(body)
            .map_err(|error| ChunkError::MalformedBody(error.to_string()))?;
        Ok(Self { key, tokens })
    }

    pub fn fingerprint(&self) -> String {
        body_fingerprint(&self.to_body())
    }
}

pub fn body_fingerprint(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    format!("{:x}", hasher.finalize())
}

pub fn synthetic_token(key: &ChunkKey, position: usize) -> String {
    format!(
        "{}-{}-{}-{:04}-{:06}",
        key.provider(),
        key.platform().path_segment(),
        key.severity().ordinal(),
        key.sequence_index(),
        position,
    )
}

/// Builds `chunk_count` full chunks of synthesized tokens for seeding.
///
/// Tokens depend only on the key and position, so seeding the same triple
/// twice writes identical objects.
pub fn generate_chunks(
    provider: &str,
    platform: Platform,
    severity: SeverityLevel,
    chunk_count: usize,
    chunk_size: usize,
) -> Result<Vec<Chunk>, ChunkError> {
    if chunk_count == 0 {
        return Err(ChunkError::NonPositive {
            name: "chunk_count",
        });
    }
    if chunk_size == 0 {
        return Err(ChunkError::NonPositive { name: "chunk_size" });
    }

    (1..=chunk_count)
        .map(|sequence_index| {
            let key = build_key(provider, platform, severity, sequence_index)?;
            let tokens = (0..chunk_size)
                .map(|position| synthetic_token(&key, position))
                .collect();
            Chunk::new(key, tokens, chunk_size)
        })
        .collect()
}
