//! Per-binary configuration assembled from the shared loaders.

use std::time::Duration;

use crate::runtime::config::{
    load_chunking, load_deadline_margin, load_flow_routing, optional, require, ChunkingConfig,
    CHUNK_BUCKET, DEFAULT_DEVICE_REGISTRY_PREFIX, DEVICE_REGISTRY_BUCKET, DEVICE_REGISTRY_PREFIX,
    PUSH_GATEWAY_URL,
};
use crate::runtime::error::ConfigError;
use crate::runtime::flow::FlowRoutingConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRegistryConfig {
    pub bucket: String,
    pub prefix: String,
    pub deadline_margin: Duration,
}

impl DeviceRegistryConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            bucket: require(lookup, DEVICE_REGISTRY_BUCKET)?,
            prefix: optional(lookup, DEVICE_REGISTRY_PREFIX, DEFAULT_DEVICE_REGISTRY_PREFIX),
            deadline_margin: load_deadline_margin(lookup)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertIngestConfig {
    pub flow: FlowRoutingConfig,
    pub chunking: ChunkingConfig,
    pub chunk_bucket: String,
    pub deadline_margin: Duration,
}

impl AlertIngestConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            flow: load_flow_routing(lookup)?,
            chunking: load_chunking(lookup)?,
            chunk_bucket: require(lookup, CHUNK_BUCKET)?,
            deadline_margin: load_deadline_margin(lookup)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSenderConfig {
    pub chunk_bucket: String,
    pub push_gateway_url: String,
    pub deadline_margin: Duration,
}

impl PushSenderConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            chunk_bucket: require(lookup, CHUNK_BUCKET)?,
            push_gateway_url: require(lookup, PUSH_GATEWAY_URL)?,
            deadline_margin: load_deadline_margin(lookup)?,
        })
    }
}
