//! Environment-style configuration, read once at process start.
//!
//! Loaders take a `lookup` closure instead of reading the process
//! environment directly so they can be exercised with fixed maps.

use std::time::Duration;

use crate::error::ConfigError;
use crate::flow::{FlowControlMode, FlowRoutingConfig, PlatformQueues};

pub const FLOW_CONTROL_MODE: &str = "FLOW_CONTROL_MODE";
pub const FCM_ALL_QUEUE_URL: &str = "FCM_ALL_QUEUE_URL";
pub const FCM_SELECTED_QUEUE_URL: &str = "FCM_SELECTED_QUEUE_URL";
pub const APNS_ALL_QUEUE_URL: &str = "APNS_ALL_QUEUE_URL";
pub const APNS_SELECTED_QUEUE_URL: &str = "APNS_SELECTED_QUEUE_URL";
pub const CHUNK_SIZE: &str = "CHUNK_SIZE";
pub const CHUNK_COUNT: &str = "CHUNK_COUNT";
pub const CHUNK_BUCKET: &str = "CHUNK_BUCKET";
pub const DEVICE_REGISTRY_BUCKET: &str = "DEVICE_REGISTRY_BUCKET";
pub const DEVICE_REGISTRY_PREFIX: &str = "DEVICE_REGISTRY_PREFIX";
pub const PUSH_GATEWAY_URL: &str = "PUSH_GATEWAY_URL";
pub const DISPATCH_DEADLINE_MARGIN_MS: &str = "DISPATCH_DEADLINE_MARGIN_MS";

pub const DEFAULT_DEVICE_REGISTRY_PREFIX: &str = "devices";
pub const DEFAULT_DEADLINE_MARGIN_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_count: usize,
}

pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

pub fn require(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(key))
}

pub fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn positive_integer(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<usize, ConfigError> {
    let raw = require(lookup, key)?;
    match raw.parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be a positive integer".to_string(),
        }),
    }
}

pub fn load_flow_routing(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<FlowRoutingConfig, ConfigError> {
    let raw_mode = require(lookup, FLOW_CONTROL_MODE)?;
    let mode = FlowControlMode::parse(&raw_mode).ok_or_else(|| ConfigError::Invalid {
        key: FLOW_CONTROL_MODE,
        value: raw_mode.clone(),
        reason: "expected 'all' or 'selected'".to_string(),
    })?;

    Ok(FlowRoutingConfig {
        mode,
        fcm: PlatformQueues {
            all: require(lookup, FCM_ALL_QUEUE_URL)?,
            selected: require(lookup, FCM_SELECTED_QUEUE_URL)?,
        },
        apns: PlatformQueues {
            all: require(lookup, APNS_ALL_QUEUE_URL)?,
            selected: require(lookup, APNS_SELECTED_QUEUE_URL)?,
        },
    })
}

pub fn load_chunking(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<ChunkingConfig, ConfigError> {
    Ok(ChunkingConfig {
        chunk_size: positive_integer(lookup, CHUNK_SIZE)?,
        chunk_count: positive_integer(lookup, CHUNK_COUNT)?,
    })
}

pub fn load_deadline_margin(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Duration, ConfigError> {
    let Some(raw) = lookup(DISPATCH_DEADLINE_MARGIN_MS).filter(|value| !value.trim().is_empty())
    else {
        return Ok(Duration::from_millis(DEFAULT_DEADLINE_MARGIN_MS));
    };

    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|error| ConfigError::Invalid {
            key: DISPATCH_DEADLINE_MARGIN_MS,
            value: raw.clone(),
            reason: error.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| values.get(key).cloned()
    }

    fn routing_pairs(mode: &'static str) -> Vec<(&'static str, &'static str)> {
        vec![
            (FLOW_CONTROL_MODE, mode),
            (FCM_ALL_QUEUE_URL, "https://sqs.local/fcm-all"),
            (FCM_SELECTED_QUEUE_URL, "https://sqs.local/fcm-selected"),
            (APNS_ALL_QUEUE_URL, "https://sqs.local/apns-all"),
            (APNS_SELECTED_QUEUE_URL, "https://sqs.local/apns-selected"),
        ]
    }

    #[test]
    fn loads_flow_routing_with_case_insensitive_mode() {
        let config = load_flow_routing(&lookup_from(&routing_pairs(" Selected ")))
            .expect("config should load");
        assert_eq!(config.mode, FlowControlMode::Selected);
        assert_eq!(config.apns.selected, "https://sqs.local/apns-selected");
    }

    #[test]
    fn rejects_unknown_mode_at_load_time() {
        let error = load_flow_routing(&lookup_from(&routing_pairs("broadcast")))
            .expect_err("config should fail");
        assert!(matches!(
            error,
            ConfigError::Invalid {
                key: FLOW_CONTROL_MODE,
                ..
            }
        ));
    }

    #[test]
    fn reports_missing_queue_url() {
        let mut pairs = routing_pairs("all");
        pairs.retain(|(key, _)| *key != APNS_ALL_QUEUE_URL);
        let error = load_flow_routing(&lookup_from(&pairs)).expect_err("config should fail");
        assert_eq!(error, ConfigError::Missing(APNS_ALL_QUEUE_URL));
    }

    #[test]
    fn chunking_requires_positive_integers() {
        let config = load_chunking(&lookup_from(&[(CHUNK_SIZE, "500"), (CHUNK_COUNT, "4")]))
            .expect("config should load");
        assert_eq!(
            config,
            ChunkingConfig {
                chunk_size: 500,
                chunk_count: 4
            }
        );

        let zero = load_chunking(&lookup_from(&[(CHUNK_SIZE, "0"), (CHUNK_COUNT, "4")]))
            .expect_err("zero size should fail");
        assert!(zero.to_string().contains("must be a positive integer"));

        let text = load_chunking(&lookup_from(&[(CHUNK_SIZE, "10"), (CHUNK_COUNT, "many")]))
            .expect_err("non-numeric count should fail");
        assert!(matches!(text, ConfigError::Invalid { key: CHUNK_COUNT, .. }));
    }

    #[test]
    fn deadline_margin_defaults_when_unset() {
        assert_eq!(
            load_deadline_margin(&lookup_from(&[])).expect("default should load"),
            Duration::from_millis(DEFAULT_DEADLINE_MARGIN_MS)
        );
        assert_eq!(
            load_deadline_margin(&lookup_from(&[(DISPATCH_DEADLINE_MARGIN_MS, "250")]))
                .expect("value should load"),
            Duration::from_millis(250)
        );
        assert!(load_deadline_margin(&lookup_from(&[(DISPATCH_DEADLINE_MARGIN_MS, "-1")])).is_err());
    }

    #[test]
    fn optional_values_fall_back_to_default() {
        let lookup = lookup_from(&[(DEVICE_REGISTRY_PREFIX, "  ")]);
        assert_eq!(
            optional(&lookup, DEVICE_REGISTRY_PREFIX, DEFAULT_DEVICE_REGISTRY_PREFIX),
            "devices"
        );
    }
}
