use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::contract::{AlertEvent, Platform};

/// Whether an alert fans out to every registered device or only to the
/// recipients named in the event. Fixed for the lifetime of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControlMode {
    All,
    Selected,
}

impl FlowControlMode {
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("all") {
            Some(Self::All)
        } else if normalized.eq_ignore_ascii_case("selected") {
            Some(Self::Selected)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Selected => "selected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformQueues {
    pub all: String,
    pub selected: String,
}

impl PlatformQueues {
    pub fn for_mode(&self, mode: FlowControlMode) -> &str {
        match mode {
            FlowControlMode::All => &self.all,
            FlowControlMode::Selected => &self.selected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRoutingConfig {
    pub mode: FlowControlMode,
    pub fcm: PlatformQueues,
    pub apns: PlatformQueues,
}

impl FlowRoutingConfig {
    pub fn queues(&self, platform: Platform) -> &PlatformQueues {
        match platform {
            Platform::Fcm => &self.fcm,
            Platform::Apns => &self.apns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDestination {
    pub platform: Platform,
    pub mode: FlowControlMode,
    pub queue_url: String,
}

/// Resolves the queues an alert must be published to: one destination per
/// distinct platform in the event, in platform order, using the queue of the
/// configured mode.
pub fn route(config: &FlowRoutingConfig, event: &AlertEvent) -> Vec<QueueDestination> {
    let platforms: BTreeSet<Platform> = event.platforms.iter().copied().collect();
    platforms
        .into_iter()
        .map(|platform| QueueDestination {
            platform,
            mode: config.mode,
            queue_url: config.queues(platform).for_mode(config.mode).to_string(),
        })
        .collect()
}
