use serde::{Deserialize, Serialize};

/// Ordinal urgency of an alert, 0 being the most urgent.
///
/// Every label maps to a level: anything that is not one of the four known
/// labels resolves to [`SeverityLevel::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SeverityLevel {
    Extreme,
    Severe,
    Moderate,
    Minor,
    Unknown,
}

pub const DEFAULT_SEVERITY: SeverityLevel = SeverityLevel::Unknown;

impl SeverityLevel {
    pub const ALL: [SeverityLevel; 5] = [
        Self::Extreme,
        Self::Severe,
        Self::Moderate,
        Self::Minor,
        Self::Unknown,
    ];

    pub fn ordinal(self) -> u8 {
        match self {
            Self::Extreme => 0,
            Self::Severe => 1,
            Self::Moderate => 2,
            Self::Minor => 3,
            Self::Unknown => 4,
        }
    }

    pub fn from_ordinal(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.ordinal() == value)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Extreme => "extreme",
            Self::Severe => "severe",
            Self::Moderate => "moderate",
            Self::Minor => "minor",
            Self::Unknown => "unknown",
        }
    }

    /// Levels that warrant high-priority delivery on push platforms.
    pub fn is_urgent(self) -> bool {
        self.ordinal() <= 1
    }
}

/// Maps a free-text severity label to its level.
pub fn classify(label: &str) -> SeverityLevel {
    let normalized = label.trim();
    if normalized.eq_ignore_ascii_case("extreme") {
        SeverityLevel::Extreme
    } else if normalized.eq_ignore_ascii_case("severe") {
        SeverityLevel::Severe
    } else if normalized.eq_ignore_ascii_case("moderate") {
        SeverityLevel::Moderate
    } else if normalized.eq_ignore_ascii_case("minor") {
        SeverityLevel::Minor
    } else {
        DEFAULT_SEVERITY
    }
}

impl From<String> for SeverityLevel {
    fn from(value: String) -> Self {
        classify(&value)
    }
}

impl From<SeverityLevel> for String {
    fn from(value: SeverityLevel) -> Self {
        value.label().to_string()
    }
}

impl std::fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
