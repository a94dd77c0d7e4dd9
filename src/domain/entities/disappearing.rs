//! Disappearing-message configuration.

use serde::{Deserialize, Serialize};

/// Per-thread expiration policy, versioned by the time its author set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct DisappearingConfig {
    pub enabled: bool,

    /// Expiration timer in seconds
    pub duration_seconds: u32,

    /// When the author set this policy (ms since epoch)
    pub source_timestamp: i64,
}

impl DisappearingConfig {
    pub fn enabled(duration_seconds: u32, source_timestamp: i64) -> Self {
        Self {
            enabled: true,
            duration_seconds,
            source_timestamp,
        }
    }

    pub fn disabled(source_timestamp: i64) -> Self {
        Self {
            enabled: false,
            duration_seconds: 0,
            source_timestamp,
        }
    }

    /// Compare policies, ignoring the version timestamp. A disabled policy
    /// matches any other disabled policy whatever its duration.
    pub fn same_policy(&self, other: &Self) -> bool {
        self.enabled == other.enabled
            && (!self.enabled || self.duration_seconds == other.duration_seconds)
    }

    pub fn is_newer_than(&self, other: &Self) -> bool {
        self.source_timestamp > other.source_timestamp
    }
}
