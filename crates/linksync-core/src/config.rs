//! Configuration types for the reconciliation controller

use serde::{Deserialize, Serialize};

use crate::types::FamilyFilter;

fn default_reconcile_interval_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    64
}

/// Controller configuration
///
/// The enabled-family flags are fixed at construction; there is no
/// runtime toggling, which keeps the family gate race-free.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Controller name, used for logging context only
    pub name: String,

    /// Whether this controller manages IPv4 addresses
    pub ipv4_enabled: bool,

    /// Whether this controller manages IPv6 addresses
    pub ipv6_enabled: bool,

    /// Seconds between periodic reconciliation passes
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,

    /// Capacity of the controller event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ControllerConfig {
    /// Create a configuration with default interval and channel capacity
    pub fn new(name: impl Into<String>, ipv4_enabled: bool, ipv6_enabled: bool) -> Self {
        Self {
            name: name.into(),
            ipv4_enabled,
            ipv6_enabled,
            reconcile_interval_secs: default_reconcile_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.is_empty() {
            return Err(crate::Error::config("controller name cannot be empty"));
        }
        if !self.ipv4_enabled && !self.ipv6_enabled {
            return Err(crate::Error::config(
                "at least one address family must be enabled",
            ));
        }
        if self.reconcile_interval_secs == 0 {
            return Err(crate::Error::config("reconcile interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// The kernel listing filter implied by the enabled families
    pub fn family_filter(&self) -> FamilyFilter {
        match (self.ipv4_enabled, self.ipv6_enabled) {
            (true, true) => FamilyFilter::All,
            (true, false) => FamilyFilter::V4,
            (false, true) => FamilyFilter::V6,
            // rejected by validate(); fall back to the widest filter
            (false, false) => FamilyFilter::All,
        }
    }
}
