//! Configuration types for the DNSLB system
//!
//! This module defines all configuration structures used throughout the crate.
//! Configuration is loaded once at process start and passed explicitly to the
//! scheduler; nothing here is read from globals.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main DNSLB configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailoverConfig {
    /// DNS controller configuration
    pub controller: ControllerConfig,

    /// Zones to reconcile
    #[serde(default)]
    pub zones: ZoneSelector,

    /// Probe tuning
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl FailoverConfig {
    /// Create a configuration for the given controller with defaults elsewhere
    pub fn new(controller: ControllerConfig) -> Self {
        Self {
            controller,
            ..Self::default()
        }
    }

    /// Set the zone selector
    pub fn with_zones(mut self, zones: ZoneSelector) -> Self {
        self.zones = zones;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.controller.validate()?;
        self.zones.validate()?;
        self.probe.validate()?;
        self.scheduler.validate()?;

        Ok(())
    }
}

/// DNS controller configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerConfig {
    /// PowerDNS authoritative server HTTP API
    PowerDns {
        /// Base URL (e.g., "http://ctl.example:8081")
        base_url: String,
        /// API key sent as X-API-Key
        api_key: String,
        /// Server id in the API path
        #[serde(default = "default_server_id")]
        server_id: String,
    },

    /// Custom controller
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ControllerConfig {
    /// Validate the controller configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ControllerConfig::PowerDns {
                base_url,
                api_key,
                server_id,
            } => {
                if base_url.is_empty() {
                    return Err(crate::Error::config("Controller base URL cannot be empty"));
                }
                if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                    return Err(crate::Error::config(format!(
                        "Controller base URL must use http or https: {}",
                        base_url
                    )));
                }
                if api_key.is_empty() {
                    return Err(crate::Error::config("Controller API key cannot be empty"));
                }
                if server_id.is_empty() {
                    return Err(crate::Error::config("Controller server id cannot be empty"));
                }
                Ok(())
            }
            ControllerConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom controller factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom controller config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the controller type name
    pub fn type_name(&self) -> &str {
        match self {
            ControllerConfig::PowerDns { .. } => "powerdns",
            ControllerConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig::PowerDns {
            base_url: String::new(),
            api_key: String::new(),
            server_id: default_server_id(),
        }
    }
}

// Keeps the API key out of Debug output
impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerConfig::PowerDns {
                base_url,
                server_id,
                ..
            } => f
                .debug_struct("PowerDns")
                .field("base_url", base_url)
                .field("api_key", &"<REDACTED>")
                .field("server_id", server_id)
                .finish(),
            ControllerConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .finish_non_exhaustive(),
        }
    }
}

/// Which zones the scheduler reconciles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "names", rename_all = "snake_case")]
pub enum ZoneSelector {
    /// Every zone the controller lists, re-listed on each tick
    All,
    /// A fixed list of zone names
    Named(Vec<String>),
}

impl ZoneSelector {
    /// Parse "all" or a comma-separated list of zone names
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("all") {
            return ZoneSelector::All;
        }

        ZoneSelector::Named(
            value
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(canonical_zone_name)
                .collect(),
        )
    }

    /// Validate the selector
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ZoneSelector::All => Ok(()),
            ZoneSelector::Named(names) if names.is_empty() => {
                Err(crate::Error::config("No zones configured"))
            }
            ZoneSelector::Named(names) => {
                if names.iter().any(|n| n.trim().is_empty()) {
                    return Err(crate::Error::config("Zone name cannot be empty"));
                }
                Ok(())
            }
        }
    }
}

impl Default for ZoneSelector {
    fn default() -> Self {
        ZoneSelector::Named(Vec::new())
    }
}

/// Append the trailing dot the controller uses for zone ids
pub fn canonical_zone_name(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

/// Probe tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Probe runner type (e.g., "icmp")
    #[serde(default = "default_probe_runner")]
    pub runner: String,

    /// Echo requests per address per pass
    #[serde(default = "default_probe_count")]
    pub count: u32,

    /// Window in which replies are counted (in seconds)
    #[serde(default = "default_probe_window_secs")]
    pub window_secs: u64,

    /// Spacing between echo requests (in milliseconds)
    #[serde(default = "default_probe_interval_ms")]
    pub interval_ms: u64,

    /// Use raw sockets; false selects unprivileged datagram ping sockets
    #[serde(default = "default_privileged")]
    pub privileged: bool,
}

impl ProbeConfig {
    /// Probe window as a Duration
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Spacing between echo requests as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Validate the probe configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.runner.is_empty() {
            return Err(crate::Error::config("Probe runner cannot be empty"));
        }
        if self.count == 0 || self.count > 20 {
            return Err(crate::Error::config(format!(
                "Probe count must be between 1 and 20, got {}",
                self.count
            )));
        }
        if self.window_secs == 0 {
            return Err(crate::Error::config("Probe window must be > 0"));
        }
        Ok(())
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            runner: default_probe_runner(),
            count: default_probe_count(),
            window_secs: default_probe_window_secs(),
            interval_ms: default_probe_interval_ms(),
            privileged: default_privileged(),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between ticks (in seconds)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Capacity of the reconcile event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Skip a record set whose previous pass is still running
    ///
    /// Disabling this allows overlapping passes to race on the same record set.
    #[serde(default = "default_guard_in_flight")]
    pub guard_in_flight: bool,
}

impl SchedulerConfig {
    /// Tick interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate the scheduler configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Scheduler interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            guard_in_flight: default_guard_in_flight(),
        }
    }
}

fn default_server_id() -> String {
    "localhost".to_string()
}

fn default_probe_runner() -> String {
    "icmp".to_string()
}

fn default_probe_count() -> u32 {
    3
}

fn default_probe_window_secs() -> u64 {
    5
}

fn default_probe_interval_ms() -> u64 {
    1000
}

fn default_privileged() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    10
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_guard_in_flight() -> bool {
    true
}
