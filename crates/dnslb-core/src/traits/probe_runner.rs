// # Probe Runner Trait
//
// Defines the interface for liveness probing of a single address.
//
// ## Implementations
//
// - ICMP echo: `dnslb-probe-icmp` crate
//
// ## Usage
//
// ```rust,ignore
// use dnslb_core::ProbeRunner;
// use std::time::Duration;
//
// let result = runner
//     .probe("10.0.0.1".parse()?, 3, Duration::from_secs(5))
//     .await?;
// println!("{}/{} replies", result.received, result.sent);
// ```

use crate::model::ProbeResult;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

/// Trait for probe runner implementations
///
/// # Contract
///
/// - Sends `count` probes to `address` and counts replies that arrive
///   before `window` elapses
/// - Must return within `window` plus its own setup/teardown cost
/// - Returns `Err(Error::Probe)` when the probe cannot be set up at all
///   (e.g. missing raw-socket privilege); the reconciler records that
///   address as unreachable
/// - Never retries; one call is one probe
///
/// Runners generate real network traffic (`count` packets per address per
/// pass), so `count` is expected to stay small.
#[async_trait]
pub trait ProbeRunner: Send + Sync {
    /// Probe one address
    async fn probe(
        &self,
        address: IpAddr,
        count: u32,
        window: Duration,
    ) -> Result<ProbeResult, crate::Error>;

    /// Get the runner name (for logging/debugging)
    fn runner_name(&self) -> &'static str;
}

/// Helper trait for constructing probe runners from configuration
pub trait ProbeRunnerFactory: Send + Sync {
    /// Create a ProbeRunner instance from configuration
    fn create(
        &self,
        config: &crate::config::ProbeConfig,
    ) -> Result<Box<dyn ProbeRunner>, crate::Error>;
}
