// # ICMP Probe Runner
//
// This crate provides an ICMP echo `ProbeRunner`.
//
// ## Behavior
//
// A probe sends `count` echo requests to one address, spaced by the
// configured interval, and counts the replies that arrive before the window
// closes. Requests that would leave after the window closes are not sent.
//
// ## Privileges
//
// - `privileged = true`: raw ICMP sockets (root or CAP_NET_RAW)
// - `privileged = false`: unprivileged datagram ping sockets (Linux needs
//   the group in `net.ipv4.ping_group_range`)
//
// A socket that cannot be opened is a probe setup failure, never a panic.

use async_trait::async_trait;
use dnslb_core::config::ProbeConfig;
use dnslb_core::model::ProbeResult;
use dnslb_core::registry::ComponentRegistry;
use dnslb_core::traits::{ProbeRunner, ProbeRunnerFactory};
use dnslb_core::{Error, Result};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence};
use tokio::task::JoinSet;
use tokio::time::Instant;

const RUNNER: &str = "icmp";

/// Echo payload, the size classic ping uses
const PAYLOAD: [u8; 56] = [0; 56];

/// ICMP echo probe runner
///
/// Every probe opens its own socket, so concurrent probes of different
/// addresses share nothing but the identifier counter. Within a probe the
/// echo tasks share one client; it is dropped only after all of them finish.
///
/// Dropping any clone of a surge-ping `Client` tears down the shared reply
/// table, so the client is held in an `Arc` rather than cloned.
pub struct IcmpProbeRunner {
    interval: Duration,
    privileged: bool,
    next_identifier: AtomicU16,
}

impl std::fmt::Debug for IcmpProbeRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcmpProbeRunner")
            .field("interval", &self.interval)
            .field("privileged", &self.privileged)
            .finish()
    }
}

impl IcmpProbeRunner {
    /// Create a runner
    ///
    /// # Parameters
    ///
    /// - `interval`: Spacing between echo requests of one probe
    /// - `privileged`: Use raw sockets instead of datagram ping sockets
    pub fn new(interval: Duration, privileged: bool) -> Self {
        Self {
            interval,
            privileged,
            next_identifier: AtomicU16::new(std::process::id() as u16),
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    fn identifier(&self) -> u16 {
        self.next_identifier.fetch_add(1, Ordering::Relaxed)
    }

    fn client(&self, address: IpAddr) -> Result<Client> {
        let kind = match address {
            IpAddr::V4(_) => ICMP::V4,
            IpAddr::V6(_) => ICMP::V6,
        };
        let sock_type = if self.privileged {
            socket2::Type::RAW
        } else {
            socket2::Type::DGRAM
        };

        let config = Config::builder().kind(kind).sock_type_hint(sock_type).build();

        Client::new(&config).map_err(|e| {
            Error::probe(format!(
                "Failed to open {} ICMP socket for {}: {}",
                if self.privileged { "raw" } else { "datagram" },
                address,
                e
            ))
        })
    }
}

/// Send offsets for `count` requests spaced by `interval`, dropping those
/// that would leave at or after `window`
fn send_offsets(count: u32, interval: Duration, window: Duration) -> Vec<Duration> {
    (0..count)
        .map(|seq| interval.saturating_mul(seq))
        .take_while(|offset| *offset < window)
        .collect()
}

#[async_trait]
impl ProbeRunner for IcmpProbeRunner {
    async fn probe(&self, address: IpAddr, count: u32, window: Duration) -> Result<ProbeResult> {
        let client = Arc::new(self.client(address)?);
        let identifier = self.identifier();
        let deadline = Instant::now() + window;

        let mut pings = JoinSet::new();
        for (seq, offset) in send_offsets(count, self.interval, window)
            .into_iter()
            .enumerate()
        {
            let client = Arc::clone(&client);
            pings.spawn(async move {
                tokio::time::sleep(offset).await;

                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return false;
                }

                let mut pinger = client.pinger(address, PingIdentifier(identifier)).await;
                pinger.timeout(remaining);

                match pinger.ping(PingSequence(seq as u16), &PAYLOAD).await {
                    Ok((_, rtt)) => {
                        tracing::trace!("{} seq={} time={:?}", address, seq, rtt);
                        true
                    }
                    Err(e) => {
                        tracing::trace!("{} seq={}: {}", address, seq, e);
                        false
                    }
                }
            });
        }

        let sent = pings.len() as u32;
        let mut received = 0;
        while let Some(joined) = pings.join_next().await {
            if matches!(joined, Ok(true)) {
                received += 1;
            }
        }

        tracing::debug!(
            "{}: {} packets transmitted, {} received",
            address,
            sent,
            received
        );
        Ok(ProbeResult::new(address, sent, received))
    }

    fn runner_name(&self) -> &'static str {
        RUNNER
    }
}

/// Factory for creating ICMP probe runners
pub struct IcmpFactory;

impl ProbeRunnerFactory for IcmpFactory {
    fn create(&self, config: &ProbeConfig) -> Result<Box<dyn ProbeRunner>> {
        if config.runner != RUNNER {
            return Err(Error::config(format!(
                "Invalid config for ICMP probe runner: {}",
                config.runner
            )));
        }

        if !config.privileged {
            tracing::info!("ICMP probes use unprivileged datagram sockets");
        }

        Ok(Box::new(IcmpProbeRunner::new(
            config.interval(),
            config.privileged,
        )))
    }
}

/// Register the ICMP probe runner with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_probe_runner(RUNNER, Box::new(IcmpFactory));
}
