//! Test doubles and common utilities for reconciliation contract tests
//!
//! This module provides in-memory fakes for the controller and the probe
//! runner that count every call, so tests can assert on side effects.

#![allow(dead_code)]

use dnslb_core::config::{ControllerConfig, FailoverConfig, ProbeConfig, SchedulerConfig, ZoneSelector};
use dnslb_core::error::{Error, Result};
use dnslb_core::model::{ProbeResult, Record, RecordSet};
use dnslb_core::traits::{DnsController, ProbeRunner};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// An in-memory controller that records fetches and publishes
///
/// Publishing replaces the stored record set by (name, type), like the real
/// controller, so later fetches see the published state.
#[derive(Default)]
pub struct FakeController {
    zones: Mutex<HashMap<String, Vec<RecordSet>>>,
    published: Mutex<Vec<(String, RecordSet)>>,
    fetch_count: AtomicUsize,
    list_count: AtomicUsize,
    publish_count: AtomicUsize,
    fail_fetch: AtomicBool,
    fail_list: AtomicBool,
    fail_publish: AtomicBool,
    dry_run: AtomicBool,
}

impl FakeController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a controller serving one zone
    pub fn with_zone(zone: &str, record_sets: Vec<RecordSet>) -> Self {
        let controller = Self::new();
        controller.set_zone(zone, record_sets);
        controller
    }

    pub fn set_zone(&self, zone: &str, record_sets: Vec<RecordSet>) {
        self.zones
            .lock()
            .unwrap()
            .insert(zone.to_string(), record_sets);
    }

    pub fn zone(&self, zone: &str) -> Vec<RecordSet> {
        self.zones
            .lock()
            .unwrap()
            .get(zone)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Accept publishes without storing them
    pub fn set_dry_run(&self, dry_run: bool) {
        self.dry_run.store(dry_run, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn list_count(&self) -> usize {
        self.list_count.load(Ordering::SeqCst)
    }

    /// Number of publish calls, successful or not
    pub fn publish_count(&self) -> usize {
        self.publish_count.load(Ordering::SeqCst)
    }

    /// Record sets accepted by publish, with their zone
    pub fn published(&self) -> Vec<(String, RecordSet)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsController for FakeController {
    async fn fetch_zone(&self, zone: &str) -> Result<Vec<RecordSet>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Error::http("connection refused"));
        }

        self.zones
            .lock()
            .unwrap()
            .get(zone)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone)))
    }

    async fn list_zones(&self) -> Result<Vec<String>> {
        self.list_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::http("connection refused"));
        }

        let mut names: Vec<String> = self.zones.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn publish_record_set(&self, zone: &str, record_set: &RecordSet) -> Result<()> {
        self.publish_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(Error::provider("fake", "422 Unprocessable Entity"));
        }

        if self.is_dry_run() {
            return Ok(());
        }

        let mut zones = self.zones.lock().unwrap();
        let sets = zones.entry(zone.to_string()).or_default();
        match sets
            .iter_mut()
            .find(|s| s.name == record_set.name && s.record_type == record_set.record_type)
        {
            Some(existing) => *existing = record_set.clone(),
            None => sets.push(record_set.clone()),
        }

        self.published
            .lock()
            .unwrap()
            .push((zone.to_string(), record_set.clone()));
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run.load(Ordering::SeqCst)
    }
}

/// A probe runner answering from a table instead of the network
///
/// Addresses are reachable (every probe answered) unless configured
/// otherwise. Delays use tokio time, so paused-clock tests stay instant.
pub struct FakeProbeRunner {
    replies: Mutex<HashMap<IpAddr, u32>>,
    failing: Mutex<HashSet<IpAddr>>,
    hanging: Mutex<HashSet<IpAddr>>,
    delay: Duration,
    probed: Mutex<Vec<IpAddr>>,
    probe_count: AtomicUsize,
}

impl FakeProbeRunner {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Every probe takes `delay` before answering
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            hanging: Mutex::new(HashSet::new()),
            delay,
            probed: Mutex::new(Vec::new()),
            probe_count: AtomicUsize::new(0),
        }
    }

    /// Answer `received` probes for `address`
    pub fn set_replies(&self, address: &str, received: u32) {
        self.replies
            .lock()
            .unwrap()
            .insert(address.parse().unwrap(), received);
    }

    /// Make `address` unreachable (no replies)
    pub fn set_down(&self, address: &str) {
        self.set_replies(address, 0);
    }

    /// Fail probe setup for `address`
    pub fn set_failing(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.parse().unwrap());
    }

    /// Never return for `address`
    pub fn set_hanging(&self, address: &str) {
        self.hanging.lock().unwrap().insert(address.parse().unwrap());
    }

    pub fn probe_count(&self) -> usize {
        self.probe_count.load(Ordering::SeqCst)
    }

    /// Addresses probed so far, sorted
    pub fn probed(&self) -> Vec<IpAddr> {
        let mut probed = self.probed.lock().unwrap().clone();
        probed.sort();
        probed
    }
}

#[async_trait::async_trait]
impl ProbeRunner for FakeProbeRunner {
    async fn probe(&self, address: IpAddr, count: u32, _window: Duration) -> Result<ProbeResult> {
        self.probe_count.fetch_add(1, Ordering::SeqCst);
        self.probed.lock().unwrap().push(address);

        if self.failing.lock().unwrap().contains(&address) {
            return Err(Error::probe("socket: operation not permitted"));
        }

        let hanging = self.hanging.lock().unwrap().contains(&address);
        if hanging {
            std::future::pending::<()>().await;
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let received = self
            .replies
            .lock()
            .unwrap()
            .get(&address)
            .copied()
            .unwrap_or(count)
            .min(count);

        Ok(ProbeResult::new(address, count, received))
    }

    fn runner_name(&self) -> &'static str {
        "fake"
    }
}

/// Build a record set from (content, disabled) pairs
pub fn record_set(name: &str, record_type: &str, records: &[(&str, bool)]) -> RecordSet {
    records
        .iter()
        .fold(RecordSet::new(name, record_type, 60), |set, (content, disabled)| {
            set.with_record(Record::new(*content).with_disabled(*disabled))
        })
}

/// The `api.example.` group with two enabled addresses
pub fn api_group() -> RecordSet {
    record_set(
        "api.example.",
        "A",
        &[("10.0.0.1", false), ("10.0.0.2", false)],
    )
}

/// Minimal configuration using a custom controller type, for tests
pub fn test_config(zones: ZoneSelector) -> FailoverConfig {
    FailoverConfig {
        controller: ControllerConfig::Custom {
            factory: "fake".to_string(),
            config: serde_json::json!({}),
        },
        zones,
        probe: ProbeConfig {
            runner: "fake".to_string(),
            count: 3,
            window_secs: 5,
            interval_ms: 1000,
            privileged: false,
        },
        scheduler: SchedulerConfig {
            interval_secs: 10,
            event_channel_capacity: 100,
            guard_in_flight: true,
        },
    }
}

/// Configuration for a single named zone
pub fn zone_config(zone: &str) -> FailoverConfig {
    test_config(ZoneSelector::Named(vec![zone.to_string()]))
}

/// Drain every event currently queued
pub fn drain<T>(rx: &mut tokio::sync::mpsc::Receiver<T>) -> Vec<T> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
