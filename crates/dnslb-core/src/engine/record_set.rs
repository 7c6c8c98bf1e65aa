//! Per-record-set reconciliation
//!
//! Probes every address of one record set concurrently and rewrites each
//! record's disabled flag from its probe result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::ProbeConfig;
use crate::model::{ProbeResult, ReconciliationOutcome, RecordKey, RecordSet, RecordVerdict};
use crate::traits::ProbeRunner;

/// Slack granted to a runner beyond the probe window before its result is
/// abandoned and the address counted as unreachable
pub const PROBE_GRACE: Duration = Duration::from_secs(1);

/// Reconciles one record set against observed reachability
///
/// Cheap to clone; clones share the probe runner.
#[derive(Clone)]
pub struct RecordSetReconciler {
    runner: Arc<dyn ProbeRunner>,
    count: u32,
    window: Duration,
}

impl RecordSetReconciler {
    /// Create a reconciler probing each address `count` times within `window`
    pub fn new(runner: Arc<dyn ProbeRunner>, count: u32, window: Duration) -> Self {
        Self {
            runner,
            count,
            window,
        }
    }

    /// Create a reconciler from probe configuration
    pub fn from_config(runner: Arc<dyn ProbeRunner>, config: &ProbeConfig) -> Self {
        Self::new(runner, config.count, config.window())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Reconcile a record set
    ///
    /// All addresses are probed in parallel, so the pass takes about one
    /// window regardless of the number of records. A probe that cannot run
    /// degrades its own address to unreachable and nothing else.
    pub async fn reconcile(&self, record_set: RecordSet) -> ReconciliationOutcome {
        let probes = self.probe_all(&record_set).await;
        apply_probe_results(record_set, probes)
    }

    async fn probe_all(&self, record_set: &RecordSet) -> HashMap<usize, (RecordKey, ProbeResult)> {
        let mut tasks = JoinSet::new();
        let mut results = HashMap::with_capacity(record_set.records.len());

        for (index, record) in record_set.records.iter().enumerate() {
            let key = RecordKey {
                index,
                content: record.content.clone(),
            };

            let Some(address) = record.address() else {
                warn!(
                    "Record {:?} in {} is not an IP address, treating it as unreachable",
                    record.content, record_set.name
                );
                continue;
            };

            let runner = Arc::clone(&self.runner);
            let (count, window) = (self.count, self.window);

            tasks.spawn(async move {
                let probe = runner.probe(address, count, window);
                let result = match tokio::time::timeout(window + PROBE_GRACE, probe).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => {
                        warn!(
                            "Probe setup failed for {}, treating it as unreachable: {}",
                            address, e
                        );
                        ProbeResult::unreachable(address)
                    }
                    Err(_) => {
                        warn!(
                            "Probe of {} overran its {:?} window, treating it as unreachable",
                            address, window
                        );
                        ProbeResult::unreachable(address)
                    }
                };
                (key, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, result)) => {
                    debug!(
                        "{} -> {} packets transmitted, {} received",
                        result.address, result.sent, result.received
                    );
                    results.insert(key.index, (key, result));
                }
                Err(e) => warn!("Probe task for {} failed: {}", record_set.name, e),
            }
        }

        results
    }
}

/// Apply probe results to a record set
///
/// A record without a matching result (no address, failed task) is disabled.
/// A result whose content no longer matches the record at its index is
/// ignored and the record keeps its flag.
fn apply_probe_results(
    mut record_set: RecordSet,
    mut probes: HashMap<usize, (RecordKey, ProbeResult)>,
) -> ReconciliationOutcome {
    let mut verdicts = Vec::with_capacity(record_set.records.len());

    for (index, record) in record_set.records.iter_mut().enumerate() {
        let was_disabled = record.disabled;
        let key = RecordKey {
            index,
            content: record.content.clone(),
        };

        let probe = match probes.remove(&index) {
            Some((probed, result)) if probed == key => Some(result),
            Some((probed, _)) => {
                warn!(
                    "Probe result for {:?} does not match record {:?} at index {}, keeping its flag",
                    probed.content, record.content, index
                );
                verdicts.push(RecordVerdict {
                    key,
                    probe: None,
                    was_disabled,
                    disabled: was_disabled,
                });
                continue;
            }
            None => None,
        };

        let disabled = probe.as_ref().is_none_or(ProbeResult::desired_disabled);
        record.disabled = disabled;

        if was_disabled != disabled {
            let stats = probe
                .map(|p| format!("{}/{} replies", p.received, p.sent))
                .unwrap_or_else(|| "not probed".to_string());
            info!(
                "{} {} in {} ({})",
                if disabled { "Disabling" } else { "Enabling" },
                record.content,
                record_set.name,
                stats
            );
        }

        verdicts.push(RecordVerdict {
            key,
            probe,
            was_disabled,
            disabled,
        });
    }

    let changed = verdicts.iter().any(RecordVerdict::flipped);

    ReconciliationOutcome {
        record_set,
        changed,
        verdicts,
    }
}
