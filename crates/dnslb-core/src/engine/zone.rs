//! Per-zone reconciliation
//!
//! Pulls one zone, picks out its load-balancing groups and reconciles each in
//! its own task, publishing the ones that changed.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::engine::events::{EventSink, ReconcileEvent};
use crate::engine::record_set::RecordSetReconciler;
use crate::error::{Error, Result};
use crate::model::{RecordSet, RecordSetKey};
use crate::state::InFlightTracker;
use crate::traits::DnsController;

/// Summary of one zone pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneReport {
    pub zone: String,
    /// Record sets in the snapshot
    pub record_sets: usize,
    /// Load-balancing groups among them
    pub eligible: usize,
    /// Groups probed and decided
    pub reconciled: usize,
    /// Groups with at least one flipped flag
    pub changed: usize,
    pub published: usize,
    /// Changed groups not written because the controller is in dry-run mode
    pub dry_run: usize,
    pub publish_failed: usize,
    /// Groups skipped because an earlier pass still holds them
    pub skipped_in_flight: usize,
    /// Pass tasks that panicked or were cancelled
    pub aborted: usize,
}

impl ZoneReport {
    fn new(zone: &str) -> Self {
        Self {
            zone: zone.to_string(),
            ..Self::default()
        }
    }

    fn record(&mut self, pass: PassResult) {
        self.reconciled += 1;
        match pass {
            PassResult::Unchanged => {}
            PassResult::Published => {
                self.changed += 1;
                self.published += 1;
            }
            PassResult::DryRun => {
                self.changed += 1;
                self.dry_run += 1;
            }
            PassResult::PublishFailed => {
                self.changed += 1;
                self.publish_failed += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassResult {
    Unchanged,
    Published,
    DryRun,
    PublishFailed,
}

/// Reconciles every load-balancing group of a zone
///
/// Cheap to clone; clones share the controller, the probe runner and the
/// in-flight tracker.
#[derive(Clone)]
pub struct ZoneReconciler {
    controller: Arc<dyn DnsController>,
    reconciler: RecordSetReconciler,
    in_flight: Option<InFlightTracker>,
    events: EventSink,
}

impl ZoneReconciler {
    /// Create a zone reconciler without an in-flight guard or events
    pub fn new(controller: Arc<dyn DnsController>, reconciler: RecordSetReconciler) -> Self {
        Self {
            controller,
            reconciler,
            in_flight: None,
            events: EventSink::disabled(),
        }
    }

    /// Skip record sets already held by another pass in `tracker`
    pub fn with_in_flight_guard(mut self, tracker: InFlightTracker) -> Self {
        self.in_flight = Some(tracker);
        self
    }

    /// Emit events to `events`
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn controller(&self) -> &Arc<dyn DnsController> {
        &self.controller
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    /// Reconcile one zone
    ///
    /// # Returns
    ///
    /// - `Ok(ZoneReport)`: The zone was pulled and every dispatched group finished
    /// - `Err(Error::Fetch)`: The zone could not be pulled; nothing was probed
    ///   or published
    pub async fn reconcile_zone(&self, zone: &str) -> Result<ZoneReport> {
        let record_sets = match self.controller.fetch_zone(zone).await {
            Ok(sets) => sets,
            Err(e) => {
                let err = match e {
                    Error::Fetch { .. } => e,
                    other => Error::fetch(zone, other.to_string()),
                };
                error!("Skipping zone {}: {}", zone, err);
                self.events.emit(ReconcileEvent::FetchFailed {
                    zone: zone.to_string(),
                    error: err.to_string(),
                });
                return Err(err);
            }
        };

        let mut report = ZoneReport::new(zone);
        report.record_sets = record_sets.len();

        let mut passes = JoinSet::new();

        for record_set in record_sets.into_iter().filter(RecordSet::is_eligible) {
            report.eligible += 1;

            let guard = match &self.in_flight {
                Some(tracker) => match tracker.try_acquire(RecordSetKey::new(zone, &record_set)) {
                    Ok(guard) => Some(guard),
                    Err(in_flight_since) => {
                        warn!(
                            "Previous pass for {} in {} still running since {}, skipping",
                            record_set.name, zone, in_flight_since
                        );
                        report.skipped_in_flight += 1;
                        self.events.emit(ReconcileEvent::RecordSetSkipped {
                            zone: zone.to_string(),
                            name: record_set.name,
                            in_flight_since,
                        });
                        continue;
                    }
                },
                None => None,
            };

            let this = self.clone();
            let zone = zone.to_string();
            passes.spawn(async move {
                let _guard = guard;
                this.reconcile_record_set(&zone, record_set).await
            });
        }

        self.events.emit(ReconcileEvent::ZoneFetched {
            zone: zone.to_string(),
            record_sets: report.record_sets,
            eligible: report.eligible,
        });
        debug!(
            "Zone {}: {} record set(s), {} load-balancing group(s)",
            zone, report.record_sets, report.eligible
        );

        while let Some(joined) = passes.join_next().await {
            match joined {
                Ok(pass) => report.record(pass),
                Err(e) => {
                    warn!("Record set pass in {} aborted: {}", zone, e);
                    report.aborted += 1;
                }
            }
        }

        Ok(report)
    }

    async fn reconcile_record_set(&self, zone: &str, record_set: RecordSet) -> PassResult {
        let outcome = self.reconciler.reconcile(record_set).await;
        let set = &outcome.record_set;

        let reachable = outcome.verdicts.iter().filter(|v| !v.disabled).count();
        self.events.emit(ReconcileEvent::RecordSetReconciled {
            zone: zone.to_string(),
            name: set.name.clone(),
            changed: outcome.changed,
            reachable,
            total: set.records.len(),
        });

        if !outcome.changed {
            debug!("{} unchanged ({}/{} reachable)", set.name, reachable, set.records.len());
            return PassResult::Unchanged;
        }

        let enabled = reachable;
        let disabled = set.records.len() - reachable;

        match self.controller.publish_record_set(zone, set).await {
            Ok(()) if self.controller.is_dry_run() => {
                info!(
                    "[DRY-RUN] {} in {} not written ({}/{} would be enabled)",
                    set.name,
                    zone,
                    enabled,
                    set.records.len()
                );
                self.events.emit(ReconcileEvent::PublishDryRun {
                    zone: zone.to_string(),
                    name: set.name.clone(),
                    disabled,
                    enabled,
                });
                PassResult::DryRun
            }
            Ok(()) => {
                info!(
                    "Published {} in {} ({}/{} enabled)",
                    set.name,
                    zone,
                    reachable,
                    set.records.len()
                );
                self.events.emit(ReconcileEvent::PublishSucceeded {
                    zone: zone.to_string(),
                    name: set.name.clone(),
                    disabled,
                    enabled,
                });
                PassResult::Published
            }
            Err(e) => {
                let err = match e {
                    Error::Publish { .. } => e,
                    other => Error::publish(zone, &set.name, other.to_string()),
                };
                warn!("{}; discarding computed state until the next pass", err);
                self.events.emit(ReconcileEvent::PublishFailed {
                    zone: zone.to_string(),
                    name: set.name.clone(),
                    error: err.to_string(),
                });
                PassResult::PublishFailed
            }
        }
    }
}
