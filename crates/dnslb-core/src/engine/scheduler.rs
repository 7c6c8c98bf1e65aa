//! Reconciliation scheduler
//!
//! The process-wide control loop: on every tick it dispatches one cycle over
//! the configured zones and goes straight back to waiting. Cycles are never
//! awaited by the loop, so a slow probe cannot delay the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info};

use crate::config::{FailoverConfig, ZoneSelector};
use crate::engine::events::{EventSink, ReconcileEvent};
use crate::engine::record_set::RecordSetReconciler;
use crate::engine::zone::{ZoneReconciler, ZoneReport};
use crate::error::Result;
use crate::state::InFlightTracker;
use crate::traits::{DnsController, ProbeRunner};

/// Summary of one cycle over all selected zones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Zones that were pulled and reconciled
    pub zones: Vec<ZoneReport>,
    /// Zones whose pull failed, with the error
    pub failed_zones: Vec<(String, String)>,
}

impl CycleReport {
    /// Total publishes across all zones
    pub fn published(&self) -> usize {
        self.zones.iter().map(|z| z.published).sum()
    }

    /// Total publishes suppressed by dry-run mode
    pub fn dry_run(&self) -> usize {
        self.zones.iter().map(|z| z.dry_run).sum()
    }

    /// Total groups reconciled across all zones
    pub fn reconciled(&self) -> usize {
        self.zones.iter().map(|z| z.reconciled).sum()
    }
}

/// Periodic reconciliation scheduler
///
/// ## Lifecycle
///
/// 1. Create with [`ReconciliationScheduler::new()`]
/// 2. Start with [`ReconciliationScheduler::run()`] or
///    [`ReconciliationScheduler::run_with_shutdown()`]
/// 3. Every `interval` a cycle is dispatched; the first tick fires immediately
/// 4. On shutdown, cycles still running are aborted, not drained
///
/// ## Timing
///
/// Ticks come from a tokio interval, so tests can drive the scheduler with
/// tokio's paused clock. A tick missed because the runtime was busy is
/// delayed, never burst.
pub struct ReconciliationScheduler {
    zones: ZoneSelector,
    interval: Duration,
    zone_reconciler: ZoneReconciler,
    events: EventSink,
}

impl ReconciliationScheduler {
    /// Create a new scheduler
    ///
    /// # Parameters
    ///
    /// - `controller`: DNS controller implementation
    /// - `runner`: Probe runner implementation
    /// - `config`: DNSLB configuration
    ///
    /// # Returns
    ///
    /// A tuple of (scheduler, event_receiver) where event_receiver yields engine events
    pub fn new(
        controller: Arc<dyn DnsController>,
        runner: Arc<dyn ProbeRunner>,
        config: FailoverConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        config.validate()?;

        let (events, rx) = EventSink::channel(config.scheduler.event_channel_capacity);

        let reconciler = RecordSetReconciler::from_config(runner, &config.probe);
        let mut zone_reconciler =
            ZoneReconciler::new(controller, reconciler).with_events(events.clone());
        if config.scheduler.guard_in_flight {
            zone_reconciler = zone_reconciler.with_in_flight_guard(InFlightTracker::new());
        }

        let scheduler = Self {
            zones: config.zones,
            interval: config.scheduler.interval(),
            zone_reconciler,
            events,
        };

        Ok((scheduler, rx))
    }

    /// Run the scheduler until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        self.run_with_shutdown(None).await
    }

    /// Run the scheduler until `shutdown_rx` fires (or Ctrl-C when `None`)
    ///
    /// Dropping the sender also stops the scheduler.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.events.emit(ReconcileEvent::Started {
            interval_secs: self.interval.as_secs(),
        });
        info!(
            "Scheduler started: {} every {:?}",
            describe_zones(&self.zones),
            self.interval
        );

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        let mut cycles = JoinSet::new();
        let mut tick: u64 = 0;

        loop {
            tokio::select! {
                Some(_) = ticks.next() => {
                    // Reap finished cycles so the set does not grow
                    while cycles.try_join_next().is_some() {}

                    tick += 1;
                    debug!("Tick {}: dispatching cycle ({} still running)", tick, cycles.len());
                    self.events.emit(ReconcileEvent::CycleDispatched { tick });

                    let zone_reconciler = self.zone_reconciler.clone();
                    let zones = self.zones.clone();
                    cycles.spawn(async move {
                        if let Ok(report) = run_cycle(&zone_reconciler, &zones).await {
                            debug!(
                                "Tick {} finished: {} group(s) reconciled, {} published, {} zone(s) failed",
                                tick,
                                report.reconciled(),
                                report.published(),
                                report.failed_zones.len()
                            );
                        }
                    });
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.events.emit(ReconcileEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        if !cycles.is_empty() {
            info!("Abandoning {} in-flight cycle(s)", cycles.len());
        }
        cycles.abort_all();

        Ok(())
    }

    /// Run exactly one cycle and wait for it to finish
    ///
    /// # Returns
    ///
    /// - `Ok(CycleReport)`: Every selected zone was attempted; per-zone fetch
    ///   failures are listed in the report
    /// - `Err(Error)`: Listing zones failed (all-zones mode only)
    pub async fn run_once(&self) -> Result<CycleReport> {
        run_cycle(&self.zone_reconciler, &self.zones).await
    }
}

/// One cycle: resolve the zone list, then reconcile every zone concurrently
async fn run_cycle(
    zone_reconciler: &ZoneReconciler,
    zones: &ZoneSelector,
) -> Result<CycleReport> {
    let names = match zones {
        ZoneSelector::Named(names) => names.clone(),
        ZoneSelector::All => match zone_reconciler.controller().list_zones().await {
            Ok(names) => names,
            Err(e) => {
                error!("Failed to list zones, skipping cycle: {}", e);
                zone_reconciler.events().emit(ReconcileEvent::ZoneListFailed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        },
    };

    let mut passes = JoinSet::new();
    for zone in names {
        let zone_reconciler = zone_reconciler.clone();
        passes.spawn(async move {
            let result = zone_reconciler.reconcile_zone(&zone).await;
            (zone, result)
        });
    }

    let mut report = CycleReport::default();
    while let Some(joined) = passes.join_next().await {
        match joined {
            Ok((_, Ok(zone_report))) => report.zones.push(zone_report),
            Ok((zone, Err(e))) => report.failed_zones.push((zone, e.to_string())),
            Err(e) => error!("Zone pass aborted: {}", e),
        }
    }

    Ok(report)
}

fn describe_zones(zones: &ZoneSelector) -> String {
    match zones {
        ZoneSelector::All => "all zones".to_string(),
        ZoneSelector::Named(names) => names.join(", "),
    }
}
