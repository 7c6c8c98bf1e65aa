//! Events emitted by the reconciliation engine

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::warn;

/// Events emitted by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Scheduler started
    Started {
        interval_secs: u64,
    },

    /// A tick dispatched a new cycle
    CycleDispatched {
        tick: u64,
    },

    /// Zone snapshot pulled
    ZoneFetched {
        zone: String,
        record_sets: usize,
        eligible: usize,
    },

    /// Zone snapshot could not be pulled; the zone is skipped this tick
    FetchFailed {
        zone: String,
        error: String,
    },

    /// Listing zones failed (all-zones mode); the whole cycle is skipped
    ZoneListFailed {
        error: String,
    },

    /// A record set was probed and decided
    RecordSetReconciled {
        zone: String,
        name: String,
        changed: bool,
        reachable: usize,
        total: usize,
    },

    /// A record set was skipped because its previous pass is still running
    RecordSetSkipped {
        zone: String,
        name: String,
        in_flight_since: DateTime<Utc>,
    },

    /// A changed record set was published
    PublishSucceeded {
        zone: String,
        name: String,
        disabled: usize,
        enabled: usize,
    },

    /// A changed record set would have been published, but the controller
    /// is in dry-run mode
    PublishDryRun {
        zone: String,
        name: String,
        disabled: usize,
        enabled: usize,
    },

    /// Publishing a changed record set failed; the computed state is discarded
    PublishFailed {
        zone: String,
        name: String,
        error: String,
    },

    /// Scheduler stopped
    Stopped {
        reason: String,
    },
}

/// Non-blocking sender for engine events
///
/// Cloned into every pass task. Emitting never waits: when the channel is full
/// the event is dropped with a warning, and a closed channel is ignored.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<ReconcileEvent>>,
}

impl EventSink {
    /// Create a sink and the receiver for its events
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ReconcileEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards every event
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Emit an event
    pub fn emit(&self, event: ReconcileEvent) {
        let Some(tx) = &self.tx else {
            return;
        };

        if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(event) {
            warn!(
                "Event channel full, dropping event. Consider increasing event_channel_capacity."
            );
        }
    }
}
