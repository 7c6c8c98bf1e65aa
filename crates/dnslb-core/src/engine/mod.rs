//! Reconciliation engine
//!
//! The engine is responsible for:
//! - Pulling zone snapshots from the DnsController
//! - Selecting load-balancing groups (type A, more than one record)
//! - Probing every address of a group concurrently via ProbeRunner
//! - Deciding each record's disabled flag from its probe result
//! - Publishing a record set only when a flag changed
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │ ReconciliationScheduler  │── tick (every interval, never waits) ──┐
//! └──────────────────────────┘                                        │
//!                                                                     ▼
//!                                                        ┌──────────────────┐
//!            ┌───────────── fetch_zone ──────────────────│  ZoneReconciler  │
//!            │                                           └──────────────────┘
//!            ▼                                              │ one task per group
//!   ┌───────────────┐                                       ▼
//!   │ DnsController │◄── publish_record_set ──┌──────────────────────┐
//!   └───────────────┘     (only if changed)   │ RecordSetReconciler  │
//!                                             └──────────────────────┘
//!                                                │ one task per address
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │ ProbeRunner │
//!                                         └─────────────┘
//! ```
//!
//! ## Pass Flow
//!
//! 1. Tick fires; the scheduler spawns the cycle and returns to waiting
//! 2. Each zone is fetched; a failed fetch skips that zone until the next tick
//! 3. Each eligible record set is reconciled in its own task
//! 4. Changed record sets are published in full; a failed publish is dropped
//! 5. Events are emitted for monitoring/logging

pub mod events;
pub mod record_set;
pub mod scheduler;
pub mod zone;

pub use events::{EventSink, ReconcileEvent};
pub use record_set::{RecordSetReconciler, PROBE_GRACE};
pub use scheduler::{CycleReport, ReconciliationScheduler};
pub use zone::{ZoneReconciler, ZoneReport};
