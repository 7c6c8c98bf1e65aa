// # dnslb-core
//
// Core library for health-check-driven DNS record failover.
//
// ## Architecture Overview
//
// This library provides the reconciliation engine that keeps DNS
// load-balancing groups pointed at live addresses:
// - **DnsController**: Trait for pulling zones from and publishing record sets to the controller
// - **ProbeRunner**: Trait for probing one address for liveness
// - **RecordSetReconciler**: Probes one group's addresses in parallel and rewrites their flags
// - **ZoneReconciler**: Pulls a zone and reconciles each group concurrently
// - **ReconciliationScheduler**: Runs the zone passes on a fixed interval
// - **ComponentRegistry**: Plugin-based registry for controllers and probe runners
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Stateless Passes**: Each pass pulls a fresh snapshot; nothing is cached between passes
// 3. **Write Suppression**: A record set is published only when a flag changed
// 4. **Fault Tolerance**: Probe, fetch and publish failures degrade a pass, never the loop
// 5. **Library-First**: All core functionality can be used as a library

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod registry;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{ControllerConfig, FailoverConfig, ProbeConfig, SchedulerConfig, ZoneSelector};
pub use engine::{
    CycleReport, EventSink, ReconcileEvent, ReconciliationScheduler, RecordSetReconciler,
    ZoneReconciler, ZoneReport,
};
pub use error::{Error, Result};
pub use model::{ProbeResult, ReconciliationOutcome, Record, RecordSet};
pub use registry::ComponentRegistry;
pub use state::InFlightTracker;
pub use traits::{DnsController, ProbeRunner};
