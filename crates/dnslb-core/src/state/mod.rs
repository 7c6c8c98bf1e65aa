// # Engine State
//
// Process-local state shared between concurrent passes. Canonical zone data
// lives in the DNS controller; nothing here survives a restart.

pub mod in_flight;

pub use in_flight::{InFlightGuard, InFlightTracker};
