//! Core traits for the DNSLB system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DnsController`]: Pull zone data from and publish record sets to the DNS controller
//! - [`ProbeRunner`]: Probe one address for liveness

pub mod dns_controller;
pub mod probe_runner;

pub use dns_controller::{DnsController, DnsControllerFactory};
pub use probe_runner::{ProbeRunner, ProbeRunnerFactory};
