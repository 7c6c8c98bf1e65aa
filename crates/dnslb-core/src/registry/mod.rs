//! Plugin-based component registry
//!
//! The registry allows DNS controllers and probe runners to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dnslb_core::registry::ComponentRegistry;
//!
//! let registry = ComponentRegistry::new();
//! dnslb_provider_powerdns::register(&registry);
//! dnslb_probe_icmp::register(&registry);
//!
//! let controller = registry.create_controller(&config.controller)?;
//! let runner = registry.create_probe_runner(&config.probe)?;
//! ```
//!
//! ## Registration
//!
//! Implementation crates expose a `register()` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &ComponentRegistry) {
//!     registry.register_controller("powerdns", Box::new(PowerDnsFactory));
//! }
//! ```

use crate::config::{ControllerConfig, ProbeConfig};
use crate::error::{Error, Result};
use crate::traits::{DnsController, DnsControllerFactory, ProbeRunner, ProbeRunnerFactory};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Registry of controller and probe runner factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Registered DNS controller factories
    controllers: RwLock<HashMap<String, Box<dyn DnsControllerFactory>>>,

    /// Registered probe runner factories
    probe_runners: RwLock<HashMap<String, Box<dyn ProbeRunnerFactory>>>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS controller factory
    ///
    /// # Parameters
    ///
    /// - `name`: Controller type name (e.g., "powerdns")
    /// - `factory`: Factory object for creating controller instances
    pub fn register_controller(
        &self,
        name: impl Into<String>,
        factory: Box<dyn DnsControllerFactory>,
    ) {
        write(&self.controllers).insert(name.into(), factory);
    }

    /// Register a probe runner factory
    ///
    /// # Parameters
    ///
    /// - `name`: Runner type name (e.g., "icmp")
    /// - `factory`: Factory object for creating runner instances
    pub fn register_probe_runner(
        &self,
        name: impl Into<String>,
        factory: Box<dyn ProbeRunnerFactory>,
    ) {
        write(&self.probe_runners).insert(name.into(), factory);
    }

    /// Create a DNS controller from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsController>)`: Created controller instance
    /// - `Err(Error)`: If the controller type is not registered or creation fails
    pub fn create_controller(&self, config: &ControllerConfig) -> Result<Box<dyn DnsController>> {
        let controller_type = config.type_name();
        let controllers = read(&self.controllers);

        let factory = controllers.get(controller_type).ok_or_else(|| {
            Error::config(format!("Unknown controller type: {}", controller_type))
        })?;

        factory.create(config)
    }

    /// Create a probe runner from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ProbeRunner>)`: Created runner instance
    /// - `Err(Error)`: If the runner type is not registered or creation fails
    pub fn create_probe_runner(&self, config: &ProbeConfig) -> Result<Box<dyn ProbeRunner>> {
        let runners = read(&self.probe_runners);

        let factory = runners
            .get(&config.runner)
            .ok_or_else(|| Error::config(format!("Unknown probe runner: {}", config.runner)))?;

        factory.create(config)
    }

    /// List all registered controller types
    pub fn list_controllers(&self) -> Vec<String> {
        read(&self.controllers).keys().cloned().collect()
    }

    /// List all registered probe runner types
    pub fn list_probe_runners(&self) -> Vec<String> {
        read(&self.probe_runners).keys().cloned().collect()
    }

    /// Check if a controller type is registered
    pub fn has_controller(&self, name: &str) -> bool {
        read(&self.controllers).contains_key(name)
    }

    /// Check if a probe runner type is registered
    pub fn has_probe_runner(&self, name: &str) -> bool {
        read(&self.probe_runners).contains_key(name)
    }
}

// Factories are only inserted whole, so a poisoned map is still usable
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
