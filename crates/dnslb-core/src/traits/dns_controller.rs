// # DNS Controller Trait
//
// Defines the interface to the authoritative DNS controller that owns zone
// data.
//
// ## Implementations
//
// - PowerDNS HTTP API: `dnslb-provider-powerdns` crate
//
// ## Usage
//
// ```rust,ignore
// use dnslb_core::DnsController;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let controller = /* DnsController implementation */;
//
//     let mut sets = controller.fetch_zone("example.").await?;
//     sets[0].records[0].disabled = true;
//     controller.publish_record_set("example.", &sets[0]).await?;
//
//     Ok(())
// }
// ```

use crate::model::RecordSet;
use async_trait::async_trait;

/// Trait for DNS controller implementations
///
/// Implementations must be thread-safe and usable across async tasks: the
/// engine shares one controller between every concurrent zone and record-set
/// pass, and issues unsynchronized concurrent reads and writes.
///
/// # Trust Level: Untrusted
///
/// Controllers are isolated, single-shot API clients:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to the controller endpoint only
/// - ✅ Parse controller-specific responses
/// - ✅ Return success or failure (the next scheduled pass is the retry)
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (owned by the scheduler's tick)
/// - ❌ Spawn tasks or threads
/// - ❌ Cache zone data between calls
/// - ❌ Decide whether a record set needs publishing (owned by the reconciler)
#[async_trait]
pub trait DnsController: Send + Sync {
    /// Pull a full snapshot of a zone's record sets
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<RecordSet>)`: Every record set in the zone
    /// - `Err(Error)`: The pull failed or the response was malformed; the
    ///   engine skips the zone for this tick
    async fn fetch_zone(&self, zone: &str) -> Result<Vec<RecordSet>, crate::Error>;

    /// List the names of all zones served by the controller
    async fn list_zones(&self) -> Result<Vec<String>, crate::Error>;

    /// Replace one record set atomically
    ///
    /// The complete record set is always sent, never a partial delta. The
    /// controller matches on (name, type) and replaces all records.
    async fn publish_record_set(
        &self,
        zone: &str,
        record_set: &RecordSet,
    ) -> Result<(), crate::Error>;

    /// Get the controller name (for logging/debugging)
    fn provider_name(&self) -> &'static str;

    /// Whether publishes are logged instead of written
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Helper trait for constructing DNS controllers from configuration
pub trait DnsControllerFactory: Send + Sync {
    /// Create a DnsController instance from configuration
    fn create(
        &self,
        config: &crate::config::ControllerConfig,
    ) -> Result<Box<dyn DnsController>, crate::Error>;
}
