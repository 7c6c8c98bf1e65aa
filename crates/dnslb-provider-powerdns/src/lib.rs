// # PowerDNS Controller
//
// This crate provides a `DnsController` over the PowerDNS authoritative
// server HTTP API.
//
// ## Implementation Status
//
// - ✅ One HTTP request per controller call
// - ✅ Full error propagation to the engine (the next tick is the retry)
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error handling for HTTP status codes (401/403, 404, 422, 429, 5xx)
// - ✅ Dry-run mode for safe testing
// - ✅ Whole-record-set REPLACE, comments carried through
// - ❌ NO retry logic (owned by the scheduler's tick)
// - ❌ NO caching (every pass pulls a fresh snapshot)
// - ❌ NO background tasks
//
// ## Architectural Constraints
//
// ### Trust Level: Untrusted (DNS Controller)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS API calls to the configured controller only
// - ✅ Parse controller responses into record sets
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Implement retry logic
// - ❌ Decide which record sets to publish
//
// ## Security Requirements
//
// - API key NEVER appears in logs or `Debug` output
// - Controller MUST fail fast if the key is empty
//
// ## API Reference
//
// - Get zone: GET `/api/v1/servers/:server_id/zones/:zone_id`
// - List zones: GET `/api/v1/servers/:server_id/zones`
// - Replace RRset: PATCH `/api/v1/servers/:server_id/zones/:zone_id`

use async_trait::async_trait;
use dnslb_core::config::ControllerConfig;
use dnslb_core::model::RecordSet;
use dnslb_core::traits::{DnsController, DnsControllerFactory};
use dnslb_core::{Error, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the API key
const API_KEY_HEADER: &str = "X-API-Key";

const PROVIDER: &str = "powerdns";

/// Zone detail as returned by the API; everything but the RRsets is ignored
#[derive(Debug, Deserialize)]
struct ZoneDetail {
    #[serde(default)]
    rrsets: Vec<RecordSet>,
}

/// Entry of the zone listing
#[derive(Debug, Deserialize)]
struct ZoneSummary {
    name: String,
}

/// PowerDNS HTTP API controller
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the controller will:
/// - Perform all GET requests (zone pull, zone listing)
/// - Log the intended PATCH payload
/// - **NOT** modify any record set
pub struct PowerDnsController {
    /// Base URL without trailing slash (e.g. "http://ctl.example:8081")
    base_url: String,

    /// API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// Server id in the API path (usually "localhost")
    server_id: String,

    client: reqwest::Client,

    dry_run: bool,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for PowerDnsController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerDnsController")
            .field("base_url", &self.base_url)
            .field("api_key", &"<REDACTED>")
            .field("server_id", &self.server_id)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl PowerDnsController {
    /// Create a new PowerDNS controller
    ///
    /// # Parameters
    ///
    /// - `base_url`: API base URL (e.g. "http://ctl.example:8081")
    /// - `api_key`: API key sent as `X-API-Key`
    /// - `server_id`: Server id in the API path
    /// - `dry_run`: If true, perform GET requests but skip PATCH updates
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: If the key, URL or server id is empty
    /// - `Err(Error::Http)`: If the HTTP client cannot be built
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        server_id: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let api_key = api_key.into();
        let server_id = server_id.into();

        if base_url.is_empty() {
            return Err(Error::config("PowerDNS base URL cannot be empty"));
        }
        if api_key.is_empty() {
            return Err(Error::config("PowerDNS API key cannot be empty"));
        }
        if server_id.is_empty() {
            return Err(Error::config("PowerDNS server id cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            api_key,
            server_id,
            client,
            dry_run,
        })
    }

    /// Create a controller in live mode
    pub fn new_live(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        server_id: impl Into<String>,
    ) -> Result<Self> {
        Self::new(base_url, api_key, server_id, false)
    }

    /// Create a controller in dry-run mode
    pub fn new_dry_run(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        server_id: impl Into<String>,
    ) -> Result<Self> {
        Self::new(base_url, api_key, server_id, true)
    }

    fn zones_url(&self) -> String {
        format!("{}/api/v1/servers/{}/zones", self.base_url, self.server_id)
    }

    fn zone_url(&self, zone: &str) -> String {
        format!("{}/{}", self.zones_url(), zone)
    }

    /// GET a JSON document
    ///
    /// `what` names the resource in error messages.
    async fn get_json(&self, url: &str, what: &str) -> Result<Value> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &body, what));
        }

        response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse {}: {}", what, e)))
    }
}

/// Map a non-success status to the error taxonomy
fn status_error(status: reqwest::StatusCode, body: &str, what: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API key or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{} not found", what)),
        422 => Error::provider(
            PROVIDER,
            format!("Controller rejected {}: {} - {}", what, status, body),
        ),
        429 => Error::rate_limited(format!("Rate limit exceeded. Status: {}", status)),
        500..=599 => Error::provider(
            PROVIDER,
            format!("Controller server error (transient): {} - {}", status, body),
        ),
        _ => Error::provider(
            PROVIDER,
            format!("Request for {} failed: {} - {}", what, status, body),
        ),
    }
}

/// Build the PATCH body replacing one RRset
fn replace_payload(record_set: &RecordSet) -> Value {
    json!({
        "rrsets": [{
            "name": record_set.name,
            "type": record_set.record_type,
            "ttl": record_set.ttl,
            "changetype": "REPLACE",
            "records": record_set.records,
            "comments": record_set.comments,
        }]
    })
}

#[async_trait]
impl DnsController for PowerDnsController {
    /// Pull all RRsets of a zone
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /api/v1/servers/localhost/zones/example.
    /// X-API-Key: <key>
    /// ```
    async fn fetch_zone(&self, zone: &str) -> Result<Vec<RecordSet>> {
        let what = format!("zone {}", zone);
        let json = self.get_json(&self.zone_url(zone), &what).await?;

        let detail: ZoneDetail = serde_json::from_value(json)
            .map_err(|e| Error::fetch(zone, format!("Malformed zone data: {}", e)))?;

        tracing::debug!("Pulled {} RRset(s) from {}", detail.rrsets.len(), zone);
        Ok(detail.rrsets)
    }

    async fn list_zones(&self) -> Result<Vec<String>> {
        let json = self.get_json(&self.zones_url(), "zone list").await?;

        let zones: Vec<ZoneSummary> = serde_json::from_value(json)
            .map_err(|e| Error::provider(PROVIDER, format!("Malformed zone list: {}", e)))?;

        Ok(zones.into_iter().map(|z| z.name).collect())
    }

    /// Replace one RRset
    ///
    /// # API Call
    ///
    /// ```http
    /// PATCH /api/v1/servers/localhost/zones/example.
    /// X-API-Key: <key>
    ///
    /// {"rrsets": [{"name": "api.example.", "type": "A", "ttl": 60,
    ///              "changetype": "REPLACE", "records": [...], "comments": []}]}
    /// ```
    async fn publish_record_set(&self, zone: &str, record_set: &RecordSet) -> Result<()> {
        let payload = replace_payload(record_set);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would PATCH {} in {}: {}",
                record_set.name,
                zone,
                payload
            );
            return Ok(());
        }

        let url = self.zone_url(zone);
        tracing::debug!("PATCH {} ({})", url, record_set.name);

        let response = self
            .client
            .patch(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            let what = format!("RRset {} in zone {}", record_set.name, zone);
            return Err(status_error(status, &body, &what));
        }

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Factory for creating PowerDNS controllers
pub struct PowerDnsFactory;

impl DnsControllerFactory for PowerDnsFactory {
    fn create(&self, config: &ControllerConfig) -> Result<Box<dyn DnsController>> {
        match config {
            ControllerConfig::PowerDns {
                base_url,
                api_key,
                server_id,
            } => {
                // Check for dry-run mode environment variable
                let dry_run = std::env::var("DNSLB_MODE")
                    .unwrap_or_default()
                    .eq_ignore_ascii_case("dry-run");

                if dry_run {
                    tracing::warn!(
                        "PowerDNS controller running in DRY-RUN mode - no changes will be made"
                    );
                }

                Ok(Box::new(PowerDnsController::new(
                    base_url.clone(),
                    api_key.clone(),
                    server_id.clone(),
                    dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for PowerDNS controller")),
        }
    }
}

/// Register the PowerDNS controller with a registry
///
/// # Example
///
/// ```rust
/// use dnslb_core::ComponentRegistry;
///
/// let registry = ComponentRegistry::new();
/// dnslb_provider_powerdns::register(&registry);
/// assert!(registry.has_controller("powerdns"));
/// ```
pub fn register(registry: &dnslb_core::ComponentRegistry) {
    registry.register_controller(PROVIDER, Box::new(PowerDnsFactory));
}
