// # dnslbd - DNS Failover Daemon
//
// This daemon is a thin integration layer:
// - No reconciliation, probing or DNS logic lives here (all of it is in dnslb-core)
// - Configuration is via environment variables only, read once at start
//
// The dnslbd daemon is responsible for:
// 1. Reading and validating configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering the controller and probe runner implementations
// 4. Running the reconciliation scheduler until SIGTERM/SIGINT
//
// ## Configuration
//
// ### Controller
// - `DNSLB_CONTROLLER_URL`: PowerDNS API base URL (required)
// - `DNSLB_API_KEY`: PowerDNS API key (required)
// - `DNSLB_SERVER_ID`: Server id in the API path (default: localhost)
// - `DNSLB_MODE`: `live` (default) or `dry-run`
//
// ### Zones
// - `DNSLB_ZONES`: Comma-separated zone names, or `all` (required)
//
// ### Probing
// - `DNSLB_PROBE_COUNT`: Echo requests per address (default: 3)
// - `DNSLB_PROBE_WINDOW_SECS`: Reply window in seconds (default: 5)
// - `DNSLB_PROBE_INTERVAL_MS`: Spacing between requests (default: 1000)
// - `DNSLB_PROBE_PRIVILEGED`: Raw sockets (default: true)
//
// ### Scheduler
// - `DNSLB_POLL_INTERVAL_SECS`: Tick interval in seconds (default: 10)
// - `DNSLB_GUARD_IN_FLIGHT`: Skip record sets still being reconciled (default: true)
// - `DNSLB_ONESHOT`: Run a single cycle and exit (default: false)
//
// ### Logging
// - `DNSLB_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export DNSLB_CONTROLLER_URL=http://ctl.example:8081
// export DNSLB_API_KEY=...
// export DNSLB_ZONES=example.,example.net.
//
// dnslbd
// ```

use anyhow::{Context, Result};
use dnslb_core::config::{
    ControllerConfig, FailoverConfig, ProbeConfig, SchedulerConfig, ZoneSelector,
};
use dnslb_core::{ComponentRegistry, DnsController, ProbeRunner, ReconciliationScheduler};
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DnslbExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DnslbExitCode> for ExitCode {
    fn from(code: DnslbExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    controller_url: String,
    api_key: String,
    server_id: String,
    mode: String,
    zones: String,
    probe_count: u32,
    probe_window_secs: u64,
    probe_interval_ms: u64,
    probe_privileged: bool,
    poll_interval_secs: u64,
    guard_in_flight: bool,
    oneshot: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from a key lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let probe = ProbeConfig::default();
        let scheduler = SchedulerConfig::default();

        Ok(Self {
            controller_url: lookup("DNSLB_CONTROLLER_URL").unwrap_or_default(),
            api_key: lookup("DNSLB_API_KEY").unwrap_or_default(),
            server_id: lookup("DNSLB_SERVER_ID").unwrap_or_else(|| "localhost".to_string()),
            mode: lookup("DNSLB_MODE").unwrap_or_else(|| "live".to_string()),
            zones: lookup("DNSLB_ZONES").unwrap_or_default(),
            probe_count: parse_var(&lookup, "DNSLB_PROBE_COUNT", probe.count)?,
            probe_window_secs: parse_var(&lookup, "DNSLB_PROBE_WINDOW_SECS", probe.window_secs)?,
            probe_interval_ms: parse_var(&lookup, "DNSLB_PROBE_INTERVAL_MS", probe.interval_ms)?,
            probe_privileged: parse_flag(&lookup, "DNSLB_PROBE_PRIVILEGED", probe.privileged)?,
            poll_interval_secs: parse_var(
                &lookup,
                "DNSLB_POLL_INTERVAL_SECS",
                scheduler.interval_secs,
            )?,
            guard_in_flight: parse_flag(
                &lookup,
                "DNSLB_GUARD_IN_FLIGHT",
                scheduler.guard_in_flight,
            )?,
            oneshot: parse_flag(&lookup, "DNSLB_ONESHOT", false)?,
            log_level: lookup("DNSLB_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks required fields, URL scheme, placeholder secrets and numeric
    /// ranges before anything is started.
    fn validate(&self) -> Result<()> {
        if self.controller_url.is_empty() {
            anyhow::bail!(
                "DNSLB_CONTROLLER_URL is required. \
                Set it via: export DNSLB_CONTROLLER_URL=http://ctl.example:8081"
            );
        }

        if !self.controller_url.starts_with("https://") && !self.controller_url.starts_with("http://")
        {
            anyhow::bail!(
                "DNSLB_CONTROLLER_URL must use HTTP or HTTPS scheme. Got: {}",
                self.controller_url
            );
        }

        if self.api_key.is_empty() {
            anyhow::bail!(
                "DNSLB_API_KEY is required. \
                Set it via: export DNSLB_API_KEY=your_key"
            );
        }

        // Check for obvious placeholder keys (common mistake)
        let key_lower = self.api_key.to_lowercase();
        if key_lower.contains("your_key") || key_lower.contains("replace_me") || key_lower == "key"
        {
            anyhow::bail!(
                "DNSLB_API_KEY appears to be a placeholder. \
                Use the api-key configured on the controller."
            );
        }

        if self.server_id.is_empty() {
            anyhow::bail!("DNSLB_SERVER_ID cannot be empty");
        }

        match self.mode.to_lowercase().as_str() {
            "live" | "dry-run" => {}
            _ => anyhow::bail!(
                "DNSLB_MODE '{}' is not valid. Valid modes: live, dry-run",
                self.mode
            ),
        }

        if self.zones.trim().is_empty() {
            anyhow::bail!(
                "DNSLB_ZONES must name at least one zone, or 'all'. \
                Set it via: export DNSLB_ZONES=example.,example.net."
            );
        }

        // Validate numeric ranges
        if !(1..=20).contains(&self.probe_count) {
            anyhow::bail!(
                "DNSLB_PROBE_COUNT must be between 1 and 20. Got: {}",
                self.probe_count
            );
        }

        if !(1..=60).contains(&self.probe_window_secs) {
            anyhow::bail!(
                "DNSLB_PROBE_WINDOW_SECS must be between 1 and 60 seconds. Got: {}",
                self.probe_window_secs
            );
        }

        if !(10..=10_000).contains(&self.probe_interval_ms) {
            anyhow::bail!(
                "DNSLB_PROBE_INTERVAL_MS must be between 10 and 10000. Got: {}",
                self.probe_interval_ms
            );
        }

        if !(1..=3600).contains(&self.poll_interval_secs) {
            anyhow::bail!(
                "DNSLB_POLL_INTERVAL_SECS must be between 1 and 3600 seconds. Got: {}",
                self.poll_interval_secs
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DNSLB_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        // Catches values that only fail once parsed, e.g. DNSLB_ZONES=","
        if let Err(e) = self.to_failover_config().validate() {
            anyhow::bail!("Invalid configuration: {}", e);
        }

        Ok(())
    }

    /// Build the engine configuration
    fn to_failover_config(&self) -> FailoverConfig {
        FailoverConfig {
            controller: ControllerConfig::PowerDns {
                base_url: self.controller_url.clone(),
                api_key: self.api_key.clone(),
                server_id: self.server_id.clone(),
            },
            zones: ZoneSelector::parse(&self.zones),
            probe: ProbeConfig {
                count: self.probe_count,
                window_secs: self.probe_window_secs,
                interval_ms: self.probe_interval_ms,
                privileged: self.probe_privileged,
                ..ProbeConfig::default()
            },
            scheduler: SchedulerConfig {
                interval_secs: self.poll_interval_secs,
                guard_in_flight: self.guard_in_flight,
                ..SchedulerConfig::default()
            },
        }
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number. Got: {}", key, value)),
        None => Ok(default),
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    match lookup(key) {
        Some(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("{} must be true or false. Got: {}", key, value),
        },
        None => Ok(default),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DnslbExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DnslbExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnslbExitCode::ConfigError.into();
    }

    info!("Starting dnslbd daemon");
    info!(
        "Configuration loaded: controller {}, zones {}",
        config.controller_url, config.zones
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnslbExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            DnslbExitCode::RuntimeError
        } else {
            DnslbExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let registry = ComponentRegistry::new();

    #[cfg(feature = "powerdns")]
    {
        info!("Registering PowerDNS controller");
        dnslb_provider_powerdns::register(&registry);
    }

    #[cfg(feature = "icmp")]
    {
        info!("Registering ICMP probe runner");
        dnslb_probe_icmp::register(&registry);
    }

    let failover = config.to_failover_config();

    let controller: Arc<dyn DnsController> = Arc::from(
        registry
            .create_controller(&failover.controller)
            .context("Failed to create DNS controller")?,
    );
    let runner: Arc<dyn ProbeRunner> = Arc::from(
        registry
            .create_probe_runner(&failover.probe)
            .context("Failed to create probe runner")?,
    );

    info!(
        "Controller: {}, probe runner: {} ({} x {}s window)",
        controller.provider_name(),
        runner.runner_name(),
        failover.probe.count,
        failover.probe.window_secs
    );

    let (scheduler, mut events) = ReconciliationScheduler::new(controller, runner, failover)?;

    // Drain engine events so the channel never fills
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Event: {:?}", event);
        }
    });

    if config.oneshot {
        let report = scheduler.run_once().await?;
        info!(
            "Cycle finished: {} group(s) reconciled, {} published, {} dry-run, {} zone(s) failed",
            report.reconciled(),
            report.published(),
            report.dry_run(),
            report.failed_zones.len()
        );
        for (zone, e) in &report.failed_zones {
            warn!("Zone {} failed: {}", zone, e);
        }
        return Ok(());
    }

    let mut signals = ShutdownSignals::new()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let signal = signals.recv().await;
        info!("Received shutdown signal: {}", signal);
        let _ = shutdown_tx.send(());
    });

    scheduler.run_with_shutdown(Some(shutdown_rx)).await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Shutdown signal listeners (SIGTERM, SIGINT)
///
/// Installed before the scheduler starts.
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn new() -> Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?,
            sigint: signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?,
        })
    }

    /// Wait for either signal and return its name
    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Fallback for non-Unix platforms: CTRL-C only
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn new() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
        }
        "SIGINT"
    }
}
