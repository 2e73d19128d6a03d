// # ddnsd - Gandi DDNS Daemon
//
// Thin integration layer over ddns-core. All reconciliation, caching and
// retry logic lives in the library; this binary only:
// 1. Reads its settings from environment variables
// 2. Loads the properties file holding the API key and hostname
// 3. Wires ipify, the system resolver and Gandi into a ReconciliationEngine
// 4. Runs the engine once per TTL and handles signals
//
// ## Configuration
//
// Daemon settings come from environment variables:
//
// - `APP_ENV_PATH`: Properties file (default `/etc/gandi-ddns.properties`)
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `DDNS_TTL_SECS`: Record TTL and cycle period (default 300)
// - `DDNS_MAX_ATTEMPTS`: Attempts per network operation (default 3)
// - `DDNS_RETRY_DELAY_SECS`: First retry delay, doubled per attempt (default 10)
// - `DDNS_IP_SOURCE_URL`: Public IP service (default https://api.ipify.org)
// - `DDNS_PID_FILE`: PID file outside systemd (default /run/gandi-ddns.pid)
// - `DDNS_MODE`: `dry-run` to log updates instead of sending them
//
// The properties file holds the secrets:
//
// ```properties
// gandi.apikey=your_api_key
// target.hostname=home.example.com
// ```
//
// ## Signals
//
// - SIGHUP: re-read the properties file; an invalid file is logged and the
//   previous configuration stays active
// - SIGTERM / SIGINT: stop scheduling, let the running cycle finish (30s max)

mod platform;

use anyhow::Result;
use ddns_core::source::DEFAULT_PROPERTIES_PATH;
use ddns_core::{
    ConfigSnapshot, ConfigSource, EngineConfig, PropertiesFile, ReconciliationEngine,
    SystemDomainResolver, TokioBackoff,
};
use ddns_ip_http::{DEFAULT_IP_SOURCE_URL, IpifyResolver};
use ddns_provider_gandi::GandiProvider;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use platform::{Notifier, PidFile};

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Default PID file location
const DEFAULT_PID_FILE: &str = "/run/gandi-ddns.pid";

/// How long shutdown waits for an in-flight cycle
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon configuration
#[derive(Debug)]
struct Config {
    properties_path: PathBuf,
    log_level: String,
    ttl_secs: Option<u32>,
    max_attempts: Option<u32>,
    retry_delay_secs: Option<u64>,
    ip_source_url: String,
    pid_file: PathBuf,
    mode: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            properties_path: lookup("APP_ENV_PATH")
                .unwrap_or_else(|| DEFAULT_PROPERTIES_PATH.to_string())
                .into(),
            log_level: lookup("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            ttl_secs: parse_var("DDNS_TTL_SECS", lookup("DDNS_TTL_SECS"))?,
            max_attempts: parse_var("DDNS_MAX_ATTEMPTS", lookup("DDNS_MAX_ATTEMPTS"))?,
            retry_delay_secs: parse_var("DDNS_RETRY_DELAY_SECS", lookup("DDNS_RETRY_DELAY_SECS"))?,
            ip_source_url: lookup("DDNS_IP_SOURCE_URL")
                .unwrap_or_else(|| DEFAULT_IP_SOURCE_URL.to_string()),
            pid_file: lookup("DDNS_PID_FILE")
                .unwrap_or_else(|| DEFAULT_PID_FILE.to_string())
                .into(),
            mode: lookup("DDNS_MODE").unwrap_or_else(|| "live".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.properties_path.as_os_str().is_empty() {
            anyhow::bail!("APP_ENV_PATH cannot be empty");
        }

        // Gandi accepts TTLs from 5 minutes to 30 days
        if let Some(ttl) = self.ttl_secs
            && !(300..=2_592_000).contains(&ttl)
        {
            anyhow::bail!(
                "DDNS_TTL_SECS must be between 300 and 2592000 seconds. Got: {}",
                ttl
            );
        }

        if let Some(max_attempts) = self.max_attempts
            && !(1..=10).contains(&max_attempts)
        {
            anyhow::bail!(
                "DDNS_MAX_ATTEMPTS must be between 1 and 10. Got: {}",
                max_attempts
            );
        }

        if let Some(retry_delay) = self.retry_delay_secs
            && !(1..=300).contains(&retry_delay)
        {
            anyhow::bail!(
                "DDNS_RETRY_DELAY_SECS must be between 1 and 300 seconds. Got: {}",
                retry_delay
            );
        }

        if !self.ip_source_url.starts_with("https://") && !self.ip_source_url.starts_with("http://")
        {
            anyhow::bail!(
                "DDNS_IP_SOURCE_URL must use HTTP or HTTPS scheme. Got: {}",
                self.ip_source_url
            );
        }

        if self.ip_source_url.starts_with("http://") {
            eprintln!(
                "WARNING: DDNS_IP_SOURCE_URL uses HTTP (not HTTPS). \
                 The reported address could be tampered with."
            );
        }

        match self.mode.as_str() {
            "live" | "dry-run" => {}
            _ => anyhow::bail!(
                "DDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                self.mode
            ),
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn dry_run(&self) -> bool {
        self.mode == "dry-run"
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// Engine settings, falling back to library defaults
    fn engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            ttl_secs: self.ttl_secs.unwrap_or(defaults.ttl_secs),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            retry_delay_secs: self.retry_delay_secs.unwrap_or(defaults.retry_delay_secs),
        }
    }
}

/// Parse an optional numeric variable, rejecting malformed values
fn parse_var<T: std::str::FromStr>(name: &str, value: Option<String>) -> Result<Option<T>> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} must be a number. Got: {:?}", name, raw)),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");

    let source = PropertiesFile::new(&config.properties_path);
    let snapshot = match source.load().and_then(|raw| ConfigSnapshot::from_raw(&raw)) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Invalid configuration in {}: {}", source.describe(), e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    info!(
        "Managing {} ({})",
        snapshot.domain_name(),
        snapshot.endpoint()
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config, source, snapshot).await {
            error!("Daemon error: {}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon until a shutdown signal
async fn run_daemon(config: Config, source: PropertiesFile, snapshot: ConfigSnapshot) -> Result<()> {
    let engine_config = config.engine_config();

    let backoff = TokioBackoff::new();
    let interrupter = backoff.interrupter();

    if config.dry_run() {
        warn!("DRY-RUN mode: record updates will be logged, not sent");
    }

    let engine = Arc::new(ReconciliationEngine::new(
        Box::new(IpifyResolver::with_url(&config.ip_source_url)),
        Box::new(SystemDomainResolver::new()),
        Box::new(GandiProvider::new(config.dry_run())),
        snapshot,
        &engine_config,
        Arc::new(backoff),
    ));

    // Register signal handlers before the first cycle starts
    let mut signals = DaemonSignals::new()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = tokio::spawn({
        let engine = Arc::clone(&engine);
        let period = engine_config.cycle_period();
        async move { engine.run_periodically(period, shutdown_rx).await }
    });

    let notifier = Notifier::from_env();
    let _pid_file = if !notifier.is_systemd() && cfg!(target_os = "linux") {
        match PidFile::create(&config.pid_file) {
            Ok(pid_file) => Some(pid_file),
            Err(e) => {
                warn!(
                    "Failed to write PID file {}: {}",
                    config.pid_file.display(),
                    e
                );
                None
            }
        }
    } else {
        None
    };

    notifier.ready();
    info!("Daemon initialized successfully");

    loop {
        match signals.recv().await? {
            DaemonSignal::Reload => {
                info!("Received SIGHUP, reloading {}", source.describe());
                notifier.reloading();
                interrupter.interrupt();

                // The reload waits for a running cycle and reads the file once it
                // holds the engine lock; keep handling signals meanwhile
                let engine = Arc::clone(&engine);
                let source = source.clone();
                let notifier = notifier.clone();
                tokio::spawn(async move {
                    if engine.reload_from(&source).await.is_ok() {
                        info!("Configuration reloaded");
                    }
                    notifier.ready();
                });
            }
            DaemonSignal::Shutdown(name) => {
                info!("Received shutdown signal: {}", name);
                break;
            }
        }
    }

    info!("Shutting down daemon");
    notifier.stopping();
    shutdown_tx.send_replace(true);
    // Skip remaining backoff sleeps so the running cycle ends within the drain timeout
    interrupter.close();

    wait_for_shutdown_with_timeout(scheduler, SHUTDOWN_TIMEOUT).await
}

/// Wait for the scheduler to finish its current cycle
///
/// Gives up after `timeout_duration` so a hung request cannot block exit.
async fn wait_for_shutdown_with_timeout(
    scheduler: tokio::task::JoinHandle<()>,
    timeout_duration: Duration,
) -> Result<()> {
    match tokio::time::timeout(timeout_duration, scheduler).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(anyhow::anyhow!("Scheduler task failed: {}", e)),
        Err(_) => {
            warn!(
                "Cycle still running after {:?}, exiting anyway",
                timeout_duration
            );
            Ok(())
        }
    }
}

/// Signals the daemon reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DaemonSignal {
    /// Re-read the configuration
    Reload,
    /// Stop, with the signal name
    Shutdown(&'static str),
}

#[cfg(unix)]
struct DaemonSignals {
    sighup: Signal,
    sigterm: Signal,
    sigint: Signal,
}

#[cfg(unix)]
impl DaemonSignals {
    fn new() -> Result<Self> {
        Ok(Self {
            sighup: signal(SignalKind::hangup())
                .map_err(|e| anyhow::anyhow!("Failed to setup SIGHUP handler: {}", e))?,
            sigterm: signal(SignalKind::terminate())
                .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?,
            sigint: signal(SignalKind::interrupt())
                .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?,
        })
    }

    async fn recv(&mut self) -> Result<DaemonSignal> {
        Ok(tokio::select! {
            _ = self.sighup.recv() => DaemonSignal::Reload,
            _ = self.sigterm.recv() => DaemonSignal::Shutdown("SIGTERM"),
            _ = self.sigint.recv() => DaemonSignal::Shutdown("SIGINT"),
        })
    }
}

/// Fallback for non-Unix platforms: CTRL-C only, no reload
#[cfg(not(unix))]
struct DaemonSignals;

#[cfg(not(unix))]
impl DaemonSignals {
    fn new() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Result<DaemonSignal> {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
        Ok(DaemonSignal::Shutdown("SIGINT"))
    }
}
