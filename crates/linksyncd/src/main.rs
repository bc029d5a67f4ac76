// # linksyncd - link address sync daemon
//
// Thin integration layer around linksync-core. The daemon is
// responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Constructing the rtnetlink capability and the controller
// 4. Registering the configured address assignments
// 5. Running the reconciliation loop until SIGINT
//
// All reconciliation logic lives in linksync-core; nothing here
// decides when or whether to touch the kernel.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `LINKSYNC_NODE_NAME`: controller name used in logs (default: linksync)
// - `LINKSYNC_IPV4`: manage IPv4 addresses (default: true)
// - `LINKSYNC_IPV6`: manage IPv6 addresses (default: false)
// - `LINKSYNC_ADDRESSES`: comma-separated `CIDR@link` assignments,
//   e.g. `10.10.10.4/24@eth0,fd00::4/64@eth0`
// - `LINKSYNC_RECONCILE_INTERVAL_SECS`: drift-repair interval (default: 30)
// - `LINKSYNC_LOG_LEVEL`: trace|debug|info|warn|error (default: info)
//
// ## Example
//
// ```bash
// export LINKSYNC_NODE_NAME=node-a
// export LINKSYNC_ADDRESSES=10.10.10.4/24@eth0
// linksyncd
// ```

use anyhow::Result;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use linksync_core::{Controller, ControllerConfig, LinkAddress, NetlinkOps};
use linksync_netlink::RtnetlinkOps;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum LinksyncExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<LinksyncExitCode> for ExitCode {
    fn from(code: LinksyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// One `CIDR@link` assignment from the environment
#[derive(Debug, Clone)]
struct Assignment {
    cidr: String,
    link_name: String,
}

/// Application configuration
struct Config {
    node_name: String,
    ipv4_enabled: bool,
    ipv6_enabled: bool,
    assignments: Vec<Assignment>,
    reconcile_interval_secs: u64,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            node_name: env::var("LINKSYNC_NODE_NAME").unwrap_or_else(|_| "linksync".to_string()),
            ipv4_enabled: parse_bool_env("LINKSYNC_IPV4", true)?,
            ipv6_enabled: parse_bool_env("LINKSYNC_IPV6", false)?,
            assignments: env::var("LINKSYNC_ADDRESSES")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(parse_assignment)
                .collect::<Result<Vec<_>>>()?,
            reconcile_interval_secs: env::var("LINKSYNC_RECONCILE_INTERVAL_SECS")
                .ok()
                .map(|s| s.parse().unwrap_or(30))
                .unwrap_or(30),
            log_level: env::var("LINKSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if !self.ipv4_enabled && !self.ipv6_enabled {
            anyhow::bail!(
                "At least one of LINKSYNC_IPV4 / LINKSYNC_IPV6 must be enabled"
            );
        }

        if !(1..=3600).contains(&self.reconcile_interval_secs) {
            anyhow::bail!(
                "LINKSYNC_RECONCILE_INTERVAL_SECS must be between 1 and 3600 seconds. Got: {}",
                self.reconcile_interval_secs
            );
        }

        for assignment in &self.assignments {
            // Parse with a placeholder index just to validate the CIDR;
            // the real index is resolved against the kernel at startup.
            let addr = LinkAddress::parse(&assignment.cidr, 0)
                .map_err(|e| anyhow::anyhow!("bad assignment {:?}: {}", assignment.cidr, e))?;
            let family_ok = match addr.family() {
                linksync_core::IpFamily::V4 => self.ipv4_enabled,
                linksync_core::IpFamily::V6 => self.ipv6_enabled,
            };
            if !family_ok {
                anyhow::bail!(
                    "Assignment {} targets a disabled address family",
                    assignment.cidr
                );
            }
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "LINKSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn parse_bool_env(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(value) => match value.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => anyhow::bail!("{} must be a boolean, got '{}'", key, other),
        },
    }
}

fn parse_assignment(entry: &str) -> Result<Assignment> {
    let (cidr, link_name) = entry.split_once('@').ok_or_else(|| {
        anyhow::anyhow!(
            "Assignment '{}' is not of the form CIDR@link (e.g. 10.10.10.4/24@eth0)",
            entry
        )
    })?;
    if link_name.is_empty() {
        anyhow::bail!("Assignment '{}' has an empty link name", entry);
    }
    Ok(Assignment {
        cidr: cidr.to_string(),
        link_name: link_name.to_string(),
    })
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return LinksyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return LinksyncExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return LinksyncExitCode::ConfigError.into();
    }

    info!("Starting linksyncd");
    info!(
        "Configuration loaded: {} assignment(s), v4={}, v6={}",
        config.assignments.len(),
        config.ipv4_enabled,
        config.ipv6_enabled
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return LinksyncExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            LinksyncExitCode::RuntimeError
        } else {
            LinksyncExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let netlink: Arc<dyn NetlinkOps> = Arc::new(RtnetlinkOps::new()?);

    let mut controller_config = ControllerConfig::new(
        config.node_name.clone(),
        config.ipv4_enabled,
        config.ipv6_enabled,
    );
    controller_config.reconcile_interval_secs = config.reconcile_interval_secs;

    let (controller, mut events) = Controller::new(controller_config, netlink.clone())?;

    // Surface controller events in the log
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!("controller event: {:?}", event);
        }
    });

    // Register the configured assignments, resolving link names
    // against the kernel
    let links = netlink.link_list().await?;
    for assignment in &config.assignments {
        let link = links
            .iter()
            .find(|l| l.name == assignment.link_name)
            .ok_or_else(|| {
                anyhow::anyhow!("link '{}' not found on this node", assignment.link_name)
            })?;
        let addr = LinkAddress::parse(&assignment.cidr, link.index)
            .map_err(|e| anyhow::anyhow!("bad assignment {:?}: {}", assignment.cidr, e))?;
        info!("Managing {} on {}", addr, link.name);
        controller.add_address(addr).await?;
    }

    info!("Starting reconciliation loop");
    controller.run().await?;

    info!("Shutting down");
    Ok(())
}
