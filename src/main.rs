use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokenwarden::config::DEFAULT_PORT;
use tokenwarden::{server, DomainManager, TokenServerConfig};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Key-bound token storage server.
#[derive(Parser, Debug)]
#[command(name = "tokenwarden", version, about)]
struct Cli {
    /// Address to bind to
    #[arg(long, env = "TOKENWARDEN_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "TOKENWARDEN_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seconds of inactivity after which a domain expires
    #[arg(long, env = "TOKENWARDEN_INACTIVE_DOMAIN_TIMEOUT", default_value_t = 86_400.0)]
    inactive_domain_timeout: f64,

    /// Maximum age in seconds of a signed request timestamp
    #[arg(long, env = "TOKENWARDEN_SIGNATURE_TIMESTAMP_TOLERANCE", default_value_t = 10.0)]
    signature_timestamp_tolerance: f64,

    /// Seconds between sweeps that reclaim expired domains
    #[arg(long, env = "TOKENWARDEN_SWEEP_INTERVAL", default_value_t = 60.0)]
    sweep_interval: f64,
}

fn seconds(flag: &str, value: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| anyhow::anyhow!("--{} must be a non-negative number of seconds: {}", flag, e))
}

impl Cli {
    fn into_config(self) -> anyhow::Result<TokenServerConfig> {
        Ok(TokenServerConfig {
            inactive_domain_timeout: seconds(
                "inactive-domain-timeout",
                self.inactive_domain_timeout,
            )?,
            signature_timestamp_tolerance: seconds(
                "signature-timestamp-tolerance",
                self.signature_timestamp_tolerance,
            )?,
            sweep_interval: seconds("sweep-interval", self.sweep_interval)?,
            host: self.host,
            port: self.port,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tokenwarden=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Cli::parse().into_config()?;
    config.validate()?;
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let manager = Arc::new(DomainManager::new(config)?);

    tracing::info!(
        ttl_secs = manager.config().inactive_domain_timeout.as_secs_f64(),
        tolerance_secs = manager.config().signature_timestamp_tolerance.as_secs_f64(),
        "Starting tokenwarden"
    );

    server::serve(listener, manager).await?;

    Ok(())
}
