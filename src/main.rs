use anyhow::Result;
use clap::Parser;
use jeedom_exporter::{
    config::{Config, DEFAULT_CONFIG_PATH},
    server,
};
use secrecy::SecretString;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Port to listen on for metrics (overrides config)
    #[arg(short, long, env = "EXPORTER_PORT")]
    port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long, env = "EXPORTER_ADDR")]
    addr: Option<String>,

    /// Jeedom API key (overrides config)
    #[arg(short, long, env = "JEEDOM_API_KEY")]
    key: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Jeedom Prometheus Exporter v{}",
        env!("CARGO_PKG_VERSION")
    );

    // An explicit path must exist, the default one may not
    let (path, required) = match &args.config {
        Some(path) => (path.as_str(), true),
        None => (DEFAULT_CONFIG_PATH, false),
    };
    let mut config = Config::load(path, required)?;

    if let Some(key) = args.key {
        config.jeedom.key = SecretString::from(key);
    }
    if let Some(port) = args.port {
        config.prometheus.port = port;
    }
    if let Some(addr) = args.addr {
        config.prometheus.addr = addr;
    }

    config.validate()?;

    info!("Configuration loaded from {}", path);
    info!("Jeedom API: {}", config.jeedom.url);

    if let Err(e) = server::start(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
