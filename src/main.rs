use anyhow::Result;
use clap::Parser;
use domoticz_exporter::{
    config::{parse_device_ids, Config},
    server,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// Endpoint of Domoticz, `host:port` or `http://host:port` (overrides config)
    #[arg(long = "domoticz", env = "DOMOTICZ_ENDPOINT")]
    endpoint: Option<String>,

    /// Username used to authenticate to Domoticz (overrides config)
    #[arg(long, env = "DOMOTICZ_USERNAME")]
    username: Option<String>,

    /// Password used to authenticate to Domoticz (overrides config)
    #[arg(long, env = "DOMOTICZ_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// IDs of the Domoticz devices, separated by comma (overrides config)
    #[arg(long, env = "DOMOTICZ_IDS")]
    ids: Option<String>,

    /// Port to listen on for metrics
    #[arg(short, long, env = "EXPORTER_PORT")]
    port: Option<u16>,

    /// Address to bind to
    #[arg(short, long, env = "EXPORTER_ADDR")]
    addr: Option<String>,

    /// Path under which to expose metrics
    #[arg(long, env = "EXPORTER_METRICS_PATH")]
    metrics_path: Option<String>,

    /// Path receiving Domoticz push requests
    #[arg(long, env = "EXPORTER_PUSH_PATH")]
    push_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Domoticz Prometheus Exporter v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(&args.config)?;

    // Override with CLI arguments if provided
    if let Some(endpoint) = args.endpoint {
        config.domoticz.endpoint = endpoint;
    }
    if let Some(username) = args.username {
        config.domoticz.username = username;
    }
    if let Some(password) = args.password {
        config.domoticz.password = secrecy::SecretString::new(password.into());
    }
    if let Some(ids) = args.ids {
        config.domoticz.device_ids = parse_device_ids(&ids);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(metrics_path) = args.metrics_path {
        config.server.metrics_path = metrics_path;
    }
    if let Some(push_path) = args.push_path {
        config.server.push_path = push_path;
    }

    info!("Configuration loaded successfully");
    info!("Domoticz endpoint: {}", config.domoticz.endpoint);

    // Start the metrics server
    if let Err(e) = server::start(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
