use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use nightshift_core::{NightshiftConfig, NightshiftError};
use nightshift_portainer::{Credential, HttpTransport, PortainerClient, Session, Transport};
use nightshift_scheduler::{DailySchedule, RestartEngine};

/// Restart a Portainer-managed container at a fixed local time every day.
#[derive(Parser)]
#[command(name = "nightshift", version)]
struct Args {
    /// Path to the TOML config file (default: ./nightshift.toml).
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nightshift=info".into()),
        )
        .init();

    let args = Args::parse();

    // load config: explicit flag > NIGHTSHIFT_CONFIG env > ./nightshift.toml
    let config_path = args.config.or_else(|| std::env::var("NIGHTSHIFT_CONFIG").ok());
    let config = NightshiftConfig::load(config_path.as_deref())?;
    config.validate()?;

    let schedule: DailySchedule = config
        .restart
        .time
        .parse()
        .map_err(NightshiftError::Config)?;

    info!(
        url = %config.portainer.url,
        endpoint = %config.portainer.endpoint_id,
        "portainer target"
    );
    info!(
        container = %config.restart.container,
        time = %schedule,
        poll_secs = config.restart.poll_interval_secs,
        "daily restart configured"
    );

    let credential = match (
        &config.portainer.api_key,
        &config.portainer.username,
        &config.portainer.password,
    ) {
        (Some(key), _, _) => Credential::ApiKey(key.clone()),
        (None, Some(username), Some(password)) => Credential::Login {
            username: username.clone(),
            password: password.clone(),
        },
        _ => anyhow::bail!("no usable credential configured"),
    };

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.portainer.url));
    let session = Session::new(transport.clone(), credential);
    let client = PortainerClient::new(transport, session, config.portainer.endpoint_id.clone());

    let engine = RestartEngine::new(
        client,
        config.restart.container.clone(),
        schedule,
        Duration::from_secs(config.restart.poll_interval_secs),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    engine.run(shutdown_rx).await;
    info!("nightshift stopped");
    Ok(())
}
