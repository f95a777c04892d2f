use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error, info};
use tokio_util::sync::CancellationToken;

use ledfx_bridge::config::load_config;
use ledfx_bridge::{Bridge, LedFxClient};

fn log_states(bridge: &Bridge) {
    for entity in bridge.entities() {
        match serde_json::to_string(&entity.report()) {
            Ok(payload) => info!("{}", payload),
            Err(e) => error!("Failed to encode state of {}: {:?}", entity.unique_id(), e),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up Ctrl-C handler
    let token = CancellationToken::new();
    let shutdown = token.clone();
    ctrlc::set_handler(move || {
        info!("Received Ctrl-C, shutting down...");
        shutdown.cancel();
    })?;

    // Narrowed to the configured level once the config is loaded.
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Trace);
    clog.init();
    log::set_max_level(log::LevelFilter::Info);

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = load_config(&config_path).inspect_err(|e| error!("{:#}", e))?;
    log::set_max_level(config.logging.level_filter().inspect_err(|e| error!("{}", e))?);

    debug!("Loaded config: {:?}", config);

    let client = LedFxClient::new(&config.ledfx)?;
    info!("Connecting to LedFx at {}", client.base_url());

    let bridge = Bridge::setup(Arc::new(client), &config.polling).await?;
    log_states(&bridge);

    let mut interval = tokio::time::interval(config.polling.interval);
    interval.tick().await;
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!("Shutdown signal received, exiting...");
                break;
            },
            _ = interval.tick() => log_states(&bridge),
        }
    }

    bridge.teardown().await
}
