use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tile_watch::{
    actors::{
        alert::AlertHandle,
        monitor::{MonitorHandle, MonitorSettings},
    },
    config::{Config, read_config_file},
    notify::Notifier,
    tiles::HttpTileFetcher,
};
use tracing::{debug, error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Watch a canvas region for deviations from a template")]
struct Args {
    /// Config file (JSON); built-in defaults are used when omitted
    #[arg(short, long)]
    file: Option<String>,

    /// Do not start the HTTP API
    #[arg(long)]
    no_api: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = filter::Targets::new().with_targets(vec![
        ("tile_watch", level),
        ("watch", level),
        ("tower_http", LevelFilter::DEBUG.min(level)),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let mut config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => {
            debug!("no config file given, using defaults");
            Config::default()
        }
    };
    config.apply_env_overrides();
    config.validate().context("invalid configuration")?;

    let fetcher = HttpTileFetcher::new(config.tile_url.clone(), config.request_timeout())
        .context("failed to build tile client")?;
    info!("fetching tiles from {}", fetcher.base_url());

    let monitor = MonitorHandle::spawn(MonitorSettings::from(&config), Arc::new(fetcher));

    if let Err(e) = monitor.configure(config.monitor.clone()).await {
        error!("initial configuration rejected: {e:#}");
        monitor.shutdown().await.ok();
        return Err(e);
    }

    let alerts = config.alert.clone().map(|alert| {
        debug!("alerting on severity changes");
        AlertHandle::spawn(Notifier::new(alert), monitor.subscribe(), monitor.watch())
    });

    #[cfg(feature = "api")]
    if !args.no_api {
        use tile_watch::api::{ApiState, spawn_api_server};

        let mut state = ApiState::new(monitor.clone(), config.history);
        if let Some(alerts) = &alerts {
            state = state.with_alerts(alerts.clone());
        }
        if let Some(dir) = &config.api.template_dir {
            state = state.with_template_dir(dir);
        }
        spawn_api_server(&config.api, state).await?;
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");

    if let Some(alerts) = alerts {
        alerts.shutdown().await;
    }
    monitor.shutdown().await?;

    Ok(())
}
