use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use watchpost::{
    Unit,
    actors::{probe::ProbeHandle, reporter::ReporterHandle},
    alerting::StatusAlerter,
    board::StatusBoard,
    config::{Config, read_config_file},
    notify::build_notifiers,
    sensors::{
        EventCounter, FileHandleSensor, LoadSensor, MemorySensor, RateSensor, Sensor,
        VersionSensor,
    },
    util::{get_config_path, get_server_name},
};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (defaults to $WATCHPOST_CONFIG or ./watchpost.json)
    #[arg(short)]
    file: Option<String>,
}

fn log_filter() -> filter::Targets {
    filter::Targets::new().with_targets(vec![
        ("watchpost", LevelFilter::DEBUG),
        (env!("CARGO_CRATE_NAME"), LevelFilter::TRACE),
    ])
}

fn init() {
    let filter = log_filter();
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
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let path = args.file.unwrap_or_else(get_config_path);
    let config = read_config_file(&path).with_context(|| format!("failed to load {path}"))?;

    let unit = Unit::new(
        config.unit.component.clone(),
        get_server_name(config.unit.server.as_deref()),
    );
    debug!("reporting as {unit} every {}s", config.interval);

    let rate_sensor = Arc::new(RateSensor::new(
        config.success_rate.number_to_keep,
        config.success_rate.warn_limit,
        config.success_rate.error_limit,
    )?);

    let events = config
        .sensors
        .audit
        .then(|| Arc::new(EventCounter::new()));

    let probes = spawn_probes(&config, rate_sensor.clone(), events.clone())?;
    let sensors = build_sensors(&config, &unit, rate_sensor, events);

    let alerter = Arc::new(StatusAlerter::new(build_notifiers(&config.alerts)));
    let board = Arc::new(StatusBoard::new());

    let reporter = ReporterHandle::spawn(
        unit,
        Duration::from_secs(config.interval as u64),
        sensors,
        board,
        alerter,
    );

    tokio::signal::ctrl_c().await?;
    debug!("shutting down");

    for probe in probes {
        if let Err(e) = probe.shutdown().await {
            error!("{e}");
        }
    }
    reporter.shutdown().await?;

    Ok(())
}

fn spawn_probes(
    config: &Config,
    sensor: Arc<RateSensor>,
    events: Option<Arc<EventCounter>>,
) -> anyhow::Result<Vec<ProbeHandle>> {
    config
        .probes
        .iter()
        .map(|probe| {
            debug!("starting probe {} ({}) every {}s", probe.name, probe.url, probe.interval);
            ProbeHandle::spawn_with_events(probe.clone(), sensor.clone(), events.clone())
                .with_context(|| format!("failed to start probe {}", probe.name))
        })
        .collect()
}

fn build_sensors(
    config: &Config,
    unit: &Unit,
    rate_sensor: Arc<RateSensor>,
    events: Option<Arc<EventCounter>>,
) -> Vec<Arc<dyn Sensor>> {
    let mut sensors: Vec<Arc<dyn Sensor>> = vec![rate_sensor];

    if let Some(memory) = &config.sensors.memory {
        sensors.push(Arc::new(MemorySensor::new(
            memory.warn,
            memory.error,
            Some(unit.server.clone()),
        )));
    }

    if let Some(load) = &config.sensors.load {
        sensors.push(Arc::new(LoadSensor::new(load.warn, load.error)));
    }

    if let Some(file_handles) = &config.sensors.file_handles {
        sensors.push(Arc::new(FileHandleSensor::new(
            file_handles.warn,
            file_handles.error,
        )));
    }

    if config.sensors.version {
        sensors.push(Arc::new(VersionSensor::default()));
    }

    if let Some(events) = events {
        sensors.push(events);
    }

    sensors
}
