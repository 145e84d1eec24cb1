mod provider;
mod store;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use waymark::{
    geofence::{GeofenceConfig, GeofenceEngine},
    progress::{HitMode, Monitoring, TripProgressController},
    shared::Coordinate,
    trip::parse_stops,
};

use crate::{
    provider::{ReplayProvider, load_samples},
    store::{JsonLineSink, MemoryStore},
};

const PUMP_INTERVAL: std::time::Duration = std::time::Duration::from_millis(20);

#[derive(Parser)]
#[command(name = "waymark-replay")]
#[command(about = "Replays recorded location samples against a trip")]
struct Args {
    /// JSON array of stop records
    #[arg(short, long)]
    trip: PathBuf,

    /// CSV with lat,lon and an optional timestamp column in milliseconds
    #[arg(short, long)]
    samples: PathBuf,

    /// Starting position as "lat,lon", used to anchor the route
    #[arg(short, long, value_parser = parse_coordinate)]
    user: Option<Coordinate>,

    /// Comma separated stop ids from an earlier run, skips optimization
    #[arg(long, value_delimiter = ',')]
    order: Option<Vec<String>>,

    /// Confirm transitions with the reduced hit count
    #[arg(long)]
    accelerated: bool,

    /// Playback speed relative to the configured sample interval
    #[arg(long, default_value_t = 50.0)]
    speed: f64,

    #[arg(long, default_value = "replay")]
    trip_id: String,
}

fn parse_coordinate(value: &str) -> Result<Coordinate, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected \"lat,lon\", got {value:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|_| format!("bad latitude {lat:?}"))?;
    let lon: f64 = lon.trim().parse().map_err(|_| format!("bad longitude {lon:?}"))?;
    Ok(Coordinate::new(lat, lon))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let config = GeofenceConfig::from_env().context("invalid geofence configuration")?;
    let engine = GeofenceEngine::new(config)?;

    let trip = std::fs::read_to_string(&args.trip)
        .with_context(|| format!("reading {}", args.trip.display()))?;
    let stops = parse_stops(&trip).context("parsing trip stops")?;
    let samples = load_samples(&args.samples, config.sample_interval)
        .with_context(|| format!("reading {}", args.samples.display()))?;
    info!(stops = stops.len(), samples = samples.len(), "loaded replay input");

    let mode = if args.accelerated {
        HitMode::Accelerated
    } else {
        HitMode::Normal
    };
    let mut controller = TripProgressController::new(
        args.trip_id,
        engine,
        ReplayProvider::new(samples, args.speed),
        MemoryStore::new(stops),
        JsonLineSink,
    )
    .with_mode(mode);

    controller.load(args.user, args.order.as_deref())?;
    if controller.start()? == Monitoring::Idle {
        info!("nothing left to visit");
        return Ok(());
    }

    let mut ticker = tokio::time::interval(PUMP_INTERVAL);
    loop {
        ticker.tick().await;
        let finished = controller.provider().is_finished();
        controller.pump();
        if !controller.is_monitoring() || finished {
            break;
        }
    }
    info!(snapshot = ?controller.snapshot(), "replay done");
    controller.stop();

    for stop in controller.store().stops() {
        info!(stop = %stop.id, name = %stop.name, status = %stop.status, "final status");
    }
    Ok(())
}
