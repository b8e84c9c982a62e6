use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::time::Instant;

use nearby_traffic::congestion::{self, Conditions, RoadType, Weather, Weekday};
use nearby_traffic::geolocation;
use nearby_traffic::routing::{BackendKind, LinearRoutes, OsrmClient};
use nearby_traffic::settings::Settings;
use nearby_traffic::simulation::LatLng;

#[derive(Parser)]
#[command(name = "nearby_traffic", version)]
#[command(about = "Simulated nearby traffic on real road routes, with optional UI")]
struct Cli {
    /// Run with the Bevy map UI
    #[arg(long)]
    ui: bool,

    /// Number of simulation ticks to run in headless mode
    #[arg(long, default_value = "300")]
    ticks: u32,

    /// Center of the simulation as LAT,LNG (skips geolocation)
    #[arg(long, allow_hyphen_values = true)]
    center: Option<LatLng>,

    /// Number of simulated units
    #[arg(long)]
    units: Option<usize>,

    /// Seed for reproducible unit placement and destinations
    #[arg(long)]
    seed: Option<u64>,

    /// Routing backend
    #[arg(long, value_enum, global = true)]
    backend: Option<BackendKind>,

    /// Don't look up the current position; use the default center
    #[arg(long)]
    no_geolocate: bool,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a single route between two points and print a summary
    Route {
        /// Start as LAT,LNG
        #[arg(long, allow_hyphen_values = true)]
        from: LatLng,
        /// Destination as LAT,LNG
        #[arg(long, allow_hyphen_values = true)]
        to: LatLng,
    },
    /// Rate how busy a road is likely to be
    Estimate {
        /// Hour of day, 0-23
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..24))]
        hour: u8,
        #[arg(long, value_enum)]
        day: Weekday,
        #[arg(long, value_enum, default_value_t = RoadType::Urban)]
        road: RoadType,
        #[arg(long, value_enum, default_value_t = Weather::Sunny)]
        weather: Weather,
        /// Observed average speed in km/h
        #[arg(long)]
        speed: Option<f64>,
    },
}

impl Cli {
    /// Layer command line overrides on top of the loaded settings
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(center) = self.center {
            settings.location.center = Some(center);
        }
        if let Some(units) = self.units {
            settings.simulation.unit_count = units;
        }
        if let Some(seed) = self.seed {
            settings.simulation.seed = Some(seed);
        }
        if let Some(backend) = self.backend {
            settings.routing.backend = backend;
        }
        if self.no_geolocate {
            settings.location.geolocate = false;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.apply_to(&mut settings);

    match cli.command {
        Some(Command::Route { from, to }) => {
            init_logging();
            return print_route(&settings, from, to);
        }
        Some(Command::Estimate {
            hour,
            day,
            road,
            weather,
            speed,
        }) => {
            let conditions = Conditions {
                hour,
                day,
                road,
                weather,
            };
            return print_estimate(&conditions, speed);
        }
        None => {}
    }

    if cli.ui {
        #[cfg(feature = "ui")]
        {
            let center = geolocation::resolve_center(&settings.location);
            run_with_ui(settings, center);
        }
        #[cfg(not(feature = "ui"))]
        {
            eprintln!("Error: UI feature is not enabled. Rebuild with --features ui");
            std::process::exit(1);
        }
    } else {
        init_logging();
        run_headless(&settings, cli.ticks);
    }

    Ok(())
}

fn init_logging() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,nearby_traffic=info"),
    )
    .init();
}

/// One-shot route lookup, the terminal counterpart of clicking on the map
fn print_route(settings: &Settings, from: LatLng, to: LatLng) -> Result<()> {
    let route = match settings.routing.backend {
        BackendKind::Osrm => OsrmClient::from_settings(&settings.routing)
            .route(from, to)
            .with_context(|| format!("No route from {} to {}", from, to))?,
        BackendKind::Linear => LinearRoutes::from_settings(&settings.routing).route(from, to),
    };

    println!("Route {} -> {}", from, to);
    println!("Points: {}", route.points.len());
    println!("Distance: {:.2} km", route.distance_m / 1000.0);
    println!("Duration: {:.1} min", route.duration_s / 60.0);
    Ok(())
}

fn print_estimate(conditions: &Conditions, speed: Option<f64>) -> Result<()> {
    let estimate = congestion::estimate(conditions, speed)?;

    let speed_source = if speed.is_some() { "observed" } else { "expected" };
    println!(
        "Traffic level: {}{}",
        estimate.level,
        if estimate.peak { " (rush hour)" } else { "" }
    );
    println!(
        "Speed: {:.1} km/h {} on a {:?} road ({:?})",
        estimate.speed_kmh, speed_source, conditions.road, conditions.weather
    );
    println!("Recommendation: {}", estimate.level.recommendation());
    Ok(())
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(settings: &Settings, ticks: u32) {
    let center = geolocation::resolve_center(&settings.location);
    let mut sim = nearby_traffic::build_simulator(settings);
    let frame_interval = sim.config().frame_interval;

    println!("Running nearby traffic simulation in headless mode...");
    println!("Ticks: {}, Frame interval: {:?}", ticks, frame_interval);

    // How many ticks make up one second of wall-clock time
    let ticks_per_second = (1000 / frame_interval.as_millis().max(1)).max(1) as u32;
    println!();

    sim.start(center);

    let mut tick = 0;
    while tick < ticks {
        let ticks_to_run = ticks_per_second.min(ticks - tick);

        for _ in 0..ticks_to_run {
            tick += 1;
            sim.tick(Instant::now());
            std::thread::sleep(frame_interval);
        }

        println!(
            "--- After tick {} ({:.1}s) ---",
            tick,
            tick as f64 * frame_interval.as_secs_f64()
        );
        sim.print_summary();
        sim.draw_map();
        println!();
    }

    let stats = &sim.stats;
    info!("=== SIMULATION COMPLETE ===");
    info!(
        "Elapsed ticks: {} ({:.1}s)",
        stats.ticks,
        frame_interval.as_secs_f64() * stats.ticks as f64
    );
    info!("Units: {}", sim.units().len());
    info!("Routes requested: {}", stats.routes_requested);
    info!("Routes received: {}", stats.routes_received);
    info!("Route failures: {}", stats.route_failures);
    info!("Retries: {}", stats.retries);
    info!("Stale responses: {}", stats.stale_responses);
    info!("Arrivals: {}", stats.arrivals);
    info!("Abandoned units: {}", stats.abandoned);
}

#[cfg(feature = "ui")]
fn run_with_ui(settings: Settings, center: LatLng) {
    use bevy::log::LogPlugin;
    use bevy::prelude::*;

    println!("Starting Nearby Traffic UI...");
    println!();
    println!("Controls:");
    println!("  Left click  - Route from your position to the clicked point");
    println!("  Right click - Move your position and restart the simulation there");
    println!("  W/A/S/D     - Pan");
    println!("  Z/X         - Zoom in/out");
    println!("  ESC         - Exit");
    println!();

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(LogPlugin {
                    filter: "warn,nearby_traffic=debug".to_string(),
                    level: bevy::log::Level::DEBUG,
                    ..default()
                })
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Nearby Traffic".into(),
                        resolution: (1280, 720).into(),
                        ..default()
                    }),
                    ..default()
                }),
        )
        .add_plugins(nearby_traffic::ui::NearbyTrafficUiPlugin { settings, center })
        .run();
}
