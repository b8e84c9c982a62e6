//! Nearby Traffic Library
//!
//! Simulated "nearby users" moving along real road routes around a center point.
//! The simulation can run headless or with a Bevy map UI. A rule-based estimator rates
//! how busy a road is likely to be.

pub mod congestion;
pub mod geolocation;
pub mod routing;
pub mod settings;
pub mod simulation;

#[cfg(feature = "ui")]
pub mod ui;

use routing::RouteBackend;
use settings::Settings;
use simulation::{MarkerLayer, Simulator};

/// The simulator as wired up by the front-ends
pub type TrafficSimulator = Simulator<MarkerLayer, RouteBackend>;

/// Build a simulator from settings, seeded if a seed is configured
pub fn build_simulator(settings: &Settings) -> TrafficSimulator {
    let routes = RouteBackend::from_settings(&settings.routing);
    let config = settings.sim_config();
    match settings.simulation.seed {
        Some(seed) => Simulator::new_with_seed(MarkerLayer::new(), routes, config, seed),
        None => Simulator::new(MarkerLayer::new(), routes, config),
    }
}
