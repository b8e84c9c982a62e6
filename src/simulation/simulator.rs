//! The traffic simulator that ties units, map and routing together
//!
//! Owns its units, the map view it draws on and the route service it asks for paths.
//! Driven by repeated calls to [`Simulator::tick`]; route answers that arrived in the
//! meantime are applied at the start of each tick.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::time::{Duration, Instant};

use super::map::MapView;
use super::types::{LatLng, UnitId};
use super::unit::{RouteState, SimUnit, StepResult};
use crate::routing::{RouteError, RouteRequest, RouteService, RouteTicket};

/// Tuning knobs for the simulator
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Number of units created by `start`
    pub unit_count: usize,
    /// Full width in degrees of the box units start in, around the center
    pub start_spread: f64,
    /// Full width in degrees of the box destinations are drawn from, around the anchor
    pub destination_spread: f64,
    /// Pause between ticks when driven in real time
    pub frame_interval: Duration,
    /// Delay before a failed route request is retried
    pub retry_delay: Duration,
    /// A unit is abandoned on its Nth consecutive failure; `None` retries forever
    pub retry_limit: Option<u32>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            unit_count: 8,
            start_spread: 0.01,
            destination_spread: 0.02,
            frame_interval: Duration::from_millis(100),
            retry_delay: Duration::from_secs(5),
            retry_limit: None,
        }
    }
}

/// Running counters, reported by the front-ends
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimStats {
    pub ticks: u64,
    pub routes_requested: u64,
    pub routes_received: u64,
    pub route_failures: u64,
    pub retries: u64,
    /// Responses dropped because their unit is gone or wasn't waiting
    pub stale_responses: u64,
    pub arrivals: u64,
    pub abandoned: u64,
}

impl SimStats {
    pub fn summary(&self) -> String {
        format!(
            "Ticks: {} | Routes: {} requested, {} received, {} failed | Retries: {} | Arrivals: {}",
            self.ticks,
            self.routes_requested,
            self.routes_received,
            self.route_failures,
            self.retries,
            self.arrivals
        )
    }
}

pub struct Simulator<M: MapView, R: RouteService> {
    map: M,
    routes: R,
    config: SimConfig,

    /// Live units, in creation order
    units: Vec<SimUnit>,

    /// Center of the current run, if started
    center: Option<LatLng>,

    /// Next unit ID to assign; never reset so stale tickets can't alias new units
    next_id: u64,

    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,

    pub stats: SimStats,
}

impl<M: MapView, R: RouteService> Simulator<M, R> {
    fn new_internal(map: M, routes: R, config: SimConfig, rng: Option<StdRng>) -> Self {
        Self {
            map,
            routes,
            config,
            units: Vec::new(),
            center: None,
            next_id: 0,
            rng,
            stats: SimStats::default(),
        }
    }

    pub fn new(map: M, routes: R, config: SimConfig) -> Self {
        Self::new_internal(map, routes, config, None)
    }

    /// Create a simulator with a seeded RNG for reproducible runs
    pub fn new_with_seed(map: M, routes: R, config: SimConfig, seed: u64) -> Self {
        Self::new_internal(map, routes, config, Some(StdRng::seed_from_u64(seed)))
    }

    pub fn units(&self) -> &[SimUnit] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&SimUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn routes(&self) -> &R {
        &self.routes
    }

    pub fn routes_mut(&mut self) -> &mut R {
        &mut self.routes
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn center(&self) -> Option<LatLng> {
        self.center
    }

    /// Units currently waiting on the routing service
    pub fn pending_requests(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.route == RouteState::InFlight)
            .count()
    }

    /// Uniform offset in `[-spread / 2, spread / 2)`, using seeded RNG if available
    fn random_offset(&mut self, spread: f64) -> f64 {
        let r: f64 = match &mut self.rng {
            Some(rng) => rng.random_range(0.0..1.0),
            None => rand::rng().random_range(0.0..1.0),
        };
        (r - 0.5) * spread
    }

    fn next_unit_id(&mut self) -> UnitId {
        let id = UnitId(self.next_id);
        self.next_id += 1;
        id
    }

    fn index_of(&self, id: UnitId) -> Option<usize> {
        self.units.iter().position(|u| u.id == id)
    }

    /// Clear any existing units and seed a fresh set around `center`
    pub fn start(&mut self, center: LatLng) {
        for unit in self.units.drain(..) {
            self.map.remove_marker(unit.marker);
        }

        info!(
            "Starting {} simulated units around {}",
            self.config.unit_count, center
        );
        self.center = Some(center);

        let spread = self.config.start_spread;
        for _ in 0..self.config.unit_count {
            let d_lat = self.random_offset(spread);
            let d_lng = self.random_offset(spread);
            let position = center.offset(d_lat, d_lng);

            let id = self.next_unit_id();
            let marker = self.map.add_marker(position);
            self.units.push(SimUnit::new(id, marker, position, center));
        }

        for idx in 0..self.units.len() {
            self.request_route_at(idx);
        }
    }

    /// Ask for a new route for one unit
    ///
    /// Returns false if the unit doesn't exist or already has a request in flight.
    pub fn request_route(&mut self, id: UnitId) -> bool {
        match self.index_of(id) {
            Some(idx) if self.units[idx].route != RouteState::InFlight => {
                self.request_route_at(idx);
                true
            }
            _ => false,
        }
    }

    fn request_route_at(&mut self, idx: usize) {
        let spread = self.config.destination_spread;
        let d_lat = self.random_offset(spread);
        let d_lng = self.random_offset(spread);

        let unit = &mut self.units[idx];
        let destination = unit.anchor.offset(d_lat, d_lng);
        unit.route = RouteState::InFlight;

        debug!(
            "Unit {} requesting route {} -> {}",
            unit.id.0, unit.position, destination
        );
        self.routes.request(RouteRequest {
            ticket: RouteTicket(unit.id.0),
            from: unit.position,
            to: destination,
        });
        self.stats.routes_requested += 1;
    }

    /// Advance the simulation by one frame
    pub fn tick(&mut self, now: Instant) {
        self.stats.ticks += 1;
        self.apply_responses(now);
        self.fire_due_retries(now);

        for idx in 0..self.units.len() {
            let marker = self.units[idx].marker;
            match self.units[idx].step() {
                StepResult::Idle => {}
                StepResult::Moved(position) => self.map.move_marker(marker, position),
                StepResult::Arrived(position) => {
                    self.map.move_marker(marker, position);
                    self.stats.arrivals += 1;
                    debug!("Unit {} arrived at {}", self.units[idx].id.0, position);
                    self.request_route_at(idx);
                }
            }
        }
    }

    fn apply_responses(&mut self, now: Instant) {
        for response in self.routes.poll() {
            let id = UnitId(response.ticket.0);
            let idx = match self.index_of(id) {
                Some(idx) if self.units[idx].route == RouteState::InFlight => idx,
                _ => {
                    debug!("Discarding stale route response for unit {}", id.0);
                    self.stats.stale_responses += 1;
                    continue;
                }
            };

            match response.result {
                Ok(route) if !route.points.is_empty() => {
                    self.stats.routes_received += 1;
                    debug!(
                        "Unit {} got a {} point route ({:.0} m)",
                        id.0,
                        route.points.len(),
                        route.distance_m
                    );
                    self.units[idx].set_path(route.points);
                }
                Ok(_) => self.handle_failure(idx, RouteError::NoRoute, now),
                Err(e) => self.handle_failure(idx, e, now),
            }
        }
    }

    fn handle_failure(&mut self, idx: usize, error: RouteError, now: Instant) {
        self.stats.route_failures += 1;
        let retry_delay = self.config.retry_delay;
        let retry_limit = self.config.retry_limit;

        let unit = &mut self.units[idx];
        unit.failures += 1;

        if retry_limit.is_some_and(|limit| unit.failures >= limit) {
            warn!(
                "Route request for unit {} failed ({}); giving up after {} attempts",
                unit.id.0, error, unit.failures
            );
            unit.route = RouteState::Abandoned;
            self.stats.abandoned += 1;
        } else {
            warn!(
                "Route request for unit {} failed ({}); retrying in {:?}",
                unit.id.0, error, retry_delay
            );
            unit.route = RouteState::RetryScheduled(now + retry_delay);
        }
    }

    fn fire_due_retries(&mut self, now: Instant) {
        for idx in 0..self.units.len() {
            match self.units[idx].route {
                RouteState::RetryScheduled(at) if at <= now => {
                    self.stats.retries += 1;
                    self.request_route_at(idx);
                }
                _ => {}
            }
        }
    }

    /// Print a summary of the simulator state
    pub fn print_summary(&self) {
        println!("=== Nearby Traffic Summary ===");
        match self.center {
            Some(center) => println!("Center: {}", center),
            None => println!("Center: (not started)"),
        }
        println!("Units: {}", self.units.len());
        println!("Pending route requests: {}", self.pending_requests());
        println!("{}", self.stats.summary());

        if !self.units.is_empty() {
            println!("--- Units ---");
            for unit in &self.units {
                let state = match unit.route {
                    RouteState::Ready if unit.has_arrived() => "arrived",
                    RouteState::Ready => "moving",
                    RouteState::InFlight => "routing",
                    RouteState::RetryScheduled(_) => "retry scheduled",
                    RouteState::Abandoned => "abandoned",
                };
                println!(
                    "  Unit {}: position={}, step={}/{}, {}",
                    unit.id.0,
                    unit.position,
                    unit.path_index,
                    unit.path.len(),
                    state
                );
            }
        }
    }

    /// Render units and their remaining paths as an ASCII grid
    pub fn render_map(&self, width: usize, height: usize) -> String {
        let Some(center) = self.center else {
            return String::new();
        };
        let width = width.max(2);
        let height = height.max(2);

        // Frame the whole destination box plus anything that wandered outside it
        let half = self.config.destination_spread.max(self.config.start_spread) / 2.0;
        let mut min_lat = center.lat - half;
        let mut max_lat = center.lat + half;
        let mut min_lng = center.lng - half;
        let mut max_lng = center.lng + half;

        for unit in &self.units {
            for p in std::iter::once(&unit.position).chain(unit.path.iter()) {
                min_lat = min_lat.min(p.lat);
                max_lat = max_lat.max(p.lat);
                min_lng = min_lng.min(p.lng);
                max_lng = max_lng.max(p.lng);
            }
        }

        let lat_span = (max_lat - min_lat).max(f64::EPSILON);
        let lng_span = (max_lng - min_lng).max(f64::EPSILON);

        let to_grid = |p: &LatLng| -> (usize, usize) {
            let col = ((p.lng - min_lng) / lng_span * (width - 1) as f64).round() as usize;
            // North is up
            let row = ((max_lat - p.lat) / lat_span * (height - 1) as f64).round() as usize;
            (row.min(height - 1), col.min(width - 1))
        };

        let mut grid = vec![vec![' '; width]; height];

        for unit in &self.units {
            let remaining = unit.path.get(unit.path_index..).unwrap_or_default();
            for p in remaining {
                let (row, col) = to_grid(p);
                grid[row][col] = '.';
            }
        }

        for unit in &self.units {
            let (row, col) = to_grid(&unit.position);
            grid[row][col] = 'o';
        }

        let (row, col) = to_grid(&center);
        grid[row][col] = '+';

        let mut out = String::new();
        for row in &grid {
            let line: String = row.iter().collect();
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }

    /// Draw a visual map of the units in the terminal
    pub fn draw_map(&self) {
        println!("\n=== Map ===");
        println!("Legend: +=Center, o=Unit, .=Route ahead");
        println!();
        print!("{}", self.render_map(60, 24));
        println!();
    }
}
