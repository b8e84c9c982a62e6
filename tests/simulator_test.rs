//! Simulator behavior tests
//!
//! Drive the simulator with a scripted route service so every response, failure and
//! delay is under the test's control.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use nearby_traffic::routing::{
    LinearRoutes, RouteError, RouteRequest, RouteResponse, RouteService, RouteTicket,
};
use nearby_traffic::simulation::{
    LatLng, MarkerLayer, Route, RouteState, SimConfig, Simulator, UnitId,
};

const DAKAR: LatLng = LatLng::new(14.7167, -17.4677);

/// Route service that records requests and only answers when told to
#[derive(Default)]
struct ScriptedRoutes {
    requests: Vec<RouteRequest>,
    ready: VecDeque<RouteResponse>,
}

impl ScriptedRoutes {
    fn requests_for(&self, id: UnitId) -> Vec<&RouteRequest> {
        self.requests
            .iter()
            .filter(|r| r.ticket == RouteTicket(id.0))
            .collect()
    }

    fn answer(&mut self, ticket: RouteTicket, result: Result<Route, RouteError>) {
        self.ready.push_back(RouteResponse { ticket, result });
    }
}

impl RouteService for ScriptedRoutes {
    fn request(&mut self, request: RouteRequest) {
        self.requests.push(request);
    }

    fn poll(&mut self) -> Vec<RouteResponse> {
        self.ready.drain(..).collect()
    }
}

fn three_point_route(from: LatLng) -> Route {
    Route {
        points: vec![
            from.offset(0.001, 0.0),
            from.offset(0.002, 0.0),
            from.offset(0.003, 0.0),
        ],
        distance_m: 330.0,
        duration_s: 40.0,
    }
}

fn scripted_sim(seed: u64) -> Simulator<MarkerLayer, ScriptedRoutes> {
    Simulator::new_with_seed(
        MarkerLayer::new(),
        ScriptedRoutes::default(),
        SimConfig::default(),
        seed,
    )
}

fn assert_indices_in_range<R: RouteService>(sim: &Simulator<MarkerLayer, R>) {
    for unit in sim.units() {
        assert!(
            unit.path_index <= unit.path.len(),
            "unit {:?} index {} past path of {}",
            unit.id,
            unit.path_index,
            unit.path.len()
        );
    }
}

#[test]
fn start_creates_units_around_center() {
    let mut sim = scripted_sim(1);
    sim.start(DAKAR);

    assert_eq!(sim.units().len(), 8);
    assert_eq!(sim.map().len(), 8);
    assert_eq!(sim.center(), Some(DAKAR));

    let half_spread = sim.config().start_spread / 2.0;
    for unit in sim.units() {
        assert_eq!(unit.anchor, DAKAR);
        assert!((unit.position.lat - DAKAR.lat).abs() <= half_spread);
        assert!((unit.position.lng - DAKAR.lng).abs() <= half_spread);
        assert_eq!(sim.map().get(unit.marker), Some(unit.position));
        assert_eq!(unit.route, RouteState::InFlight);
        assert_eq!(unit.path_index, 0);
        assert!(unit.path.is_empty());
    }

    // One initial request per unit, from its own position
    let requests = &sim.routes().requests;
    assert_eq!(requests.len(), 8);
    for unit in sim.units() {
        let mine = sim.routes().requests_for(unit.id);
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].from, unit.position);
    }
}

#[test]
fn destinations_stay_within_spread_of_anchor() {
    let mut sim = scripted_sim(2);
    sim.start(DAKAR);

    let half_spread = sim.config().destination_spread / 2.0;
    for request in &sim.routes().requests {
        assert!((request.to.lat - DAKAR.lat).abs() <= half_spread);
        assert!((request.to.lng - DAKAR.lng).abs() <= half_spread);
    }
}

#[test]
fn units_walk_a_three_point_route_then_request_again() {
    let mut sim = scripted_sim(3);
    sim.start(DAKAR);
    let now = Instant::now();

    let units: Vec<_> = sim.units().iter().map(|u| (u.id, u.position)).collect();
    for (id, position) in &units {
        sim.routes_mut()
            .answer(RouteTicket(id.0), Ok(three_point_route(*position)));
    }

    for tick in 1..=3 {
        sim.tick(now + Duration::from_millis(100 * tick));
        assert_indices_in_range(&sim);
    }

    for (id, start) in &units {
        let unit = sim.unit(*id).unwrap();
        let last = three_point_route(*start).points[2];
        assert_eq!(unit.position, last);
        assert_eq!(sim.map().get(unit.marker), Some(last));
        assert_eq!(unit.path_index, unit.path.len());
        assert_eq!(unit.route, RouteState::InFlight);

        // Initial request plus exactly one on arrival, from the final point
        let requests = sim.routes().requests_for(*id);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].from, last);
    }
    assert_eq!(sim.stats.arrivals, 8);
}

#[test]
fn arrived_unit_does_not_move_until_new_route() {
    let mut sim = scripted_sim(4);
    sim.start(DAKAR);
    let now = Instant::now();
    let id = sim.units()[0].id;
    let start = sim.units()[0].position;

    sim.routes_mut()
        .answer(RouteTicket(id.0), Ok(three_point_route(start)));
    for tick in 1..=3 {
        sim.tick(now + Duration::from_millis(100 * tick));
    }
    let arrived_at = sim.unit(id).unwrap().position;

    // No answer yet: further ticks leave the unit and its request count alone
    for tick in 4..=10 {
        sim.tick(now + Duration::from_millis(100 * tick));
        assert_eq!(sim.unit(id).unwrap().position, arrived_at);
    }
    assert_eq!(sim.routes().requests_for(id).len(), 2);

    let next = vec![arrived_at.offset(0.0, 0.001), arrived_at.offset(0.0, 0.002)];
    sim.routes_mut().answer(
        RouteTicket(id.0),
        Ok(Route {
            points: next.clone(),
            ..Default::default()
        }),
    );
    sim.tick(now + Duration::from_millis(1100));
    assert_eq!(sim.unit(id).unwrap().position, next[0]);
    assert_eq!(sim.unit(id).unwrap().path_index, 1);
}

#[test]
fn pending_units_are_skipped() {
    let mut sim = scripted_sim(5);
    sim.start(DAKAR);
    let positions: Vec<_> = sim.units().iter().map(|u| u.position).collect();

    let now = Instant::now();
    for tick in 1..=5 {
        sim.tick(now + Duration::from_millis(100 * tick));
    }

    let after: Vec<_> = sim.units().iter().map(|u| u.position).collect();
    assert_eq!(positions, after);
    assert_eq!(sim.routes().requests.len(), 8);
}

#[test]
fn failed_request_is_retried_once_after_delay() {
    let mut sim = scripted_sim(6);
    sim.start(DAKAR);
    let t0 = Instant::now();
    let id = sim.units()[0].id;

    sim.routes_mut().answer(
        RouteTicket(id.0),
        Err(RouteError::Transport("connection refused".to_string())),
    );
    sim.tick(t0);
    assert_eq!(
        sim.unit(id).unwrap().route,
        RouteState::RetryScheduled(t0 + Duration::from_secs(5))
    );
    assert_eq!(sim.routes().requests_for(id).len(), 1);

    sim.tick(t0 + Duration::from_millis(4900));
    assert_eq!(sim.routes().requests_for(id).len(), 1);

    sim.tick(t0 + Duration::from_secs(5));
    let requests = sim.routes().requests_for(id);
    assert_eq!(requests.len(), 2);
    // Destination is re-drawn, not reused
    assert_ne!(requests[0].to, requests[1].to);
    assert_eq!(sim.unit(id).unwrap().route, RouteState::InFlight);
    assert_eq!(sim.stats.retries, 1);

    // Still waiting on that retry: no duplicates however long we tick
    for secs in 6..20 {
        sim.tick(t0 + Duration::from_secs(secs));
    }
    assert_eq!(sim.routes().requests_for(id).len(), 2);
}

#[test]
fn always_failing_router_never_stacks_requests() {
    let mut sim = scripted_sim(7);
    sim.start(DAKAR);
    let t0 = Instant::now();
    let id = sim.units()[0].id;

    // Fail every request immediately for 30 simulated seconds, ticking at 10 FPS
    for tick in 0..300u64 {
        let now = t0 + Duration::from_millis(100 * tick);
        let outstanding = sim.routes().requests_for(id).len() as u64 - sim.stats.route_failures;
        if outstanding == 1 && sim.unit(id).unwrap().route == RouteState::InFlight {
            sim.routes_mut()
                .answer(RouteTicket(id.0), Err(RouteError::NoRoute));
        }
        sim.tick(now);
        assert!(sim.pending_requests() <= sim.units().len());
    }

    // A failure at t=0 then one retry every 5s
    let requests = sim.routes().requests_for(id).len();
    assert_eq!(requests, 6, "expected initial + 5 retries, got {requests}");
    assert_eq!(sim.stats.retries, 5);
}

#[test]
fn empty_route_counts_as_failure() {
    let mut sim = scripted_sim(8);
    sim.start(DAKAR);
    let t0 = Instant::now();
    let id = sim.units()[0].id;

    sim.routes_mut()
        .answer(RouteTicket(id.0), Ok(Route::default()));
    sim.tick(t0);

    assert_eq!(sim.stats.route_failures, 1);
    assert!(matches!(
        sim.unit(id).unwrap().route,
        RouteState::RetryScheduled(_)
    ));
}

#[test]
fn retry_limit_abandons_unit() {
    let config = SimConfig {
        retry_limit: Some(2),
        ..SimConfig::default()
    };
    let mut sim = Simulator::new_with_seed(MarkerLayer::new(), ScriptedRoutes::default(), config, 9);
    sim.start(DAKAR);
    let t0 = Instant::now();
    let id = sim.units()[0].id;

    sim.routes_mut()
        .answer(RouteTicket(id.0), Err(RouteError::NoRoute));
    sim.tick(t0);
    sim.tick(t0 + Duration::from_secs(5));
    assert_eq!(sim.routes().requests_for(id).len(), 2);

    sim.routes_mut()
        .answer(RouteTicket(id.0), Err(RouteError::NoRoute));
    sim.tick(t0 + Duration::from_secs(6));
    assert_eq!(sim.unit(id).unwrap().route, RouteState::Abandoned);
    assert_eq!(sim.stats.abandoned, 1);

    sim.tick(t0 + Duration::from_secs(60));
    assert_eq!(sim.routes().requests_for(id).len(), 2);
}

#[test]
fn success_resets_failure_count() {
    let config = SimConfig {
        retry_limit: Some(2),
        ..SimConfig::default()
    };
    let mut sim = Simulator::new_with_seed(MarkerLayer::new(), ScriptedRoutes::default(), config, 10);
    sim.start(DAKAR);
    let t0 = Instant::now();
    let id = sim.units()[0].id;
    let start = sim.units()[0].position;

    sim.routes_mut()
        .answer(RouteTicket(id.0), Err(RouteError::NoRoute));
    sim.tick(t0);
    sim.tick(t0 + Duration::from_secs(5));
    sim.routes_mut()
        .answer(RouteTicket(id.0), Ok(three_point_route(start)));
    sim.tick(t0 + Duration::from_secs(6));

    assert_eq!(sim.unit(id).unwrap().failures, 0);
    assert_eq!(sim.unit(id).unwrap().route, RouteState::Ready);
}

#[test]
fn restart_discards_late_responses() {
    let mut sim = scripted_sim(11);
    sim.start(DAKAR);
    let old_ids: Vec<_> = sim.units().iter().map(|u| u.id).collect();
    let old_markers: Vec<_> = sim.units().iter().map(|u| u.marker).collect();

    let elsewhere = LatLng::new(48.8566, 2.3522);
    sim.start(elsewhere);

    assert_eq!(sim.units().len(), 8);
    assert_eq!(sim.map().len(), 8);
    for marker in old_markers {
        assert_eq!(sim.map().get(marker), None);
    }
    for unit in sim.units() {
        assert!(!old_ids.contains(&unit.id));
        assert_eq!(unit.anchor, elsewhere);
    }

    // Answers for the previous generation arrive late
    for id in &old_ids {
        sim.routes_mut()
            .answer(RouteTicket(id.0), Ok(three_point_route(DAKAR)));
    }
    let positions: Vec<_> = sim.units().iter().map(|u| u.position).collect();
    sim.tick(Instant::now());

    assert_eq!(sim.stats.stale_responses, 8);
    assert_eq!(sim.stats.routes_received, 0);
    let after: Vec<_> = sim.units().iter().map(|u| u.position).collect();
    assert_eq!(positions, after);
    assert!(sim.units().iter().all(|u| u.path.is_empty()));
}

#[test]
fn duplicate_answer_is_ignored() {
    let mut sim = scripted_sim(12);
    sim.start(DAKAR);
    let id = sim.units()[0].id;
    let start = sim.units()[0].position;

    sim.routes_mut()
        .answer(RouteTicket(id.0), Ok(three_point_route(start)));
    sim.routes_mut()
        .answer(RouteTicket(id.0), Ok(three_point_route(start.offset(0.01, 0.01))));
    sim.tick(Instant::now());

    assert_eq!(sim.stats.routes_received, 1);
    assert_eq!(sim.stats.stale_responses, 1);
    assert_eq!(sim.unit(id).unwrap().path, three_point_route(start).points);
}

#[test]
fn request_route_refuses_while_in_flight() {
    let mut sim = scripted_sim(13);
    sim.start(DAKAR);
    let id = sim.units()[0].id;

    assert!(!sim.request_route(id));
    assert!(!sim.request_route(UnitId(999)));
    assert_eq!(sim.routes().requests_for(id).len(), 1);

    sim.routes_mut()
        .answer(RouteTicket(id.0), Ok(three_point_route(DAKAR)));
    sim.tick(Instant::now());
    assert!(sim.request_route(id));
    assert_eq!(sim.routes().requests_for(id).len(), 2);
}

#[test]
fn same_seed_same_layout() {
    let mut a = scripted_sim(42);
    let mut b = scripted_sim(42);
    a.start(DAKAR);
    b.start(DAKAR);

    let pa: Vec<_> = a.units().iter().map(|u| u.position).collect();
    let pb: Vec<_> = b.units().iter().map(|u| u.position).collect();
    assert_eq!(pa, pb);
    assert_eq!(a.routes().requests, b.routes().requests);
}

#[test]
fn indices_stay_in_range_over_long_run() {
    let mut sim = Simulator::new_with_seed(
        MarkerLayer::new(),
        LinearRoutes::new(100.0, 10.0),
        SimConfig::default(),
        14,
    );
    sim.start(DAKAR);
    let t0 = Instant::now();

    for tick in 0..500u64 {
        sim.tick(t0 + Duration::from_millis(100 * tick));
        assert_indices_in_range(&sim);
        for unit in sim.units() {
            assert_eq!(sim.map().get(unit.marker), Some(unit.position));
        }
    }

    assert!(sim.stats.arrivals > 0);
    assert_eq!(sim.stats.route_failures, 0);
    assert_eq!(
        sim.stats.routes_requested,
        sim.stats.routes_received + sim.pending_requests() as u64
    );
}

#[test]
fn map_render_shows_units_and_center() {
    let mut sim = scripted_sim(15);
    assert_eq!(sim.render_map(40, 20), "");

    sim.start(DAKAR);
    let map = sim.render_map(40, 20);
    assert_eq!(map.lines().count(), 20);
    assert!(map.contains('+'));
    assert!(map.contains('o'));
}
