//! Offline route backend that walks a straight line between the two points

use std::collections::VecDeque;

use super::{RouteRequest, RouteResponse, RouteService};
use crate::settings::RoutingSettings;
use crate::simulation::{LatLng, Route};

/// Upper bound on sampled segments per route
pub const MAX_LINEAR_STEPS: usize = 10_000;

/// Answers every request on the next poll with an evenly sampled straight path
#[derive(Debug)]
pub struct LinearRoutes {
    /// Spacing between consecutive path points in meters
    step_m: f64,
    /// Travel speed used for the duration estimate, in m/s
    speed_mps: f64,
    ready: VecDeque<RouteResponse>,
}

impl LinearRoutes {
    pub fn new(step_m: f64, speed_mps: f64) -> Self {
        Self {
            step_m: step_m.max(1.0),
            speed_mps: speed_mps.max(0.1),
            ready: VecDeque::new(),
        }
    }

    pub fn from_settings(settings: &RoutingSettings) -> Self {
        Self::new(settings.linear_step_m, settings.linear_speed_mps)
    }

    pub fn route(&self, from: LatLng, to: LatLng) -> Route {
        let distance_m = from.distance_m(&to);
        let steps = ((distance_m / self.step_m).ceil() as usize).clamp(1, MAX_LINEAR_STEPS);
        let points = (0..=steps)
            .map(|i| from.lerp(&to, i as f64 / steps as f64))
            .collect();

        Route {
            points,
            distance_m,
            duration_s: distance_m / self.speed_mps,
        }
    }
}

impl RouteService for LinearRoutes {
    fn request(&mut self, request: RouteRequest) {
        let route = self.route(request.from, request.to);
        self.ready.push_back(RouteResponse {
            ticket: request.ticket,
            result: Ok(route),
        });
    }

    fn poll(&mut self) -> Vec<RouteResponse> {
        self.ready.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteTicket;

    #[test]
    fn samples_from_start_to_end() {
        let routes = LinearRoutes::new(100.0, 10.0);
        let from = LatLng::new(14.7167, -17.4677);
        let to = from.offset(0.01, 0.0);
        let route = routes.route(from, to);

        assert_eq!(route.points.first(), Some(&from));
        assert_eq!(route.points.last(), Some(&to));
        // ~1.1 km at 100 m spacing
        assert_eq!(route.points.len(), 13);
        assert!((route.duration_s - route.distance_m / 10.0).abs() < 1e-9);
    }

    #[test]
    fn identical_endpoints_still_yield_a_path() {
        let routes = LinearRoutes::new(25.0, 8.0);
        let here = LatLng::new(1.0, 1.0);
        assert_eq!(routes.route(here, here).points, vec![here, here]);
    }

    #[test]
    fn long_trips_are_capped() {
        let routes = LinearRoutes::new(1.0, 8.0);
        let dakar = LatLng::new(14.7167, -17.4677);
        let paris = LatLng::new(48.8566, 2.3522);
        let route = routes.route(dakar, paris);

        assert_eq!(route.points.len(), MAX_LINEAR_STEPS + 1);
        assert_eq!(route.points.last(), Some(&paris));
        assert!(route.distance_m > 4_000_000.0);
    }

    #[test]
    fn answers_on_next_poll() {
        let mut routes = LinearRoutes::new(25.0, 8.0);
        let from = LatLng::new(0.0, 0.0);
        routes.request(RouteRequest {
            ticket: RouteTicket(7),
            from,
            to: from.offset(0.001, 0.001),
        });

        let responses = routes.poll();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].ticket, RouteTicket(7));
        assert!(responses[0].result.is_ok());
        assert!(routes.poll().is_empty());
    }
}
