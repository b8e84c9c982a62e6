//! Client for the OSRM HTTP route API

use log::{debug, warn};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::{RouteError, RouteRequest, RouteResponse, RouteService};
use crate::settings::RoutingSettings;
use crate::simulation::{path_length_m, LatLng, Route};

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

/// GeoJSON line string; OSRM orders each pair as `[lng, lat]`
#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

impl OsrmResponse {
    fn into_route(self) -> Result<Route, RouteError> {
        if self.code != "Ok" {
            return Err(RouteError::Service {
                message: self.message.unwrap_or_default(),
                code: self.code,
            });
        }

        let route = self.routes.into_iter().next().ok_or(RouteError::NoRoute)?;
        let points: Vec<LatLng> = route
            .geometry
            .coordinates
            .into_iter()
            .map(|[lng, lat]| LatLng::new(lat, lng))
            .collect();

        if points.is_empty() {
            return Err(RouteError::NoRoute);
        }

        // Some OSRM builds leave distance out of trimmed responses
        let distance_m = if route.distance > 0.0 {
            route.distance
        } else {
            path_length_m(&points)
        };

        Ok(Route {
            points,
            distance_m,
            duration_s: route.duration,
        })
    }
}

/// Blocking OSRM client
#[derive(Clone)]
pub struct OsrmClient {
    agent: ureq::Agent,
    service_url: String,
    profile: String,
}

impl OsrmClient {
    pub fn new(service_url: &str, profile: &str, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            service_url: service_url.trim_end_matches('/').to_string(),
            profile: profile.to_string(),
        }
    }

    pub fn from_settings(settings: &RoutingSettings) -> Self {
        Self::new(
            &settings.service_url,
            &settings.profile,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn route_url(&self, from: LatLng, to: LatLng) -> String {
        format!(
            "{}/{}/{:.6},{:.6};{:.6},{:.6}?overview=full&geometries=geojson",
            self.service_url, self.profile, from.lng, from.lat, to.lng, to.lat
        )
    }

    /// Fetch a driving route between two points
    pub fn route(&self, from: LatLng, to: LatLng) -> Result<Route, RouteError> {
        let url = self.route_url(from, to);
        debug!("GET {}", url);

        // OSRM reports NoRoute and friends as 400 with a JSON body worth reading
        let response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(e) => return Err(RouteError::Transport(e.to_string())),
        };

        let response: OsrmResponse = response
            .into_json()
            .map_err(|e| RouteError::Decode(e.to_string()))?;
        response.into_route()
    }
}

/// Runs each OSRM request on a worker thread and collects the answers
pub struct OsrmService {
    client: OsrmClient,
    inbox: Arc<Mutex<Vec<RouteResponse>>>,
}

impl OsrmService {
    pub fn new(client: OsrmClient) -> Self {
        Self {
            client,
            inbox: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

fn deliver(inbox: &Mutex<Vec<RouteResponse>>, response: RouteResponse) {
    match inbox.lock() {
        Ok(mut pending) => pending.push(response),
        Err(poisoned) => poisoned.into_inner().push(response),
    }
}

impl RouteService for OsrmService {
    fn request(&mut self, request: RouteRequest) {
        let client = self.client.clone();
        let inbox = Arc::clone(&self.inbox);
        let ticket = request.ticket;

        let spawned = thread::Builder::new()
            .name("osrm-route".to_string())
            .spawn(move || {
                let result = client.route(request.from, request.to);
                deliver(&inbox, RouteResponse { ticket, result });
            });

        if let Err(e) = spawned {
            warn!("Could not spawn routing worker: {}", e);
            deliver(
                &self.inbox,
                RouteResponse {
                    ticket,
                    result: Err(RouteError::Transport(e.to_string())),
                },
            );
        }
    }

    fn poll(&mut self) -> Vec<RouteResponse> {
        match self.inbox.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}
