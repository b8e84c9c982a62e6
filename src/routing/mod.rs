//! Route fetching
//!
//! Route services are asynchronous from the caller's point of view: `request` returns
//! immediately and completed routes are collected with `poll`. Each request carries a
//! ticket so responses can be matched back to whoever asked, or dropped if that
//! requester is gone.

mod linear;
mod osrm;

use clap::ValueEnum;
use serde::Deserialize;
use thiserror::Error;

use crate::settings::RoutingSettings;
use crate::simulation::{LatLng, Route};

pub use linear::LinearRoutes;
pub use osrm::{OsrmClient, OsrmService};

/// Identifies a request so its response can be paired with the requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteTicket(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub ticket: RouteTicket,
    pub from: LatLng,
    pub to: LatLng,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteResponse {
    pub ticket: RouteTicket,
    pub result: Result<Route, RouteError>,
}

/// Why no path came back from the routing service
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RouteError {
    #[error("routing request failed: {0}")]
    Transport(String),
    #[error("routing service answered {code}: {message}")]
    Service { code: String, message: String },
    #[error("routing service returned no route")]
    NoRoute,
    #[error("malformed routing response: {0}")]
    Decode(String),
}

pub trait RouteService {
    /// Submit a request; the answer shows up in a later `poll`
    fn request(&mut self, request: RouteRequest);

    /// Drain every response that completed since the last call
    fn poll(&mut self) -> Vec<RouteResponse>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Public OSRM HTTP API
    #[default]
    Osrm,
    /// Offline straight-line paths
    Linear,
}

/// Route backend selected at startup
pub enum RouteBackend {
    Osrm(OsrmService),
    Linear(LinearRoutes),
}

impl RouteBackend {
    pub fn from_settings(settings: &RoutingSettings) -> Self {
        match settings.backend {
            BackendKind::Osrm => RouteBackend::Osrm(OsrmService::new(OsrmClient::from_settings(
                settings,
            ))),
            BackendKind::Linear => RouteBackend::Linear(LinearRoutes::from_settings(settings)),
        }
    }
}

impl RouteService for RouteBackend {
    fn request(&mut self, request: RouteRequest) {
        match self {
            RouteBackend::Osrm(service) => service.request(request),
            RouteBackend::Linear(service) => service.request(request),
        }
    }

    fn poll(&mut self) -> Vec<RouteResponse> {
        match self {
            RouteBackend::Osrm(service) => service.poll(),
            RouteBackend::Linear(service) => service.poll(),
        }
    }
}
