//! UI components and resources for linking Bevy entities to simulation state

use bevy::prelude::*;
use std::collections::HashMap;

use crate::routing::{RouteBackend, RouteRequest, RouteService, RouteTicket};
use crate::simulation::{LatLng, MarkerId};
use crate::TrafficSimulator;

/// Resource wrapper for the simulator
#[derive(Resource)]
pub struct SimulatorResource(pub TrafficSimulator);

/// Maps geographic coordinates onto the 2D world plane
///
/// Equirectangular around a fixed origin, which is plenty for a few kilometers.
#[derive(Resource, Debug, Clone, Copy)]
pub struct MapProjection {
    pub origin: LatLng,
    pub pixels_per_degree: f32,
}

impl MapProjection {
    pub fn new(origin: LatLng) -> Self {
        Self {
            origin,
            pixels_per_degree: 30_000.0,
        }
    }

    fn lng_scale(&self) -> f32 {
        (self.origin.lat.to_radians().cos() as f32).max(0.01)
    }

    pub fn to_world(&self, p: LatLng) -> Vec2 {
        Vec2::new(
            (p.lng - self.origin.lng) as f32 * self.lng_scale() * self.pixels_per_degree,
            (p.lat - self.origin.lat) as f32 * self.pixels_per_degree,
        )
    }

    pub fn to_lat_lng(&self, v: Vec2) -> LatLng {
        LatLng::new(
            self.origin.lat + (v.y / self.pixels_per_degree) as f64,
            self.origin.lng + (v.x / (self.lng_scale() * self.pixels_per_degree)) as f64,
        )
    }
}

/// The user's own position and the route they last asked for
#[derive(Resource)]
pub struct UserRoute {
    pub router: RouteBackend,
    pub position: LatLng,
    pub destination: Option<LatLng>,
    pub path: Vec<LatLng>,
    /// Only the newest request counts; older answers are dropped
    pub pending: Option<RouteTicket>,
    next_ticket: u64,
}

impl UserRoute {
    pub fn new(router: RouteBackend, position: LatLng) -> Self {
        Self {
            router,
            position,
            destination: None,
            path: Vec::new(),
            pending: None,
            next_ticket: 0,
        }
    }

    /// Replace the current route with one to `destination`
    pub fn route_to(&mut self, destination: LatLng) {
        let ticket = RouteTicket(self.next_ticket);
        self.next_ticket += 1;

        self.destination = Some(destination);
        self.path.clear();
        self.pending = Some(ticket);
        self.router.request(RouteRequest {
            ticket,
            from: self.position,
            to: destination,
        });
    }

    /// Move the user, re-routing to the current destination if there is one
    pub fn move_to(&mut self, position: LatLng) {
        self.position = position;
        if let Some(destination) = self.destination {
            self.route_to(destination);
        }
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Marker component for the user's position
#[derive(Component)]
pub struct UserMarker;

/// Marker component for the status line
#[derive(Component)]
pub struct StatusText;

/// Links a Bevy entity to a marker in the simulator's marker layer
#[derive(Component)]
pub struct MarkerLink(pub MarkerId);

/// Resource to track Bevy entities mapped to simulation markers
#[derive(Resource, Default)]
pub struct MarkerMappings {
    pub markers: HashMap<MarkerId, Entity>,
}

/// Resource to control camera movement settings
#[derive(Resource)]
pub struct CameraSettings {
    pub movement_speed: f32,
    pub zoom_speed: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            movement_speed: 400.0,
            zoom_speed: 1.5,
        }
    }
}
