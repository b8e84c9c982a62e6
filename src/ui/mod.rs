//! UI module that visualizes the simulation state using Bevy
//!
//! This module is purely for visualization and input - all simulation logic is in the
//! `simulation` module. The UI reads unit markers from the simulator's marker layer
//! and renders them as 2D circles on a flat projection around the starting center.

mod components;
mod input;
mod sync;
mod world;

use bevy::prelude::*;
use std::time::Duration;

use crate::routing::RouteBackend;
use crate::settings::Settings;
use crate::simulation::LatLng;

pub use components::{MapProjection, MarkerMappings, SimulatorResource, UserRoute};

use components::CameraSettings;
use input::{handle_camera_movement, handle_input, handle_map_clicks};
use sync::{
    draw_routes, poll_user_route, sync_markers, sync_user_marker, tick_simulation,
    update_status_text,
};
use world::{setup_world, start_simulation};

/// Plugin to register all UI systems
pub struct NearbyTrafficUiPlugin {
    pub settings: Settings,
    /// Starting position of the user and of the simulation
    pub center: LatLng,
}

impl Plugin for NearbyTrafficUiPlugin {
    fn build(&self, app: &mut App) {
        let frame_interval = self
            .settings
            .sim_config()
            .frame_interval
            .max(Duration::from_millis(1));

        app.insert_resource(SimulatorResource(crate::build_simulator(&self.settings)))
            .insert_resource(UserRoute::new(
                RouteBackend::from_settings(&self.settings.routing),
                self.center,
            ))
            .insert_resource(MapProjection::new(self.center))
            .insert_resource(ClearColor(Color::srgb(0.09, 0.11, 0.14)))
            .insert_resource(Time::<Fixed>::from_duration(frame_interval))
            .init_resource::<MarkerMappings>()
            .init_resource::<CameraSettings>()
            .add_systems(Startup, (setup_world, start_simulation.after(setup_world)))
            .add_systems(FixedUpdate, tick_simulation)
            .add_systems(
                Update,
                (
                    sync_markers,
                    sync_user_marker,
                    poll_user_route,
                    draw_routes,
                    update_status_text,
                    handle_input,
                    handle_camera_movement,
                    handle_map_clicks,
                ),
            );
    }
}
