//! Systems for syncing Bevy entities with simulation state

use bevy::prelude::*;
use std::time::Instant;

use super::components::{
    MapProjection, MarkerLink, MarkerMappings, SimulatorResource, StatusText, UserMarker,
    UserRoute,
};
use crate::routing::RouteService;

const UNIT_MARKER_RADIUS: f32 = 6.0;
const UNIT_MARKER_COLOR: Color = Color::srgb(0.94, 0.27, 0.27);
const UNIT_PATH_COLOR: Color = Color::srgba(0.94, 0.27, 0.27, 0.35);
const USER_ROUTE_COLOR: Color = Color::srgb(0.22, 0.74, 0.97);

/// System to run simulation tick
pub fn tick_simulation(mut sim: ResMut<SimulatorResource>) {
    sim.0.tick(Instant::now());
}

/// System to sync unit marker visuals from the simulator's marker layer
pub fn sync_markers(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    sim: Res<SimulatorResource>,
    projection: Res<MapProjection>,
    mut mappings: ResMut<MarkerMappings>,
    mut marker_query: Query<(Entity, &MarkerLink, &mut Transform)>,
) {
    let layer = sim.0.map();

    // Update existing markers, despawn the ones the simulator removed
    for (entity, link, mut transform) in marker_query.iter_mut() {
        if let Some(pos) = layer.get(link.0) {
            transform.translation = projection.to_world(pos).extend(1.0);
        } else {
            commands.entity(entity).despawn();
            mappings.markers.remove(&link.0);
        }
    }

    // Spawn new markers
    for (id, pos) in layer.iter() {
        if mappings.markers.contains_key(&id) {
            continue;
        }
        let entity = commands
            .spawn((
                MarkerLink(id),
                Mesh2d(meshes.add(Circle::new(UNIT_MARKER_RADIUS))),
                MeshMaterial2d(materials.add(UNIT_MARKER_COLOR)),
                Transform::from_translation(projection.to_world(pos).extend(1.0)),
            ))
            .id();
        mappings.markers.insert(id, entity);
    }
}

/// System to keep the user marker at the user's position
pub fn sync_user_marker(
    user_route: Res<UserRoute>,
    projection: Res<MapProjection>,
    mut query: Query<&mut Transform, With<UserMarker>>,
) {
    for mut transform in query.iter_mut() {
        transform.translation = projection.to_world(user_route.position).extend(2.0);
    }
}

/// System to collect the answer to the user's route request
pub fn poll_user_route(mut user_route: ResMut<UserRoute>) {
    let user_route = &mut *user_route;

    for response in user_route.router.poll() {
        if user_route.pending != Some(response.ticket) {
            continue;
        }
        user_route.pending = None;

        match response.result {
            Ok(route) => {
                info!(
                    "Route ready: {} points, {:.2} km, ~{:.0} min",
                    route.points.len(),
                    route.distance_m / 1000.0,
                    route.duration_s / 60.0
                );
                user_route.path = route.points;
            }
            Err(e) => warn!("Route to destination failed: {}", e),
        }
    }
}

/// System to draw the user's route and the road ahead of each unit
pub fn draw_routes(
    mut gizmos: Gizmos,
    sim: Res<SimulatorResource>,
    user_route: Res<UserRoute>,
    projection: Res<MapProjection>,
) {
    for unit in sim.0.units() {
        let ahead = unit
            .path
            .get(unit.path_index.saturating_sub(1)..)
            .unwrap_or_default();
        if ahead.len() >= 2 {
            gizmos.linestrip_2d(
                ahead.iter().map(|p| projection.to_world(*p)),
                UNIT_PATH_COLOR,
            );
        }
    }

    if user_route.path.len() >= 2 {
        gizmos.linestrip_2d(
            user_route.path.iter().map(|p| projection.to_world(*p)),
            USER_ROUTE_COLOR,
        );
    }
}

/// System to update the status line
pub fn update_status_text(
    sim: Res<SimulatorResource>,
    user_route: Res<UserRoute>,
    mut text_query: Query<&mut Text, With<StatusText>>,
) {
    let sim = &sim.0;
    let route_status = match (user_route.pending, user_route.destination) {
        (Some(_), _) => "routing...".to_string(),
        (None, Some(destination)) if !user_route.path.is_empty() => {
            format!("to {}", destination)
        }
        (None, Some(_)) => "no route".to_string(),
        (None, None) => "click the map to route".to_string(),
    };

    for mut text in text_query.iter_mut() {
        **text = format!(
            "Units: {} | Waiting on router: {} | Arrivals: {} | Failures: {}\nYou: {} | Route: {}",
            sim.units().len(),
            sim.pending_requests(),
            sim.stats.arrivals,
            sim.stats.route_failures,
            user_route.position,
            route_status
        );
    }
}
