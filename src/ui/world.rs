//! World setup systems for camera, user marker and status line

use bevy::prelude::*;

use super::components::{
    MainCamera, MapProjection, SimulatorResource, StatusText, UserMarker, UserRoute,
};

pub const USER_MARKER_RADIUS: f32 = 10.0;
pub const USER_MARKER_COLOR: Color = Color::srgb(0.22, 0.74, 0.97);

/// System to setup the world environment (camera, user marker, status line)
pub fn setup_world(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    projection: Res<MapProjection>,
    user_route: Res<UserRoute>,
) {
    commands.spawn((MainCamera, Camera2d));

    let pos = projection.to_world(user_route.position);
    commands.spawn((
        UserMarker,
        Mesh2d(meshes.add(Circle::new(USER_MARKER_RADIUS))),
        MeshMaterial2d(materials.add(USER_MARKER_COLOR)),
        Transform::from_xyz(pos.x, pos.y, 2.0),
    ));

    commands.spawn((
        StatusText,
        Text::new("Starting..."),
        TextFont {
            font_size: 16.0,
            ..default()
        },
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(10.0),
            left: Val::Px(10.0),
            ..default()
        },
    ));
}

/// System to seed the simulation around the user's starting position
pub fn start_simulation(mut sim: ResMut<SimulatorResource>, user_route: Res<UserRoute>) {
    sim.0.start(user_route.position);
}
