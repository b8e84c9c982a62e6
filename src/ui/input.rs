//! Input handling systems

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use super::components::{CameraSettings, MainCamera, MapProjection, SimulatorResource, UserRoute};

/// Handle basic keyboard input
pub fn handle_input(keyboard: Res<ButtonInput<KeyCode>>, mut exit: MessageWriter<AppExit>) {
    if keyboard.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}

/// Pan with WASD, zoom with Z/X
pub fn handle_camera_movement(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    settings: Res<CameraSettings>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    let Ok(mut transform) = camera_query.single_mut() else {
        return;
    };

    let mut direction = Vec2::ZERO;
    if keyboard.pressed(KeyCode::KeyW) {
        direction.y += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyS) {
        direction.y -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyA) {
        direction.x -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) {
        direction.x += 1.0;
    }

    // Pan faster when zoomed out
    let zoom = transform.scale.x;
    let step = direction.normalize_or_zero() * settings.movement_speed * zoom * time.delta_secs();
    transform.translation += step.extend(0.0);

    let mut zoom_factor = 1.0;
    if keyboard.pressed(KeyCode::KeyZ) {
        zoom_factor /= 1.0 + settings.zoom_speed * time.delta_secs();
    }
    if keyboard.pressed(KeyCode::KeyX) {
        zoom_factor *= 1.0 + settings.zoom_speed * time.delta_secs();
    }
    let scale = (zoom * zoom_factor).clamp(0.1, 10.0);
    transform.scale = Vec3::new(scale, scale, 1.0);
}

/// Left click routes to the clicked point; right click moves the user there
pub fn handle_map_clicks(
    mouse: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    camera_query: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    projection: Res<MapProjection>,
    mut user_route: ResMut<UserRoute>,
    mut sim: ResMut<SimulatorResource>,
) {
    let left = mouse.just_pressed(MouseButton::Left);
    let right = mouse.just_pressed(MouseButton::Right);
    if !left && !right {
        return;
    }

    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };
    let Ok(world_pos) = camera.viewport_to_world_2d(camera_transform, cursor) else {
        return;
    };

    let clicked = projection.to_lat_lng(world_pos);
    if left {
        info!("Routing from {} to {}", user_route.position, clicked);
        user_route.route_to(clicked);
    } else {
        info!("Moving to {}, restarting nearby traffic", clicked);
        user_route.move_to(clicked);
        sim.0.start(clicked);
    }
}
