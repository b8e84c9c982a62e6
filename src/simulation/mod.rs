//! Standalone traffic simulation module
//!
//! This module contains the simulated "nearby users" logic. It runs independently
//! of the Bevy game engine and talks to the outside world only through the
//! [`MapView`] and [`crate::routing::RouteService`] traits, so it can be tested
//! from the console with scripted implementations of both.

mod map;
mod simulator;
mod types;
mod unit;

pub use map::{MapView, MarkerLayer};
pub use simulator::{SimConfig, SimStats, Simulator};
pub use types::{
    path_length_m, LatLng, MarkerId, ParseLatLngError, Route, UnitId, DEFAULT_CENTER,
    EARTH_RADIUS_M,
};
pub use unit::{RouteState, SimUnit, StepResult};
