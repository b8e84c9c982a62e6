//! A simulated "nearby user" moving along fetched routes
//!
//! Standalone implementation that doesn't depend on Bevy.

use std::time::Instant;

use super::types::{LatLng, MarkerId, UnitId};

/// Where a unit stands with respect to the routing service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    /// No request outstanding
    Ready,
    /// Exactly one request outstanding
    InFlight,
    /// The last request failed; ask again at the given instant
    RetryScheduled(Instant),
    /// Retry cap reached, the unit stays put
    Abandoned,
}

/// Result of stepping a unit by one path point
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepResult {
    /// Nothing to do: no path yet, already at the end, or waiting on the router
    Idle,
    /// Moved to the given point, more points remain
    Moved(LatLng),
    /// Moved onto the final point of the path
    Arrived(LatLng),
}

#[derive(Debug, Clone)]
pub struct SimUnit {
    pub id: UnitId,
    pub marker: MarkerId,
    pub position: LatLng,
    /// Fixed point destinations are randomized around
    pub anchor: LatLng,
    pub path: Vec<LatLng>,
    /// Always within `0..=path.len()`
    pub path_index: usize,
    pub route: RouteState,
    /// Consecutive failed route requests
    pub failures: u32,
}

impl SimUnit {
    pub fn new(id: UnitId, marker: MarkerId, position: LatLng, anchor: LatLng) -> Self {
        Self {
            id,
            marker,
            position,
            anchor,
            path: Vec::new(),
            path_index: 0,
            route: RouteState::Ready,
            failures: 0,
        }
    }

    /// True once every point of the current path has been visited
    pub fn has_arrived(&self) -> bool {
        self.path_index >= self.path.len()
    }

    /// Replace the path with a freshly fetched one and start from its first point
    pub fn set_path(&mut self, path: Vec<LatLng>) {
        self.path = path;
        self.path_index = 0;
        self.route = RouteState::Ready;
        self.failures = 0;
    }

    /// Advance one point along the path
    pub fn step(&mut self) -> StepResult {
        if self.route != RouteState::Ready || self.has_arrived() {
            return StepResult::Idle;
        }

        let next = self.path[self.path_index];
        self.position = next;
        self.path_index += 1;

        if self.has_arrived() {
            StepResult::Arrived(next)
        } else {
            StepResult::Moved(next)
        }
    }
}
