//! The marker surface the simulator draws on

use std::collections::BTreeMap;

use super::types::{LatLng, MarkerId};

/// Minimal map widget contract: the simulator only places, moves and removes markers.
pub trait MapView {
    fn add_marker(&mut self, at: LatLng) -> MarkerId;
    fn move_marker(&mut self, id: MarkerId, at: LatLng);
    fn remove_marker(&mut self, id: MarkerId);
}

/// In-memory marker layer shared by the headless runner and the UI
///
/// Front-ends read positions from here and render them however they like.
#[derive(Debug, Default)]
pub struct MarkerLayer {
    markers: BTreeMap<MarkerId, LatLng>,
    next_id: u64,
}

impl MarkerLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: MarkerId) -> Option<LatLng> {
        self.markers.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MarkerId, LatLng)> + '_ {
        self.markers.iter().map(|(id, pos)| (*id, *pos))
    }
}

impl MapView for MarkerLayer {
    fn add_marker(&mut self, at: LatLng) -> MarkerId {
        let id = MarkerId(self.next_id);
        self.next_id += 1;
        self.markers.insert(id, at);
        id
    }

    fn move_marker(&mut self, id: MarkerId, at: LatLng) {
        if let Some(pos) = self.markers.get_mut(&id) {
            *pos = at;
        }
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.markers.remove(&id);
    }
}
