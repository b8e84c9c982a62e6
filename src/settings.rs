//! File-backed settings
//!
//! Every field has a default so a missing or partial config file is fine. The CLI
//! overrides individual values after loading.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::routing::BackendKind;
use crate::simulation::{LatLng, SimConfig, DEFAULT_CENTER};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub simulation: SimulationSettings,
    pub routing: RoutingSettings,
    pub location: LocationSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub unit_count: usize,
    /// Full width, in degrees, of the box units start in
    pub start_spread: f64,
    /// Full width, in degrees, of the box destinations are drawn from
    pub destination_spread: f64,
    pub frame_interval_ms: u64,
    pub retry_delay_ms: u64,
    /// A unit gives up on its Nth consecutive failure; unset retries forever. Must be at
    /// least 1.
    pub retry_limit: Option<u32>,
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            unit_count: 8,
            start_spread: 0.01,
            destination_spread: 0.02,
            frame_interval_ms: 100,
            retry_delay_ms: 5000,
            retry_limit: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    pub backend: BackendKind,
    pub service_url: String,
    pub profile: String,
    pub timeout_secs: u64,
    pub linear_step_m: f64,
    pub linear_speed_mps: f64,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Osrm,
            service_url: "https://router.project-osrm.org/route/v1".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 10,
            linear_step_m: 25.0,
            linear_speed_mps: 8.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    /// Fixed center; skips geolocation when set
    pub center: Option<LatLng>,
    pub default_center: LatLng,
    pub geolocate: bool,
    pub geolocation_url: String,
    pub timeout_secs: u64,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            center: None,
            default_center: DEFAULT_CENTER,
            geolocate: true,
            geolocation_url: "https://ipapi.co/json/".to_string(),
            timeout_secs: 5,
        }
    }
}

impl Settings {
    /// Load from an explicit path, or from the default location if it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = Self::config_path();
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)?;
        if settings.simulation.retry_limit == Some(0) {
            bail!("simulation.retry_limit must be at least 1; leave it unset to retry forever");
        }
        Ok(settings)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nearby_traffic")
            .join("config.toml")
    }

    pub fn sim_config(&self) -> SimConfig {
        let sim = &self.simulation;
        SimConfig {
            unit_count: sim.unit_count,
            start_spread: sim.start_spread,
            destination_spread: sim.destination_spread,
            frame_interval: Duration::from_millis(sim.frame_interval_ms),
            retry_delay: Duration::from_millis(sim.retry_delay_ms),
            retry_limit: sim.retry_limit,
        }
    }
}
