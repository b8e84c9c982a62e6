//! One-shot lookup of the user's position
//!
//! Uses an IP geolocation service; accuracy is city-level at best, which is all the
//! simulation needs to pick a center.

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};
use serde::Deserialize;
use std::time::Duration;

use crate::settings::LocationSettings;
use crate::simulation::LatLng;

#[derive(Debug, Deserialize)]
struct GeoResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    region: Option<String>,
}

/// A resolved position and a human-readable place name
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub position: LatLng,
    pub name: String,
}

fn parse_location(body: &str) -> Result<Located> {
    let geo: GeoResponse =
        serde_json::from_str(body).context("Unreadable geolocation response")?;

    let (Some(lat), Some(lng)) = (geo.latitude, geo.longitude) else {
        bail!("Geolocation response has no coordinates");
    };

    let name = format!(
        "{}{}",
        geo.city.unwrap_or_default(),
        geo.region.map(|r| format!(", {}", r)).unwrap_or_default()
    );

    Ok(Located {
        position: LatLng::new(lat, lng),
        name,
    })
}

/// Look up the current position from the caller's IP address
pub fn locate(url: &str, timeout: Duration) -> Result<Located> {
    let agent = ureq::AgentBuilder::new().timeout(timeout).build();
    let body = agent
        .get(url)
        .call()
        .map_err(|e| anyhow!("Geolocation request to {} failed: {}", url, e))?
        .into_string()
        .context("Failed to read geolocation response")?;
    parse_location(&body)
}

/// Pick the simulation center: explicit setting, then geolocation, then the default
pub fn resolve_center(settings: &LocationSettings) -> LatLng {
    if let Some(center) = settings.center {
        return center;
    }

    if !settings.geolocate {
        return settings.default_center;
    }

    match locate(
        &settings.geolocation_url,
        Duration::from_secs(settings.timeout_secs),
    ) {
        Ok(located) => {
            info!("Located at {} ({})", located.position, located.name);
            located.position
        }
        Err(e) => {
            warn!(
                "Geolocation failed ({:#}); falling back to {}",
                e, settings.default_center
            );
            settings.default_center
        }
    }
}
