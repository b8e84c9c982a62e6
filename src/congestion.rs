//! Rule-based traffic level estimate
//!
//! Rates a road as Low, Medium or High traffic from the hour, the day of the week, the
//! road type and the weather. An observed average speed, when known, replaces the
//! expected one.

use clap::ValueEnum;
use std::fmt;
use thiserror::Error;

/// Weekday rush hours, inclusive
pub const MORNING_PEAK: (u8, u8) = (7, 9);
pub const EVENING_PEAK: (u8, u8) = (16, 19);

/// Share of the free-flow speed lost during rush hour
pub const PEAK_SLOWDOWN: f64 = 0.55;
/// Share of the free-flow speed lost in rain or fog
pub const WEATHER_SLOWDOWN: f64 = 0.2;
pub const MIN_SPEED_KMH: f64 = 5.0;

/// Below this fraction of the free-flow speed traffic is High
pub const HIGH_SPEED_RATIO: f64 = 0.4;
/// Below this fraction of the free-flow speed traffic is Medium
pub const MEDIUM_SPEED_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn is_weekend(self) -> bool {
        matches!(self, Weekday::Saturday | Weekday::Sunday)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RoadType {
    Highway,
    #[default]
    Urban,
    Residential,
}

impl RoadType {
    /// Free-flow speed in km/h
    pub fn base_speed_kmh(self) -> f64 {
        match self {
            RoadType::Highway => 100.0,
            RoadType::Urban => 50.0,
            RoadType::Residential => 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Weather {
    #[default]
    Sunny,
    Cloudy,
    Rainy,
    Foggy,
}

impl Weather {
    pub fn slows_traffic(self) -> bool {
        matches!(self, Weather::Rainy | Weather::Foggy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrafficLevel {
    Low,
    Medium,
    High,
}

impl TrafficLevel {
    /// Advice shown next to the level
    pub fn recommendation(self) -> &'static str {
        match self {
            TrafficLevel::Low => "Main route recommended.",
            TrafficLevel::Medium => "Moderate traffic. Watch for updates.",
            TrafficLevel::High => "Heavy traffic. Consider taking secondary roads.",
        }
    }
}

impl fmt::Display for TrafficLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrafficLevel::Low => "Low",
            TrafficLevel::Medium => "Medium",
            TrafficLevel::High => "High",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conditions {
    /// Hour of day, 0-23
    pub hour: u8,
    pub day: Weekday,
    pub road: RoadType,
    pub weather: Weather,
}

impl Conditions {
    pub fn is_peak(&self) -> bool {
        let in_window = |(start, end): (u8, u8)| (start..=end).contains(&self.hour);
        !self.day.is_weekend() && (in_window(MORNING_PEAK) || in_window(EVENING_PEAK))
    }

    /// Average speed to expect with no measurement at hand
    pub fn expected_speed_kmh(&self) -> f64 {
        let mut factor = 1.0;
        if self.is_peak() {
            factor -= PEAK_SLOWDOWN;
        }
        if self.weather.slows_traffic() {
            factor -= WEATHER_SLOWDOWN;
        }
        (self.road.base_speed_kmh() * factor).max(MIN_SPEED_KMH)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub level: TrafficLevel,
    /// Speed the level was derived from, observed or expected
    pub speed_kmh: f64,
    pub peak: bool,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EstimateError {
    #[error("hour must be between 0 and 23, got {0}")]
    Hour(u8),
    #[error("average speed must be a non-negative number, got {0}")]
    Speed(f64),
}

/// Rate the traffic for `conditions`, optionally from an observed average speed
pub fn estimate(
    conditions: &Conditions,
    observed_speed_kmh: Option<f64>,
) -> Result<Estimate, EstimateError> {
    if conditions.hour > 23 {
        return Err(EstimateError::Hour(conditions.hour));
    }
    let speed_kmh = match observed_speed_kmh {
        Some(speed) if !speed.is_finite() || speed < 0.0 => {
            return Err(EstimateError::Speed(speed))
        }
        Some(speed) => speed,
        None => conditions.expected_speed_kmh(),
    };

    let peak = conditions.is_peak();
    let base = conditions.road.base_speed_kmh();
    let level = if peak || speed_kmh < base * HIGH_SPEED_RATIO {
        TrafficLevel::High
    } else if speed_kmh < base * MEDIUM_SPEED_RATIO {
        TrafficLevel::Medium
    } else {
        TrafficLevel::Low
    };

    Ok(Estimate {
        level,
        speed_kmh,
        peak,
    })
}
