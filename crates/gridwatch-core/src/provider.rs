//! The consumed rating-provider interface.
//!
//! The IEEE-738 thermal physics lives outside this core; the agent only
//! sees a deterministic, side-effect-free function from weather parameters
//! to per-line ratings.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::LineLoading;

/// Weather parameters for one rating computation.
///
/// Field names and defaults follow the IEEE-738 solver's input set, so
/// partially specified request bodies fill in the standard assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherParams {
    /// Ambient temperature, °C.
    #[serde(default = "default_ambient_temp")]
    pub ambient_temp_c: f64,
    /// Wind speed, ft/s.
    #[serde(default = "default_wind_speed")]
    pub wind_speed_ft_s: f64,
    /// Wind angle relative to the conductor, degrees.
    #[serde(default = "default_wind_angle")]
    pub wind_angle_deg: f64,
    /// Local sun time, hours.
    #[serde(default = "default_sun_time")]
    pub sun_time_hour: f64,
    /// Calendar date used for solar position, e.g. "12 Jun".
    #[serde(default = "default_date")]
    pub date: String,
    /// Conductor emissivity.
    #[serde(default = "default_emissivity")]
    pub emissivity: f64,
    /// Conductor solar absorptivity.
    #[serde(default = "default_emissivity")]
    pub absorptivity: f64,
    /// Line orientation.
    #[serde(default = "default_direction")]
    pub direction: String,
    /// Atmosphere clarity.
    #[serde(default = "default_atmosphere")]
    pub atmosphere: String,
    /// Elevation above sea level, ft.
    #[serde(default = "default_elevation")]
    pub elevation_ft: f64,
    /// Latitude, degrees.
    #[serde(default = "default_latitude")]
    pub latitude_deg: f64,
}

fn default_ambient_temp() -> f64 {
    25.0
}

fn default_wind_speed() -> f64 {
    2.0
}

fn default_wind_angle() -> f64 {
    90.0
}

fn default_sun_time() -> f64 {
    12.0
}

fn default_date() -> String {
    "12 Jun".to_string()
}

fn default_emissivity() -> f64 {
    0.8
}

fn default_direction() -> String {
    "EastWest".to_string()
}

fn default_atmosphere() -> String {
    "Clear".to_string()
}

fn default_elevation() -> f64 {
    1000.0
}

fn default_latitude() -> f64 {
    27.0
}

impl Default for WeatherParams {
    fn default() -> Self {
        Self {
            ambient_temp_c: default_ambient_temp(),
            wind_speed_ft_s: default_wind_speed(),
            wind_angle_deg: default_wind_angle(),
            sun_time_hour: default_sun_time(),
            date: default_date(),
            emissivity: default_emissivity(),
            absorptivity: default_emissivity(),
            direction: default_direction(),
            atmosphere: default_atmosphere(),
            elevation_ft: default_elevation(),
            latitude_deg: default_latitude(),
        }
    }
}

/// One entry of an ordered weather forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    /// When this weather case applies.
    pub timestamp: DateTime<Utc>,
    /// Forecast weather parameters.
    #[serde(default)]
    pub weather: WeatherParams,
}

/// Rating provider failure.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Required line or conductor data is missing.
    #[error("missing data: {0}")]
    MissingData(String),

    /// The rating computation failed for the given weather case.
    #[error("computation failed: {0}")]
    Computation(String),
}

impl From<ProviderError> for crate::error::Error {
    fn from(e: ProviderError) -> Self {
        crate::error::Error::Provider(e.to_string())
    }
}

/// Computes per-line ratings, flows and loading for a weather case.
///
/// Implementations wrap the external IEEE-738 solver. Assumed
/// deterministic and side-effect-free: identical weather yields identical
/// ratings.
#[async_trait]
pub trait RatingProvider: Send + Sync {
    /// Compute ratings for every monitored line under the given weather.
    async fn compute_ratings(
        &self,
        weather: &WeatherParams,
    ) -> Result<HashMap<String, LineLoading>, ProviderError>;
}
