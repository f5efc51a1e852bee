use serde::{Deserialize, Serialize};

use crate::format::IconKey;

/// A single position fix in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Unit system requested from the weather API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Metric, Units::Imperial, Units::Standard]
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            "standard" => Ok(Units::Standard),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: metric, imperial, standard."
            )),
        }
    }
}

/// Weather payload as returned by the `2.5/weather` endpoint.
///
/// Field names follow the domain; serde renames map them onto the wire
/// names (`weather`, `main`, `sys`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherPayload {
    #[serde(rename = "weather")]
    pub conditions: Vec<Condition>,
    #[serde(rename = "main")]
    pub measurements: Measurements,
    pub wind: Wind,
    #[serde(rename = "sys")]
    pub sun: SunInfo,
}

impl WeatherPayload {
    /// The condition shown on screen. Later entries are tolerated but not displayed.
    pub fn primary_condition(&self) -> Option<&Condition> {
        self.conditions.first()
    }

    pub fn country_code(&self) -> &str {
        &self.sun.country
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "main")]
    pub main_category: String,
    pub description: String,
    #[serde(rename = "icon")]
    pub icon_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    #[serde(rename = "temp")]
    pub temperature: f64,
    #[serde(rename = "temp_min")]
    pub min_temperature: f64,
    #[serde(rename = "temp_max")]
    pub max_temperature: f64,
    #[serde(rename = "humidity")]
    pub humidity_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Metres per second for `metric`/`standard`, miles per hour for `imperial`.
    pub speed: f64,
}

/// The `sys` block: sunrise/sunset and the reported country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunInfo {
    #[serde(rename = "sunrise")]
    pub sunrise_unix_seconds: i64,
    #[serde(rename = "sunset")]
    pub sunset_unix_seconds: i64,
    // Missing over open water.
    #[serde(default)]
    pub country: String,
}

/// Everything the screen shows for one successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayState {
    pub locality_name: Option<String>,
    pub condition_summary: String,
    pub condition_description: String,
    pub temperature_text: String,
    pub min_text: String,
    pub max_text: String,
    pub humidity_text: String,
    pub wind_speed_text: String,
    pub sunrise_text: String,
    pub sunset_text: String,
    pub country_display_name: String,
    pub icon_key: IconKey,
}

impl DisplayState {
    /// Fold a late locality into an already built state, leaving every other field alone.
    pub fn with_locality(mut self, locality: String) -> Self {
        self.locality_name = Some(locality);
        self
    }
}
