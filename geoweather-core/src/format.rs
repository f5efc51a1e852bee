//! Pure transformations from a weather payload to display strings.

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::model::{DisplayState, Units, WeatherPayload};

mod country;

pub use country::display_country_name;

/// Countries that read temperatures in Fahrenheit.
const FAHRENHEIT_COUNTRIES: &[&str] = &["US", "LR", "MM"];

const MPH_TO_MPS: f64 = 0.447_04;
const MPS_TO_KMH: f64 = 3.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    pub fn for_country(country_code: &str) -> Self {
        let code = country_code.trim().to_ascii_uppercase();
        if FAHRENHEIT_COUNTRIES.contains(&code.as_str()) {
            TemperatureUnit::Fahrenheit
        } else {
            TemperatureUnit::Celsius
        }
    }
}

/// Closed set of weather illustrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IconKey {
    Sunny,
    #[default]
    Cloudy,
    Rainy,
    Stormy,
    Snowy,
}

impl IconKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            IconKey::Sunny => "sunny",
            IconKey::Cloudy => "cloudy",
            IconKey::Rainy => "rainy",
            IconKey::Stormy => "stormy",
            IconKey::Snowy => "snowy",
        }
    }
}

/// `"°F"` for the US, Liberia and Myanmar, `"°C"` everywhere else.
pub fn unit_symbol(country_code: &str) -> &'static str {
    TemperatureUnit::for_country(country_code).symbol()
}

/// One decimal place followed by the unit symbol, e.g. `"21.4 °C"`.
pub fn format_temperature(value: f64, unit: &str) -> String {
    let mut rounded = (value * 10.0).round() / 10.0;
    if rounded == 0.0 {
        // keep "-0.0" off the screen
        rounded = 0.0;
    }
    format!("{rounded:.1} {unit}")
}

/// m/s to km/h, rounded half-up to two decimals.
pub fn format_wind_speed_kmh(meters_per_second: f64) -> String {
    let kmh = (meters_per_second * MPS_TO_KMH * 100.0).round() / 100.0;
    format!("{kmh:.2}")
}

/// Whole percent, halves rounded up like the wind speed.
pub fn format_humidity(percent: f64) -> String {
    format!("{:.0}%", percent.round())
}

/// `HH:mm` in the machine's local time zone.
pub fn format_clock_time(unix_seconds: i64) -> String {
    format_clock_time_in(unix_seconds, &Local)
}

pub fn format_clock_time_in<Tz>(unix_seconds: i64, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    DateTime::from_timestamp(unix_seconds, 0)
        .map(|utc| utc.with_timezone(zone).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

/// Map an OpenWeather icon code onto an illustration. Unknown codes get the default.
pub fn icon_key_for(code: &str) -> IconKey {
    match code {
        "01d" => IconKey::Sunny,
        "02d" | "03d" | "04d" | "02n" | "03n" | "04n" | "10n" | "11n" | "50d" | "50n" => {
            IconKey::Cloudy
        }
        "09d" | "09n" | "10d" | "13n" => IconKey::Rainy,
        "11d" => IconKey::Stormy,
        "01n" | "13d" => IconKey::Snowy,
        _ => IconKey::default(),
    }
}

/// Convert a payload temperature (in the request's unit system) to `target`.
pub fn convert_temperature(value: f64, from: Units, target: TemperatureUnit) -> f64 {
    let celsius = match from {
        Units::Metric => value,
        Units::Imperial => (value - 32.0) * 5.0 / 9.0,
        Units::Standard => value - 273.15,
    };
    match target {
        TemperatureUnit::Celsius => celsius,
        TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
    }
}

/// Imperial payloads report wind in mph; everything else in m/s.
pub fn wind_speed_mps(value: f64, from: Units) -> f64 {
    match from {
        Units::Imperial => value * MPH_TO_MPS,
        Units::Metric | Units::Standard => value,
    }
}

/// Builds a [`DisplayState`] from a payload fetched with `units`.
#[derive(Debug, Clone, Copy)]
pub struct UnitFormatter {
    units: Units,
}

impl UnitFormatter {
    pub fn new(units: Units) -> Self {
        Self { units }
    }

    /// `unit_country` decides the temperature symbol; the locality is left empty.
    pub fn display_state(&self, payload: &WeatherPayload, unit_country: &str) -> DisplayState {
        let target = TemperatureUnit::for_country(unit_country);
        let symbol = target.symbol();
        let temp = |v: f64| format_temperature(convert_temperature(v, self.units, target), symbol);

        let (summary, description, icon_key) = match payload.primary_condition() {
            Some(c) => (c.main_category.clone(), c.description.clone(), icon_key_for(&c.icon_code)),
            None => (String::new(), String::new(), IconKey::default()),
        };

        let m = &payload.measurements;

        DisplayState {
            locality_name: None,
            condition_summary: summary,
            condition_description: description,
            temperature_text: temp(m.temperature),
            min_text: format!("min {}", temp(m.min_temperature)),
            max_text: format!("max {}", temp(m.max_temperature)),
            humidity_text: format_humidity(m.humidity_percent),
            wind_speed_text: format_wind_speed_kmh(wind_speed_mps(payload.wind.speed, self.units)),
            sunrise_text: format_clock_time(payload.sun.sunrise_unix_seconds),
            sunset_text: format_clock_time(payload.sun.sunset_unix_seconds),
            country_display_name: display_country_name(payload.country_code()),
            icon_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Condition, Measurements, SunInfo, Wind};
    use chrono::{FixedOffset, Utc};

    fn payload(icon: &str, country: &str) -> WeatherPayload {
        WeatherPayload {
            conditions: vec![Condition {
                main_category: "Clear".into(),
                description: "clear sky".into(),
                icon_code: icon.into(),
            }],
            measurements: Measurements {
                temperature: 21.37,
                min_temperature: -3.06,
                max_temperature: 123.46,
                humidity_percent: 55.0,
            },
            wind: Wind { speed: 10.0 },
            sun: SunInfo {
                sunrise_unix_seconds: 0,
                sunset_unix_seconds: 3_600,
                country: country.into(),
            },
        }
    }

    #[test]
    fn fahrenheit_countries() {
        for code in ["US", "LR", "MM", "us"] {
            assert_eq!(unit_symbol(code), "°F", "{code}");
        }
        for code in ["DE", "GB", "HU", "CA", "JP", ""] {
            assert_eq!(unit_symbol(code), "°C", "{code}");
        }
    }

    #[test]
    fn temperature_rounds_to_one_decimal() {
        assert_eq!(format_temperature(21.37, "°C"), "21.4 °C");
        assert_eq!(format_temperature(-3.06, "°C"), "-3.1 °C");
        assert_eq!(format_temperature(123.46, "°F"), "123.5 °F");
        assert_eq!(format_temperature(7.0, "°C"), "7.0 °C");
        assert_eq!(format_temperature(-0.04, "°C"), "0.0 °C");
    }

    #[test]
    fn wind_speed_in_kmh() {
        assert_eq!(format_wind_speed_kmh(10.0), "36.00");
        assert_eq!(format_wind_speed_kmh(0.0), "0.00");
        assert_eq!(format_wind_speed_kmh(4.12), "14.83");
    }

    #[test]
    fn humidity_halves_round_up() {
        assert_eq!(format_humidity(54.5), "55%");
        assert_eq!(format_humidity(55.5), "56%");
        assert_eq!(format_humidity(55.0), "55%");
        assert_eq!(format_humidity(99.4), "99%");
    }

    #[test]
    fn clock_time_in_fixed_zones() {
        assert_eq!(format_clock_time_in(0, &Utc), "00:00");
        let cet = FixedOffset::east_opt(3_600).expect("valid offset");
        assert_eq!(format_clock_time_in(0, &cet), "01:00");
        let est = FixedOffset::west_opt(5 * 3_600).expect("valid offset");
        assert_eq!(format_clock_time_in(1_700_000_000, &est), "17:13");
        assert_eq!(format_clock_time_in(i64::MAX, &Utc), "--:--");
    }

    #[test]
    fn clock_time_uses_local_zone() {
        let expected = DateTime::from_timestamp(0, 0)
            .expect("epoch is representable")
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string();
        assert_eq!(format_clock_time(0), expected);
        assert_eq!(format_clock_time(0), format_clock_time(0));
    }

    #[test]
    fn icon_codes() {
        assert_eq!(icon_key_for("01d"), IconKey::Sunny);
        assert_eq!(icon_key_for("04n"), IconKey::Cloudy);
        assert_eq!(icon_key_for("10d"), IconKey::Rainy);
        assert_eq!(icon_key_for("11d"), IconKey::Stormy);
        assert_eq!(icon_key_for("13d"), IconKey::Snowy);
        assert_eq!(icon_key_for("zz"), IconKey::Cloudy);
        assert_eq!(icon_key_for(""), IconKey::default());
    }

    #[test]
    fn conversions() {
        assert!((convert_temperature(100.0, Units::Metric, TemperatureUnit::Fahrenheit) - 212.0).abs() < 1e-9);
        assert!((convert_temperature(32.0, Units::Imperial, TemperatureUnit::Celsius)).abs() < 1e-9);
        assert!((convert_temperature(273.15, Units::Standard, TemperatureUnit::Celsius)).abs() < 1e-9);
        assert!((wind_speed_mps(10.0, Units::Imperial) - 4.4704).abs() < 1e-9);
        assert_eq!(wind_speed_mps(10.0, Units::Metric), 10.0);
    }

    #[test]
    fn display_state_from_metric_payload() {
        let state = UnitFormatter::new(Units::Metric).display_state(&payload("01d", "HU"), "HU");

        assert_eq!(state.locality_name, None);
        assert_eq!(state.condition_summary, "Clear");
        assert_eq!(state.condition_description, "clear sky");
        assert_eq!(state.temperature_text, "21.4 °C");
        assert_eq!(state.min_text, "min -3.1 °C");
        assert_eq!(state.max_text, "max 123.5 °C");
        assert_eq!(state.humidity_text, "55%");
        assert_eq!(state.wind_speed_text, "36.00");
        assert_eq!(state.sunrise_text, format_clock_time(0));
        assert_eq!(state.sunset_text, format_clock_time(3_600));
        assert_eq!(state.country_display_name, "Hungary");
        assert_eq!(state.icon_key, IconKey::Sunny);
    }

    #[test]
    fn display_state_converts_to_fahrenheit_for_us() {
        let mut p = payload("11d", "US");
        p.measurements.temperature = 20.0;
        let state = UnitFormatter::new(Units::Metric).display_state(&p, "US");

        assert_eq!(state.temperature_text, "68.0 °F");
        assert_eq!(state.country_display_name, "United States");
        assert_eq!(state.icon_key, IconKey::Stormy);
    }

    #[test]
    fn display_state_reads_only_first_condition() {
        let mut p = payload("01d", "DE");
        p.conditions.push(Condition {
            main_category: "Rain".into(),
            description: "light rain".into(),
            icon_code: "10d".into(),
        });
        let state = UnitFormatter::new(Units::Metric).display_state(&p, "DE");
        assert_eq!(state.condition_summary, "Clear");
        assert_eq!(state.icon_key, IconKey::Sunny);
    }
}
