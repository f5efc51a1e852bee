//! Core library for the `geoweather` tool.
//!
//! This crate defines:
//! - The location-to-weather pipeline and its state machine
//! - Collaborator seams (position source, permission prompts, geocoding,
//!   weather API, network reachability, display sink)
//! - Payload formatting into display-ready strings
//! - Configuration & error taxonomy
//!
//! It is used by `geoweather-cli`, but any host that can implement the
//! collaborator traits can drive a run.

pub mod config;
pub mod error;
pub mod format;
pub mod geocode;
pub mod location;
pub mod model;
pub mod pipeline;
pub mod provider;

pub use config::{ApiConfig, Config, UnitSource};
pub use error::{FetchError, GeocodeError, LocationError, PipelineFailure};
pub use format::{IconKey, TemperatureUnit, UnitFormatter};
pub use geocode::{GeocodeBackend, NominatimBackend, Place, ReverseGeocoder};
pub use location::{
    LocationAcquirer, Permission, PermissionPrompter, PermissionStatus, PositionSource,
    PositionSubscription, ProviderKind, SettingsKind,
};
pub use model::{Coordinate, DisplayState, Units, WeatherPayload};
pub use pipeline::{DisplaySink, NetworkMonitor, PipelineOptions, Stage, WeatherPipeline};
pub use provider::{OpenWeatherClient, WeatherClient};
