use async_trait::async_trait;
use std::{fmt::Debug, time::Duration};

use crate::{error::FetchError, model::{Coordinate, WeatherPayload}};

pub mod openweather;

pub use openweather::OpenWeatherClient;

/// Single-shot weather fetch for one coordinate. No retries.
///
/// Units, credentials and endpoint are fixed at construction time.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch(&self, coord: Coordinate, deadline: Duration) -> Result<WeatherPayload, FetchError>;
}
