use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    config::ApiConfig,
    error::FetchError,
    model::{Coordinate, WeatherPayload},
};

use super::WeatherClient;

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    config: ApiConfig,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(config: ApiConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: ApiConfig, http: Client) -> Self {
        Self { config, http }
    }

    fn endpoint(&self) -> String {
        format!("{}/2.5/weather", self.config.base_url.trim_end_matches('/'))
    }

    async fn request(&self, coord: Coordinate) -> Result<WeatherPayload, FetchError> {
        let res = self
            .http
            .get(self.endpoint())
            .query(&[
                ("lat", coord.latitude.to_string()),
                ("lon", coord.longitude.to_string()),
                ("units", self.config.units.as_str().to_string()),
                ("appid", self.config.api_key.clone()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = res.status();
        if !status.is_success() {
            // The status alone classifies the failure; the body is diagnostics only.
            let body = res.text().await.unwrap_or_default();
            log_http_failure(status, &body);
            return Err(FetchError::Http {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let body = res.text().await.map_err(transport_error)?;

        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }

        let parsed: WeatherPayload =
            serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;

        if parsed.conditions.is_empty() {
            return Err(FetchError::Parse(
                "response contained no weather conditions".to_string(),
            ));
        }

        debug!(
            country = %parsed.country_code(),
            conditions = parsed.conditions.len(),
            "OpenWeather payload received"
        );

        Ok(parsed)
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    async fn fetch(&self, coord: Coordinate, deadline: Duration) -> Result<WeatherPayload, FetchError> {
        match tokio::time::timeout(deadline, self.request(coord)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?deadline, %coord, "OpenWeather request exceeded its deadline");
                Err(FetchError::Timeout)
            }
        }
    }
}

fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(err.to_string())
    }
}

// 400 and 404 are handled the same way; only the diagnostics differ.
fn log_http_failure(status: StatusCode, body: &str) {
    match status {
        StatusCode::BAD_REQUEST => {
            warn!(status = 400, body = %truncate_body(body), "OpenWeather rejected the request (bad request)")
        }
        StatusCode::NOT_FOUND => {
            warn!(status = 404, body = %truncate_body(body), "OpenWeather has no data for the coordinate (not found)")
        }
        other => {
            warn!(status = other.as_u16(), body = %truncate_body(body), "OpenWeather request failed")
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
