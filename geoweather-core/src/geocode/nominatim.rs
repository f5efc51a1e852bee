//! Reverse geocoding through Nominatim (OpenStreetMap). No API key required,
//! but the usage policy asks for an identifying User-Agent.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{config::GeocoderSection, error::GeocodeError, model::Coordinate};

use super::{GeocodeBackend, Place};

#[derive(Debug, Clone)]
pub struct NominatimBackend {
    base_url: String,
    http: Client,
}

impl NominatimBackend {
    pub fn new(section: &GeocoderSection) -> Result<Self, GeocodeError> {
        let http = Client::builder()
            .user_agent(section.user_agent.as_str())
            .build()
            .map_err(|e| GeocodeError::Lookup(format!("failed to create geocoding client: {e}")))?;

        Ok(Self {
            base_url: section.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
    // Present instead of an address when nothing is found, e.g. over the ocean.
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
}

impl NominatimAddress {
    fn locality(self) -> Option<String> {
        self.city.or(self.town).or(self.village).or(self.municipality)
    }
}

#[async_trait]
impl GeocodeBackend for NominatimBackend {
    async fn reverse(&self, coord: Coordinate, max_results: usize) -> Result<Vec<Place>, GeocodeError> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("format", "json".to_string()),
                ("lat", coord.latitude.to_string()),
                ("lon", coord.longitude.to_string()),
                ("addressdetails", "1".to_string()),
                ("zoom", "10".to_string()),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Lookup(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Lookup(format!("Nominatim returned status {status}")));
        }

        let body: NominatimResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Lookup(format!("Nominatim parse error: {e}")))?;

        if let Some(reason) = body.error {
            debug!(%reason, %coord, "Nominatim found no address");
            return Ok(Vec::new());
        }

        // Nominatim's reverse endpoint yields a single candidate at most.
        Ok(body
            .address
            .map(|addr| Place { locality: addr.locality() })
            .into_iter()
            .collect())
    }
}
