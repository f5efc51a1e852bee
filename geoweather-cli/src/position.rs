//! Position sources available to a terminal host.

use async_trait::async_trait;
use geoweather_core::{
    Coordinate, LocationError, PositionSource, PositionSubscription, ProviderKind,
    location::LocationRequest,
};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const IP_API_URL: &str = "http://ip-api.com/json/?fields=status,message,lat,lon,city";

/// A coordinate given on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition {
    coord: Coordinate,
}

impl FixedPosition {
    pub fn new(coord: Coordinate) -> Self {
        Self { coord }
    }
}

#[async_trait]
impl PositionSource for FixedPosition {
    fn is_provider_enabled(&self, _kind: ProviderKind) -> bool {
        true
    }

    async fn request_updates(
        &self,
        request: LocationRequest,
    ) -> Result<PositionSubscription, LocationError> {
        let (tx, subscription) = PositionSubscription::channel(1);
        tokio::spawn(deliver(tx, self.coord, request));
        Ok(subscription)
    }
}

/// Approximate position from the public IP address.
///
/// Only a network provider exists here; there is no GPS on a terminal.
#[derive(Debug, Clone)]
pub struct IpPosition {
    url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
}

impl Default for IpPosition {
    fn default() -> Self {
        Self::new()
    }
}

impl IpPosition {
    pub fn new() -> Self {
        Self::with_url(IP_API_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: Client::new(),
        }
    }

    async fn locate(http: &Client, url: &str) -> Result<Coordinate, String> {
        let res = http.get(url).send().await.map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            return Err(format!("IP geolocation returned status {}", res.status()));
        }

        let body: IpApiResponse = res.json().await.map_err(|e| e.to_string())?;
        match (body.status.as_str(), body.lat, body.lon) {
            ("success", Some(lat), Some(lon)) => {
                info!(lat, lon, city = ?body.city, "IP geolocation resolved");
                Ok(Coordinate::new(lat, lon))
            }
            _ => Err(body.message.unwrap_or_else(|| format!("status {}", body.status))),
        }
    }
}

#[async_trait]
impl PositionSource for IpPosition {
    fn is_provider_enabled(&self, kind: ProviderKind) -> bool {
        kind == ProviderKind::Network
    }

    async fn request_updates(
        &self,
        request: LocationRequest,
    ) -> Result<PositionSubscription, LocationError> {
        debug!(?request, "IP position requested");
        let (tx, subscription) = PositionSubscription::channel(1);
        let http = self.http.clone();
        let url = self.url.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = tx.closed() => {}
                located = Self::locate(&http, &url) => match located {
                    Ok(coord) => deliver(tx, coord, request).await,
                    // Dropping the sender closes the stream without a fix.
                    Err(error) => warn!(%error, "IP geolocation failed"),
                },
            }
        });

        Ok(subscription)
    }
}

/// Repeat `coord` every `interval` until `max_updates` fixes went out or the
/// subscriber hung up.
async fn deliver(tx: mpsc::Sender<Coordinate>, coord: Coordinate, request: LocationRequest) {
    let mut sent = 0u32;
    while request.max_updates.is_none_or(|max| sent < max) {
        if sent > 0 {
            tokio::select! {
                _ = tx.closed() => return,
                _ = tokio::time::sleep(request.interval) => {}
            }
        }
        if tx.send(coord).await.is_err() {
            return;
        }
        sent += 1;
    }
}
