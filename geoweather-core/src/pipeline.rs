//! The location-to-weather run.
//!
//! `Idle -> Checking -> AwaitingFix -> FetchingData -> Done | Failed`
//!
//! Once a fix is known the weather fetch and the reverse geocode run side by
//! side. The display state is emitted as soon as the weather payload is
//! formatted; a locality that lands later is pushed as one in-place update.

use async_trait::async_trait;
use std::{fmt::Debug, future::Future, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    config::{Config, UnitSource, device_locale_country},
    error::PipelineFailure,
    format::UnitFormatter,
    geocode::{LocalityLookup, ReverseGeocoder, locality_for_display},
    location::{LocationAcquirer, SettingsKind},
    model::{Coordinate, DisplayState, Units, WeatherPayload},
    provider::WeatherClient,
};

/// Reachability check made before any weather request.
#[async_trait]
pub trait NetworkMonitor: Send + Sync + Debug {
    async fn is_network_available(&self) -> bool;
}

/// Write-only view the pipeline renders into.
pub trait DisplaySink: Send + Sync + Debug {
    fn set_busy(&self, busy: bool);

    fn show_weather(&self, state: &DisplayState);

    /// A locality that arrived after [`DisplaySink::show_weather`].
    fn update_locality(&self, locality: &str);

    fn show_failure(&self, failure: &PipelineFailure);

    fn stage_changed(&self, _stage: Stage) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Checking,
    AwaitingFix,
    FetchingData,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    pub fn can_advance_to(&self, next: Stage) -> bool {
        matches!(
            (self, next),
            (Stage::Idle, Stage::Checking)
                | (Stage::Checking, Stage::AwaitingFix)
                | (Stage::AwaitingFix, Stage::FetchingData)
                | (Stage::FetchingData, Stage::Done)
        ) || (!self.is_terminal() && next == Stage::Failed)
    }
}

/// Keeps the busy indicator up for as long as it lives.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    sink: &'a dyn DisplaySink,
}

impl<'a> BusyGuard<'a> {
    pub fn show(sink: &'a dyn DisplaySink) -> Self {
        sink.set_busy(true);
        Self { sink }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.sink.set_busy(false);
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub location_deadline: Duration,
    pub fetch_deadline: Duration,
    /// Units the weather client requests; the formatter converts from these.
    pub units: Units,
    pub unit_source: UnitSource,
    pub device_country: Option<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            location_deadline: config.deadlines.location(),
            fetch_deadline: config.deadlines.fetch(),
            units: config.api.units,
            unit_source: config.unit_source,
            device_country: device_locale_country(),
        }
    }
}

/// State of a single run. Never shared between runs.
struct Run<'a> {
    stage: Stage,
    sink: &'a dyn DisplaySink,
}

impl<'a> Run<'a> {
    fn new(sink: &'a dyn DisplaySink) -> Self {
        Self { stage: Stage::Idle, sink }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal transition {:?} -> {next:?}",
            self.stage
        );
        debug!(from = ?self.stage, to = ?next, "Pipeline stage");
        self.stage = next;
        self.sink.stage_changed(next);
    }
}

#[derive(Debug)]
pub struct WeatherPipeline {
    locator: LocationAcquirer,
    weather: Arc<dyn WeatherClient>,
    geocoder: ReverseGeocoder,
    network: Arc<dyn NetworkMonitor>,
    sink: Arc<dyn DisplaySink>,
    options: PipelineOptions,
}

impl WeatherPipeline {
    pub fn new(
        locator: LocationAcquirer,
        weather: Arc<dyn WeatherClient>,
        geocoder: ReverseGeocoder,
        network: Arc<dyn NetworkMonitor>,
        sink: Arc<dyn DisplaySink>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            locator,
            weather,
            geocoder,
            network,
            sink,
            options,
        }
    }

    /// One complete run with no external cancellation.
    pub async fn run(&self) -> Result<DisplayState, PipelineFailure> {
        self.run_until_cancelled(CancellationToken::new()).await
    }

    #[instrument(skip_all, name = "weather_pipeline")]
    pub async fn run_until_cancelled(
        &self,
        cancel: CancellationToken,
    ) -> Result<DisplayState, PipelineFailure> {
        let mut run = Run::new(self.sink.as_ref());

        match self.drive(&mut run, &cancel).await {
            Ok(state) => Ok(state),
            Err(failure) => {
                match &failure {
                    PipelineFailure::Cancelled => info!("Weather run cancelled"),
                    PipelineFailure::HttpError(_) | PipelineFailure::Unknown(_) => {
                        error!(%failure, "Weather run failed")
                    }
                    other => warn!(failure = %other, "Weather run failed"),
                }
                run.advance(Stage::Failed);
                self.sink.show_failure(&failure);
                Err(failure)
            }
        }
    }

    async fn drive(
        &self,
        run: &mut Run<'_>,
        cancel: &CancellationToken,
    ) -> Result<DisplayState, PipelineFailure> {
        run.advance(Stage::Checking);
        if !self.locator.is_location_enabled() {
            self.locator.prompt_open_settings(SettingsKind::LocationSettings);
            return Err(PipelineFailure::LocationDisabled);
        }

        run.advance(Stage::AwaitingFix);
        let coord = until_cancelled(cancel, self.locator.acquire(self.options.location_deadline))
            .await??;

        if !until_cancelled(cancel, self.network.is_network_available()).await? {
            return Err(PipelineFailure::NoNetwork);
        }

        run.advance(Stage::FetchingData);
        let (payload, mut locality) = self.fetch_both(coord, cancel).await?;

        let mut state = UnitFormatter::new(self.options.units)
            .display_state(&payload, &self.unit_country(&payload));

        if locality.is_finished() {
            if let Some(name) = locality_for_display((&mut locality).await) {
                state = state.with_locality(name);
            }
            self.sink.show_weather(&state);
            run.advance(Stage::Done);
            return Ok(state);
        }

        self.sink.show_weather(&state);
        run.advance(Stage::Done);

        match until_cancelled(cancel, &mut locality).await {
            Ok(outcome) => {
                if let Some(name) = locality_for_display(outcome) {
                    self.sink.update_locality(&name);
                    state = state.with_locality(name);
                }
            }
            Err(_) => debug!("Cancelled while waiting for the locality"),
        }

        Ok(state)
    }

    /// Weather fetch under the busy indicator, with the geocode started alongside.
    ///
    /// On failure the pending lookup is dropped, which aborts it.
    async fn fetch_both(
        &self,
        coord: Coordinate,
        cancel: &CancellationToken,
    ) -> Result<(WeatherPayload, LocalityLookup), PipelineFailure> {
        let busy = BusyGuard::show(self.sink.as_ref());
        let locality = self.geocoder.lookup(coord);

        let fetched =
            until_cancelled(cancel, self.weather.fetch(coord, self.options.fetch_deadline)).await;
        drop(busy);

        let payload = fetched??;
        Ok((payload, locality))
    }

    fn unit_country(&self, payload: &WeatherPayload) -> String {
        match (self.options.unit_source, &self.options.device_country) {
            (UnitSource::DeviceLocale, Some(country)) => country.clone(),
            _ => payload.country_code().to_string(),
        }
    }
}

async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, PipelineFailure> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineFailure::Cancelled),
        out = fut => Ok(out),
    }
}
