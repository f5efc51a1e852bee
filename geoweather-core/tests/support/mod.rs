//! Scripted collaborators for driving the pipeline in tests.

#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use geoweather_core::{
    Coordinate, DisplaySink, DisplayState, FetchError, GeocodeBackend, GeocodeError,
    LocationAcquirer, LocationError, NetworkMonitor, Permission, PermissionPrompter,
    PermissionStatus, PipelineFailure, PipelineOptions, Place, PositionSource,
    PositionSubscription, ProviderKind, ReverseGeocoder, SettingsKind, Stage, WeatherClient,
    WeatherPipeline, WeatherPayload,
    location::LocationRequest,
    model::{Condition, Measurements, SunInfo, Wind},
};

pub const NYC: Coordinate = Coordinate { latitude: 40.7128, longitude: -74.0060 };

pub fn payload(icon: &str, humidity: f64, country: &str) -> WeatherPayload {
    WeatherPayload {
        conditions: vec![Condition {
            main_category: "Thunderstorm".into(),
            description: "thunderstorm with rain".into(),
            icon_code: icon.into(),
        }],
        measurements: Measurements {
            temperature: 21.37,
            min_temperature: 19.9,
            max_temperature: 23.1,
            humidity_percent: humidity,
        },
        wind: Wind { speed: 4.12 },
        sun: SunInfo {
            sunrise_unix_seconds: 1_700_000_000,
            sunset_unix_seconds: 1_700_040_000,
            country: country.into(),
        },
    }
}

#[derive(Debug)]
pub struct FakeSource {
    pub enabled: bool,
    pub fix: Option<Coordinate>,
    pub requests: AtomicUsize,
}

impl FakeSource {
    pub fn delivering(fix: Coordinate) -> Self {
        Self { enabled: true, fix: Some(fix), requests: AtomicUsize::new(0) }
    }

    pub fn disabled() -> Self {
        Self { enabled: false, fix: None, requests: AtomicUsize::new(0) }
    }

    pub fn silent() -> Self {
        Self { enabled: true, fix: None, requests: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl PositionSource for FakeSource {
    fn is_provider_enabled(&self, _kind: ProviderKind) -> bool {
        self.enabled
    }

    async fn request_updates(
        &self,
        _request: LocationRequest,
    ) -> Result<PositionSubscription, LocationError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let (tx, subscription) = PositionSubscription::channel(1);
        let fix = self.fix;
        tokio::spawn(async move {
            if let Some(coord) = fix {
                let _ = tx.send(coord).await;
            }
            tx.closed().await;
        });
        Ok(subscription)
    }
}

#[derive(Debug)]
pub struct FakePrompter {
    pub status: PermissionStatus,
    pub settings: Mutex<Vec<SettingsKind>>,
}

impl FakePrompter {
    pub fn answering(status: PermissionStatus) -> Self {
        Self { status, settings: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl PermissionPrompter for FakePrompter {
    async fn request_permissions(&self, _permissions: &[Permission]) -> PermissionStatus {
        self.status
    }

    fn prompt_open_settings(&self, kind: SettingsKind) {
        self.settings.lock().unwrap().push(kind);
    }
}

#[derive(Debug)]
pub struct FakeNetwork(pub bool);

#[async_trait]
impl NetworkMonitor for FakeNetwork {
    async fn is_network_available(&self) -> bool {
        self.0
    }
}

#[derive(Debug)]
pub struct FakeWeather {
    pub result: Result<WeatherPayload, FetchError>,
    pub delay: Duration,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<Coordinate>>,
}

impl FakeWeather {
    pub fn new(result: Result<WeatherPayload, FetchError>, delay: Duration) -> Self {
        Self { result, delay, calls: AtomicUsize::new(0), seen: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl WeatherClient for FakeWeather {
    async fn fetch(&self, coord: Coordinate, _deadline: Duration) -> Result<WeatherPayload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(coord);
        tokio::time::sleep(self.delay).await;
        self.result.clone()
    }
}

#[derive(Debug)]
pub struct FakeGeocoder {
    pub result: Result<Vec<Place>, GeocodeError>,
    pub delay: Duration,
    pub calls: AtomicUsize,
    pub completed: Arc<AtomicUsize>,
}

impl FakeGeocoder {
    pub fn locality(name: &str, delay: Duration) -> Self {
        Self::new(Ok(vec![Place { locality: Some(name.to_string()) }]), delay)
    }

    pub fn new(result: Result<Vec<Place>, GeocodeError>, delay: Duration) -> Self {
        Self { result, delay, calls: AtomicUsize::new(0), completed: Arc::new(AtomicUsize::new(0)) }
    }
}

#[async_trait]
impl GeocodeBackend for FakeGeocoder {
    async fn reverse(&self, _coord: Coordinate, _max_results: usize) -> Result<Vec<Place>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Busy(bool),
    Weather(DisplayState),
    Locality(String),
    Failure(PipelineFailure),
    Stage(Stage),
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Everything except stage notifications.
    pub fn output(&self) -> Vec<Event> {
        self.events().into_iter().filter(|e| !matches!(e, Event::Stage(_))).collect()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Stage(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl DisplaySink for RecordingSink {
    fn set_busy(&self, busy: bool) {
        self.push(Event::Busy(busy));
    }

    fn show_weather(&self, state: &DisplayState) {
        self.push(Event::Weather(state.clone()));
    }

    fn update_locality(&self, locality: &str) {
        self.push(Event::Locality(locality.to_string()));
    }

    fn show_failure(&self, failure: &PipelineFailure) {
        self.push(Event::Failure(failure.clone()));
    }

    fn stage_changed(&self, stage: Stage) {
        self.push(Event::Stage(stage));
    }
}

pub struct Harness {
    pub source: Arc<FakeSource>,
    pub prompter: Arc<FakePrompter>,
    pub network: Arc<FakeNetwork>,
    pub weather: Arc<FakeWeather>,
    pub geocoder: Arc<FakeGeocoder>,
    pub sink: Arc<RecordingSink>,
    pub options: PipelineOptions,
}

impl Harness {
    pub fn new(weather: FakeWeather, geocoder: FakeGeocoder) -> Self {
        Self {
            source: Arc::new(FakeSource::delivering(NYC)),
            prompter: Arc::new(FakePrompter::answering(PermissionStatus::Granted)),
            network: Arc::new(FakeNetwork(true)),
            weather: Arc::new(weather),
            geocoder: Arc::new(geocoder),
            sink: Arc::new(RecordingSink::default()),
            options: PipelineOptions {
                location_deadline: Duration::from_secs(2),
                fetch_deadline: Duration::from_secs(2),
                ..PipelineOptions::default()
            },
        }
    }

    pub fn pipeline(&self) -> WeatherPipeline {
        WeatherPipeline::new(
            LocationAcquirer::new(self.source.clone(), self.prompter.clone()),
            self.weather.clone(),
            ReverseGeocoder::new(self.geocoder.clone(), Duration::from_secs(2)),
            self.network.clone(),
            self.sink.clone(),
            self.options.clone(),
        )
    }
}
