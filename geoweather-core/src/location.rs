//! One-shot position acquisition.
//!
//! Checks that a position provider is enabled and that location permission is
//! granted, then subscribes for high-accuracy updates and cancels the
//! subscription as soon as the first fix arrives.

use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, info, warn};

use crate::{error::LocationError, model::Coordinate};

pub const LOCATION_PERMISSIONS: &[Permission] =
    &[Permission::FineLocation, Permission::CoarseLocation];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gps,
    Network,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    FineLocation,
    CoarseLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The platform wants the user told why before asking again.
    NeedsRationale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsKind {
    LocationSettings,
    AppPermissionSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    HighAccuracy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    /// Gap between consecutive fixes.
    pub interval: Duration,
    pub priority: Priority,
    /// Sources stop delivering after this many fixes; `None` means until cancelled.
    pub max_updates: Option<u32>,
}

impl LocationRequest {
    pub fn single_fix() -> Self {
        Self {
            interval: Duration::from_millis(100),
            priority: Priority::HighAccuracy,
            max_updates: Some(1),
        }
    }
}

/// Live stream of fixes from a [`PositionSource`].
///
/// Providers push into the sending half and should stop once
/// [`mpsc::Sender::closed`] resolves.
#[derive(Debug)]
pub struct PositionSubscription {
    rx: mpsc::Receiver<Coordinate>,
}

impl PositionSubscription {
    pub fn new(rx: mpsc::Receiver<Coordinate>) -> Self {
        Self { rx }
    }

    pub fn channel(capacity: usize) -> (mpsc::Sender<Coordinate>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }

    /// `None` once the provider has hung up.
    pub async fn next_fix(&mut self) -> Option<Coordinate> {
        self.rx.recv().await
    }

    pub fn cancel(&mut self) {
        self.rx.close();
    }
}

#[async_trait]
pub trait PositionSource: Send + Sync + Debug {
    fn is_provider_enabled(&self, kind: ProviderKind) -> bool;

    async fn request_updates(
        &self,
        request: LocationRequest,
    ) -> Result<PositionSubscription, LocationError>;
}

/// Permission dialogs and settings shortcuts owned by the host UI.
#[async_trait]
pub trait PermissionPrompter: Send + Sync + Debug {
    async fn request_permissions(&self, permissions: &[Permission]) -> PermissionStatus;

    fn prompt_open_settings(&self, kind: SettingsKind);
}

#[derive(Debug, Clone)]
pub struct LocationAcquirer {
    source: Arc<dyn PositionSource>,
    prompter: Arc<dyn PermissionPrompter>,
}

impl LocationAcquirer {
    pub fn new(source: Arc<dyn PositionSource>, prompter: Arc<dyn PermissionPrompter>) -> Self {
        Self { source, prompter }
    }

    /// GPS or network-based positioning is switched on.
    pub fn is_location_enabled(&self) -> bool {
        self.source.is_provider_enabled(ProviderKind::Gps)
            || self.source.is_provider_enabled(ProviderKind::Network)
    }

    pub fn prompt_open_settings(&self, kind: SettingsKind) {
        self.prompter.prompt_open_settings(kind);
    }

    /// Request permission, retrying once after a rationale prompt.
    pub async fn ensure_permission(&self) -> Result<(), LocationError> {
        match self.prompter.request_permissions(LOCATION_PERMISSIONS).await {
            PermissionStatus::Granted => Ok(()),
            PermissionStatus::Denied => Err(LocationError::PermissionDenied),
            PermissionStatus::NeedsRationale => {
                info!("Location permission needs a rationale; prompting before retrying once");
                self.prompt_open_settings(SettingsKind::AppPermissionSettings);

                match self.prompter.request_permissions(LOCATION_PERMISSIONS).await {
                    PermissionStatus::Granted => Ok(()),
                    _ => Err(LocationError::PermissionDenied),
                }
            }
        }
    }

    /// Single attempt at one position fix, bounded by `deadline`.
    pub async fn acquire(&self, deadline: Duration) -> Result<Coordinate, LocationError> {
        if !self.is_location_enabled() {
            return Err(LocationError::Disabled);
        }

        self.ensure_permission().await?;
        self.first_fix(deadline).await
    }

    async fn first_fix(&self, deadline: Duration) -> Result<Coordinate, LocationError> {
        let started = Instant::now();

        let mut subscription = tokio::time::timeout(
            deadline,
            self.source.request_updates(LocationRequest::single_fix()),
        )
        .await
        .map_err(|_| LocationError::Timeout)??;

        let remaining = deadline.saturating_sub(started.elapsed());
        let fix = tokio::time::timeout(remaining, subscription.next_fix()).await;

        // Never keep listening past the first delivery, whatever happens downstream.
        subscription.cancel();

        match fix {
            Ok(Some(coord)) => {
                info!(latitude = coord.latitude, longitude = coord.longitude, "Position fix acquired");
                Ok(coord)
            }
            Ok(None) => {
                warn!("Position provider hung up before delivering a fix");
                Err(LocationError::StreamClosed)
            }
            Err(_) => {
                debug!(?deadline, "No position fix before the deadline");
                Err(LocationError::Timeout)
            }
        }
    }
}
