//! Error taxonomy for the location-to-weather pipeline.
//!
//! Component errors (`LocationError`, `FetchError`, `GeocodeError`) keep the
//! detail needed for logging. `PipelineFailure` is the terminal outcome a run
//! reports to its caller and display sink.

use thiserror::Error;

/// Failures while obtaining a position fix.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("Location services are turned off")]
    Disabled,
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("No position fix within the deadline")]
    Timeout,
    #[error("Position provider closed the subscription before delivering a fix")]
    StreamClosed,
    #[error("Position provider error: {0}")]
    Provider(String),
}

/// Failures while fetching the weather payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Weather request failed with status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Weather response body was empty")]
    EmptyBody,
    #[error("Failed to parse weather response: {0}")]
    Parse(String),
    #[error("Weather request transport error: {0}")]
    Transport(String),
    #[error("Weather request exceeded its deadline")]
    Timeout,
}

/// Reverse geocoding did not produce a locality. Never fatal for a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeocodeError {
    #[error("Reverse geocoding lookup failed: {0}")]
    Lookup(String),
    #[error("Reverse geocoding exceeded its deadline")]
    Timeout,
    #[error("Reverse geocoding task was interrupted: {0}")]
    Interrupted(String),
}

/// Terminal outcome of a failed pipeline run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineFailure {
    #[error("Location services are turned off")]
    LocationDisabled,
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("No network connection")]
    NoNetwork,
    #[error("Weather API returned HTTP {0}")]
    HttpError(u16),
    #[error("Operation timed out")]
    Timeout,
    #[error("Run was cancelled")]
    Cancelled,
    #[error("Unexpected failure: {0}")]
    Unknown(String),
}

impl PipelineFailure {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineFailure::LocationDisabled => {
                "It looks like you have turned off your location provider. Please turn it on."
            }
            PipelineFailure::PermissionDenied => {
                "You have denied location permission. Please enable it, it is mandatory for the app to work."
            }
            PipelineFailure::NoNetwork => "No internet connection is available.",
            PipelineFailure::HttpError(400) => "The weather service rejected the request.",
            PipelineFailure::HttpError(404) => "The weather service has no data for this location.",
            PipelineFailure::HttpError(_) => "The weather service returned an error. Please try again.",
            PipelineFailure::Timeout => "Getting the weather took too long. Please try again.",
            PipelineFailure::Cancelled => "Cancelled.",
            PipelineFailure::Unknown(_) => "Something went wrong. Please try again.",
        }
    }
}

impl From<LocationError> for PipelineFailure {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::Disabled => PipelineFailure::LocationDisabled,
            LocationError::PermissionDenied => PipelineFailure::PermissionDenied,
            LocationError::Timeout => PipelineFailure::Timeout,
            other => PipelineFailure::Unknown(other.to_string()),
        }
    }
}

impl From<FetchError> for PipelineFailure {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Http { status, .. } => PipelineFailure::HttpError(status),
            FetchError::Timeout => PipelineFailure::Timeout,
            other => PipelineFailure::Unknown(other.to_string()),
        }
    }
}
