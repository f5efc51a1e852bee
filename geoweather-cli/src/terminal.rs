//! Terminal implementations of the permission prompt and the display sink.

use async_trait::async_trait;
use chrono::Local;
use geoweather_core::{
    DisplaySink, DisplayState, Permission, PermissionPrompter, PermissionStatus, PipelineFailure,
    SettingsKind,
};
use inquire::{Confirm, InquireError};
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompter {
    assume_yes: bool,
}

impl TerminalPrompter {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

#[async_trait]
impl PermissionPrompter for TerminalPrompter {
    async fn request_permissions(&self, permissions: &[Permission]) -> PermissionStatus {
        if self.assume_yes {
            return PermissionStatus::Granted;
        }

        let precise = permissions.contains(&Permission::FineLocation);
        let question = if precise {
            "Allow geoweather to look up your precise location?"
        } else {
            "Allow geoweather to look up your approximate location?"
        };

        let answer = tokio::task::spawn_blocking(move || {
            Confirm::new(question)
                .with_default(true)
                .with_help_message("Your position is only sent to the weather and geocoding services")
                .prompt()
        })
        .await;

        match answer {
            Ok(Ok(true)) => PermissionStatus::Granted,
            Ok(Ok(false)) => PermissionStatus::Denied,
            Ok(Err(InquireError::OperationCanceled | InquireError::OperationInterrupted)) => {
                PermissionStatus::Denied
            }
            Ok(Err(error)) => {
                warn!(%error, "Cannot ask for location permission; pass --yes to grant it");
                PermissionStatus::Denied
            }
            Err(error) => {
                warn!(%error, "Permission prompt task failed");
                PermissionStatus::Denied
            }
        }
    }

    fn prompt_open_settings(&self, kind: SettingsKind) {
        let hint = match kind {
            SettingsKind::LocationSettings => {
                "Location lookup is unavailable. Pass --lat and --lon to use a fixed position."
            }
            SettingsKind::AppPermissionSettings => {
                "geoweather needs your location to find the weather. Re-run with --yes to allow it."
            }
        };
        eprintln!("{hint}");
    }
}

/// Prints each run to stdout; progress and failures go to stderr.
#[derive(Debug, Default)]
pub struct TerminalSink;

impl DisplaySink for TerminalSink {
    fn set_busy(&self, busy: bool) {
        if busy {
            eprintln!("Fetching weather...");
        }
    }

    fn show_weather(&self, state: &DisplayState) {
        print!("{}", render(state));
    }

    fn update_locality(&self, locality: &str) {
        println!("Location: {locality}");
    }

    fn show_failure(&self, failure: &PipelineFailure) {
        eprintln!("{}", failure.user_message());
    }
}

fn render(state: &DisplayState) -> String {
    let place = match &state.locality_name {
        Some(locality) => format!("{locality}, {}", state.country_display_name),
        None => state.country_display_name.clone(),
    };

    format!(
        "{place}\n\
         {} ({}) [{}]\n\
         Temperature: {} ({}, {})\n\
         Humidity:    {}\n\
         Wind:        {} km/h\n\
         Sunrise:     {}  Sunset: {}\n\
         Updated at {}\n",
        state.condition_summary,
        state.condition_description,
        state.icon_key.as_str(),
        state.temperature_text,
        state.min_text,
        state.max_text,
        state.humidity_text,
        state.wind_speed_text,
        state.sunrise_text,
        state.sunset_text,
        Local::now().format("%H:%M"),
    )
}
