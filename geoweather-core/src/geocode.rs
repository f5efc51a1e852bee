//! Reverse geocoding: coordinates to a locality name.
//!
//! The lookup itself is delegated to a [`GeocodeBackend`]. [`ReverseGeocoder`]
//! runs it on a spawned task so the caller never blocks, and hands the result
//! back through a [`LocalityLookup`] future that resolves exactly once.

use async_trait::async_trait;
use std::{
    fmt::Debug,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{error::GeocodeError, model::Coordinate};

pub mod nominatim;

pub use nominatim::NominatimBackend;

/// One reverse-geocoding candidate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Place {
    pub locality: Option<String>,
}

#[async_trait]
pub trait GeocodeBackend: Send + Sync + Debug {
    /// Up to `max_results` candidates for the coordinate, best first.
    async fn reverse(&self, coord: Coordinate, max_results: usize) -> Result<Vec<Place>, GeocodeError>;
}

#[derive(Debug, Clone)]
pub struct ReverseGeocoder {
    backend: Arc<dyn GeocodeBackend>,
    deadline: Duration,
}

impl ReverseGeocoder {
    pub fn new(backend: Arc<dyn GeocodeBackend>, deadline: Duration) -> Self {
        Self { backend, deadline }
    }

    /// Start a lookup on a background task.
    ///
    /// Resolves to the first candidate's locality, or `""` when the backend
    /// found nothing. Dropping the returned handle aborts the lookup.
    pub fn lookup(&self, coord: Coordinate) -> LocalityLookup {
        let backend = Arc::clone(&self.backend);
        let deadline = self.deadline;

        let handle = tokio::spawn(first_locality(backend, coord, deadline));

        LocalityLookup { handle }
    }
}

async fn first_locality(
    backend: Arc<dyn GeocodeBackend>,
    coord: Coordinate,
    deadline: Duration,
) -> Result<String, GeocodeError> {
    let places = tokio::time::timeout(deadline, backend.reverse(coord, 1))
        .await
        .map_err(|_| GeocodeError::Timeout)??;

    Ok(places
        .into_iter()
        .next()
        .and_then(|place| place.locality)
        .unwrap_or_default())
}

/// Pending result of [`ReverseGeocoder::lookup`].
#[derive(Debug)]
pub struct LocalityLookup {
    handle: JoinHandle<Result<String, GeocodeError>>,
}

impl LocalityLookup {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for LocalityLookup {
    type Output = Result<String, GeocodeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_err)) => {
                Poll::Ready(Err(GeocodeError::Interrupted(join_err.to_string())))
            }
        }
    }
}

impl Drop for LocalityLookup {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Collapse a lookup outcome into a displayable locality, logging the two
/// "nothing to show" cases differently.
pub fn locality_for_display(outcome: Result<String, GeocodeError>) -> Option<String> {
    match outcome {
        Ok(locality) if locality.trim().is_empty() => {
            debug!("Reverse geocoding found no locality for the coordinate");
            None
        }
        Ok(locality) => Some(locality),
        Err(err) => {
            warn!(error = %err, "Reverse geocoding unavailable; showing weather without a locality");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Scripted {
        result: Result<Vec<Place>, GeocodeError>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(result: Result<Vec<Place>, GeocodeError>) -> Self {
            Self { result, delay: Duration::ZERO, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl GeocodeBackend for Scripted {
        async fn reverse(&self, _coord: Coordinate, max_results: usize) -> Result<Vec<Place>, GeocodeError> {
            assert_eq!(max_results, 1);
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.result.clone()
        }
    }

    fn place(name: Option<&str>) -> Place {
        Place { locality: name.map(str::to_string) }
    }

    fn coord() -> Coordinate {
        Coordinate::new(47.4979, 19.0402)
    }

    #[tokio::test]
    async fn takes_first_candidates_locality() {
        let backend = Arc::new(Scripted::new(Ok(vec![place(Some("Budapest")), place(Some("Pest"))])));
        let geocoder = ReverseGeocoder::new(backend.clone(), Duration::from_secs(1));

        assert_eq!(geocoder.lookup(coord()).await, Ok("Budapest".to_string()));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_candidates_is_an_empty_success() {
        let geocoder = ReverseGeocoder::new(Arc::new(Scripted::new(Ok(vec![]))), Duration::from_secs(1));
        assert_eq!(geocoder.lookup(coord()).await, Ok(String::new()));
    }

    #[tokio::test]
    async fn candidate_without_locality_is_empty() {
        let geocoder =
            ReverseGeocoder::new(Arc::new(Scripted::new(Ok(vec![place(None)]))), Duration::from_secs(1));
        assert_eq!(geocoder.lookup(coord()).await, Ok(String::new()));
    }

    #[tokio::test]
    async fn backend_error_is_distinct_from_empty() {
        let geocoder = ReverseGeocoder::new(
            Arc::new(Scripted::new(Err(GeocodeError::Lookup("service down".into())))),
            Duration::from_secs(1),
        );
        let outcome = geocoder.lookup(coord()).await;
        assert_eq!(outcome, Err(GeocodeError::Lookup("service down".into())));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let mut backend = Scripted::new(Ok(vec![place(Some("Late"))]));
        backend.delay = Duration::from_millis(200);
        let geocoder = ReverseGeocoder::new(Arc::new(backend), Duration::from_millis(20));

        assert_eq!(geocoder.lookup(coord()).await, Err(GeocodeError::Timeout));
    }

    #[test]
    fn display_collapses_empty_and_errors() {
        assert_eq!(locality_for_display(Ok("Szeged".into())), Some("Szeged".into()));
        assert_eq!(locality_for_display(Ok(String::new())), None);
        assert_eq!(locality_for_display(Err(GeocodeError::Timeout)), None);
    }
}
