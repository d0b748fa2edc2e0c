//! Status polling for long-running resources.
//!
//! The server only exposes "get current state" endpoints, so watching an
//! analysis means fetching it on a fixed interval and turning the sequence
//! of snapshots into transition events. `watch` reports each distinct
//! status once, stops on the first terminal status, and stops immediately
//! on the first fetch error.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Interval between status fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// A snapshot returned by a polled endpoint.
pub trait Polled {
    /// The part of the snapshot whose change counts as a transition.
    type Key: PartialEq + Clone;

    fn key(&self) -> Self::Key;

    fn is_terminal(&self) -> bool;

    /// Whether a terminal snapshot means the run did not succeed.
    fn is_failure(&self) -> bool;

    /// Progress counter expected to be non-decreasing until terminal.
    fn progress(&self) -> Option<i64> {
        None
    }
}

/// How a watched resource finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Succeeded(T),
    Failed(T),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Outcome::Succeeded(t) | Outcome::Failed(t) => t,
        }
    }
}

#[derive(Error, Debug)]
pub enum PollError<E> {
    #[error("Failed to fetch status: {0}")]
    Fetch(#[source] E),

    #[error("Watch cancelled")]
    Cancelled,
}

/// Poll `fetch` until it returns a terminal snapshot.
///
/// `on_transition` runs once for every snapshot whose key differs from the
/// previous one (the first snapshot always counts). There is no iteration
/// limit; between ticks the loop sleeps for `interval` and returns
/// `PollError::Cancelled` if `cancel` fires first. A request already in
/// flight is never interrupted.
pub async fn watch<T, E, F, Fut>(
    mut fetch: F,
    interval: Duration,
    cancel: &CancellationToken,
    mut on_transition: impl FnMut(&T),
) -> Result<Outcome<T>, PollError<E>>
where
    T: Polled,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_key: Option<T::Key> = None;
    let mut last_progress: Option<i64> = None;
    let mut ticks: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(PollError::Cancelled);
        }

        ticks += 1;
        let snapshot = fetch().await.map_err(PollError::Fetch)?;

        let key = snapshot.key();
        if last_key.as_ref() != Some(&key) {
            on_transition(&snapshot);
            last_key = Some(key);
        }

        if snapshot.is_terminal() {
            debug!(ticks, failed = snapshot.is_failure(), "Watched resource reached terminal state");
            return Ok(if snapshot.is_failure() {
                Outcome::Failed(snapshot)
            } else {
                Outcome::Succeeded(snapshot)
            });
        }

        if let Some(progress) = snapshot.progress() {
            if let Some(previous) = last_progress {
                if progress < previous {
                    warn!(previous, progress, "Stage went backwards while polling");
                }
            }
            last_progress = Some(progress);
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
