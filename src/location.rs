//! The geolocation seam: a one-shot position query plus a continuous
//! watch, with an explicit release that guarantees no update is applied
//! afterwards.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::context::Context;
use crate::geo::Coordinate;

/// A single position fix from the platform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fix {
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
}

impl Fix {
    /// A fix stamped with the current time.
    pub fn now(coordinate: Coordinate) -> Self {
        Fix { coordinate, timestamp: Utc::now() }
    }
}

#[derive(Error, Debug, Clone)]
pub enum LocationError {
    /// The platform has no geolocation capability at all.
    #[error("geolocation is not supported here")]
    Unsupported,
    /// A position request failed or timed out.
    #[error("could not determine a position: {0}")]
    Unavailable(String),
}

/// Hints passed through to the platform subscription.
#[derive(Clone, Copy, Debug)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// Maximum acceptable age of a cached fix, in milliseconds.
    pub max_age_ms: u32,
}

impl Default for WatchOptions {
    fn default() -> Self {
        // Fresh, high-accuracy fixes.
        WatchOptions { high_accuracy: true, max_age_ms: 0 }
    }
}

/// The shared user-position cell.
///
/// Exactly one writer (the platform callback) and any number of readers
/// (the renderer, the locate action). Each push replaces the previous
/// fix; ordering beyond "last callback wins" is not needed. After
/// [`PositionFeed::release`] the stored fix is discarded and every later
/// push is dropped, so a late callback can never write into a torn-down
/// shell.
///
/// One-shot request failures land here too, as a pending notice for the
/// shell to surface.
#[derive(Clone, Debug, Default)]
pub struct PositionFeed {
    ctx: Context,
    state: Arc<Mutex<FeedState>>,
}

#[derive(Debug, Default)]
struct FeedState {
    fix: Option<Fix>,
    notice: Option<LocationError>,
}

impl PositionFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored fix. Dropped once the feed is released.
    pub fn push(&self, fix: Fix) {
        let mut state = self.state.lock().unwrap();
        if self.ctx.is_cancelled() {
            tracing::trace!("dropping fix delivered after release");
            return;
        }
        state.fix = Some(fix);
    }

    /// The most recent fix, if any has arrived.
    pub fn latest(&self) -> Option<Fix> {
        self.state.lock().unwrap().fix
    }

    /// Queue a blocking notice for the shell to surface.
    pub fn push_notice(&self, error: LocationError) {
        let mut state = self.state.lock().unwrap();
        if self.ctx.is_cancelled() {
            return;
        }
        state.notice = Some(error);
    }

    /// Take the pending notice, if any.
    pub fn take_notice(&self) -> Option<LocationError> {
        self.state.lock().unwrap().notice.take()
    }

    /// Sever the feed: the stored position is discarded and all later
    /// pushes are ignored. Idempotent.
    pub fn release(&self) {
        self.ctx.cancel();
        let mut state = self.state.lock().unwrap();
        state.fix = None;
        state.notice = None;
    }

    pub fn is_released(&self) -> bool {
        self.ctx.is_cancelled()
    }
}

/// A platform position provider.
///
/// Implementations deliver fixes into the provided feed. A synchronous
/// error means the capability is missing or the request could not start.
/// Asynchronous one-shot failures land in the feed as notices; watch
/// failures are logged by the implementation, which keeps tracking.
pub trait LocationSource {
    /// Start a one-shot position request.
    fn request_once(&mut self, feed: &PositionFeed) -> Result<(), LocationError>;

    /// Start continuous tracking into the feed, until the feed is
    /// released.
    fn watch(&mut self, feed: &PositionFeed) -> Result<(), LocationError>;
}

/// The nullary source: no geolocation capability at all.
pub struct NullLocationSource;

impl LocationSource for NullLocationSource {
    fn request_once(&mut self, _: &PositionFeed) -> Result<(), LocationError> {
        Err(LocationError::Unsupported)
    }

    fn watch(&mut self, _: &PositionFeed) -> Result<(), LocationError> {
        Err(LocationError::Unsupported)
    }
}

/// Scripted source for tests and the simulator.
///
/// Watch fixes are delivered only when the owner pumps
/// [`FakeLocationSource::deliver_next`], standing in for the platform's
/// callback cadence.
pub struct FakeLocationSource {
    fixes: Vec<Fix>,
    next: usize,
    feed: Option<PositionFeed>,
}

impl FakeLocationSource {
    pub fn new(fixes: Vec<Fix>) -> Self {
        FakeLocationSource { fixes, next: 0, feed: None }
    }

    /// A source scripted from bare `(latitude, longitude)` pairs.
    pub fn at(coordinates: &[(f64, f64)]) -> Self {
        Self::new(
            coordinates
                .iter()
                .map(|&(lat, lon)| Fix::now(Coordinate::new(lat, lon)))
                .collect(),
        )
    }

    /// Deliver the next scripted fix to the watching feed, as the
    /// platform would. Returns false once the script is exhausted or if
    /// nothing is watching.
    pub fn deliver_next(&mut self) -> bool {
        let Some(feed) = &self.feed else {
            return false;
        };
        let Some(fix) = self.fixes.get(self.next) else {
            return false;
        };
        feed.push(*fix);
        self.next += 1;
        true
    }
}

impl LocationSource for FakeLocationSource {
    fn request_once(&mut self, feed: &PositionFeed) -> Result<(), LocationError> {
        match self.fixes.get(self.next) {
            Some(fix) => {
                feed.push(*fix);
                self.next += 1;
                Ok(())
            }
            None => Err(LocationError::Unavailable("position script exhausted".into())),
        }
    }

    fn watch(&mut self, feed: &PositionFeed) -> Result<(), LocationError> {
        self.feed = Some(feed.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_push_wins() {
        let feed = PositionFeed::new();
        feed.push(Fix::now(Coordinate::new(-6.9, 107.6)));
        feed.push(Fix::now(Coordinate::new(-6.8, 107.7)));
        assert_eq!(feed.latest().unwrap().coordinate, Coordinate::new(-6.8, 107.7));
    }

    #[test]
    fn release_discards_position_and_blocks_late_deliveries() {
        let feed = PositionFeed::new();
        let mut source = FakeLocationSource::at(&[(-6.9, 107.6), (-6.8, 107.7)]);
        source.watch(&feed).unwrap();

        assert!(source.deliver_next());
        assert!(feed.latest().is_some());

        feed.release();
        assert!(feed.latest().is_none());

        // The platform delivers one more update after teardown.
        assert!(source.deliver_next());
        assert!(feed.latest().is_none());
    }

    #[test]
    fn release_is_idempotent() {
        let feed = PositionFeed::new();
        feed.release();
        feed.release();
        assert!(feed.is_released());
    }

    #[test]
    fn null_source_reports_unsupported() {
        let feed = PositionFeed::new();
        assert!(matches!(
            NullLocationSource.request_once(&feed),
            Err(LocationError::Unsupported)
        ));
        assert!(matches!(NullLocationSource.watch(&feed), Err(LocationError::Unsupported)));
    }

    #[test]
    fn exhausted_one_shot_is_unavailable() {
        let feed = PositionFeed::new();
        let mut source = FakeLocationSource::at(&[(-6.9, 107.6)]);
        assert!(source.request_once(&feed).is_ok());
        assert!(matches!(
            source.request_once(&feed),
            Err(LocationError::Unavailable(_))
        ));
    }

    #[test]
    fn notices_are_taken_once() {
        let feed = PositionFeed::new();
        feed.push_notice(LocationError::Unsupported);
        assert!(feed.take_notice().is_some());
        assert!(feed.take_notice().is_none());
    }
}
