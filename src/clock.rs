//! # Playback Clock / Transport
//!
//! Shared play/pause/stop/seek state machine observed by the demuxer core.
//! The cycle between the two (core observes the clock, core also commands
//! the clock) is kept as two one-directional interfaces: the clock holds
//! `Weak` observer capabilities, the core holds an `Arc` command handle.
//!
//! Timekeeping here is deliberately simple wall-clock arithmetic; anything
//! smarter (audio-master clocks, drift correction) lives outside this crate.

use std::sync::Weak;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

// ============================================================================
// Status
// ============================================================================

/// Transport status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Stopped,
    Playing,
    Paused,
}

// ============================================================================
// Observer Capability
// ============================================================================

/// Transport event subscriber.
///
/// All methods default to no-ops so observers implement only what they
/// react to. `will_seek` fires before the clock position changes.
pub trait TransportObserver: Send + Sync {
    fn will_seek(&self, _position: Duration) {}
    fn did_play(&self) {}
    fn did_stop(&self) {}
}

// ============================================================================
// Clock
// ============================================================================

struct ClockState {
    status: PlaybackStatus,
    /// Accumulated position while not running
    base: Duration,
    /// Set while Playing
    started_at: Option<Instant>,
}

/// Shared playback clock and transport control
pub struct PlaybackClock {
    state: Mutex<ClockState>,
    observers: Mutex<Vec<Weak<dyn TransportObserver>>>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ClockState {
                status: PlaybackStatus::Stopped,
                base: Duration::ZERO,
                started_at: None,
            }),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.state.lock().status
    }

    /// Current playback position
    pub fn position(&self) -> Duration {
        let state = self.state.lock();
        match state.started_at {
            Some(started) => state.base + started.elapsed(),
            None => state.base,
        }
    }

    pub fn play(&self) {
        {
            let mut state = self.state.lock();
            if state.status == PlaybackStatus::Playing {
                return;
            }
            state.status = PlaybackStatus::Playing;
            state.started_at = Some(Instant::now());
        }
        self.notify(|obs| obs.did_play());
    }

    pub fn pause(&self) {
        let mut state = self.state.lock();
        if state.status != PlaybackStatus::Playing {
            return;
        }
        if let Some(started) = state.started_at.take() {
            state.base += started.elapsed();
        }
        state.status = PlaybackStatus::Paused;
    }

    pub fn stop(&self) {
        {
            let mut state = self.state.lock();
            if state.status == PlaybackStatus::Stopped {
                return;
            }
            state.status = PlaybackStatus::Stopped;
            state.base = Duration::ZERO;
            state.started_at = None;
        }
        self.notify(|obs| obs.did_stop());
    }

    /// Move the playback position.
    ///
    /// Observers are told via `will_seek` before the position changes so
    /// they can invalidate buffered data that predates the jump.
    pub fn seek_to(&self, position: Duration) {
        self.notify(|obs| obs.will_seek(position));

        let mut state = self.state.lock();
        state.base = position;
        if state.started_at.is_some() {
            state.started_at = Some(Instant::now());
        }
    }

    pub fn subscribe(&self, observer: Weak<dyn TransportObserver>) {
        self.observers.lock().push(observer);
    }

    pub fn unsubscribe(&self, observer: &Weak<dyn TransportObserver>) {
        self.observers
            .lock()
            .retain(|o| o.upgrade().is_some() && !o.ptr_eq(observer));
    }

    /// Upgrade live observers outside the lock, prune the dead ones
    fn notify<F: Fn(&dyn TransportObserver)>(&self, f: F) {
        let live: Vec<_> = {
            let mut observers = self.observers.lock();
            observers.retain(|o| o.upgrade().is_some());
            observers.iter().filter_map(|o| o.upgrade()).collect()
        };
        for obs in live {
            f(obs.as_ref());
        }
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingObserver {
        seeks: AtomicUsize,
        stops: AtomicUsize,
    }

    impl TransportObserver for CountingObserver {
        fn will_seek(&self, _position: Duration) {
            self.seeks.fetch_add(1, Ordering::SeqCst);
        }
        fn did_stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_status_transitions() {
        let clock = PlaybackClock::new();
        assert_eq!(clock.status(), PlaybackStatus::Stopped);

        clock.play();
        assert_eq!(clock.status(), PlaybackStatus::Playing);

        clock.pause();
        assert_eq!(clock.status(), PlaybackStatus::Paused);

        clock.stop();
        assert_eq!(clock.status(), PlaybackStatus::Stopped);
        assert_eq!(clock.position(), Duration::ZERO);
    }

    #[test]
    fn test_pause_from_stopped_is_noop() {
        let clock = PlaybackClock::new();
        clock.pause();
        assert_eq!(clock.status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn test_seek_moves_position() {
        let clock = PlaybackClock::new();
        clock.seek_to(Duration::from_secs(42));
        assert_eq!(clock.position(), Duration::from_secs(42));
    }

    #[test]
    fn test_observer_notified_and_pruned() {
        let clock = PlaybackClock::new();
        let obs = Arc::new(CountingObserver {
            seeks: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        });
        let weak: Weak<dyn TransportObserver> =
            Arc::downgrade(&(obs.clone() as Arc<dyn TransportObserver>));
        clock.subscribe(weak);

        clock.seek_to(Duration::from_secs(1));
        clock.play();
        clock.stop();
        assert_eq!(obs.seeks.load(Ordering::SeqCst), 1);
        assert_eq!(obs.stops.load(Ordering::SeqCst), 1);

        // Dropped observers stop receiving events
        drop(obs);
        clock.seek_to(Duration::from_secs(2));
        assert!(clock.observers.lock().is_empty());
    }
}
