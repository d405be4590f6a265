use serde::Deserialize;
use std::time::Instant;

/// What to do when the wall clock runs past the end of the track while it is
/// still marked as playing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndOfTrack {
    /// Restart the track from the beginning.
    #[default]
    Loop,
    /// Stop playback and hold the final frame for that query.
    Stop,
}

/// Result of reading the playback clock at some wall-clock instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClockReading {
    NotStarted,
    Running(f64),
    /// Elapsed time exceeded the track duration by `overrun` seconds.
    Ended { overrun: f64 },
}

/// Maps wall-clock instants onto seconds into the track.
///
/// Reading the clock never changes it; restarting is up to the owner.
#[derive(Clone, Debug)]
pub struct PlaybackClock {
    started_at: Option<Instant>,
    duration: f64,
}

impl PlaybackClock {
    pub fn new(duration: f64) -> Self {
        Self {
            started_at: None,
            duration,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
    }

    pub fn reset(&mut self) {
        self.started_at = None;
    }

    pub fn reading(&self, now: Instant) -> ClockReading {
        let Some(start) = self.started_at else {
            return ClockReading::NotStarted;
        };
        // Instants before the start read as zero rather than negative time.
        let elapsed = now.saturating_duration_since(start).as_secs_f64();
        if elapsed > self.duration {
            ClockReading::Ended {
                overrun: elapsed - self.duration,
            }
        } else {
            ClockReading::Running(elapsed)
        }
    }

    /// Seconds into the track at `now`, saturating at the track end.
    pub fn elapsed_seconds(&self, now: Instant) -> f64 {
        match self.reading(now) {
            ClockReading::NotStarted => 0.0,
            ClockReading::Running(t) => t,
            ClockReading::Ended { .. } => self.duration,
        }
    }
}
