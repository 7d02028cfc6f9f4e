use crate::game::chart::DEFAULT_BPM;
use log::warn;
use serde::Serialize;

/// Notes closer together than this (in ms) are judged as one chord.
pub const CHORD_EPSILON_MS: f64 = 1e-3;

/// Fraction of a beat a player may be early or late and still hit.
pub const HIT_WINDOW_BEAT_DIVISOR: f64 = 3.5;
/// Fraction of a beat a sustain may be released before its end.
pub const RELEASE_WINDOW_BEAT_DIVISOR: f64 = 2.0;

/// Timing tolerances around a note's nominal time, in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct JudgmentWindows {
    pub early: f64,
    pub late: f64,
    pub release: f64,
}

impl JudgmentWindows {
    pub fn from_bpm(bpm: f64) -> Self {
        let bpm = if bpm.is_finite() && bpm > 0.0 {
            bpm
        } else {
            warn!("Judgment windows requested for {} BPM; using {}.", bpm, DEFAULT_BPM);
            DEFAULT_BPM
        };
        let period = 60000.0 / bpm;
        Self {
            early: period / HIT_WINDOW_BEAT_DIVISOR,
            late: period / HIT_WINDOW_BEAT_DIVISOR,
            release: period / RELEASE_WINDOW_BEAT_DIVISOR,
        }
    }

    /// Window in which unplayed notes can still be hit.
    #[inline(always)]
    pub fn hit_range(&self, position: f64) -> (f64, f64) {
        (position - self.late, position + self.early)
    }

    /// Window in which unplayed notes are reported as missed.
    #[inline(always)]
    pub fn miss_range(&self, position: f64) -> (f64, f64) {
        (position - 2.0 * self.late, position - self.late)
    }
}

impl Default for JudgmentWindows {
    fn default() -> Self {
        Self::from_bpm(DEFAULT_BPM)
    }
}
