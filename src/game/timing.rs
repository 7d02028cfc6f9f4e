use log::{debug, warn};

pub const DEFAULT_CONVERGENCE_RATE: f64 = 0.03;
/// Below this distance the smoothed tempo snaps onto its target.
pub const BPM_EPSILON: f64 = 1e-6;

/// Tempo-aware playback clock.
///
/// Tempo changes are never applied instantly: `set_tempo` moves the target and
/// `advance` eases the displayed tempo towards it, so the scrolling neck never
/// pops when the chart changes speed.
#[derive(Debug, Clone)]
pub struct TimelineClock {
    current_bpm: f64,
    target_bpm: f64,
    /// Time of the last accepted tempo change; `None` until one is seen.
    last_bpm_change: Option<f64>,
    base_beat: f64,
    convergence_rate: f64,
}

impl TimelineClock {
    pub fn new(initial_bpm: f64, convergence_rate: f64) -> Result<Self, String> {
        if !initial_bpm.is_finite() || initial_bpm <= 0.0 {
            return Err(format!("Initial BPM {} must be greater than zero", initial_bpm));
        }
        if !(convergence_rate > 0.0 && convergence_rate < 1.0) {
            return Err(format!(
                "Tempo convergence rate {} must lie between 0 and 1",
                convergence_rate
            ));
        }
        Ok(Self {
            current_bpm: initial_bpm,
            target_bpm: initial_bpm,
            last_bpm_change: None,
            base_beat: 0.0,
            convergence_rate,
        })
    }

    #[inline(always)]
    pub fn current_bpm(&self) -> f64 {
        self.current_bpm
    }

    #[inline(always)]
    pub fn target_bpm(&self) -> f64 {
        self.target_bpm
    }

    #[inline(always)]
    pub fn last_bpm_change(&self) -> Option<f64> {
        self.last_bpm_change
    }

    #[inline(always)]
    pub fn base_beat(&self) -> f64 {
        self.base_beat
    }

    /// Milliseconds per beat at the smoothed tempo.
    #[inline(always)]
    pub fn current_period(&self) -> f64 {
        60000.0 / self.current_bpm
    }

    /// One smoothing step towards the target tempo.
    pub fn advance(&mut self) {
        let diff = self.target_bpm - self.current_bpm;
        if diff.abs() < BPM_EPSILON {
            self.current_bpm = self.target_bpm;
        } else {
            self.current_bpm += diff * self.convergence_rate;
        }
    }

    pub fn set_tempo(&mut self, bpm: f64, at_time: f64) {
        if !bpm.is_finite() || bpm <= 0.0 {
            warn!("Ignoring tempo change to {} BPM at {:.2}ms", bpm, at_time);
            return;
        }
        if let Some(last) = self.last_bpm_change {
            self.base_beat += (at_time - last) / self.current_period();
        }
        debug!(
            "Tempo change at {:.2}ms: {:.3} -> {:.3} BPM (base beat {:.3})",
            at_time, self.target_bpm, bpm, self.base_beat
        );
        self.target_bpm = bpm;
        self.last_bpm_change = Some(at_time);
    }

    /// Applies a tempo marker seen while scanning the chart around `position`.
    ///
    /// A marker is taken once it lies more than one beat behind the playhead,
    /// except the very first one, which is always taken. Markers at or before
    /// the last accepted change are ignored. Returns whether it was applied.
    pub fn observe_tempo(&mut self, time: f64, bpm: f64, position: f64) -> bool {
        let crossed = match self.last_bpm_change {
            None => true,
            Some(last) => position - time > self.current_period() && time > last,
        };
        if crossed {
            self.set_tempo(bpm, time);
        }
        crossed && self.last_bpm_change == Some(time)
    }

    /// Continuous beat coordinate of `time`.
    pub fn beat_at(&self, time: f64) -> f64 {
        let origin = self.last_bpm_change.unwrap_or(0.0);
        (time - origin) / self.current_period() + self.base_beat
    }

    /// Forgets accumulated tempo history after the playhead jumps.
    ///
    /// The clock restarts settled on `bpm` (or its current target when that is
    /// `None` or invalid), with `last_change` as the new beat origin. Markers at
    /// or before `last_change` are not applied again.
    pub fn reset(&mut self, bpm: Option<f64>, last_change: Option<f64>) {
        let bpm = bpm
            .filter(|b| b.is_finite() && *b > 0.0)
            .unwrap_or(self.target_bpm);
        self.current_bpm = bpm;
        self.target_bpm = bpm;
        self.last_bpm_change = last_change;
        self.base_beat = 0.0;
    }
}
