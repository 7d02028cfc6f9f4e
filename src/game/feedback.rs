use serde::Serialize;

pub const PRESS_WEIGHT: f32 = 0.5;
/// Extra key lift while a pick action is held on a pressed fret.
pub const PICK_PRESS_BONUS: f32 = 0.25;

/// Per-tick rates of the fret animations. Ticks are milliseconds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FeedbackRates {
    pub press_weight: f32,
    pub weight_decay: f32,
    pub activity_rise: f32,
    pub activity_decay: f32,
}

impl Default for FeedbackRates {
    fn default() -> Self {
        Self {
            press_weight: PRESS_WEIGHT,
            weight_decay: 1.0 / 64.0,
            activity_rise: 1.0 / 32.0,
            activity_decay: 1.0 / 64.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct LaneFeedback {
    /// Press indicator, jumps up while the fret is down and falls off linearly.
    pub weight: f32,
    /// Glow indicator, ramps up while the lane is part of a held chord.
    pub activity: f32,
}

impl LaneFeedback {
    pub fn step(self, ticks: f32, pressed: bool, active: bool, rates: &FeedbackRates) -> Self {
        let weight = if pressed {
            rates.press_weight
        } else {
            (self.weight - ticks * rates.weight_decay).max(0.0)
        };
        let activity = if active {
            (self.activity + ticks * rates.activity_rise).min(1.0)
        } else {
            (self.activity - ticks * rates.activity_decay).max(0.0)
        };
        Self { weight, activity }
    }
}

/// Render-facing fret animation state, one entry per lane.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FretVisualState {
    lanes: Vec<LaneFeedback>,
}

impl FretVisualState {
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes: vec![LaneFeedback::default(); lanes],
        }
    }

    /// Advances every lane; `pressed` and `active` are queried per lane index.
    pub fn step(
        &mut self,
        ticks: f32,
        rates: &FeedbackRates,
        pressed: impl Fn(usize) -> bool,
        active: impl Fn(usize) -> bool,
    ) {
        for (lane, feedback) in self.lanes.iter_mut().enumerate() {
            *feedback = feedback.step(ticks, pressed(lane), active(lane), rates);
        }
    }

    pub fn lane(&self, lane: usize) -> LaneFeedback {
        self.lanes.get(lane).copied().unwrap_or_default()
    }

    pub fn lanes(&self) -> &[LaneFeedback] {
        &self.lanes
    }

    /// How far the fret key is pushed down for drawing.
    pub fn key_press(&self, lane: usize, picking: bool) -> f32 {
        let weight = self.lane(lane).weight;
        if weight > 0.0 && picking {
            weight + PICK_PRESS_BONUS
        } else {
            weight
        }
    }

    pub fn reset(&mut self) {
        self.lanes.fill(LaneFeedback::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_sets_weight_then_decays() {
        let rates = FeedbackRates::default();
        let lane = LaneFeedback::default().step(16.0, true, false, &rates);
        assert_eq!(lane.weight, 0.5);
        let lane = lane.step(16.0, false, false, &rates);
        assert_eq!(lane.weight, 0.25);
        let lane = lane.step(64.0, false, false, &rates);
        assert_eq!(lane.weight, 0.0);
    }

    #[test]
    fn activity_rises_faster_than_it_falls_and_stays_clamped() {
        let rates = FeedbackRates::default();
        let mut lane = LaneFeedback::default();
        lane = lane.step(16.0, false, true, &rates);
        assert_eq!(lane.activity, 0.5);
        lane = lane.step(64.0, false, true, &rates);
        assert_eq!(lane.activity, 1.0);
        lane = lane.step(16.0, false, false, &rates);
        assert_eq!(lane.activity, 0.75);
        lane = lane.step(1000.0, false, false, &rates);
        assert_eq!(lane.activity, 0.0);
    }

    #[test]
    fn identical_tick_sequences_replay_identically() {
        let rates = FeedbackRates::default();
        let ticks = [16.0, 17.0, 15.5, 33.3, 16.7, 8.0, 16.0, 16.0];
        let run = || {
            let mut state = FretVisualState::new(5);
            for (i, t) in ticks.iter().enumerate() {
                state.step(*t, &rates, |lane| (lane + i) % 3 == 0, |lane| lane == i % 5);
            }
            state
        };
        let a = run();
        let b = run();
        for lane in 0..5 {
            assert_eq!(a.lane(lane).weight.to_bits(), b.lane(lane).weight.to_bits());
            assert_eq!(a.lane(lane).activity.to_bits(), b.lane(lane).activity.to_bits());
        }
    }

    #[test]
    fn key_press_bonus_needs_weight_and_pick() {
        let rates = FeedbackRates::default();
        let mut state = FretVisualState::new(2);
        state.step(16.0, &rates, |lane| lane == 0, |_| false);
        assert_eq!(state.key_press(0, true), 0.75);
        assert_eq!(state.key_press(0, false), 0.5);
        assert_eq!(state.key_press(1, true), 0.0);
        assert_eq!(state.key_press(7, true), 0.0);
        state.reset();
        assert_eq!(state.lane(0), LaneFeedback::default());
    }
}
