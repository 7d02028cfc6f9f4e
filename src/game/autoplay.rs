use crate::core::input::{Action, ControlSnapshot, ControlSource};
use crate::game::chart::Track;
use crate::game::hold::ActiveHold;

/// Plays a chart perfectly, for demos and replays.
///
/// Each frame it picks every chord whose time was crossed since the previous
/// frame and keeps the frets of the held chord down until its sustain ends.
/// Consecutive picks alternate between the two pick actions so back-to-back
/// chords still produce a fresh pick edge.
#[derive(Debug, Default, Clone)]
pub struct Autoplay {
    state: ControlSnapshot,
    next_pick: usize,
}

impl Autoplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, track: Option<&Track>, hold: Option<&ActiveHold>, position: f64, ticks: f64) {
        let mut state = ControlSnapshot::default();

        let due = track
            .map(|t| t.unplayed_notes(position - ticks, position))
            .unwrap_or_default();
        let first = due.iter().map(|n| n.time).reduce(f64::min);
        let chord: Vec<usize> = match first {
            Some(first) => due
                .iter()
                .filter(|n| n.time == first && n.time > position - ticks)
                .map(|n| n.lane)
                .collect(),
            None => Vec::new(),
        };

        if !chord.is_empty() {
            for lane in chord {
                if let Some(slot) = state.frets.get_mut(lane) {
                    *slot = true;
                }
            }
            state.picks[self.next_pick] = true;
            self.next_pick ^= 1;
        } else if let Some(hold) = hold.filter(|h| h.is_running(position)) {
            for lane in hold.lanes() {
                if let Some(slot) = state.frets.get_mut(lane) {
                    *slot = true;
                }
            }
        }

        self.state = state;
    }
}

impl ControlSource for Autoplay {
    fn get_state(&self, action: Action) -> bool {
        self.state.get_state(action)
    }
}
