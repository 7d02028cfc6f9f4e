use crate::config::GuitarConfig;
use crate::core::input::ControlSnapshot;
use crate::game::chart::Track;
use crate::game::feedback::FretVisualState;
use crate::game::hold::ActiveHold;
use crate::game::judgment::JudgmentWindows;
use crate::game::matcher;
use crate::game::note::{Event, NoteRef};
use crate::game::timing::TimelineClock;
use log::{debug, info};

/// Judgment and timing state of one player's guitar track.
///
/// Everything that reads the chart takes an `Option`, so a guitar can keep
/// animating with no chart loaded (as the editor does between songs); those
/// calls then judge nothing.
#[derive(Debug, Clone)]
pub struct Guitar {
    config: GuitarConfig,
    clock: TimelineClock,
    windows: JudgmentWindows,
    hold: Option<ActiveHold>,
    feedback: FretVisualState,
    editor_mode: bool,
    selected_string: usize,
    /// Milliseconds of ticks seen since creation; phases the animations.
    time: f64,
}

impl Guitar {
    pub fn new(config: GuitarConfig, initial_bpm: f64, editor_mode: bool) -> Result<Self, String> {
        config.validate()?;
        let clock = TimelineClock::new(initial_bpm, config.tempo_convergence)?;
        let windows = JudgmentWindows::from_bpm(clock.current_bpm());
        info!(
            "Guitar ready: {} lanes, {:.2} BPM, hit window {:.2}ms{}",
            config.lanes,
            initial_bpm,
            windows.late,
            if editor_mode { " (editor)" } else { "" }
        );
        Ok(Self {
            feedback: FretVisualState::new(config.lanes),
            config,
            clock,
            windows,
            hold: None,
            editor_mode,
            selected_string: 0,
            time: 0.0,
        })
    }

    #[inline(always)]
    pub fn lanes(&self) -> usize {
        self.config.lanes
    }

    pub fn config(&self) -> &GuitarConfig {
        &self.config
    }

    pub fn clock(&self) -> &TimelineClock {
        &self.clock
    }

    pub fn windows(&self) -> &JudgmentWindows {
        &self.windows
    }

    pub fn hold(&self) -> Option<&ActiveHold> {
        self.hold.as_ref()
    }

    pub fn feedback(&self) -> &FretVisualState {
        &self.feedback
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn is_editor_mode(&self) -> bool {
        self.editor_mode
    }

    pub fn is_lefty_mode(&self) -> bool {
        self.config.lefty_mode
    }

    pub fn set_lefty_mode(&mut self, lefty: bool) {
        self.config.lefty_mode = lefty;
    }

    // --- Editor string selection ---

    pub fn selected_string(&self) -> usize {
        self.selected_string
    }

    pub fn select_string(&mut self, string: usize) {
        self.selected_string = string % self.lanes();
    }

    pub fn select_previous_string(&mut self) {
        let lanes = self.lanes();
        self.selected_string = (self.selected_string + lanes - 1) % lanes;
    }

    pub fn select_next_string(&mut self) {
        self.selected_string = (self.selected_string + 1) % self.lanes();
    }

    // --- Tempo ---

    /// Scans the visible part of the chart for tempo markers and applies the
    /// ones the playhead has crossed.
    pub fn update_tempo(&mut self, track: Option<&Track>, position: f64) {
        let Some(track) = track else {
            return;
        };
        let period = self.clock.current_period();
        let start = position - period * 2.0;
        let end = position + period * self.config.beats_per_board;
        for (time, _, event) in track.get_events(start, end) {
            match event {
                Event::Tempo(tempo) => {
                    self.clock.observe_tempo(time, tempo.bpm, position);
                }
                Event::Note(_) => {}
            }
        }
    }

    /// Beat coordinate of the playhead, used to scroll the neck.
    pub fn beat_offset(&self, position: f64) -> f64 {
        self.clock.beat_at(position)
    }

    // --- Judgment ---

    pub fn required_notes(&self, track: Option<&Track>, position: f64) -> Vec<NoteRef> {
        track.map_or_else(Vec::new, |track| {
            matcher::required_notes(track, position, &self.windows)
        })
    }

    pub fn missed_notes(&self, track: Option<&Track>, position: f64) -> Vec<NoteRef> {
        track.map_or_else(Vec::new, |track| {
            matcher::missed_notes(track, position, &self.windows)
        })
    }

    pub fn controls_match_notes(&self, controls: &ControlSnapshot, notes: &[NoteRef]) -> bool {
        matcher::controls_match_notes(controls, notes)
    }

    pub fn are_notes_tappable(&self, notes: &[NoteRef]) -> Option<bool> {
        matcher::are_notes_tappable(notes)
    }

    /// Judges a pick at `position`. On a match the chord is marked played and
    /// becomes the active hold; otherwise any previous hold is dropped.
    pub fn start_pick(
        &mut self,
        track: Option<&mut Track>,
        position: f64,
        controls: &ControlSnapshot,
    ) -> bool {
        self.hold = None;
        let Some(track) = track else {
            return false;
        };

        let notes = matcher::required_notes(track, position, &self.windows);
        if !self.controls_match_notes(controls, &notes) {
            debug!(
                "Pick at {:.2}ms matched nothing ({} candidate notes)",
                position,
                notes.len()
            );
            return false;
        }

        for note in &notes {
            track.mark_played(note.id);
        }
        let hold = ActiveHold::new(position, notes);
        debug!(
            "Pick at {:.2}ms hit lanes {:?}, sustain from {:.2}ms",
            position,
            hold.lanes().collect::<Vec<_>>(),
            hold.pick_start
        );
        self.hold = Some(hold);
        true
    }

    /// Releases the active hold. Returns false when a sustain was let go
    /// earlier than the release window allows.
    pub fn end_pick(&mut self, position: f64) -> bool {
        let Some(hold) = self.hold.take() else {
            return true;
        };
        let ok = !hold.is_premature_release(position, self.windows.release);
        if !ok {
            debug!("Sustain released early at {:.2}ms", position);
        }
        ok
    }

    pub fn pick_length(&self, position: f64) -> f64 {
        self.hold.as_ref().map_or(0.0, |hold| hold.pick_length(position))
    }

    // --- Frame update ---

    fn is_lane_active(&self, lane: usize, controls: &ControlSnapshot) -> bool {
        if self.editor_mode {
            if !controls.is_picking() {
                return false;
            }
            let any_pressed = (0..self.lanes()).any(|l| controls.is_fret_pressed(l));
            if any_pressed {
                controls.is_fret_pressed(lane)
            } else {
                lane == self.selected_string
            }
        } else {
            self.hold.as_ref().is_some_and(|hold| hold.has_lane(lane))
        }
    }

    /// Advances animations and tempo by `ticks` milliseconds.
    ///
    /// Returns false when the active hold ran past the end of one of its
    /// notes on this frame; the hold is cleared at that point.
    pub fn run(&mut self, ticks: f64, position: f64, controls: &ControlSnapshot) -> bool {
        self.time += ticks;

        let active: Vec<bool> = (0..self.lanes())
            .map(|lane| self.is_lane_active(lane, controls))
            .collect();
        let editor_mode = self.editor_mode;
        let selected = self.selected_string;
        let rates = self.config.feedback;
        self.feedback.step(
            ticks as f32,
            &rates,
            |lane| controls.is_fret_pressed(lane) || (editor_mode && selected == lane),
            |lane| active[lane],
        );

        self.clock.advance();
        self.windows = JudgmentWindows::from_bpm(self.clock.current_bpm());

        match &self.hold {
            Some(hold) if !hold.is_running(position) => {
                debug!("Sustain ran its course at {:.2}ms", position);
                self.hold = None;
                false
            }
            _ => true,
        }
    }

    /// Drops hold and tempo history after the playhead jumps to `position`,
    /// picking the chart's tempo back up from there.
    pub fn reset(&mut self, track: Option<&Track>, position: f64) {
        self.hold = None;
        let bpm = track.map(|t| t.bpm_at(position));
        let last_change = track.and_then(|t| t.last_tempo_change(position));
        self.clock.reset(bpm, last_change);
        info!(
            "Guitar reset at {:.2}ms, tempo {:.2} BPM",
            position,
            self.clock.current_bpm()
        );
        self.windows = JudgmentWindows::from_bpm(self.clock.current_bpm());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::note::Note;

    fn guitar(bpm: f64) -> Guitar {
        Guitar::new(GuitarConfig::default(), bpm, false).unwrap()
    }

    fn single_note_track() -> Track {
        let mut track = Track::new();
        track.add_tempo(0.0, 120.0);
        track.add_note(1000.0, Note::new(0, 500.0));
        track
    }

    #[test]
    fn zero_lanes_is_a_construction_error() {
        let config = GuitarConfig {
            lanes: 0,
            ..Default::default()
        };
        assert!(Guitar::new(config, 120.0, false).is_err());
        assert!(Guitar::new(GuitarConfig::default(), 0.0, false).is_err());
    }

    #[test]
    fn hit_sustain_and_release() {
        let mut track = single_note_track();
        let mut g = guitar(120.0);
        let controls = ControlSnapshot::holding(&[0], true);

        assert!(g.start_pick(Some(&mut track), 990.0, &controls));
        assert!(track.note(1).unwrap().played);
        let hold = g.hold().unwrap();
        assert_eq!(hold.notes.len(), 1);
        assert_eq!(hold.notes[0].id, 1);
        assert_eq!(hold.pick_start, 1000.0);

        assert_eq!(g.pick_length(1200.0), 200.0);
        assert!(g.end_pick(1500.0));
        assert!(g.hold().is_none());
        assert_eq!(g.pick_length(1500.0), 0.0);
    }

    #[test]
    fn early_release_is_reported() {
        let mut track = single_note_track();
        let mut g = guitar(120.0);
        assert!(g.start_pick(Some(&mut track), 1000.0, &ControlSnapshot::holding(&[0], true)));
        // Release window at 120 BPM is 250ms.
        assert!(!g.end_pick(1200.0));
        assert!(g.hold().is_none());
    }

    #[test]
    fn release_inside_margin_is_fine() {
        let mut track = single_note_track();
        let mut g = guitar(120.0);
        assert!(g.start_pick(Some(&mut track), 1000.0, &ControlSnapshot::holding(&[0], true)));
        assert!(g.end_pick(1260.0));
    }

    #[test]
    fn failed_pick_clears_previous_hold() {
        let mut track = single_note_track();
        track.add_note(1100.0, Note::new(4, 0.0));
        let mut g = guitar(120.0);
        assert!(g.start_pick(Some(&mut track), 1000.0, &ControlSnapshot::holding(&[0], true)));
        assert!(g.hold().is_some());
        assert!(!g.start_pick(Some(&mut track), 1100.0, &ControlSnapshot::holding(&[2], true)));
        assert!(g.hold().is_none());
        assert!(!track.note(2).unwrap().played);
    }

    #[test]
    fn no_chart_judges_nothing() {
        let mut g = guitar(120.0);
        let controls = ControlSnapshot::holding(&[0], true);
        assert!(!g.start_pick(None, 1000.0, &controls));
        assert!(g.required_notes(None, 1000.0).is_empty());
        assert!(g.missed_notes(None, 1000.0).is_empty());
        g.update_tempo(None, 1000.0);
        assert!(g.run(16.0, 1000.0, &controls));
    }

    #[test]
    fn run_reports_hold_completion() {
        let mut track = single_note_track();
        let mut g = guitar(120.0);
        let controls = ControlSnapshot::holding(&[0], false);
        assert!(g.start_pick(Some(&mut track), 1000.0, &ControlSnapshot::holding(&[0], true)));
        assert!(g.run(16.0, 1400.0, &controls));
        assert!(g.hold().is_some());
        assert!(!g.run(16.0, 1500.5, &controls));
        assert!(g.hold().is_none());
    }

    #[test]
    fn frets_glow_while_held() {
        let mut track = single_note_track();
        let mut g = guitar(120.0);
        let controls = ControlSnapshot::holding(&[0], false);
        assert!(g.start_pick(Some(&mut track), 1000.0, &ControlSnapshot::holding(&[0], true)));
        g.run(16.0, 1016.0, &controls);
        assert_eq!(g.feedback().lane(0).weight, 0.5);
        assert_eq!(g.feedback().lane(0).activity, 0.5);
        assert_eq!(g.feedback().lane(1).activity, 0.0);
    }

    #[test]
    fn tempo_markers_retarget_and_windows_follow() {
        let mut track = Track::new();
        track.add_tempo(0.0, 120.0);
        track.add_tempo(1000.0, 240.0);
        let mut g = guitar(120.0);
        let controls = ControlSnapshot::default();

        g.update_tempo(Some(&track), 0.0);
        assert_eq!(g.clock().last_bpm_change(), Some(0.0));
        g.update_tempo(Some(&track), 1600.0);
        assert_eq!(g.clock().target_bpm(), 240.0);

        let before = g.windows().late;
        g.run(16.0, 1600.0, &controls);
        assert!(g.windows().late < before);
        assert_eq!(g.windows().late, 60000.0 / g.clock().current_bpm() / 3.5);
    }

    #[test]
    fn editor_selection_wraps() {
        let mut g = Guitar::new(GuitarConfig::default(), 120.0, true).unwrap();
        g.select_previous_string();
        assert_eq!(g.selected_string(), 4);
        g.select_next_string();
        assert_eq!(g.selected_string(), 0);
        g.select_string(7);
        assert_eq!(g.selected_string(), 2);
    }

    #[test]
    fn editor_mode_lights_selected_string_on_pick() {
        let mut g = Guitar::new(GuitarConfig::default(), 120.0, true).unwrap();
        g.select_string(3);
        g.run(16.0, 0.0, &ControlSnapshot::holding(&[], true));
        assert_eq!(g.feedback().lane(3).weight, 0.5);
        assert_eq!(g.feedback().lane(3).activity, 0.5);
        g.run(16.0, 0.0, &ControlSnapshot::holding(&[1], true));
        assert_eq!(g.feedback().lane(1).activity, 0.5);
        assert_eq!(g.feedback().lane(3).activity, 0.25);
    }

    #[test]
    fn reset_drops_hold_and_tempo_history() {
        let mut track = single_note_track();
        let mut g = guitar(120.0);
        g.update_tempo(Some(&track), 0.0);
        assert!(g.start_pick(Some(&mut track), 1000.0, &ControlSnapshot::holding(&[0], true)));
        g.reset(None, 1000.0);
        assert!(g.hold().is_none());
        assert_eq!(g.clock().last_bpm_change(), None);
    }

    #[test]
    fn reset_picks_up_the_chart_tempo() {
        let mut track = single_note_track();
        track.add_tempo(2000.0, 240.0);
        let mut g = guitar(120.0);
        g.reset(Some(&track), 3000.0);
        assert_eq!(g.clock().target_bpm(), 240.0);
        assert_eq!(g.clock().last_bpm_change(), Some(2000.0));
        assert_eq!(g.windows().late, 60000.0 / 240.0 / 3.5);
    }

    #[test]
    fn frets_past_a_short_neck_break_the_chord() {
        let config = GuitarConfig {
            lanes: 3,
            ..Default::default()
        };
        let mut track = single_note_track();
        let mut g = Guitar::new(config, 120.0, false).unwrap();
        assert!(!g.start_pick(Some(&mut track), 1000.0, &ControlSnapshot::holding(&[0, 4], true)));
        assert!(!track.note(1).unwrap().played);
        assert!(g.start_pick(Some(&mut track), 1000.0, &ControlSnapshot::holding(&[0], true)));
    }
}
