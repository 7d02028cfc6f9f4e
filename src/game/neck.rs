//! Render-facing projection of the guitar neck.
//!
//! Nothing here draws. These functions turn judged state into the positions,
//! fades and waveform samples a renderer needs, in board units: `x` across the
//! neck, `z` away from the strike line.

use crate::core::input::ControlSnapshot;
use crate::game::chart::Track;
use crate::game::feedback::LaneFeedback;
use crate::game::guitar::Guitar;
use crate::game::judgment::JudgmentWindows;
use crate::game::note::Event;
use serde::Serialize;
use std::f64::consts::PI;

/// Upper bound on waveform segments per held note.
pub const MAX_WAVEFORM_SAMPLES: usize = 4096;
/// Segment length at the tail end of a waveform, in ms.
const WAVEFORM_TAIL_STEP: f64 = 10.0;
/// Fraction of the board over which notes fade in at the far end.
const FAR_FADE_START: f64 = 0.8;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NoteSprite {
    pub lane: usize,
    pub x: f64,
    pub z: f64,
    pub length: f64,
    pub fade: f64,
    /// Missed note drawn flattened and grey behind the strike line.
    pub flat: bool,
    /// Played note whose head has passed; only the remaining tail is drawn.
    pub tail_only: bool,
    pub tappable: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Bar {
    pub z: f64,
    pub fade: f64,
    /// Whole-beat line, drawn brighter than the editor's subdivisions.
    pub major: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct WaveSegment {
    pub z: f64,
    pub z_end: f64,
    pub amplitude: f64,
    pub amplitude_end: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WaveformTrail {
    pub lane: usize,
    pub x: f64,
    pub segments: Vec<WaveSegment>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct FretKey {
    pub lane: usize,
    pub x: f64,
    pub press: f32,
    pub feedback: LaneFeedback,
    /// Pulse of the glow sprite in [-1, 1], phased to the held chord.
    pub glow_pulse: f64,
}

/// Everything a renderer needs for one frame of one guitar.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderFrame {
    pub position: f64,
    pub beat_offset: f64,
    pub neck_scroll: f64,
    pub bpm: f64,
    pub windows: JudgmentWindows,
    pub lefty: bool,
    pub controls: ControlSnapshot,
    pub held_lanes: Vec<usize>,
    pub frets: Vec<FretKey>,
    pub bars: Vec<Bar>,
    pub notes: Vec<NoteSprite>,
    pub trails: Vec<WaveformTrail>,
}

fn far_fade(z: f64, board_length: f64) -> Option<f64> {
    (z > board_length * FAR_FADE_START)
        .then(|| (board_length - z) / (board_length * (1.0 - FAR_FADE_START)))
}

impl Guitar {
    fn beats_per_unit(&self) -> f64 {
        self.config().beats_per_board / self.config().board_length
    }

    /// Board units per millisecond at the current tempo.
    fn projection(&self) -> f64 {
        1.0 / self.clock().current_period() / self.beats_per_unit()
    }

    pub fn lane_x(&self, lane: usize) -> f64 {
        let w = self.config().board_width / self.lanes() as f64;
        let x = ((self.lanes() / 2) as f64 - lane as f64) * w;
        if self.is_lefty_mode() { -x } else { x }
    }

    /// Texture coordinate of the neck at the strike line.
    pub fn neck_scroll(&self, position: f64) -> f64 {
        0.5 * self.beat_offset(position) / self.beats_per_unit()
    }

    /// Beat lines between the strike line and the far end of the board.
    pub fn bars(&self, position: f64) -> Vec<Bar> {
        let beats_per_unit = self.beats_per_unit();
        let board_length = self.config().board_length;
        let origin = self.clock().last_bpm_change().unwrap_or(0.0);
        let current_beat = (position - origin) / self.clock().current_period();
        let step = if self.is_editor_mode() { 0.25 } else { 1.0 };

        let mut bars = Vec::new();
        let mut beat = current_beat.trunc();
        while beat < current_beat + self.config().beats_per_board {
            let z = (beat - current_beat) / beats_per_unit;
            let fade = far_fade(z, board_length)
                .unwrap_or(if z < 0.0 { (1.0 + z).max(0.0) } else { 1.0 });
            bars.push(Bar {
                z,
                fade,
                major: beat.fract().abs() < 1e-3,
            });
            beat += step;
        }
        bars
    }

    /// Notes in view, positioned relative to the strike line.
    pub fn note_sprites(&self, track: Option<&Track>, position: f64) -> Vec<NoteSprite> {
        let Some(track) = track else {
            return Vec::new();
        };
        let period = self.clock().current_period();
        let proj = self.projection();
        let board_length = self.config().board_length;
        let start = position - period * 2.0;
        let end = position + period * self.config().beats_per_board;

        let mut sprites = Vec::new();
        for (time, _, event) in track.get_events(start, end) {
            let note = match event {
                Event::Note(note) => note,
                Event::Tempo(_) => continue,
            };

            let mut z = (time - position) * proj;
            let z_end = (time + note.length - position) * proj;
            let fade = far_fade(z, board_length).unwrap_or(if z < 0.0 {
                (1.0 + z_end).clamp(0.0, 1.0)
            } else {
                1.0
            });
            let mut length = note.length * proj;
            let mut flat = false;
            let mut tail_only = false;

            if z < 0.0 {
                if note.played {
                    tail_only = true;
                    length += z;
                    z = 0.0;
                    if length <= 0.0 {
                        continue;
                    }
                } else {
                    flat = true;
                }
            }

            sprites.push(NoteSprite {
                lane: note.lane,
                x: self.lane_x(note.lane),
                z,
                length,
                fade,
                flat,
                tail_only,
                tappable: note.tappable,
            });
        }
        sprites
    }

    /// Waveforms drawn over the sustains currently being held.
    ///
    /// Segments start at the end of each note and walk back towards the
    /// strike line, finer near the note end and coarser near the player.
    pub fn waveform_trails(&self, position: f64) -> Vec<WaveformTrail> {
        let Some(hold) = self.hold() else {
            return Vec::new();
        };
        let proj = self.projection();
        let time = self.time();

        hold.notes
            .iter()
            .filter_map(|note| {
                let end = note.end_time();
                let dt = end - position;
                if dt < 1e-3 {
                    return None;
                }

                let lane = note.lane as f64;
                let wave = |t: f64| {
                    let u = ((t - note.time) * -0.1 + position - note.time) / 64.0 + 0.0001;
                    ((lane + time * -0.01 + t * 0.03).sin() + (lane + time * 0.01 + t * 0.02).cos())
                        * 0.1
                        + 0.1
                        + u.sin() / (5.0 * u)
                };

                let head_step = dt * proj * 25.0;
                let step_growth = (WAVEFORM_TAIL_STEP - head_step) / dt;
                let mut t = end;
                let mut step = head_step;
                let mut amplitude = 0.0;
                let mut segments = Vec::new();

                while t > note.time && t - step > position && segments.len() < MAX_WAVEFORM_SAMPLES {
                    let next = wave(t - step);
                    segments.push(WaveSegment {
                        z: (t - position) * proj,
                        z_end: (t - step - position) * proj,
                        amplitude,
                        amplitude_end: next,
                    });
                    t -= step;
                    amplitude = next;
                    step = head_step + step_growth * (end - t);
                }

                Some(WaveformTrail {
                    lane: note.lane,
                    x: self.lane_x(note.lane),
                    segments,
                })
            })
            .collect()
    }

    pub fn fret_keys(&self, controls: &ControlSnapshot) -> Vec<FretKey> {
        let time = self.time();
        let glow_pulse = match self.hold().and_then(|h| h.start_time()) {
            Some(start) => (PI + (time - start) * 0.01).cos(),
            None => (time * 0.01).cos(),
        };
        (0..self.lanes())
            .map(|lane| FretKey {
                lane,
                x: self.lane_x(lane),
                press: self.feedback().key_press(lane, controls.is_picking()),
                feedback: self.feedback().lane(lane),
                glow_pulse,
            })
            .collect()
    }

    pub fn frame(&self, track: Option<&Track>, position: f64, controls: &ControlSnapshot) -> RenderFrame {
        RenderFrame {
            position,
            beat_offset: self.beat_offset(position),
            neck_scroll: self.neck_scroll(position),
            bpm: self.clock().current_bpm(),
            windows: *self.windows(),
            lefty: self.is_lefty_mode(),
            controls: *controls,
            held_lanes: self.hold().map(|h| h.lanes().collect()).unwrap_or_default(),
            frets: self.fret_keys(controls),
            bars: if track.is_some() { self.bars(position) } else { Vec::new() },
            notes: self.note_sprites(track, position),
            trails: self.waveform_trails(position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuitarConfig;
    use crate::game::note::Note;

    fn guitar() -> Guitar {
        Guitar::new(GuitarConfig::default(), 120.0, false).unwrap()
    }

    #[test]
    fn lanes_are_laid_out_and_mirrored() {
        let mut g = guitar();
        // 5 lanes on a 4 unit board: 0.8 units apart, centred on lane 2.
        assert!((g.lane_x(0) - 1.6).abs() < 1e-9);
        assert_eq!(g.lane_x(2), 0.0);
        assert!((g.lane_x(4) + 1.6).abs() < 1e-9);
        g.set_lefty_mode(true);
        assert!((g.lane_x(0) + 1.6).abs() < 1e-9);
    }

    #[test]
    fn sprites_project_onto_the_board() {
        let mut track = Track::new();
        track.add_note(1500.0, Note::new(1, 500.0));
        let g = guitar();
        let sprites = g.note_sprites(Some(&track), 1000.0);
        assert_eq!(sprites.len(), 1);
        // One beat (500ms) ahead is 12 / 5 board units.
        assert!((sprites[0].z - 2.4).abs() < 1e-9);
        assert!((sprites[0].length - 2.4).abs() < 1e-9);
        assert_eq!(sprites[0].fade, 1.0);
        assert!(!sprites[0].flat && !sprites[0].tail_only);
    }

    #[test]
    fn passed_notes_are_flattened_or_clipped() {
        let mut track = Track::new();
        let missed = track.add_note(900.0, Note::new(0, 0.0));
        let played = track.add_note(900.0, Note::new(1, 500.0));
        track.mark_played(played);
        let g = guitar();
        let sprites = g.note_sprites(Some(&track), 1000.0);
        assert_eq!(sprites.len(), 2);
        let flat = sprites.iter().find(|s| s.lane == 0).unwrap();
        assert!(flat.flat);
        let tail = sprites.iter().find(|s| s.lane == 1).unwrap();
        assert!(tail.tail_only);
        assert_eq!(tail.z, 0.0);
        assert!((tail.length - 1.92).abs() < 1e-9);
        assert!(!track.note(missed).unwrap().played);
    }

    #[test]
    fn fully_passed_tail_is_dropped() {
        let mut track = Track::new();
        let id = track.add_note(900.0, Note::new(1, 50.0));
        track.mark_played(id);
        assert!(guitar().note_sprites(Some(&track), 1000.0).is_empty());
        assert!(guitar().note_sprites(None, 1000.0).is_empty());
    }

    #[test]
    fn bars_cover_the_board() {
        let g = guitar();
        let bars = g.bars(0.0);
        assert_eq!(bars.len(), 5);
        assert!(bars.iter().all(|b| b.major));
        assert_eq!(bars[0].z, 0.0);

        // Half a beat in: one bar behind the strike line, one at the far end.
        let bars = g.bars(250.0);
        assert_eq!(bars.len(), 6);
        assert_eq!(bars[0].fade, 0.0);
        assert_eq!(bars[1].fade, 1.0);
        assert!((bars[5].fade - 0.5).abs() < 1e-9);

        let editor = Guitar::new(GuitarConfig::default(), 120.0, true).unwrap();
        let bars = editor.bars(0.0);
        assert_eq!(bars.len(), 20);
        assert_eq!(bars.iter().filter(|b| b.major).count(), 5);
    }

    #[test]
    fn waveform_follows_the_held_sustain() {
        let mut track = Track::new();
        track.add_note(1000.0, Note::new(0, 1000.0));
        let mut g = guitar();
        assert!(g.waveform_trails(1000.0).is_empty());
        assert!(g.start_pick(Some(&mut track), 1000.0, &ControlSnapshot::holding(&[0], true)));

        let trails = g.waveform_trails(1200.0);
        assert_eq!(trails.len(), 1);
        let segments = &trails[0].segments;
        assert!(!segments.is_empty());
        assert!(segments.len() <= MAX_WAVEFORM_SAMPLES);
        assert!(segments.iter().all(|s| s.z > s.z_end && s.z_end > 0.0));
        assert_eq!(segments[0].amplitude, 0.0);
        assert_eq!(g.waveform_trails(1200.0), trails);
    }

    #[test]
    fn frame_collects_render_state() {
        let mut track = Track::new();
        track.add_tempo(0.0, 120.0);
        track.add_note(1000.0, Note::new(2, 0.0));
        let mut g = guitar();
        let controls = ControlSnapshot::holding(&[2], true);
        g.update_tempo(Some(&track), 0.0);
        g.run(16.0, 0.0, &controls);
        let frame = g.frame(Some(&track), 500.0, &controls);
        assert_eq!(frame.frets.len(), 5);
        assert_eq!(frame.frets[2].press, 0.75);
        assert_eq!(frame.notes.len(), 1);
        assert!((frame.beat_offset - 1.0).abs() < 1e-9);
        assert!(frame.held_lanes.is_empty());
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"neck_scroll\""));
    }
}
