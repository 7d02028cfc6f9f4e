use crate::core::input::ControlSnapshot;
use crate::game::chart::Track;
use crate::game::guitar::Guitar;
use crate::game::neck::RenderFrame;
use crate::game::note::NoteRef;
use log::{debug, info};

/// Gameplay result of one frame, handed to whoever keeps score.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// A chord was hit, by a pick or (for tappable notes) a hammer-on.
    Hit { notes: Vec<NoteRef>, hammer_on: bool },
    /// A pick that matched nothing.
    BadPick { position: f64 },
    /// Notes that left the late window unplayed.
    Missed { notes: Vec<NoteRef> },
    /// The held chord was let go; `ok` is false when released too early.
    Released { ok: bool, held_ms: f64 },
    /// The held chord reached the end of its sustain.
    HoldComplete { held_ms: f64 },
}

/// One player's guitar track driven frame by frame.
pub struct Session {
    guitar: Guitar,
    track: Option<Track>,
    prev_controls: ControlSnapshot,
    /// Whether the most recent judged chord was hit; hammer-ons chain off it.
    last_chord_hit: bool,
    position: f64,
}

impl Session {
    pub fn new(guitar: Guitar, track: Option<Track>) -> Self {
        if let Some(track) = &track {
            info!(
                "Session started with {} notes ending at {:.2}ms",
                track.note_count(),
                track.end_time()
            );
        } else {
            info!("Session started without a chart");
        }
        Self {
            guitar,
            track,
            prev_controls: ControlSnapshot::default(),
            last_chord_hit: false,
            position: 0.0,
        }
    }

    pub fn guitar(&self) -> &Guitar {
        &self.guitar
    }

    pub fn guitar_mut(&mut self) -> &mut Guitar {
        &mut self.guitar
    }

    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    pub fn set_track(&mut self, track: Option<Track>) {
        self.track = track;
        self.seek(self.position);
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn frame(&self, controls: &ControlSnapshot) -> RenderFrame {
        self.guitar.frame(self.track.as_ref(), self.position, controls)
    }

    /// Runs one frame: `ticks` milliseconds elapsed, the playhead is at
    /// `position`, and `controls` is this frame's input snapshot.
    pub fn tick(&mut self, ticks: f64, position: f64, controls: &ControlSnapshot) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        self.position = position;
        self.guitar.update_tempo(self.track.as_ref(), position);

        self.process_release(position, controls, &mut outcomes);

        let picked = controls
            .picks
            .iter()
            .zip(self.prev_controls.picks.iter())
            .any(|(&now, &before)| now && !before);
        let fretted = (0..self.guitar.lanes())
            .any(|lane| controls.is_fret_pressed(lane) && !self.prev_controls.is_fret_pressed(lane));

        if picked {
            self.process_pick(position, controls, &mut outcomes);
        } else if fretted {
            self.process_hammer_on(position, controls, &mut outcomes);
        }

        let missed = self.guitar.missed_notes(self.track.as_ref(), position);
        if !missed.is_empty() {
            if let Some(track) = self.track.as_mut() {
                track.consume(&missed);
            }
            info!(
                "MISSED: {} notes at {:.2}ms (lanes {:?})",
                missed.len(),
                position,
                missed.iter().map(|n| n.lane).collect::<Vec<_>>()
            );
            self.last_chord_hit = false;
            outcomes.push(Outcome::Missed { notes: missed });
        }

        let held_ms = self.guitar.pick_length(position);
        if !self.guitar.run(ticks, position, controls) {
            outcomes.push(Outcome::HoldComplete { held_ms });
        }

        self.prev_controls = *controls;
        outcomes
    }

    fn process_release(&mut self, position: f64, controls: &ControlSnapshot, outcomes: &mut Vec<Outcome>) {
        let Some(hold) = self.guitar.hold() else {
            return;
        };
        if hold.lanes().all(|lane| controls.is_fret_pressed(lane)) {
            return;
        }
        let held_ms = hold.pick_length(position);
        let ok = self.guitar.end_pick(position);
        debug!("Released at {:.2}ms after {:.2}ms (ok: {})", position, held_ms, ok);
        if !ok {
            self.last_chord_hit = false;
        }
        outcomes.push(Outcome::Released { ok, held_ms });
    }

    fn process_pick(&mut self, position: f64, controls: &ControlSnapshot, outcomes: &mut Vec<Outcome>) {
        if self.guitar.start_pick(self.track.as_mut(), position, controls) {
            let notes = self.guitar.hold().map(|h| h.notes.clone()).unwrap_or_default();
            info!(
                "HIT: lanes {:?} at {:.2}ms",
                notes.iter().map(|n| n.lane).collect::<Vec<_>>(),
                position
            );
            self.last_chord_hit = true;
            outcomes.push(Outcome::Hit {
                notes,
                hammer_on: false,
            });
        } else {
            info!(
                "BAD PICK at {:.2}ms (frets {:?})",
                position,
                controls.pressed_lanes().collect::<Vec<_>>()
            );
            self.last_chord_hit = false;
            outcomes.push(Outcome::BadPick { position });
        }
    }

    /// Fret press without a pick. Only tappable chords right after a hit
    /// count; anything else is ignored rather than penalised.
    fn process_hammer_on(&mut self, position: f64, controls: &ControlSnapshot, outcomes: &mut Vec<Outcome>) {
        if !self.last_chord_hit {
            return;
        }
        let required = self.guitar.required_notes(self.track.as_ref(), position);
        if self.guitar.are_notes_tappable(&required) != Some(true) {
            return;
        }
        if !self.guitar.controls_match_notes(controls, &required) {
            return;
        }
        if self.guitar.start_pick(self.track.as_mut(), position, controls) {
            let notes = self.guitar.hold().map(|h| h.notes.clone()).unwrap_or_default();
            info!(
                "HAMMER-ON: lanes {:?} at {:.2}ms",
                notes.iter().map(|n| n.lane).collect::<Vec<_>>(),
                position
            );
            outcomes.push(Outcome::Hit {
                notes,
                hammer_on: true,
            });
        }
    }

    /// Moves the playhead without playing through the gap.
    ///
    /// Rewinding makes the notes after the new position playable again.
    pub fn seek(&mut self, position: f64) {
        info!("Seek from {:.2}ms to {:.2}ms", self.position, position);
        if position < self.position {
            if let Some(track) = self.track.as_mut() {
                track.reset_played_from(position);
            }
        }
        self.guitar.reset(self.track.as_ref(), position);
        self.prev_controls = ControlSnapshot::default();
        self.last_chord_hit = false;
        self.position = position;
    }
}
