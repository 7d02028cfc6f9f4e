use crate::core::input::{ControlSnapshot, FRET_COUNT};
use crate::game::chart::Track;
use crate::game::judgment::{CHORD_EPSILON_MS, JudgmentWindows};
use crate::game::note::NoteRef;

/// Unplayed notes that can be hit at `position`.
///
/// When notes at several times fall inside the window only the earliest chord
/// is returned; notes within `CHORD_EPSILON_MS` of it count as part of it.
pub fn required_notes(track: &Track, position: f64, windows: &JudgmentWindows) -> Vec<NoteRef> {
    let (start, end) = windows.hit_range(position);
    let mut notes = track.unplayed_notes(start, end);
    if let Some(first) = notes.iter().map(|n| n.time).reduce(f64::min) {
        notes.retain(|n| n.time - first < CHORD_EPSILON_MS);
    }
    notes
}

/// Unplayed notes that slid out of the late window at `position`.
///
/// The caller is expected to consume them so they are reported once.
pub fn missed_notes(track: &Track, position: f64, windows: &JudgmentWindows) -> Vec<NoteRef> {
    let (start, end) = windows.miss_range(position);
    track.unplayed_notes(start, end)
}

/// Groups notes starting within `CHORD_EPSILON_MS` of each other, keeping
/// time order.
pub fn chords(notes: &[NoteRef]) -> Vec<Vec<&NoteRef>> {
    let mut chords: Vec<Vec<&NoteRef>> = Vec::new();
    for note in notes {
        match chords
            .iter_mut()
            .find(|chord| (chord[0].time - note.time).abs() < CHORD_EPSILON_MS)
        {
            Some(chord) => chord.push(note),
            None => chords.push(vec![note]),
        }
    }
    chords.sort_by(|a, b| a[0].time.total_cmp(&b[0].time));
    chords
}

/// Whether the held frets play every chord in `notes`.
///
/// Every required lane must be down. Extra frets below the highest required
/// lane are tolerated so a sustain can chain into the next chord; extra frets
/// above it are not. Every fret on the controller is checked, including ones
/// past the lanes a chart uses. An empty set never matches.
pub fn controls_match_notes(controls: &ControlSnapshot, notes: &[NoteRef]) -> bool {
    if notes.is_empty() {
        return false;
    }

    chords(notes).iter().all(|chord| {
        let Some(highest) = chord.iter().map(|n| n.lane).max() else {
            return false;
        };
        (0..FRET_COUNT).all(|lane| {
            let required = chord.iter().any(|n| n.lane == lane);
            let pressed = controls.is_fret_pressed(lane);
            if required {
                pressed
            } else {
                !pressed || lane < highest
            }
        })
    })
}

/// `None` for an empty set, otherwise whether every note may be hammered on.
pub fn are_notes_tappable(notes: &[NoteRef]) -> Option<bool> {
    if notes.is_empty() {
        return None;
    }
    Some(notes.iter().all(|n| n.tappable))
}
