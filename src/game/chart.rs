use crate::game::note::{Event, EventId, Note, NoteRef, Tempo};
use log::debug;
use std::cmp::Ordering;

pub const DEFAULT_BPM: f64 = 120.0;

/// One playable track of a song: notes and tempo markers ordered by time.
///
/// Events never move once placed; they are addressed by their position in the
/// arena, which is what the judgment code holds on to between frames.
#[derive(Clone, Debug, Default)]
pub struct Track {
    events: Vec<(f64, Event)>,
    // Sorted view into `events`, kept in time order. Ties keep insertion order.
    order: Vec<EventId>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_note(&mut self, time: f64, note: Note) -> EventId {
        self.add_event(time, Event::Note(note))
    }

    pub fn add_tempo(&mut self, time: f64, bpm: f64) -> EventId {
        self.add_event(time, Event::Tempo(Tempo { bpm }))
    }

    pub fn add_event(&mut self, time: f64, event: Event) -> EventId {
        let id = self.events.len();
        self.events.push((time, event));
        let at = self.order.partition_point(|&other| self.events[other].0 <= time);
        self.order.insert(at, id);
        id
    }

    pub fn note(&self, id: EventId) -> Option<&Note> {
        self.events.get(id).and_then(|(_, event)| event.as_note())
    }

    /// All events with `start <= time <= end`, in time order.
    pub fn get_events(&self, start: f64, end: f64) -> impl Iterator<Item = (f64, EventId, &Event)> {
        let (start, end) = match start.partial_cmp(&end) {
            Some(Ordering::Greater) => (end, start),
            _ => (start, end),
        };
        let first = self.order.partition_point(|&id| self.events[id].0 < start);
        let last = self.order.partition_point(|&id| self.events[id].0 <= end);
        self.order[first..last.max(first)].iter().map(move |&id| {
            let (time, event) = &self.events[id];
            (*time, id, event)
        })
    }

    /// Notes inside `[start, end]` that have not been played yet.
    pub fn unplayed_notes(&self, start: f64, end: f64) -> Vec<NoteRef> {
        self.get_events(start, end)
            .filter_map(|(time, id, event)| match event {
                Event::Note(note) if !note.played => Some(NoteRef {
                    time,
                    id,
                    lane: note.lane,
                    length: note.length,
                    tappable: note.tappable,
                }),
                Event::Note(_) | Event::Tempo(_) => None,
            })
            .collect()
    }

    /// Marks a note as played. Returns false if it already was or if `id`
    /// is not a note.
    pub fn mark_played(&mut self, id: EventId) -> bool {
        match self.events.get_mut(id) {
            Some((_, Event::Note(note))) if !note.played => {
                note.played = true;
                true
            }
            _ => false,
        }
    }

    /// Marks every note in `notes` as handled so later queries skip them.
    pub fn consume(&mut self, notes: &[NoteRef]) {
        for note in notes {
            self.mark_played(note.id);
        }
    }

    /// Clears every played flag, used when a song restarts.
    pub fn reset_played(&mut self) {
        self.reset_played_from(f64::NEG_INFINITY);
    }

    /// Clears the played flag of notes at or after `from`, so a practice
    /// rewind can play them again.
    pub fn reset_played_from(&mut self, from: f64) {
        let mut cleared = 0usize;
        for (time, event) in &mut self.events {
            if let Event::Note(note) = event {
                if note.played && *time >= from {
                    note.played = false;
                    cleared += 1;
                }
            }
        }
        debug!("Track reset from {:.2}ms, {} notes cleared.", from, cleared);
    }

    pub fn bpm_at(&self, time: f64) -> f64 {
        let mut bpm = None;
        for &id in &self.order {
            let (event_time, event) = &self.events[id];
            if let Event::Tempo(tempo) = event {
                if *event_time > time && bpm.is_some() {
                    break;
                }
                bpm = Some(tempo.bpm);
            }
        }
        bpm.filter(|b| b.is_finite() && *b > 0.0).unwrap_or(DEFAULT_BPM)
    }

    /// Time of the last tempo marker at or before `time`.
    pub fn last_tempo_change(&self, time: f64) -> Option<f64> {
        let until = self.order.partition_point(|&id| self.events[id].0 <= time);
        self.order[..until].iter().rev().find_map(|&id| match &self.events[id] {
            (at, Event::Tempo(_)) => Some(*at),
            (_, Event::Note(_)) => None,
        })
    }

    pub fn end_time(&self) -> f64 {
        self.events
            .iter()
            .map(|(time, event)| match event {
                Event::Note(note) => time + note.length,
                Event::Tempo(_) => *time,
            })
            .fold(0.0, f64::max)
    }

    pub fn note_count(&self) -> usize {
        self.events
            .iter()
            .filter(|(_, event)| matches!(event, Event::Note(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Track {
        let mut track = Track::new();
        track.add_tempo(0.0, 120.0);
        track.add_note(1000.0, Note::new(0, 0.0));
        track.add_note(500.0, Note::new(1, 0.0));
        track.add_note(2000.0, Note::new(2, 250.0));
        track.add_tempo(1500.0, 90.0);
        track
    }

    #[test]
    fn events_come_back_in_time_order() {
        let track = track();
        let times: Vec<f64> = track.get_events(0.0, 5000.0).map(|(t, _, _)| t).collect();
        assert_eq!(times, vec![0.0, 500.0, 1000.0, 1500.0, 2000.0]);
    }

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let track = track();
        let times: Vec<f64> = track.get_events(500.0, 1000.0).map(|(t, _, _)| t).collect();
        assert_eq!(times, vec![500.0, 1000.0]);
    }

    #[test]
    fn reversed_window_is_normalized() {
        let track = track();
        assert_eq!(track.get_events(1000.0, 500.0).count(), 2);
    }

    #[test]
    fn played_notes_are_filtered_and_marked_once() {
        let mut track = track();
        let notes = track.unplayed_notes(0.0, 1200.0);
        assert_eq!(notes.len(), 2);
        assert!(track.mark_played(notes[0].id));
        assert!(!track.mark_played(notes[0].id));
        assert_eq!(track.unplayed_notes(0.0, 1200.0).len(), 1);
    }

    #[test]
    fn tempo_events_cannot_be_played() {
        let mut track = track();
        assert!(!track.mark_played(0));
    }

    #[test]
    fn reset_clears_played_flags() {
        let mut track = track();
        let notes = track.unplayed_notes(0.0, 5000.0);
        track.consume(&notes);
        assert!(track.unplayed_notes(0.0, 5000.0).is_empty());
        track.reset_played();
        assert_eq!(track.unplayed_notes(0.0, 5000.0).len(), 3);
    }

    #[test]
    fn partial_reset_keeps_earlier_notes_played() {
        let mut track = track();
        let notes = track.unplayed_notes(0.0, 5000.0);
        track.consume(&notes);
        track.reset_played_from(1000.0);
        let times: Vec<f64> = track.unplayed_notes(0.0, 5000.0).iter().map(|n| n.time).collect();
        assert_eq!(times, vec![1000.0, 2000.0]);
    }

    #[test]
    fn bpm_lookup_follows_markers() {
        let track = track();
        assert_eq!(track.bpm_at(0.0), 120.0);
        assert_eq!(track.bpm_at(1499.0), 120.0);
        assert_eq!(track.bpm_at(1500.0), 90.0);
        assert_eq!(Track::new().bpm_at(0.0), DEFAULT_BPM);
    }

    #[test]
    fn last_tempo_change_before_a_time() {
        let track = track();
        assert_eq!(track.last_tempo_change(1499.0), Some(0.0));
        assert_eq!(track.last_tempo_change(1500.0), Some(1500.0));
        assert_eq!(track.last_tempo_change(9000.0), Some(1500.0));
        assert_eq!(track.last_tempo_change(-1.0), None);
        assert_eq!(Track::new().last_tempo_change(0.0), None);
    }

    #[test]
    fn end_time_includes_sustains() {
        assert_eq!(track().end_time(), 2250.0);
        assert_eq!(track().note_count(), 3);
    }
}
