/// Index of an event inside the `Track` that owns it.
pub type EventId = usize;

#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    pub lane: usize,
    /// Sustain length in milliseconds. Zero for plain taps.
    pub length: f64,
    pub tappable: bool,
    /// Set once by the matcher when the note is hit (or consumed as missed).
    pub played: bool,
}

impl Note {
    pub fn new(lane: usize, length: f64) -> Self {
        Self {
            lane,
            length,
            tappable: false,
            played: false,
        }
    }

    pub fn tappable(mut self) -> Self {
        self.tappable = true;
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tempo {
    pub bpm: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Note(Note),
    Tempo(Tempo),
}

impl Event {
    pub fn as_note(&self) -> Option<&Note> {
        match self {
            Event::Note(note) => Some(note),
            Event::Tempo(_) => None,
        }
    }
}

/// A note picked out of a chart window, addressed by its arena position.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteRef {
    pub time: f64,
    pub id: EventId,
    pub lane: usize,
    pub length: f64,
    pub tappable: bool,
}

impl NoteRef {
    #[inline(always)]
    pub fn end_time(&self) -> f64 {
        self.time + self.length
    }
}
