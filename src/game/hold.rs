use crate::game::note::NoteRef;

/// Chord being sustained after a successful pick.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveHold {
    /// Where sustain credit starts counting; never earlier than the chord itself.
    pub pick_start: f64,
    pub notes: Vec<NoteRef>,
}

impl ActiveHold {
    pub fn new(position: f64, notes: Vec<NoteRef>) -> Self {
        let pick_start = notes.iter().map(|n| n.time).fold(position, f64::max);
        Self { pick_start, notes }
    }

    /// How long the chord has been held, capped by its shortest note.
    pub fn pick_length(&self, position: f64) -> f64 {
        self.notes
            .iter()
            .map(|n| n.length)
            .fold(position - self.pick_start, f64::min)
            .max(0.0)
    }

    /// False once the playhead has passed the end of any held note.
    pub fn is_running(&self, position: f64) -> bool {
        self.notes.iter().all(|n| position <= n.end_time())
    }

    /// Whether letting go at `position` cuts a sustain short by more than `release_margin`.
    pub fn is_premature_release(&self, position: f64, release_margin: f64) -> bool {
        self.notes
            .iter()
            .any(|n| n.end_time() > position + release_margin)
    }

    pub fn has_lane(&self, lane: usize) -> bool {
        self.notes.iter().any(|n| n.lane == lane)
    }

    pub fn lanes(&self) -> impl Iterator<Item = usize> + '_ {
        self.notes.iter().map(|n| n.lane)
    }

    /// Time of the chord's first note, used to phase the glow animation.
    pub fn start_time(&self) -> Option<f64> {
        self.notes.first().map(|n| n.time)
    }
}
