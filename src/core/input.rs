use serde::Serialize;

/// Number of fret buttons on the controller.
pub const FRET_COUNT: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Action {
    Fret1 = 0,
    Fret2 = 1,
    Fret3 = 2,
    Fret4 = 3,
    Fret5 = 4,
    Pick1 = 5,
    Pick2 = 6,
}

pub const FRET_ACTIONS: [Action; FRET_COUNT] = [
    Action::Fret1,
    Action::Fret2,
    Action::Fret3,
    Action::Fret4,
    Action::Fret5,
];

impl Action {
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Anything that can be polled for the current state of a controller action.
pub trait ControlSource {
    fn get_state(&self, action: Action) -> bool;
}

/// Controller state captured once per frame.
///
/// All judgment within a frame reads from the same snapshot so a pick and the
/// frets it is checked against can never disagree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ControlSnapshot {
    pub frets: [bool; FRET_COUNT],
    pub picks: [bool; 2],
}

impl ControlSnapshot {
    pub fn capture<S: ControlSource + ?Sized>(source: &S) -> Self {
        let mut snapshot = Self::default();
        for (lane, action) in FRET_ACTIONS.iter().enumerate() {
            snapshot.frets[lane] = source.get_state(*action);
        }
        snapshot.picks = [
            source.get_state(Action::Pick1),
            source.get_state(Action::Pick2),
        ];
        snapshot
    }

    /// Snapshot with the given lanes held and the first pick action set to `pick`.
    pub fn holding(lanes: &[usize], pick: bool) -> Self {
        let mut snapshot = Self::default();
        for &lane in lanes {
            if let Some(slot) = snapshot.frets.get_mut(lane) {
                *slot = true;
            }
        }
        snapshot.picks[0] = pick;
        snapshot
    }

    #[inline(always)]
    pub fn is_fret_pressed(&self, lane: usize) -> bool {
        self.frets.get(lane).copied().unwrap_or(false)
    }

    #[inline(always)]
    pub fn is_picking(&self) -> bool {
        self.picks[0] || self.picks[1]
    }

    pub fn pressed_lanes(&self) -> impl Iterator<Item = usize> + '_ {
        self.frets
            .iter()
            .enumerate()
            .filter_map(|(lane, &down)| down.then_some(lane))
    }
}

impl ControlSource for ControlSnapshot {
    fn get_state(&self, action: Action) -> bool {
        match action {
            Action::Pick1 => self.picks[0],
            Action::Pick2 => self.picks[1],
            fret => self.frets[fret.index()],
        }
    }
}
