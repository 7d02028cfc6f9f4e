use fretsync::config;
use fretsync::core::input::ControlSnapshot;
use fretsync::game::autoplay::Autoplay;
use fretsync::game::chart::Track;
use fretsync::game::gameplay::{Outcome, Session};
use fretsync::game::guitar::Guitar;
use fretsync::game::note::Note;
use log::{error, info, LevelFilter};
use std::error::Error;
use std::io::{self, Write};

/// Tail after the last note so the final sustain and miss windows play out.
const DEMO_TAIL_MS: f64 = 2000.0;

#[derive(Debug, Default)]
struct Tally {
    hits: u32,
    hammer_ons: u32,
    bad_picks: u32,
    missed: u32,
    early_releases: u32,
    sustain_ms: f64,
}

impl Tally {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Hit { hammer_on, .. } => {
                self.hits += 1;
                if *hammer_on {
                    self.hammer_ons += 1;
                }
            }
            Outcome::BadPick { .. } => self.bad_picks += 1,
            Outcome::Missed { notes } => self.missed += notes.len() as u32,
            Outcome::Released { ok, held_ms } => {
                if !ok {
                    self.early_releases += 1;
                }
                self.sustain_ms += held_ms;
            }
            Outcome::HoldComplete { held_ms } => self.sustain_ms += held_ms,
        }
    }
}

/// A short built-in chart: single notes, chords, a hammer-on run, sustains
/// and a tempo change halfway through.
fn demo_track() -> Track {
    let mut track = Track::new();
    track.add_tempo(0.0, 120.0);

    let beat = 500.0;
    for (i, lane) in [0, 1, 2, 1, 0, 2, 3, 4].iter().enumerate() {
        track.add_note(2000.0 + i as f64 * beat, Note::new(*lane, 0.0));
    }
    for (i, lanes) in [[0, 2], [1, 3], [2, 4], [0, 4]].iter().enumerate() {
        for lane in lanes {
            track.add_note(6000.0 + i as f64 * beat * 2.0, Note::new(*lane, beat));
        }
    }

    track.add_tempo(10000.0, 160.0);
    let beat = 60000.0 / 160.0;
    track.add_note(10500.0, Note::new(0, 0.0));
    for (i, lane) in [1, 2, 3].iter().enumerate() {
        track.add_note(10500.0 + (i + 1) as f64 * beat / 2.0, Note::new(*lane, 0.0).tappable());
    }
    track.add_note(12500.0, Note::new(2, beat * 4.0));
    track
}

fn run_demo(config: &config::Config) -> Result<Tally, Box<dyn Error>> {
    let track = demo_track();
    let guitar = Guitar::new(config.guitar.clone(), track.bpm_at(0.0), false)?;
    let end = track.end_time() + DEMO_TAIL_MS;
    let mut session = Session::new(guitar, Some(track));
    let mut autoplay = Autoplay::new();
    let mut tally = Tally::default();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut position = 0.0;
    while position < end {
        position += config.tick_ms;
        autoplay.update(session.track(), session.guitar().hold(), position, config.tick_ms);
        let controls = ControlSnapshot::capture(&autoplay);

        for outcome in session.tick(config.tick_ms, position, &controls) {
            tally.record(&outcome);
        }

        if config.dump_frames {
            serde_json::to_writer(&mut out, &session.frame(&controls))?;
            writeln!(out)?;
        }
    }
    Ok(tally)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .filter_module("fretsync::game::guitar", LevelFilter::Info)
        .filter_module("fretsync::game::timing", LevelFilter::Info)
        .init();

    info!("fretsync demo starting...");
    config::load();
    let config = config::get();

    let tally = match run_demo(&config) {
        Ok(tally) => tally,
        Err(e) => {
            error!("Demo failed: {}", e);
            return Err(e);
        }
    };

    info!(
        "Demo finished: {} hits ({} hammer-ons), {} missed, {} bad picks, {} early releases, {:.0}ms sustained",
        tally.hits,
        tally.hammer_ons,
        tally.missed,
        tally.bad_picks,
        tally.early_releases,
        tally.sustain_ms
    );
    Ok(())
}
