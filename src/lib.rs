//! Note judgment and timing core of a five-fret guitar rhythm game.
//!
//! A [`game::gameplay::Session`] is ticked once per frame with a control
//! snapshot; it keeps the tempo clock, the hittable-note windows, held
//! sustains and the fret animations in step with the playhead and reports
//! what happened for scoring. Rendering, audio and chart loading live
//! elsewhere.

pub mod config;
pub mod core;
pub mod game;
