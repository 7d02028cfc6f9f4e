use crate::core::input::FRET_COUNT;
use crate::game::feedback::FeedbackRates;
use crate::game::timing::DEFAULT_CONVERGENCE_RATE;
use configparser::ini::Ini;
use log::{info, warn};
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

pub const CONFIG_INI_PATH: &str = "fretsync.ini";

const GUITAR_SECTION: &str = "Guitar";
const DEMO_SECTION: &str = "Demo";

/// Tunables of one guitar track.
#[derive(Debug, Clone, PartialEq)]
pub struct GuitarConfig {
    pub lanes: usize,
    pub board_width: f64,
    pub board_length: f64,
    pub beats_per_board: f64,
    pub tempo_convergence: f64,
    pub feedback: FeedbackRates,
    pub lefty_mode: bool,
}

impl Default for GuitarConfig {
    fn default() -> Self {
        Self {
            lanes: FRET_COUNT,
            board_width: 4.0,
            board_length: 12.0,
            beats_per_board: 5.0,
            tempo_convergence: DEFAULT_CONVERGENCE_RATE,
            feedback: FeedbackRates::default(),
            lefty_mode: false,
        }
    }
}

impl GuitarConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.lanes == 0 || self.lanes > FRET_COUNT {
            return Err(format!(
                "Lane count {} must be between 1 and {}",
                self.lanes, FRET_COUNT
            ));
        }
        if !(self.tempo_convergence > 0.0 && self.tempo_convergence < 1.0) {
            return Err(format!(
                "TempoConvergence {} must lie between 0 and 1",
                self.tempo_convergence
            ));
        }
        for (name, value) in [
            ("BoardWidth", self.board_width),
            ("BoardLength", self.board_length),
            ("BeatsPerBoard", self.beats_per_board),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} {} must be greater than zero", name, value));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub guitar: GuitarConfig,
    /// Fixed frame step of the headless demo, in milliseconds.
    pub tick_ms: f64,
    /// Print every demo frame as a JSON line on stdout.
    pub dump_frames: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            guitar: GuitarConfig::default(),
            tick_ms: 1000.0 / 60.0,
            dump_frames: false,
        }
    }
}

impl Config {
    pub fn from_ini(ini: &Ini) -> Result<Self, String> {
        let defaults = Config::default();
        let g = &defaults.guitar;

        let float = |section: &str, key: &str, default: f64| -> Result<f64, String> {
            Ok(ini.getfloat(section, key)?.unwrap_or(default))
        };

        let guitar = GuitarConfig {
            lanes: ini
                .getuint(GUITAR_SECTION, "Lanes")?
                .map_or(g.lanes, |v| v as usize),
            board_width: float(GUITAR_SECTION, "BoardWidth", g.board_width)?,
            board_length: float(GUITAR_SECTION, "BoardLength", g.board_length)?,
            beats_per_board: float(GUITAR_SECTION, "BeatsPerBoard", g.beats_per_board)?,
            tempo_convergence: float(GUITAR_SECTION, "TempoConvergence", g.tempo_convergence)?,
            feedback: FeedbackRates {
                press_weight: float(GUITAR_SECTION, "PressWeight", g.feedback.press_weight as f64)?
                    as f32,
                weight_decay: float(GUITAR_SECTION, "WeightDecay", g.feedback.weight_decay as f64)?
                    as f32,
                activity_rise: float(GUITAR_SECTION, "ActivityRise", g.feedback.activity_rise as f64)?
                    as f32,
                activity_decay: float(GUITAR_SECTION, "ActivityDecay", g.feedback.activity_decay as f64)?
                    as f32,
            },
            lefty_mode: ini
                .getboolcoerce(GUITAR_SECTION, "LeftyMode")?
                .unwrap_or(g.lefty_mode),
        };
        guitar.validate()?;

        let tick_ms = float(DEMO_SECTION, "TickMs", defaults.tick_ms)?;
        if !tick_ms.is_finite() || tick_ms <= 0.0 {
            return Err(format!("TickMs {} must be greater than zero", tick_ms));
        }

        Ok(Self {
            guitar,
            tick_ms,
            dump_frames: ini
                .getboolcoerce(DEMO_SECTION, "DumpFrames")?
                .unwrap_or(defaults.dump_frames),
        })
    }

    fn to_ini(&self) -> Ini {
        let mut conf = Ini::new();
        let g = &self.guitar;
        let mut set = |section: &str, key: &str, value: String| {
            conf.set(section, key, Some(value));
        };
        set(GUITAR_SECTION, "Lanes", g.lanes.to_string());
        set(GUITAR_SECTION, "BoardWidth", g.board_width.to_string());
        set(GUITAR_SECTION, "BoardLength", g.board_length.to_string());
        set(GUITAR_SECTION, "BeatsPerBoard", g.beats_per_board.to_string());
        set(GUITAR_SECTION, "TempoConvergence", g.tempo_convergence.to_string());
        set(GUITAR_SECTION, "PressWeight", g.feedback.press_weight.to_string());
        set(GUITAR_SECTION, "WeightDecay", g.feedback.weight_decay.to_string());
        set(GUITAR_SECTION, "ActivityRise", g.feedback.activity_rise.to_string());
        set(GUITAR_SECTION, "ActivityDecay", g.feedback.activity_decay.to_string());
        set(GUITAR_SECTION, "LeftyMode", if g.lefty_mode { "1" } else { "0" }.to_string());
        set(DEMO_SECTION, "TickMs", self.tick_ms.to_string());
        set(DEMO_SECTION, "DumpFrames", if self.dump_frames { "1" } else { "0" }.to_string());
        conf
    }
}

static CONFIG: Lazy<Mutex<Config>> = Lazy::new(|| Mutex::new(Config::default()));

fn create_default_file(path: &Path) -> Result<(), std::io::Error> {
    info!("Config file not found, writing defaults to '{}'.", path.display());
    Config::default().to_ini().write(path)
}

/// Loads `path` into the global config, writing a default file first if
/// there is none. Problems are logged and leave the defaults in place.
pub fn load_from(path: &Path) {
    if !path.exists() {
        if let Err(e) = create_default_file(path) {
            warn!("Failed to create default config file: {}", e);
            return;
        }
    }

    let mut conf = Ini::new();
    if let Err(e) = conf.load(path) {
        warn!("Failed to load '{}': {}. Using defaults.", path.display(), e);
        return;
    }

    match Config::from_ini(&conf) {
        Ok(config) => {
            info!("Loaded config from '{}'.", path.display());
            *CONFIG.lock().unwrap_or_else(PoisonError::into_inner) = config;
        }
        Err(e) => warn!("Invalid config in '{}': {}. Using defaults.", path.display(), e),
    }
}

pub fn load() {
    load_from(Path::new(CONFIG_INI_PATH));
}

/// Returns a copy of the currently loaded config.
pub fn get() -> Config {
    CONFIG.lock().unwrap_or_else(PoisonError::into_inner).clone()
}
