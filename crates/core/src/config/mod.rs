use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BeatVizError, Result};

/// MIDI realtime clock pulses per quarter note.
pub const MIDI_CLOCK_PPQN: u32 = 24;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub clock: ClockConfig,
    pub surface: SurfaceConfig,
    pub scene: SceneConfig,
    /// Seeds every animation RNG when set, making spawns reproducible.
    pub seed: Option<u64>,
}

impl AppConfig {
    pub fn live_defaults() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let clock = &self.clock;
        if clock.resolution == 0 || clock.resolution % MIDI_CLOCK_PPQN != 0 {
            return Err(BeatVizError::InvalidConfig(format!(
                "clock resolution {} must be a non-zero multiple of {MIDI_CLOCK_PPQN}",
                clock.resolution
            )));
        }
        if !(clock.bpm.is_finite() && clock.bpm > 0.0) {
            return Err(BeatVizError::InvalidConfig(format!(
                "bpm {} must be positive",
                clock.bpm
            )));
        }
        if clock.cycle_beats == 0 {
            return Err(BeatVizError::InvalidConfig(
                "cycle_beats must be at least 1".to_string(),
            ));
        }

        let surface = &self.surface;
        if surface.page_width == 0 || surface.page_width > surface.tracks_max {
            return Err(BeatVizError::InvalidConfig(format!(
                "page width {} must be within 1..={}",
                surface.page_width, surface.tracks_max
            )));
        }
        if surface.knobs_per_track > surface.knobs_max {
            return Err(BeatVizError::InvalidConfig(format!(
                "knobs per track {} exceeds the {} registered knob rows",
                surface.knobs_per_track, surface.knobs_max
            )));
        }
        Ok(())
    }
}

/// Clock resolution and internal tempo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Ticks per quarter note.
    pub resolution: u32,
    pub bpm: f64,
    /// Length of the group-relative pulse cycle, in beats.
    pub cycle_beats: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            resolution: MIDI_CLOCK_PPQN,
            bpm: 120.0,
            cycle_beats: 16,
        }
    }
}

/// Shape of the physical control surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Tracks visible at once.
    pub page_width: usize,
    /// Continuous controls bound per visible track.
    pub knobs_per_track: usize,
    /// Track roles registered with the transport.
    pub tracks_max: usize,
    /// Knob rows registered per track.
    pub knobs_max: usize,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            page_width: 8,
            knobs_per_track: 2,
            tracks_max: 40,
            knobs_max: 4,
        }
    }
}

/// Dimensions of the rendered region, in pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 240,
            height: 160,
        }
    }
}
