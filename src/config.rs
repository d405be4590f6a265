use serde::Deserialize;
use std::path::Path;

use crate::analysis::peaks::PeakSettings;
use crate::error::{Error, Result};
use crate::playback::clock::EndOfTrack;

/// On-disk configuration (`tonelight.toml`). Every field has a default.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub peaks: PeaksConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_frames_per_second")]
    pub frames_per_second: u32,
    #[serde(default = "default_frequency_ceiling")]
    pub frequency_ceiling_hz: f32,
}

#[derive(Debug, Deserialize)]
pub struct PeaksConfig {
    #[serde(default = "default_min_separation")]
    pub min_separation: usize,
    #[serde(default = "default_min_height")]
    pub min_height: f32,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub end_of_track: EndOfTrack,
}

#[derive(Debug, Default, Deserialize)]
pub struct CacheConfig {
    /// Maximum entries per cache; absent means unbounded for the session.
    #[serde(default)]
    pub capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_leds")]
    pub leds: usize,
    #[serde(default = "default_max_frequency")]
    pub max_frequency_hz: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frames_per_second: default_frames_per_second(),
            frequency_ceiling_hz: default_frequency_ceiling(),
        }
    }
}

impl Default for PeaksConfig {
    fn default() -> Self {
        Self {
            min_separation: default_min_separation(),
            min_height: default_min_height(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            leds: default_leds(),
            max_frequency_hz: default_max_frequency(),
        }
    }
}

fn default_frames_per_second() -> u32 { 10 }
fn default_frequency_ceiling() -> f32 { 1500.0 }
fn default_min_separation() -> usize { 5 }
fn default_min_height() -> f32 { 0.007 }
fn default_leds() -> usize { 150 }
fn default_max_frequency() -> f32 { 1000.0 }

impl Config {
    /// Validated analysis parameters for a [`crate::Musician`].
    pub fn settings(&self) -> Result<AnalysisSettings> {
        let settings = AnalysisSettings {
            frames_per_second: self.analysis.frames_per_second,
            frequency_ceiling_hz: self.analysis.frequency_ceiling_hz,
            peaks: PeakSettings {
                min_separation: self.peaks.min_separation,
                min_height: self.peaks.min_height,
            },
            end_of_track: self.playback.end_of_track,
            cache_capacity: self.cache.capacity,
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Tunable analysis parameters, checked before any analysis runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnalysisSettings {
    pub frames_per_second: u32,
    pub frequency_ceiling_hz: f32,
    pub peaks: PeakSettings,
    pub end_of_track: EndOfTrack,
    pub cache_capacity: Option<usize>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            frames_per_second: default_frames_per_second(),
            frequency_ceiling_hz: default_frequency_ceiling(),
            peaks: PeakSettings::default(),
            end_of_track: EndOfTrack::default(),
            cache_capacity: None,
        }
    }
}

impl AnalysisSettings {
    pub fn validate(&self) -> Result<()> {
        if self.frames_per_second == 0 {
            return Err(Error::Configuration(
                "frames_per_second must be positive".into(),
            ));
        }
        if !self.frequency_ceiling_hz.is_finite() || self.frequency_ceiling_hz < 0.0 {
            return Err(Error::Configuration(format!(
                "frequency ceiling must be a non-negative number of Hz, got {}",
                self.frequency_ceiling_hz
            )));
        }
        if self.cache_capacity == Some(0) {
            return Err(Error::Configuration("cache capacity must be positive".into()));
        }
        self.peaks.validate()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Configuration(format!("cannot read {}: {}", path.display(), e))
    })?;
    toml::from_str(&content)
        .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))
}
