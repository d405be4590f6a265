//! Real-time pitch-to-color analysis of an audio track.
//!
//! A [`Musician`] precomputes a spectrogram of a decoded track, then answers
//! queries keyed by wall-clock time while the track plays: the current
//! periodogram, its key frequencies (spectral peaks), and a color for any set
//! of frequencies, where hue follows pitch class and brightness follows
//! distance to the nearest key frequency.

pub mod analysis;
pub mod audio;
pub mod color;
pub mod config;
pub mod error;
pub mod musician;
pub mod playback;

pub use audio::waveform::Waveform;
pub use color::wheel::Rgb;
pub use config::{AnalysisSettings, Config};
pub use error::{Error, Result};
pub use musician::{KeyFrequencies, Musician, Periodogram};
pub use playback::clock::EndOfTrack;
pub use playback::output::{AudioOutput, PlaybackHandle, SilentOutput};
