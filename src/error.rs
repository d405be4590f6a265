use thiserror::Error;

/// Errors surfaced by the analysis core.
///
/// A key frequency sitting exactly on its gradient boundary is not an error;
/// the color mapper resolves it locally.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    #[error("waveform has {samples} samples, fewer than one analysis window of {window}")]
    TooShort { samples: usize, window: usize },

    #[error("audio output failed: {0}")]
    Playback(String),

    #[error("failed to decode audio: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, Error>;
