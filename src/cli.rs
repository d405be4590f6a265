use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tonelight", about = "Map the dominant pitches of a track onto colored lights")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    /// Write the per-frame JSON lines report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file (defaults to ./tonelight.toml, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Analysis frames per second
    #[arg(long, default_value_t = 10)]
    pub fps: u32,

    /// Highest frequency kept in the spectrogram (Hz)
    #[arg(long, default_value_t = 1500.0)]
    pub ceiling: f32,

    /// Minimum distance between key frequencies, in frequency bins
    #[arg(long, default_value_t = 5)]
    pub min_separation: usize,

    /// Minimum magnitude of a key frequency
    #[arg(long, default_value_t = 0.007)]
    pub min_height: f32,

    /// Number of LEDs; their frequencies are spread evenly up to --max-freq
    #[arg(long, default_value_t = 150)]
    pub leds: usize,

    /// Frequency of the last LED (Hz)
    #[arg(long, default_value_t = 1000.0)]
    pub max_freq: f32,

    /// Warm the peak and color caches for every frame before starting
    #[arg(long)]
    pub precompute: bool,

    /// Play the track and poll colors in real time instead of writing a report
    #[arg(long)]
    pub live: bool,

    /// Stop live mode after this many seconds (default: track length)
    #[arg(long)]
    pub seconds: Option<f64>,

    /// Stop at the end of the track instead of looping
    #[arg(long)]
    pub once: bool,
}
