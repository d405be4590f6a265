mod cli;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};

use cli::Cli;
use tonelight::audio::decode::decode_file;
use tonelight::color::wheel::linspace;
use tonelight::config::{self, Config};
use tonelight::{AudioOutput, EndOfTrack, Musician, SilentOutput};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let mut cfg = resolve_config(cli.config.as_deref())?;

    // CLI flags win wherever they differ from their defaults
    if cli.fps != 10 { cfg.analysis.frames_per_second = cli.fps; }
    if cli.ceiling != 1500.0 { cfg.analysis.frequency_ceiling_hz = cli.ceiling; }
    if cli.min_separation != 5 { cfg.peaks.min_separation = cli.min_separation; }
    if cli.min_height != 0.007 { cfg.peaks.min_height = cli.min_height; }
    if cli.leds != 150 { cfg.display.leds = cli.leds; }
    if cli.max_freq != 1000.0 { cfg.display.max_frequency_hz = cli.max_freq; }
    if cli.once { cfg.playback.end_of_track = EndOfTrack::Stop; }

    let settings = cfg.settings().context("Invalid analysis settings")?;

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }
    if cfg.display.leds == 0 {
        anyhow::bail!("At least one LED is required");
    }

    log::info!("tonelight - pitch-colored lights");
    log::info!("Input: {}", cli.input.display());
    log::info!(
        "Analysis: {} frames/s up to {:.0}Hz, peaks >= {} apart and >= {}",
        settings.frames_per_second,
        settings.frequency_ceiling_hz,
        settings.peaks.min_separation,
        settings.peaks.min_height
    );

    // 1. Decode audio
    log::info!("Decoding audio...");
    let waveform = decode_file(&cli.input)?;
    let duration = waveform.duration();

    // 2. Analyze
    log::info!("Analyzing audio...");
    let output: Box<dyn AudioOutput> = if cli.live {
        open_output()?
    } else {
        Box::new(SilentOutput::default())
    };
    let mut musician = Musician::new(waveform, settings, output)?;

    let leds = linspace(1.0, cfg.display.max_frequency_hz, cfg.display.leds);

    // 3. Optional cache warm-up
    if cli.precompute {
        let spinner = ProgressBar::new_spinner();
        spinner.set_message("Precomputing color spaces...");
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));
        musician.precompute_all_colorspaces(&leds)?;
        spinner.finish_and_clear();
    }

    // 4. Drive the consumer API
    if cli.live {
        let seconds = cli.seconds.unwrap_or(duration);
        log::info!("Live for {:.1}s with {} LEDs", seconds, leds.len());
        report::run_live(&mut musician, &leds, seconds)?;
    } else {
        let frames = match cli.output {
            Some(ref path) => {
                let file = std::fs::File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                let mut writer = std::io::BufWriter::new(file);
                report::write_report(&mut musician, &leds, &mut writer)?
            }
            None => {
                let stdout = std::io::stdout();
                let mut lock = stdout.lock();
                report::write_report(&mut musician, &leds, &mut lock)?
            }
        };
        log::info!("Wrote {} frames", frames);
    }

    let (peaks, colors) = musician.cache_stats();
    log::info!(
        "Cache: peaks {} entries ({} hits), colors {} entries ({} hits)",
        peaks.entries,
        peaks.hits,
        colors.entries,
        colors.hits
    );
    Ok(())
}

/// Config from an explicit path, or from the first auto-detected file
/// (./tonelight.toml, then the user config dirs), or defaults.
///
/// An explicit file that fails to load is an error. A discovered one is
/// skipped with a warning.
fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        let cfg = config::load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        return Ok(cfg);
    }

    let discovered = [
        Some(PathBuf::from("tonelight.toml")),
        dirs::home_dir()
            .map(|home| home.join(".config").join("tonelight").join("config.toml")),
        dirs::config_dir().map(|dir| dir.join("tonelight").join("config.toml")),
    ]
    .into_iter()
    .flatten()
    .find(|path| path.exists());

    match discovered {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                Ok(cfg)
            }
            Err(err) => {
                log::warn!("Ignoring config: {}", err);
                Ok(Config::default())
            }
        },
        None => Ok(Config::default()),
    }
}

#[cfg(feature = "playback")]
fn open_output() -> Result<Box<dyn AudioOutput>> {
    let output = tonelight::playback::output::RodioOutput::open_default()
        .context("Failed to open audio output")?;
    Ok(Box::new(output))
}

#[cfg(not(feature = "playback"))]
fn open_output() -> Result<Box<dyn AudioOutput>> {
    log::warn!(
        "Built without audio output; live mode runs silently. \
         Rebuild with: cargo build --features playback"
    );
    Ok(Box::new(SilentOutput::default()))
}
