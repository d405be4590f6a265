use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};

use crate::audio::waveform::Waveform;
use crate::error::{Error, Result};

/// Taper fraction of the analysis window.
const TUKEY_ALPHA: f64 = 0.25;

/// Time-frequency magnitude matrix of one track.
///
/// `magnitude(i, j)` is the magnitude of `frequencies()[i]` at
/// `frame_times()[j]`. Columns are stored contiguously so a single frame can be
/// handed out as a slice.
#[derive(Clone, Debug)]
pub struct Spectrogram {
    frequencies: Vec<f32>,
    frame_times: Vec<f64>,
    frames: Vec<Vec<f32>>,
}

impl Spectrogram {
    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    pub fn frame_times(&self) -> &[f64] {
        &self.frame_times
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn num_bins(&self) -> usize {
        self.frequencies.len()
    }

    /// Magnitude column for analysis frame `index`.
    pub fn frame(&self, index: usize) -> &[f32] {
        &self.frames[index]
    }

    pub fn magnitude(&self, bin: usize, frame: usize) -> f32 {
        self.frames[frame][bin]
    }

    /// Largest magnitude anywhere in the matrix; a natural plot extent.
    pub fn max_magnitude(&self) -> f32 {
        self.frames
            .iter()
            .flat_map(|f| f.iter().copied())
            .fold(0.0f32, f32::max)
    }

    /// Insertion point of `seconds` among the frame times (first frame whose
    /// time is not below it), clamped to the last frame.
    pub fn frame_index_for(&self, seconds: f64) -> usize {
        let idx = self.frame_times.partition_point(|&t| t < seconds);
        idx.min(self.frame_times.len().saturating_sub(1))
    }
}

/// Window length in samples for `frames_per_second` analysis frames.
pub fn window_length(sample_rate: u32, frames_per_second: u32) -> Result<usize> {
    if frames_per_second == 0 {
        return Err(Error::Configuration("frames_per_second must be positive".into()));
    }
    let window = (sample_rate / frames_per_second) as usize;
    if window < 2 {
        return Err(Error::Configuration(format!(
            "{} frames/s at {}Hz gives a {}-sample window; at least 2 are needed",
            frames_per_second, sample_rate, window
        )));
    }
    Ok(window)
}

/// Compute the magnitude spectrogram of `waveform` with non-overlapping
/// windows, keeping bins up to and including the first at or above
/// `frequency_ceiling_hz`.
pub fn build(
    waveform: &Waveform,
    frames_per_second: u32,
    frequency_ceiling_hz: f32,
) -> Result<Spectrogram> {
    if !frequency_ceiling_hz.is_finite() || frequency_ceiling_hz < 0.0 {
        return Err(Error::Configuration(format!(
            "frequency ceiling must be a non-negative number of Hz, got {}",
            frequency_ceiling_hz
        )));
    }
    let sample_rate = waveform.sample_rate();
    let window = window_length(sample_rate, frames_per_second)?;

    if waveform.is_empty() {
        return Err(Error::EmptyInput("waveform has no samples"));
    }
    let mono = waveform.downmix();
    if mono.len() < window {
        return Err(Error::TooShort {
            samples: mono.len(),
            window,
        });
    }

    let sr = sample_rate as f32;
    let all_bins = window / 2 + 1;
    let keep = (0..all_bins)
        .position(|k| bin_frequency(k, sr, window) >= frequency_ceiling_hz)
        .map_or(all_bins, |i| i + 1);
    let frequencies: Vec<f32> = (0..keep).map(|k| bin_frequency(k, sr, window)).collect();

    let num_frames = (mono.len() - window) / window + 1;
    let frame_times: Vec<f64> = (0..num_frames)
        .map(|j| (window as f64 / 2.0 + (j * window) as f64) / sample_rate as f64)
        .collect();

    let taper = tukey_window(window, TUKEY_ALPHA);
    let power: f32 = taper.iter().map(|w| w * w).sum();
    let scale = (1.0 / (sr * power)).sqrt();

    log::info!(
        "Spectrogram: {} frames x {} bins (window {} samples, {:.1}Hz resolution, ceiling {:.0}Hz)",
        num_frames,
        keep,
        window,
        sr / window as f32,
        frequency_ceiling_hz
    );

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(window);

    let frames: Vec<Vec<f32>> = (0..num_frames)
        .into_par_iter()
        .map(|j| {
            let segment = &mono[j * window..(j + 1) * window];
            let mean = segment.iter().sum::<f32>() / window as f32;

            let mut buffer: Vec<Complex<f32>> = segment
                .iter()
                .zip(taper.iter())
                .map(|(&s, &w)| Complex::new((s - mean) * w, 0.0))
                .collect();
            fft.process(&mut buffer);

            buffer[..keep].iter().map(|c| c.norm() * scale).collect()
        })
        .collect();

    Ok(Spectrogram {
        frequencies,
        frame_times,
        frames,
    })
}

fn bin_frequency(bin: usize, sample_rate: f32, window: usize) -> f32 {
    bin as f32 * sample_rate / window as f32
}

/// Periodic Tukey window: flat top with cosine tapers over `alpha` of its length.
fn tukey_window(size: usize, alpha: f64) -> Vec<f32> {
    // Periodic form: symmetric window one sample longer, last sample dropped.
    let m = size + 1;
    let span = (m - 1) as f64;
    let width = (alpha * span / 2.0).floor() as usize;
    (0..size)
        .map(|n| {
            let x = n as f64;
            let w = if n <= width {
                0.5 * (1.0 + (std::f64::consts::PI * (-1.0 + 2.0 * x / alpha / span)).cos())
            } else if n < m - width - 1 {
                1.0
            } else {
                0.5 * (1.0
                    + (std::f64::consts::PI * (-2.0 / alpha + 1.0 + 2.0 * x / alpha / span)).cos())
            };
            w as f32
        })
        .collect()
}
