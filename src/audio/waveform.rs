use crate::error::{Error, Result};

/// Decoded audio: interleaved samples in [-1.0, 1.0] plus their layout.
///
/// Immutable once built; the analysis core only ever reads it.
#[derive(Clone, Debug)]
pub struct Waveform {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(Error::Configuration("waveform needs at least one channel".into()));
        }
        if sample_rate == 0 {
            return Err(Error::Configuration("sample rate must be positive".into()));
        }
        if samples.len() % channels != 0 {
            return Err(Error::Configuration(format!(
                "{} interleaved samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Single-channel convenience constructor.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(samples, 1, sample_rate)
    }

    /// Normalize signed integer PCM of `sample_width` bytes into [-1.0, 1.0].
    pub fn from_pcm(
        pcm: &[i32],
        sample_width: u32,
        channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if !(1..=4).contains(&sample_width) {
            return Err(Error::Configuration(format!(
                "unsupported PCM sample width of {} bytes",
                sample_width
            )));
        }
        let full_scale = (1u64 << (8 * sample_width - 1)) as f64;
        let samples = pcm
            .iter()
            .map(|&s| (s as f64 / full_scale) as f32)
            .collect();
        Self::new(samples, channels, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Downmix to mono by averaging channels.
    pub fn downmix(&self) -> Vec<f32> {
        if self.channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks(self.channels)
            .map(|frame| frame.iter().sum::<f32>() / self.channels as f32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_channels() {
        let wave = Waveform::new(vec![1.0, 0.0, -0.5, 0.5, 0.25, 0.75], 2, 8000).unwrap();
        assert_eq!(wave.frames(), 3);
        assert_eq!(wave.downmix(), vec![0.5, 0.0, 0.5]);
    }

    #[test]
    fn duration_counts_frames_not_samples() {
        let wave = Waveform::new(vec![0.0; 4000], 2, 1000).unwrap();
        assert!((wave.duration() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_ragged_interleaving() {
        assert!(matches!(
            Waveform::new(vec![0.0; 5], 2, 1000),
            Err(Error::Configuration(_))
        ));
        assert!(Waveform::new(vec![0.0; 4], 0, 1000).is_err());
        assert!(Waveform::mono(vec![0.0; 4], 0).is_err());
    }

    #[test]
    fn pcm_is_scaled_by_full_scale() {
        let wave = Waveform::from_pcm(&[-32768, 0, 16384], 2, 1, 44100).unwrap();
        assert_eq!(wave.samples(), &[-1.0, 0.0, 0.5]);

        let wave = Waveform::from_pcm(&[-128, 64], 1, 1, 8000).unwrap();
        assert_eq!(wave.samples(), &[-1.0, 0.5]);

        assert!(Waveform::from_pcm(&[0], 5, 1, 8000).is_err());
    }
}
