use rayon::prelude::*;
use std::time::Instant;

use crate::analysis::memo::{ContentKey, MemoStats};
use crate::analysis::peaks::{find_peaks, PeakDetector};
use crate::analysis::spectrogram::{self, Spectrogram};
use crate::audio::waveform::Waveform;
use crate::color::space::{construct_color_space, ColorMapper};
use crate::color::wheel::Rgb;
use crate::config::AnalysisSettings;
use crate::error::{Error, Result};
use crate::playback::clock::{ClockReading, EndOfTrack, PlaybackClock};
use crate::playback::output::AudioOutput;

/// One analysis frame's magnitude spectrum.
#[derive(Clone, Copy, Debug)]
pub struct Periodogram<'a> {
    pub frame: usize,
    pub frequencies: &'a [f32],
    pub magnitudes: &'a [f32],
}

/// Peaks of one analysis frame, ascending by frequency.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyFrequencies {
    pub frame: usize,
    /// Indices into the spectrogram's frequency axis.
    pub indices: Vec<usize>,
    pub frequencies: Vec<f32>,
}

/// Plays a track and answers questions about what is sounding right now:
/// the periodogram, its key frequencies, and colors for arbitrary
/// frequencies.
///
/// Every query takes the wall-clock instant it is asked for. Queries may
/// restart the track (see [`EndOfTrack`]) and fill the memo caches, hence
/// `&mut self`. Dropping a playing `Musician` stops its output.
pub struct Musician {
    waveform: Waveform,
    spectrogram: Spectrogram,
    settings: AnalysisSettings,
    clock: PlaybackClock,
    playing: bool,
    peaks: PeakDetector,
    colors: ColorMapper,
    output: Box<dyn AudioOutput>,
}

impl Musician {
    pub fn new(
        waveform: Waveform,
        settings: AnalysisSettings,
        output: Box<dyn AudioOutput>,
    ) -> Result<Self> {
        settings.validate()?;
        let spectrogram = spectrogram::build(
            &waveform,
            settings.frames_per_second,
            settings.frequency_ceiling_hz,
        )?;
        let peaks = PeakDetector::new(settings.peaks, settings.cache_capacity)?;
        let colors = ColorMapper::new(settings.cache_capacity);
        let clock = PlaybackClock::new(waveform.duration());

        Ok(Self {
            waveform,
            spectrogram,
            settings,
            clock,
            playing: false,
            peaks,
            colors,
            output,
        })
    }

    pub fn spectrogram(&self) -> &Spectrogram {
        &self.spectrogram
    }

    pub fn waveform(&self) -> &Waveform {
        &self.waveform
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn duration(&self) -> f64 {
        self.clock.duration()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Start the track at `now`. Does nothing if it is already playing.
    pub fn start_playback(&mut self, now: Instant) -> Result<()> {
        if self.playing {
            return Ok(());
        }
        let handle = self.output.play(&self.waveform)?;
        self.playing = true;
        self.clock.start(now);
        log::info!("Playback started ({:?}, {:.1}s)", handle, self.duration());
        Ok(())
    }

    /// Halt the output and return to idle; the clock reads zero afterwards.
    pub fn stop_playback(&mut self) -> Result<()> {
        self.output.stop_all()?;
        if self.playing {
            log::info!("Playback stopped");
        }
        self.playing = false;
        self.clock.reset();
        Ok(())
    }

    /// Seconds into the track at `now`, applying the end-of-track policy if
    /// the track has run out while playing.
    pub fn song_time(&mut self, now: Instant) -> Result<f64> {
        match self.clock.reading(now) {
            ClockReading::NotStarted => Ok(0.0),
            ClockReading::Running(t) => Ok(t),
            ClockReading::Ended { overrun } => {
                if !self.playing {
                    return Ok(self.duration());
                }
                match self.settings.end_of_track {
                    EndOfTrack::Loop => {
                        log::debug!("Track ended {:.3}s ago, looping", overrun);
                        let restarted = self
                            .output
                            .stop_all()
                            .and_then(|()| self.output.play(&self.waveform));
                        if let Err(err) = restarted {
                            // Output is down: go idle.
                            self.playing = false;
                            self.clock.reset();
                            return Err(err);
                        }
                        self.clock.start(now);
                        Ok(0.0)
                    }
                    EndOfTrack::Stop => {
                        log::debug!("Track ended {:.3}s ago, stopping", overrun);
                        let end = self.duration();
                        self.stop_playback()?;
                        Ok(end)
                    }
                }
            }
        }
    }

    /// Analysis frame sounding at `now`.
    pub fn frame_index(&mut self, now: Instant) -> Result<usize> {
        let t = self.song_time(now)?;
        Ok(self.spectrogram.frame_index_for(t))
    }

    pub fn get_periodogram(&mut self, now: Instant) -> Result<Periodogram<'_>> {
        let frame = self.frame_index(now)?;
        Ok(Periodogram {
            frame,
            frequencies: self.spectrogram.frequencies(),
            magnitudes: self.spectrogram.frame(frame),
        })
    }

    pub fn get_key_frequencies(&mut self, now: Instant) -> Result<KeyFrequencies> {
        let frame = self.frame_index(now)?;
        Ok(self.key_frequencies_of(frame))
    }

    /// Colors for `frequencies` at `now`, co-indexed with the input.
    pub fn get_colors_for_frequencies(
        &mut self,
        frequencies: &[f32],
        now: Instant,
    ) -> Result<Vec<Rgb>> {
        if frequencies.is_empty() {
            return Err(Error::EmptyInput("no query frequencies to color"));
        }
        let keys = self.get_key_frequencies(now)?;
        self.colors.colors(&keys.frequencies, frequencies)
    }

    /// Run peak detection and color mapping for every analysis frame so live
    /// queries for `frequencies` only hit the caches. Call before playback.
    pub fn precompute_all_colorspaces(&mut self, frequencies: &[f32]) -> Result<()> {
        if frequencies.is_empty() {
            return Err(Error::EmptyInput("no query frequencies to color"));
        }
        let settings = *self.peaks.settings();
        let spectrogram = &self.spectrogram;
        let bins = spectrogram.frequencies();

        let warmed = (0..spectrogram.num_frames())
            .into_par_iter()
            .map(|j| {
                let column = spectrogram.frame(j);
                let peaks = find_peaks(column, &settings);
                let keys: Vec<f32> = peaks.iter().map(|&i| bins[i]).collect();
                let colors = construct_color_space(&keys, frequencies)?;
                Ok((ContentKey::of(column), peaks, ContentKey::of(&keys), colors))
            })
            .collect::<Result<Vec<_>>>()?;

        let query_key = ContentKey::of(frequencies);
        for (column_key, peaks, keys_key, colors) in warmed {
            self.peaks.prime(column_key, peaks);
            self.colors.prime(keys_key, query_key.clone(), colors);
        }

        log::info!(
            "Precomputed {} frames: {} distinct spectra, {} distinct color spaces",
            self.spectrogram.num_frames(),
            self.peaks.stats().entries,
            self.colors.stats().entries
        );
        Ok(())
    }

    /// Peak and color cache counters.
    pub fn cache_stats(&self) -> (MemoStats, MemoStats) {
        (self.peaks.stats(), self.colors.stats())
    }

    pub fn clear_caches(&mut self) {
        self.peaks.clear_cache();
        self.colors.clear_cache();
    }

    fn key_frequencies_of(&mut self, frame: usize) -> KeyFrequencies {
        let indices = self.peaks.find(self.spectrogram.frame(frame));
        let bins = self.spectrogram.frequencies();
        let frequencies = indices.iter().map(|&i| bins[i]).collect();
        KeyFrequencies {
            frame,
            indices,
            frequencies,
        }
    }
}

impl Drop for Musician {
    fn drop(&mut self) {
        if self.playing {
            if let Err(err) = self.stop_playback() {
                log::warn!("Failed to stop playback on teardown: {}", err);
            }
        }
        let (peaks, colors) = self.cache_stats();
        log::debug!("Cache usage: peaks {:?}, colors {:?}", peaks, colors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::wheel::{linspace, pitch_class_to_color};
    use crate::playback::output::testing::RecordingOutput;
    use crate::playback::output::SilentOutput;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    const RATE: u32 = 1000;

    fn tone(freq: f32, seconds: f32) -> Vec<f32> {
        let n = (RATE as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / RATE as f32).sin())
            .collect()
    }

    fn settings(end_of_track: EndOfTrack) -> AnalysisSettings {
        AnalysisSettings {
            frequency_ceiling_hz: 500.0,
            end_of_track,
            ..AnalysisSettings::default()
        }
    }

    /// One second of 440Hz followed by one second of 300Hz.
    fn two_tone() -> Waveform {
        let mut samples = tone(440.0, 1.0);
        samples.extend(tone(300.0, 1.0));
        Waveform::mono(samples, RATE).unwrap()
    }

    fn recorded(end_of_track: EndOfTrack) -> (Musician, Rc<Cell<usize>>, Rc<Cell<usize>>) {
        let output = RecordingOutput::default();
        let plays = output.plays.clone();
        let stops = output.stops.clone();
        let musician =
            Musician::new(two_tone(), settings(end_of_track), Box::new(output)).unwrap();
        (musician, plays, stops)
    }

    fn at(t0: Instant, seconds: f64) -> Instant {
        t0 + Duration::from_secs_f64(seconds)
    }

    #[test]
    fn pure_tone_end_to_end() {
        let wave = Waveform::mono(tone(440.0, 2.0), RATE).unwrap();
        let mut musician =
            Musician::new(wave, settings(EndOfTrack::Loop), Box::new(SilentOutput::default()))
                .unwrap();
        let now = Instant::now();

        let pgram = musician.get_periodogram(now).unwrap();
        assert_eq!(pgram.frame, 0);
        assert_eq!(pgram.frequencies.len(), pgram.magnitudes.len());

        let keys = musician.get_key_frequencies(now).unwrap();
        assert_eq!(keys.indices, vec![44]);
        assert_eq!(keys.frequencies, vec![440.0]);

        let colors = musician.get_colors_for_frequencies(&[440.0], now).unwrap();
        assert_eq!(colors, vec![pitch_class_to_color(0.0, 0.5)]);
    }

    #[test]
    fn queries_follow_playback_time() {
        let (mut musician, _, _) = recorded(EndOfTrack::Loop);
        let t0 = Instant::now();
        musician.start_playback(t0).unwrap();

        let early = musician.get_key_frequencies(at(t0, 0.2)).unwrap();
        assert_eq!(early.frequencies, vec![440.0]);

        let late = musician.get_key_frequencies(at(t0, 1.5)).unwrap();
        assert_eq!(late.frame, 15);
        assert_eq!(late.frequencies, vec![300.0]);
    }

    #[test]
    fn start_is_idempotent() {
        let (mut musician, plays, _) = recorded(EndOfTrack::Loop);
        let t0 = Instant::now();
        musician.start_playback(t0).unwrap();
        musician.start_playback(at(t0, 1.0)).unwrap();
        assert_eq!(plays.get(), 1);
        let t = musician.song_time(at(t0, 1.5)).unwrap();
        assert!((t - 1.5).abs() < 1e-9);
    }

    #[test]
    fn stop_halts_output_and_resets_clock() {
        let (mut musician, _, stops) = recorded(EndOfTrack::Loop);
        let t0 = Instant::now();
        musician.start_playback(t0).unwrap();
        musician.stop_playback().unwrap();
        assert!(!musician.is_playing());
        assert_eq!(stops.get(), 1);
        assert_eq!(musician.song_time(at(t0, 1.5)).unwrap(), 0.0);
    }

    #[test]
    fn overrun_loops_by_default() {
        let (mut musician, plays, stops) = recorded(EndOfTrack::Loop);
        let t0 = Instant::now();
        musician.start_playback(t0).unwrap();

        assert_eq!(musician.song_time(at(t0, 2.5)).unwrap(), 0.0);
        assert!(musician.is_playing());
        assert_eq!(plays.get(), 2);
        assert_eq!(stops.get(), 1);

        let t = musician.song_time(at(t0, 3.0)).unwrap();
        assert!((t - 0.5).abs() < 1e-9);
    }

    #[test]
    fn overrun_can_stop_instead() {
        let (mut musician, plays, stops) = recorded(EndOfTrack::Stop);
        let t0 = Instant::now();
        musician.start_playback(t0).unwrap();

        let last = musician.spectrogram().num_frames() - 1;
        assert_eq!(musician.frame_index(at(t0, 2.5)).unwrap(), last);
        assert!(!musician.is_playing());
        assert_eq!(plays.get(), 1);
        assert_eq!(stops.get(), 1);
    }

    #[test]
    fn output_failure_propagates() {
        let output = RecordingOutput {
            play_limit: Some(0),
            ..RecordingOutput::default()
        };
        let mut musician =
            Musician::new(two_tone(), settings(EndOfTrack::Loop), Box::new(output)).unwrap();
        assert!(matches!(
            musician.start_playback(Instant::now()),
            Err(Error::Playback(_))
        ));
        assert!(!musician.is_playing());
    }

    #[test]
    fn failed_restart_goes_idle_without_retrying() {
        let output = RecordingOutput {
            play_limit: Some(1),
            ..RecordingOutput::default()
        };
        let attempts = output.attempts.clone();
        let stops = output.stops.clone();
        let mut musician =
            Musician::new(two_tone(), settings(EndOfTrack::Loop), Box::new(output)).unwrap();
        let t0 = Instant::now();
        musician.start_playback(t0).unwrap();

        assert!(matches!(
            musician.song_time(at(t0, 2.5)),
            Err(Error::Playback(_))
        ));
        assert!(!musician.is_playing());
        assert_eq!(attempts.get(), 2);
        assert_eq!(stops.get(), 1);

        // Later queries see an idle clock and leave the output alone.
        assert_eq!(musician.song_time(at(t0, 2.6)).unwrap(), 0.0);
        assert!(musician.get_colors_for_frequencies(&[440.0], at(t0, 2.7)).is_ok());
        assert_eq!(attempts.get(), 2);
        assert_eq!(stops.get(), 1);
    }

    #[test]
    fn clearing_caches_forces_recomputation() {
        let (mut musician, _, _) = recorded(EndOfTrack::Loop);
        let leds = linspace(1.0, 1000.0, 10);
        musician.precompute_all_colorspaces(&leds).unwrap();
        let (peaks, colors) = musician.cache_stats();
        assert!(peaks.entries > 0 && colors.entries > 0);

        musician.clear_caches();
        let (peaks, colors) = musician.cache_stats();
        assert_eq!(peaks.entries, 0);
        assert_eq!(colors.entries, 0);

        musician.get_colors_for_frequencies(&leds, Instant::now()).unwrap();
        let (peaks, colors) = musician.cache_stats();
        assert_eq!(peaks.misses, 1);
        assert_eq!(colors.misses, 1);
    }

    #[test]
    fn precompute_fills_both_caches() {
        let (mut musician, _, _) = recorded(EndOfTrack::Loop);
        let leds = linspace(1.0, 1000.0, 150);
        musician.precompute_all_colorspaces(&leds).unwrap();

        let (peaks, colors) = musician.cache_stats();
        assert_eq!(peaks.misses, 0);
        assert!(peaks.entries >= 2);
        assert!(colors.entries >= 2);

        let t0 = Instant::now();
        musician.start_playback(t0).unwrap();
        for i in 0..20 {
            let now = at(t0, i as f64 * 0.1);
            let warm = musician.get_colors_for_frequencies(&leds, now).unwrap();
            let keys = musician.get_key_frequencies(now).unwrap();
            assert_eq!(warm, construct_color_space(&keys.frequencies, &leds).unwrap());
        }
        let (peaks, colors) = musician.cache_stats();
        assert_eq!(peaks.misses, 0);
        assert_eq!(colors.misses, 0);
    }

    #[test]
    fn empty_queries_are_rejected() {
        let (mut musician, _, _) = recorded(EndOfTrack::Loop);
        assert!(matches!(
            musician.get_colors_for_frequencies(&[], Instant::now()),
            Err(Error::EmptyInput(_))
        ));
        assert!(musician.precompute_all_colorspaces(&[]).is_err());
    }

    #[test]
    fn dropping_a_playing_musician_stops_output() {
        let (mut musician, _, stops) = recorded(EndOfTrack::Loop);
        musician.start_playback(Instant::now()).unwrap();
        drop(musician);
        assert_eq!(stops.get(), 1);
    }

    #[test]
    fn invalid_settings_fail_construction() {
        let bad = AnalysisSettings {
            frames_per_second: 1000,
            ..AnalysisSettings::default()
        };
        let result = Musician::new(two_tone(), bad, Box::new(SilentOutput::default()));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
