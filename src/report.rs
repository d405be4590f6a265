use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::Write;
use std::time::{Duration, Instant};

use tonelight::color::wheel::frequency_to_color;
use tonelight::Musician;

#[derive(Serialize)]
struct FrameReport<'a> {
    frame: usize,
    time: f64,
    key_frequencies: &'a [f32],
    key_colors: Vec<[u8; 3]>,
    leds: Vec<[u8; 3]>,
}

/// Replay the track on a simulated clock, one query per analysis frame, and
/// write a JSON line per frame. Returns the number of frames written.
pub fn write_report(musician: &mut Musician, leds: &[f32], out: &mut dyn Write) -> Result<usize> {
    let times = musician.spectrogram().frame_times().to_vec();
    // Query at frame_time - first center: halfway between neighbouring
    // centers, so clock rounding never lands on the wrong frame.
    let offset = times.first().copied().unwrap_or(0.0);

    let pb = ProgressBar::new(times.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)",
            )?
            .progress_chars("=>-"),
    );

    let start = Instant::now();
    musician.start_playback(start)?;

    for (idx, &time) in times.iter().enumerate() {
        let now = start + Duration::from_secs_f64(time - offset);
        let keys = musician.get_key_frequencies(now)?;
        let colors = musician.get_colors_for_frequencies(leds, now)?;

        let report = FrameReport {
            frame: keys.frame,
            time,
            key_frequencies: &keys.frequencies,
            key_colors: keys
                .frequencies
                .iter()
                .map(|&f| frequency_to_color(f, 0.5).to_bytes())
                .collect(),
            leds: colors.iter().map(|c| c.to_bytes()).collect(),
        };
        serde_json::to_writer(&mut *out, &report)?;
        writeln!(out)?;
        pb.set_position(idx as u64 + 1);
    }

    pb.finish_with_message("Report complete");
    musician.stop_playback()?;
    out.flush()?;
    Ok(times.len())
}

/// Play in real time, polling once per analysis frame until `seconds` have
/// passed or playback stops on its own.
pub fn run_live(musician: &mut Musician, leds: &[f32], seconds: f64) -> Result<()> {
    let interval = Duration::from_secs_f64(1.0 / musician.settings().frames_per_second as f64);
    let start = Instant::now();
    let deadline = start + Duration::from_secs_f64(seconds.max(0.0));
    musician.start_playback(start)?;

    while musician.is_playing() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let keys = musician.get_key_frequencies(now)?;
        let colors = musician.get_colors_for_frequencies(leds, now)?;
        let lit = colors.iter().filter(|c| c.to_bytes() != [0, 0, 0]).count();
        log::info!(
            "frame {:4}  keys {:?}  {}/{} LEDs lit",
            keys.frame,
            keys.frequencies,
            lit,
            leds.len()
        );
        std::thread::sleep(interval);
    }

    musician.stop_playback()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonelight::color::wheel::linspace;
    use tonelight::{AnalysisSettings, SilentOutput, Waveform};

    #[test]
    fn report_has_one_line_per_frame() {
        let samples: Vec<f32> = (0..2000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 1000.0).sin())
            .collect();
        let wave = Waveform::mono(samples, 1000).unwrap();
        let settings = AnalysisSettings {
            frequency_ceiling_hz: 500.0,
            ..AnalysisSettings::default()
        };
        let mut musician =
            Musician::new(wave, settings, Box::new(SilentOutput::default())).unwrap();

        let mut buf = Vec::new();
        let written = write_report(&mut musician, &linspace(1.0, 500.0, 10), &mut buf).unwrap();
        assert_eq!(written, 20);
        assert!(!musician.is_playing());

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 20);
        for (j, line) in lines.iter().enumerate() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["frame"], j);
            assert_eq!(value["key_frequencies"][0], 440.0);
            // A440 is pitch class zero: pure red.
            let red = &value["key_colors"][0];
            assert!(red[0].as_u64().unwrap() >= 254);
            assert!(red[1].as_u64().unwrap() <= 1 && red[2].as_u64().unwrap() <= 1);
            assert_eq!(value["leds"].as_array().unwrap().len(), 10);
        }
    }
}
