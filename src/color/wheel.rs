use palette::{Hsl, IntoColor, Srgb};
use serde::Serialize;

/// Reference pitch (A4) in Hz.
pub const REFERENCE_HZ: f32 = 440.0;

/// An RGB color with components in [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Rgb {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        red: 0.0,
        green: 0.0,
        blue: 0.0,
    };

    /// 8-bit channels for LED drivers (truncating).
    pub fn to_bytes(self) -> [u8; 3] {
        let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0) as u8;
        [byte(self.red), byte(self.green), byte(self.blue)]
    }
}

/// Equal-tempered semitones above (or below) 440Hz.
pub fn frequency_to_note(freq: f32) -> f32 {
    12.0 * (freq / REFERENCE_HZ).log2()
}

/// Inverse of [`frequency_to_note`].
pub fn note_to_frequency(note: f32) -> f32 {
    REFERENCE_HZ * 2f32.powf(note / 12.0)
}

/// Position of `freq` within its octave, in [0, 1). A is 0.
///
/// Frequencies that have no pitch (zero, negative, NaN) fold to 0.
pub fn frequency_to_pitch_class(freq: f32) -> f32 {
    if !(freq > 0.0) || !freq.is_finite() {
        return 0.0;
    }
    wrap_unit(frequency_to_note(freq).rem_euclid(12.0) / 12.0)
}

/// Fully saturated color whose hue is `x` mod 1.
pub fn pitch_class_to_color(x: f32, luminosity: f32) -> Rgb {
    let hue = wrap_unit(x.rem_euclid(1.0));
    let hsl: Hsl = Hsl::new(hue * 360.0, 1.0, luminosity.clamp(0.0, 1.0));
    let rgb: Srgb = hsl.into_color();
    Rgb {
        red: rgb.red,
        green: rgb.green,
        blue: rgb.blue,
    }
}

/// Color of the pitch class of `freq`.
pub fn frequency_to_color(freq: f32, luminosity: f32) -> Rgb {
    pitch_class_to_color(frequency_to_pitch_class(freq), luminosity)
}

/// `count` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f32, stop: f32, count: usize) -> Vec<f32> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f32;
            (0..count).map(|i| start + step * i as f32).collect()
        }
    }
}

// rem_euclid can round up to the modulus itself for tiny negative inputs.
fn wrap_unit(x: f32) -> f32 {
    if x >= 1.0 {
        0.0
    } else {
        x
    }
}
