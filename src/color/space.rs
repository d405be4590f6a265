use super::wheel::{frequency_to_color, Rgb, REFERENCE_HZ};
use crate::analysis::memo::{ContentKey, Memo, MemoStats};
use crate::error::{Error, Result};

/// Luminosity of a query frequency sitting exactly on its key frequency.
const PEAK_LUMINOSITY: f32 = 0.5;

/// Gradient edges around the key frequencies: 0, the midpoints between
/// neighbouring keys, and the highest query frequency.
pub fn gradient_boundaries(key_frequencies: &[f32], query_frequencies: &[f32]) -> Vec<f32> {
    let top = query_frequencies
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);

    let mut boundaries = Vec::with_capacity(key_frequencies.len() + 1);
    boundaries.push(0.0);
    boundaries.extend(key_frequencies.windows(2).map(|w| (w[0] + w[1]) / 2.0));
    boundaries.push(top);
    boundaries
}

/// First element of `candidates` closest to `target`.
fn nearest(candidates: &[f32], target: f32) -> f32 {
    let mut best = candidates[0];
    for &c in &candidates[1..] {
        if (c - target).abs() < (best - target).abs() {
            best = c;
        }
    }
    best
}

/// Brightness of `freq` given its nearest key and that key's nearest boundary:
/// 0.5 on the key, falling linearly to 0 at the boundary and staying there.
fn falloff(freq: f32, key: f32, boundary: f32) -> f32 {
    let span = (key - boundary).abs();
    if span == 0.0 {
        return PEAK_LUMINOSITY;
    }
    (PEAK_LUMINOSITY - PEAK_LUMINOSITY * (freq - key).abs() / span).max(0.0)
}

/// Color every query frequency by its nearest key frequency's pitch class,
/// dimmed by distance from that key.
///
/// With no key frequencies every query maps to black.
pub fn construct_color_space(
    key_frequencies: &[f32],
    query_frequencies: &[f32],
) -> Result<Vec<Rgb>> {
    if query_frequencies.is_empty() {
        return Err(Error::EmptyInput("no query frequencies to color"));
    }
    if key_frequencies.is_empty() {
        let dark = frequency_to_color(REFERENCE_HZ, 0.0);
        return Ok(vec![dark; query_frequencies.len()]);
    }

    let boundaries = gradient_boundaries(key_frequencies, query_frequencies);
    let colors = query_frequencies
        .iter()
        .map(|&f| {
            let key = nearest(key_frequencies, f);
            let boundary = nearest(&boundaries, key);
            frequency_to_color(key, falloff(f, key, boundary))
        })
        .collect();
    Ok(colors)
}

/// [`construct_color_space`] memoized on the content of both inputs.
#[derive(Debug)]
pub struct ColorMapper {
    memo: Memo<(ContentKey, ContentKey), Vec<Rgb>>,
}

impl ColorMapper {
    pub fn new(cache_capacity: Option<usize>) -> Self {
        Self {
            memo: Memo::new(cache_capacity),
        }
    }

    pub fn colors(
        &mut self,
        key_frequencies: &[f32],
        query_frequencies: &[f32],
    ) -> Result<Vec<Rgb>> {
        if query_frequencies.is_empty() {
            return Err(Error::EmptyInput("no query frequencies to color"));
        }
        let key = (
            ContentKey::of(key_frequencies),
            ContentKey::of(query_frequencies),
        );
        if let Some(colors) = self.memo.lookup(&key) {
            return Ok(colors);
        }
        let colors = construct_color_space(key_frequencies, query_frequencies)?;
        self.memo.insert(key, colors.clone());
        Ok(colors)
    }

    /// Record a color space computed elsewhere.
    pub fn prime(&mut self, keys: ContentKey, queries: ContentKey, colors: Vec<Rgb>) {
        self.memo.insert((keys, queries), colors);
    }

    pub fn stats(&self) -> MemoStats {
        self.memo.stats()
    }

    pub fn clear_cache(&mut self) {
        self.memo.clear();
    }
}
