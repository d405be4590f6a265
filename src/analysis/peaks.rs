use std::cmp::Ordering;

use super::memo::{ContentKey, Memo, MemoStats};
use crate::error::{Error, Result};

/// Thresholds for peak picking on a magnitude spectrum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeakSettings {
    /// Minimum index distance between two reported peaks.
    pub min_separation: usize,
    /// Minimum magnitude of a reported peak (inclusive).
    pub min_height: f32,
}

impl Default for PeakSettings {
    fn default() -> Self {
        Self {
            min_separation: 5,
            min_height: 0.007,
        }
    }
}

impl PeakSettings {
    pub fn validate(&self) -> Result<()> {
        if self.min_separation < 1 {
            return Err(Error::Configuration(
                "peak min_separation must be at least 1".into(),
            ));
        }
        if !self.min_height.is_finite() {
            return Err(Error::Configuration(format!(
                "peak min_height must be finite, got {}",
                self.min_height
            )));
        }
        Ok(())
    }
}

/// Indices of local maxima in `values`, ascending.
///
/// A flat top counts once, at its middle sample (the lower middle for an even
/// run). Runs touching either end of the slice never count.
pub fn local_maxima(values: &[f32]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if values.len() < 3 {
        return maxima;
    }
    let last = values.len() - 1;

    let mut i = 1;
    while i < last {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < last && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

/// Peak picking with height and separation constraints.
///
/// Candidates closer than `min_separation` compete: the higher one survives,
/// and on equal height the lower index wins.
pub fn find_peaks(values: &[f32], settings: &PeakSettings) -> Vec<usize> {
    let candidates: Vec<usize> = local_maxima(values)
        .into_iter()
        .filter(|&i| values[i] >= settings.min_height)
        .collect();

    if settings.min_separation <= 1 || candidates.len() < 2 {
        return candidates;
    }

    let mut by_priority: Vec<usize> = (0..candidates.len()).collect();
    by_priority.sort_by(|&a, &b| {
        match values[candidates[b]].total_cmp(&values[candidates[a]]) {
            Ordering::Equal => a.cmp(&b),
            ord => ord,
        }
    });

    let mut keep = vec![true; candidates.len()];
    for &j in &by_priority {
        if !keep[j] {
            continue;
        }
        let center = candidates[j];

        let mut k = j;
        while k > 0 && center - candidates[k - 1] < settings.min_separation {
            keep[k - 1] = false;
            k -= 1;
        }

        let mut k = j + 1;
        while k < candidates.len() && candidates[k] - center < settings.min_separation {
            keep[k] = false;
            k += 1;
        }
    }

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(idx, kept)| kept.then_some(idx))
        .collect()
}

/// [`find_peaks`] memoized on the content of the input slice.
#[derive(Debug)]
pub struct PeakDetector {
    settings: PeakSettings,
    memo: Memo<ContentKey, Vec<usize>>,
}

impl PeakDetector {
    pub fn new(settings: PeakSettings, cache_capacity: Option<usize>) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            memo: Memo::new(cache_capacity),
        })
    }

    pub fn settings(&self) -> &PeakSettings {
        &self.settings
    }

    pub fn find(&mut self, magnitudes: &[f32]) -> Vec<usize> {
        let settings = self.settings;
        self.memo
            .get_or_insert_with(ContentKey::of(magnitudes), || {
                find_peaks(magnitudes, &settings)
            })
    }

    /// Record a result computed elsewhere (e.g. in a parallel warm-up pass).
    pub fn prime(&mut self, key: ContentKey, peaks: Vec<usize>) {
        self.memo.insert(key, peaks);
    }

    pub fn is_cached(&self, magnitudes: &[f32]) -> bool {
        self.memo.contains(&ContentKey::of(magnitudes))
    }

    pub fn stats(&self) -> MemoStats {
        self.memo.stats()
    }

    pub fn clear_cache(&mut self) {
        self.memo.clear();
    }
}
