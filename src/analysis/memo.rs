use std::collections::HashMap;
use std::hash::Hash;

/// Value-equality snapshot of a float sequence, usable as a map key.
///
/// Two keys are equal exactly when the inputs have the same length and the
/// same bit patterns, so a mutable buffer can be memoized by content.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentKey(Box<[u32]>);

impl ContentKey {
    pub fn of(values: &[f32]) -> Self {
        Self(values.iter().map(|v| v.to_bits()).collect())
    }
}

/// Hit/miss counters for a [`Memo`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Growth-only memo map owned by a single session.
///
/// With a capacity set, new results are still computed once the map is full
/// but are no longer retained.
#[derive(Debug)]
pub struct Memo<K, V> {
    entries: HashMap<K, V>,
    capacity: Option<usize>,
    hits: u64,
    misses: u64,
}

impl<K: Eq + Hash, V: Clone> Memo<K, V> {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    /// Cached value for `key`, counting the hit or miss.
    pub fn lookup(&mut self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits += 1;
                Some(value.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn get_or_insert_with(&mut self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.lookup(&key) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Store a precomputed result. Equal keys always carry equal values, so an
    /// existing entry is left untouched.
    pub fn insert(&mut self, key: K, value: V) {
        if self.is_full() && !self.entries.contains_key(&key) {
            return;
        }
        self.entries.entry(key).or_insert(value);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_full(&self) -> bool {
        self.capacity.is_some_and(|cap| self.entries.len() >= cap)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn stats(&self) -> MemoStats {
        MemoStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_compare_by_content() {
        let mut buffer = vec![0.5f32, 0.25, 0.0];
        let before = ContentKey::of(&buffer);
        assert_eq!(before, ContentKey::of(&[0.5, 0.25, 0.0]));

        buffer[1] = 0.3;
        assert_ne!(before, ContentKey::of(&buffer));
        assert_ne!(ContentKey::of(&[0.5]), ContentKey::of(&[0.5, 0.5]));
    }

    #[test]
    fn computes_once_per_key() {
        let mut memo: Memo<ContentKey, usize> = Memo::new(None);
        let mut calls = 0;
        for _ in 0..3 {
            let v = memo.get_or_insert_with(ContentKey::of(&[1.0, 2.0]), || {
                calls += 1;
                7
            });
            assert_eq!(v, 7);
        }
        assert_eq!(calls, 1);
        assert_eq!(
            memo.stats(),
            MemoStats {
                entries: 1,
                hits: 2,
                misses: 1
            }
        );
    }

    #[test]
    fn bounded_memo_stops_retaining() {
        let mut memo: Memo<u32, u32> = Memo::new(Some(2));
        memo.insert(1, 10);
        memo.insert(2, 20);
        memo.insert(3, 30);
        assert_eq!(memo.len(), 2);
        assert!(!memo.contains(&3));

        // Still answers, just without caching.
        assert_eq!(memo.get_or_insert_with(4, || 40), 40);
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn racing_inserts_keep_first_value() {
        let mut memo: Memo<u32, u32> = Memo::new(None);
        memo.insert(1, 10);
        memo.insert(1, 11);
        assert_eq!(memo.len(), 1);
        assert_eq!(memo.get_or_insert_with(1, || unreachable!()), 10);
    }
}
