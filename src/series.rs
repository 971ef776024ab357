use indexmap::IndexMap;
use serde::Serialize;

/// A group-by result: one value per distinct key.
///
/// Series are produced fresh on every refresh and replaced wholesale, never
/// patched. Keys are unique; iteration follows insertion order so rendering
/// stays deterministic, while equality compares the key/value pairs as a set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregateSeries {
    entries: IndexMap<String, f64>,
}

impl AggregateSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.get(key).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or overwrite `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.entries.insert(key.into(), value);
    }

    /// Add `value` to the entry for `key`, creating it at zero first.
    pub fn accumulate(&mut self, key: &str, value: f64) {
        match self.entries.get_mut(key) {
            Some(v) => *v += value,
            None => {
                self.entries.insert(key.to_string(), value);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    /// Largest value in the series, or 0 when empty.
    pub fn max(&self) -> f64 {
        self.entries.values().copied().fold(0.0, f64::max)
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for AggregateSeries {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut series = Self::new();
        for (k, v) in iter {
            series.insert(k, v);
        }
        series
    }
}
