use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::ops::Index;

use super::UNKNOWN_BUCKET;

static ZERO: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bucket {
    label: String,
    count: u64,
}

/// Category counter keyed case-insensitively.
///
/// Buckets are merged on the lower-cased key and keep the spelling of the
/// first value seen, so `"High"` and `"high"` land together and lookups in
/// either spelling agree. Missing keys index to 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Histogram {
    buckets: BTreeMap<String, Bucket>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one item; absent or blank values go to the `Unknown` bucket.
    pub fn record(&mut self, value: Option<&str>) {
        let label = match value.map(str::trim) {
            Some(v) if !v.is_empty() => v,
            _ => UNKNOWN_BUCKET,
        };
        let bucket = self
            .buckets
            .entry(label.to_lowercase())
            .or_insert_with(|| Bucket { label: label.to_string(), count: 0 });
        bucket.count += 1;
    }

    pub fn get(&self, key: &str) -> u64 {
        self.buckets.get(&key.to_lowercase()).map(|b| b.count).unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.buckets.values().map(|b| b.count).sum()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Buckets as `(label, count)` ordered by the normalized key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.buckets.values().map(|b| (b.label.as_str(), b.count))
    }
}

impl<'a> FromIterator<Option<&'a str>> for Histogram {
    fn from_iter<I: IntoIterator<Item = Option<&'a str>>>(iter: I) -> Self {
        let mut histogram = Histogram::new();
        for value in iter {
            histogram.record(value);
        }
        histogram
    }
}

impl Index<&str> for Histogram {
    type Output = u64;

    fn index(&self, key: &str) -> &u64 {
        self.buckets
            .get(&key.to_lowercase())
            .map(|b| &b.count)
            .unwrap_or(&ZERO)
    }
}

impl Serialize for Histogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.buckets.len()))?;
        for (label, count) in self.iter() {
            map.serialize_entry(label, &count)?;
        }
        map.end()
    }
}
