//! Folding primitives shared by every domain aggregator.
//!
//! Each domain summary is built from the same four rules: a total, category
//! histograms, boolean-flag counts and keyword-relevance counts, with
//! percentages derived last.

pub mod histogram;

pub use histogram::Histogram;

/// Bucket used when a categorised field is absent.
pub const UNKNOWN_BUCKET: &str = "Unknown";

/// `round(100 * count / total, 2)`, or 0 when `total` is 0.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = count as f64 * 100.0 / total as f64;
    (raw * 100.0).round() / 100.0
}

/// Same as [`percentage`] for fractional scores such as secure score points.
pub fn ratio_percentage(value: f64, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    ((value / max * 100.0) * 100.0).round() / 100.0
}

/// Lower-cased value of an optional text field, empty when absent.
pub fn lowered(field: &Option<String>) -> String {
    field.as_deref().map(str::to_lowercase).unwrap_or_default()
}

/// True when any keyword occurs as a substring of any field, ignoring case.
pub fn contains_any<S: AsRef<str>>(fields: &[S], keywords: &[&str]) -> bool {
    fields.iter().any(|field| {
        let haystack = field.as_ref().to_lowercase();
        keywords.iter().any(|kw| haystack.contains(&kw.to_lowercase()))
    })
}

/// Number of items matching `predicate`.
pub fn count_where<T>(items: &[T], predicate: impl Fn(&T) -> bool) -> u64 {
    items.iter().filter(|item| predicate(item)).count() as u64
}

/// Case-insensitive equality of an optional field against one of `values`.
pub fn field_in(field: &Option<String>, values: &[&str]) -> bool {
    let value = lowered(field);
    values.iter().any(|v| value == v.to_lowercase())
}
