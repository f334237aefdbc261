use futures::future::{join_all, BoxFuture};
use serde_json::Value;

use crate::errors::UpstreamError;

/// Outcome of one named request: the decoded payload or the captured failure.
pub type Outcome = Result<Value, UpstreamError>;

/// A zero-argument read already bound to its endpoint.
pub type Operation<'a> = BoxFuture<'a, Outcome>;

/// An ordered set of independent, named upstream reads.
#[derive(Default)]
pub struct RequestSet<'a> {
    entries: Vec<(String, Operation<'a>)>,
}

impl<'a> RequestSet<'a> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Register a request. A later request with the same name replaces the earlier one.
    pub fn add(&mut self, name: impl Into<String>, operation: Operation<'a>) -> &mut Self {
        let name = name.into();
        self.entries.retain(|(existing, _)| *existing != name);
        self.entries.push((name, operation));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

/// Settled outcomes, in the order the requests were registered.
#[derive(Debug, Default)]
pub struct FanOutResults {
    entries: Vec<(String, Outcome)>,
}

impl FanOutResults {
    pub fn from_entries(entries: Vec<(String, Outcome)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&Outcome> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, o)| o)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn successes(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_ok()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Outcome)> {
        self.entries.iter().map(|(n, o)| (n.as_str(), o))
    }
}

impl IntoIterator for FanOutResults {
    type Item = (String, Outcome);
    type IntoIter = std::vec::IntoIter<(String, Outcome)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Drive every request concurrently and wait until all have settled.
///
/// Nothing is cancelled when a request fails; each failure is returned as a
/// value next to its request name.
pub async fn fan_out(requests: RequestSet<'_>) -> FanOutResults {
    let (names, operations): (Vec<String>, Vec<Operation<'_>>) =
        requests.entries.into_iter().unzip();
    let outcomes = join_all(operations).await;
    FanOutResults {
        entries: names.into_iter().zip(outcomes).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_collects_all_outcomes_in_order() {
        let mut set = RequestSet::new();
        set.add("slow", async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(json!({"value": [1]}))
        }.boxed());
        set.add("broken", async { Err(UpstreamError::http(500, "boom")) }.boxed());
        set.add("fast", async { Ok(json!({"value": []})) }.boxed());

        let results = fan_out(set).await;
        let names: Vec<&str> = results.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["slow", "broken", "fast"]);
        assert_eq!(results.successes(), 2);
        assert!(results.get("broken").unwrap().is_err());
    }

    #[tokio::test]
    async fn test_failure_does_not_cancel_siblings() {
        let mut set = RequestSet::new();
        set.add("fails_first", async { Err(UpstreamError::transport("reset")) }.boxed());
        set.add("finishes_later", async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(json!({"value": [1, 2, 3]}))
        }.boxed());

        let results = fan_out(set).await;
        let later = results.get("finishes_later").unwrap().as_ref().unwrap();
        assert_eq!(later["value"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_requests_run_concurrently() {
        let mut set = RequestSet::new();
        for i in 0..5 {
            set.add(format!("req{}", i), async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(Value::Null)
            }.boxed());
        }
        let started = std::time::Instant::now();
        let results = fan_out(set).await;
        assert_eq!(results.len(), 5);
        assert!(started.elapsed() < Duration::from_millis(200));
    }

    #[test]
    fn test_duplicate_name_replaces_entry() {
        let mut set = RequestSet::new();
        set.add("alerts", async { Ok(Value::Null) }.boxed());
        set.add("alerts", async { Ok(Value::Null) }.boxed());
        assert_eq!(set.len(), 1);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["alerts"]);
    }

    #[tokio::test]
    async fn test_empty_set() {
        let results = fan_out(RequestSet::new()).await;
        assert!(results.is_empty());
    }
}
