//! In-memory registry of accepted async jobs.
//!
//! The registry is plain data. The [`AdmissionController`](super::AdmissionController)
//! owns it behind the same lock as its counters, so every method here
//! assumes the caller already holds that lock.

use crate::request_id::RequestId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// A job accepted by the downstream handler and not yet seen to finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    /// Identifier issued for the request that started the job
    pub id: RequestId,
    /// When the accept was recorded (for stale detection)
    pub recorded_at: Instant,
}

impl JobRecord {
    pub fn new(id: RequestId, recorded_at: Instant) -> Self {
        Self { id, recorded_at }
    }

    /// Age of the record relative to `now`.
    #[inline]
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.recorded_at)
    }

    /// Returns true if the record is older than `ttl`.
    #[inline]
    pub fn is_stale(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) > ttl
    }
}

/// Mapping from job identifier to record.
#[derive(Debug, Default)]
pub(crate) struct JobRegistry {
    records: HashMap<String, JobRecord>,
}

impl JobRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts a record. Returns false if the id was already tracked.
    pub(crate) fn insert(&mut self, record: JobRecord) -> bool {
        let key = record.id.as_str().to_string();
        if self.records.contains_key(&key) {
            return false;
        }
        self.records.insert(key, record);
        true
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<JobRecord> {
        self.records.remove(id)
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// Removes and returns every record older than `ttl`.
    pub(crate) fn purge_stale(&mut self, now: Instant, ttl: Duration) -> Vec<JobRecord> {
        let stale: Vec<String> = self
            .records
            .iter()
            .filter(|(_, record)| record.is_stale(now, ttl))
            .map(|(key, _)| key.clone())
            .collect();

        stale
            .into_iter()
            .filter_map(|key| self.records.remove(&key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, at: Instant) -> JobRecord {
        JobRecord::new(RequestId::from_string(id), at)
    }

    #[test]
    fn test_insert_and_remove() {
        let mut registry = JobRegistry::new();
        let now = Instant::now();

        assert!(registry.insert(record("abc", now)));
        assert!(registry.contains("abc"));
        assert_eq!(registry.len(), 1);

        let removed = registry.remove("abc").unwrap();
        assert_eq!(removed.id.as_str(), "abc");
        assert_eq!(registry.len(), 0);
        assert!(registry.remove("abc").is_none());
    }

    #[test]
    fn test_duplicate_insert_is_ignored() {
        let mut registry = JobRegistry::new();
        let now = Instant::now();

        assert!(registry.insert(record("abc", now)));
        assert!(!registry.insert(record("abc", now)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_purge_stale_only_removes_old_records() {
        let mut registry = JobRegistry::new();
        let start = Instant::now();
        registry.insert(record("old", start));
        registry.insert(record("fresh", start + Duration::from_secs(5)));

        let now = start + Duration::from_secs(6);
        let purged = registry.purge_stale(now, Duration::from_secs(3));

        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].id.as_str(), "old");
        assert!(registry.contains("fresh"));
        assert!(!registry.contains("old"));
    }

    #[test]
    fn test_record_exactly_at_ttl_is_kept() {
        let start = Instant::now();
        let rec = record("edge", start);
        assert!(!rec.is_stale(start + Duration::from_secs(1), Duration::from_secs(1)));
        assert!(rec.is_stale(start + Duration::from_millis(1001), Duration::from_secs(1)));
    }
}
