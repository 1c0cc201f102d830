//! The admission gate.
//!
//! One lock guards the job registry together with the `received` and
//! `serving` counters. Every decision reads and mutates them in a single
//! critical section; the downstream handler always runs with the lock
//! released.

use super::registry::{JobRecord, JobRegistry};
use crate::config::AdmissionConfig;
use crate::protocol::{is_completion_status, is_pending, job_id_from_path};
use crate::request_id::RequestId;
use axum::response::{IntoResponse, Response};
use http::{HeaderMap, StatusCode};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A mutating request was turned away because the server is at capacity.
///
/// The client is expected to back off and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("server at capacity ({received} executing, {serving} jobs running, limit {capacity})")]
pub struct AdmissionRejected {
    pub received: usize,
    pub serving: usize,
    pub capacity: usize,
}

impl IntoResponse for AdmissionRejected {
    fn into_response(self) -> Response {
        (StatusCode::TOO_MANY_REQUESTS, self.to_string()).into_response()
    }
}

/// Point-in-time view of the gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionStats {
    /// Mutating requests currently executing in the handler
    pub received: usize,
    /// Jobs accepted and not yet seen to finish
    pub serving: usize,
    /// Configured capacity
    pub capacity: usize,
    /// Lifetime count of admitted mutating requests
    pub admitted: u64,
    /// Lifetime count of overload rejections
    pub rejected: u64,
    /// Lifetime count of records removed by a completion poll
    pub completed: u64,
    /// Lifetime count of records removed by the sweeper
    pub purged: u64,
}

impl AdmissionStats {
    /// Fraction of lifetime mutating requests that were rejected.
    pub fn rejection_rate(&self) -> f64 {
        let total = self.admitted + self.rejected;
        if total == 0 {
            0.0
        } else {
            self.rejected as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct GateState {
    registry: JobRegistry,
    received: usize,
    serving: usize,
}

/// Decides whether mutating requests may run and tracks the async jobs
/// they start.
///
/// Constructed once per server and shared through an `Arc`.
#[derive(Debug)]
pub struct AdmissionController {
    config: AdmissionConfig,
    state: Mutex<GateState>,
    admitted: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    purged: AtomicU64,
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            config,
            state: Mutex::new(GateState {
                registry: JobRegistry::new(),
                received: 0,
                serving: 0,
            }),
            admitted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            purged: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Tries to admit a mutating request.
    ///
    /// On success the returned permit counts against `received` until it is
    /// settled with [`AdmissionPermit::accept`] or dropped. Admission fails
    /// when executing requests would exceed capacity or running jobs already
    /// fill it.
    pub fn try_admit(&self) -> Result<AdmissionPermit<'_>, AdmissionRejected> {
        let capacity = self.config.max_concurrent();
        let mut state = self.state.lock();

        state.received += 1;
        if state.received > capacity || state.serving >= capacity {
            state.received -= 1;
            let rejected = AdmissionRejected {
                received: state.received,
                serving: state.serving,
                capacity,
            };
            drop(state);

            self.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(
                received = rejected.received,
                serving = rejected.serving,
                capacity,
                "Admission rejected, server at capacity"
            );
            return Err(rejected);
        }
        drop(state);

        self.admitted.fetch_add(1, Ordering::Relaxed);
        Ok(AdmissionPermit {
            controller: self,
            settled: false,
        })
    }

    /// Inspects the outcome of a status-check request.
    ///
    /// If `path` names a job-status resource, `status` means the job is done
    /// and the response carries no pending marker, the job's record is
    /// removed. Returns true if a record was removed.
    pub fn observe_status(&self, path: &str, status: StatusCode, headers: &HeaderMap) -> bool {
        if !is_completion_status(status) || is_pending(headers) {
            return false;
        }
        match job_id_from_path(path, self.config.status_resource()) {
            Some(job_id) => self.complete_job(job_id),
            None => false,
        }
    }

    /// Removes a job record and frees its capacity.
    ///
    /// Returns false if the job was not tracked; calling this twice for the
    /// same id changes nothing the second time.
    pub fn complete_job(&self, job_id: &str) -> bool {
        let mut state = self.state.lock();
        let Some(record) = state.registry.remove(job_id) else {
            return false;
        };
        state.serving -= 1;
        debug_assert_eq!(state.serving, state.registry.len());
        let serving = state.serving;
        drop(state);

        self.completed.fetch_add(1, Ordering::Relaxed);
        debug!(
            job_id = %record.id,
            serving,
            age_ms = record.age(Instant::now()).as_millis() as u64,
            "Job completed, record removed"
        );
        true
    }

    /// Purges every record older than the configured TTL.
    ///
    /// Returns the number of records removed.
    pub fn sweep_stale(&self) -> usize {
        let ttl = self.config.entry_ttl();
        let now = Instant::now();

        let mut state = self.state.lock();
        let purged = state.registry.purge_stale(now, ttl);
        state.serving -= purged.len();
        debug_assert_eq!(state.serving, state.registry.len());
        let serving = state.serving;
        drop(state);

        if !purged.is_empty() {
            self.purged.fetch_add(purged.len() as u64, Ordering::Relaxed);
            for record in &purged {
                warn!(
                    job_id = %record.id,
                    age_secs = record.age(now).as_secs(),
                    "Purging stale job record"
                );
            }
            warn!(purged = purged.len(), serving, "Stale job sweep freed capacity");
        }
        purged.len()
    }

    /// Returns true if a record exists for `job_id`.
    pub fn contains(&self, job_id: &str) -> bool {
        self.state.lock().registry.contains(job_id)
    }

    /// Returns a snapshot of counters and lifetime statistics.
    pub fn stats(&self) -> AdmissionStats {
        let (received, serving) = {
            let state = self.state.lock();
            (state.received, state.serving)
        };
        AdmissionStats {
            received,
            serving,
            capacity: self.config.max_concurrent(),
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            purged: self.purged.load(Ordering::Relaxed),
        }
    }

    fn settle(&self, accepted: Option<&RequestId>) {
        let mut state = self.state.lock();
        state.received -= 1;

        let Some(id) = accepted else {
            return;
        };
        if state.registry.insert(JobRecord::new(id.clone(), Instant::now())) {
            state.serving += 1;
            debug_assert_eq!(state.serving, state.registry.len());
            let serving = state.serving;
            drop(state);
            debug!(job_id = %id, serving, "Job accepted, record inserted");
        } else {
            drop(state);
            warn!(job_id = %id, "Job id already tracked, ignoring duplicate accept");
        }
    }
}

/// Slot held by an admitted mutating request while its handler runs.
///
/// Dropping the permit releases the slot. [`accept`](Self::accept) releases
/// it and records the job in the same critical section.
#[must_use = "dropping the permit immediately releases the admission slot"]
#[derive(Debug)]
pub struct AdmissionPermit<'a> {
    controller: &'a AdmissionController,
    settled: bool,
}

impl AdmissionPermit<'_> {
    /// Records that the handler accepted the request and started job `id`.
    pub fn accept(mut self, id: &RequestId) {
        self.settled = true;
        self.controller.settle(Some(id));
    }
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.controller.settle(None);
        }
    }
}
