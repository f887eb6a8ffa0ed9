//! StatusTracker: per-root job state for dependent-value recomputation
//!
//! Each accepted mutation that touches computed attributes enqueues
//! recomputation work rooted at one attribute value. The tracker records,
//! per root, which dependent values are queued, running, or completed, so
//! progress is observable while workers race over the queue.

use crate::ids::AttributeValueId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use thiserror::Error;

/// Errors from status-tracking operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("job already exists for root {0}")]
    RootExists(AttributeValueId),
    #[error("no job for root {0}")]
    RootNotFound(AttributeValueId),
    #[error("dependent value {0} is not running")]
    NotRunning(AttributeValueId),
}

/// Result type for status-tracking operations
pub type StatusResult<T> = Result<T, StatusError>;

/// The three-set state of one job. The sets are pairwise disjoint, and an
/// id only ever moves forward: queued → running → completed.
#[derive(Debug, Default)]
struct JobState {
    queued: BTreeSet<AttributeValueId>,
    running: BTreeSet<AttributeValueId>,
    completed: BTreeSet<AttributeValueId>,
    metadata: HashMap<AttributeValueId, Value>,
}

impl JobState {
    /// True if the id is anywhere in the three sets
    fn contains(&self, id: &AttributeValueId) -> bool {
        self.queued.contains(id) || self.running.contains(id) || self.completed.contains(id)
    }

    fn snapshot(&self, root: &AttributeValueId) -> JobSnapshot {
        JobSnapshot {
            root: root.clone(),
            queued: self.queued.iter().cloned().collect(),
            running: self.running.iter().cloned().collect(),
            completed: self.completed.iter().cloned().collect(),
            metadata: self.metadata.clone(),
        }
    }
}

/// A consistent view of one job, taken under the root's lock.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub root: AttributeValueId,
    pub queued: Vec<AttributeValueId>,
    pub running: Vec<AttributeValueId>,
    pub completed: Vec<AttributeValueId>,
    pub metadata: HashMap<AttributeValueId, Value>,
}

impl JobSnapshot {
    /// Total ids tracked across the three sets
    pub fn tracked(&self) -> usize {
        self.queued.len() + self.running.len() + self.completed.len()
    }

    /// True once every tracked id has completed
    pub fn is_finished(&self) -> bool {
        self.queued.is_empty() && self.running.is_empty()
    }
}

/// Tracks dependent-value propagation per recomputation root.
///
/// Roots are independent units: each has its own lock, and there is no
/// cross-root coordination. The queued→running transition is an atomic
/// claim — under concurrent workers exactly one claim per id succeeds.
#[derive(Debug, Default)]
pub struct StatusTracker {
    jobs: DashMap<AttributeValueId, Mutex<JobState>>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
        }
    }

    /// Create a job for a root, with all three sets empty.
    ///
    /// Creation is atomic: concurrent creates for the same root yield
    /// exactly one success.
    pub fn create(&self, root: AttributeValueId) -> StatusResult<()> {
        match self.jobs.entry(root.clone()) {
            Entry::Occupied(_) => Err(StatusError::RootExists(root)),
            Entry::Vacant(entry) => {
                entry.insert(Mutex::new(JobState::default()));
                Ok(())
            }
        }
    }

    /// Restore a job from a previously taken snapshot (recovery path).
    pub fn restore(&self, snapshot: JobSnapshot) -> StatusResult<()> {
        match self.jobs.entry(snapshot.root.clone()) {
            Entry::Occupied(_) => Err(StatusError::RootExists(snapshot.root)),
            Entry::Vacant(entry) => {
                entry.insert(Mutex::new(JobState {
                    queued: snapshot.queued.into_iter().collect(),
                    running: snapshot.running.into_iter().collect(),
                    completed: snapshot.completed.into_iter().collect(),
                    metadata: snapshot.metadata,
                }));
                Ok(())
            }
        }
    }

    fn with_job<T>(
        &self,
        root: &AttributeValueId,
        f: impl FnOnce(&mut JobState) -> T,
    ) -> StatusResult<T> {
        let job = self
            .jobs
            .get(root)
            .ok_or_else(|| StatusError::RootNotFound(root.clone()))?;
        let mut state = job.lock().unwrap();
        Ok(f(&mut state))
    }

    /// Queue a dependent value for recomputation.
    ///
    /// Returns `false` (without changing anything) if the id is already
    /// tracked anywhere in the job: ids never regress.
    pub fn enqueue(&self, root: &AttributeValueId, id: AttributeValueId) -> StatusResult<bool> {
        self.with_job(root, |state| {
            if state.contains(&id) {
                return false;
            }
            state.queued.insert(id);
            true
        })
    }

    /// Atomically claim a queued id for execution.
    ///
    /// Compare-and-swap semantics: succeeds only if the id is currently
    /// queued, so concurrent workers racing for the same id get exactly
    /// one winner.
    pub fn claim(&self, root: &AttributeValueId, id: &AttributeValueId) -> StatusResult<bool> {
        self.with_job(root, |state| {
            if state.queued.remove(id) {
                state.running.insert(id.clone());
                true
            } else {
                false
            }
        })
    }

    /// Mark a running id as completed.
    pub fn finish(&self, root: &AttributeValueId, id: &AttributeValueId) -> StatusResult<()> {
        self.with_job(root, |state| {
            if state.running.remove(id) {
                state.completed.insert(id.clone());
                Ok(())
            } else {
                Err(StatusError::NotRunning(id.clone()))
            }
        })?
    }

    /// Attach free-form metadata to a dependent value id.
    pub fn set_metadata(
        &self,
        root: &AttributeValueId,
        id: AttributeValueId,
        value: Value,
    ) -> StatusResult<()> {
        self.with_job(root, |state| {
            state.metadata.insert(id, value);
        })
    }

    /// A consistent view of the full job (all three sets plus metadata).
    pub fn snapshot(&self, root: &AttributeValueId) -> StatusResult<JobSnapshot> {
        self.with_job(root, |state| state.snapshot(root))
    }

    /// Remove a job, returning its final state.
    pub fn retire(&self, root: &AttributeValueId) -> StatusResult<JobSnapshot> {
        let (key, state) = self
            .jobs
            .remove(root)
            .ok_or_else(|| StatusError::RootNotFound(root.clone()))?;
        let state = state.lock().unwrap();
        Ok(state.snapshot(&key))
    }

    /// All roots with a live job
    pub fn roots(&self) -> Vec<AttributeValueId> {
        self.jobs.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn av(id: &str) -> AttributeValueId {
        AttributeValueId::from_string(id)
    }

    #[test]
    fn create_starts_empty() {
        let tracker = StatusTracker::new();
        tracker.create(av("root")).unwrap();
        let snap = tracker.snapshot(&av("root")).unwrap();
        assert_eq!(snap.tracked(), 0);
        assert!(snap.is_finished());
    }

    #[test]
    fn create_twice_fails() {
        let tracker = StatusTracker::new();
        tracker.create(av("root")).unwrap();
        assert_eq!(
            tracker.create(av("root")),
            Err(StatusError::RootExists(av("root")))
        );
    }

    #[test]
    fn ids_move_strictly_forward() {
        let tracker = StatusTracker::new();
        tracker.create(av("root")).unwrap();

        assert!(tracker.enqueue(&av("root"), av("v1")).unwrap());
        // Re-enqueue of a tracked id is refused
        assert!(!tracker.enqueue(&av("root"), av("v1")).unwrap());

        assert!(tracker.claim(&av("root"), &av("v1")).unwrap());
        // A second claim loses
        assert!(!tracker.claim(&av("root"), &av("v1")).unwrap());
        // Enqueueing a running id is refused
        assert!(!tracker.enqueue(&av("root"), av("v1")).unwrap());

        tracker.finish(&av("root"), &av("v1")).unwrap();
        // Completed ids cannot be re-queued, re-claimed, or re-finished
        assert!(!tracker.enqueue(&av("root"), av("v1")).unwrap());
        assert!(!tracker.claim(&av("root"), &av("v1")).unwrap());
        assert_eq!(
            tracker.finish(&av("root"), &av("v1")),
            Err(StatusError::NotRunning(av("v1")))
        );
    }

    #[test]
    fn sets_stay_disjoint_and_union_monotone() {
        let tracker = StatusTracker::new();
        tracker.create(av("root")).unwrap();
        for id in ["a", "b", "c"] {
            tracker.enqueue(&av("root"), av(id)).unwrap();
        }
        tracker.claim(&av("root"), &av("a")).unwrap();
        tracker.claim(&av("root"), &av("b")).unwrap();
        tracker.finish(&av("root"), &av("a")).unwrap();

        let snap = tracker.snapshot(&av("root")).unwrap();
        assert_eq!(snap.queued, vec![av("c")]);
        assert_eq!(snap.running, vec![av("b")]);
        assert_eq!(snap.completed, vec![av("a")]);
        assert_eq!(snap.tracked(), 3);
    }

    #[test]
    fn finish_requires_claim() {
        let tracker = StatusTracker::new();
        tracker.create(av("root")).unwrap();
        tracker.enqueue(&av("root"), av("v1")).unwrap();
        assert_eq!(
            tracker.finish(&av("root"), &av("v1")),
            Err(StatusError::NotRunning(av("v1")))
        );
    }

    #[test]
    fn unknown_root_is_an_error() {
        let tracker = StatusTracker::new();
        assert_eq!(
            tracker.enqueue(&av("ghost"), av("v1")),
            Err(StatusError::RootNotFound(av("ghost")))
        );
    }

    #[test]
    fn concurrent_claims_have_one_winner() {
        let tracker = std::sync::Arc::new(StatusTracker::new());
        tracker.create(av("root")).unwrap();
        tracker.enqueue(&av("root"), av("contested")).unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let tracker = tracker.clone();
            handles.push(std::thread::spawn(move || {
                tracker.claim(&av("root"), &av("contested")).unwrap()
            }));
        }
        let wins: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(wins, 1);

        let snap = tracker.snapshot(&av("root")).unwrap();
        assert_eq!(snap.running, vec![av("contested")]);
        assert!(snap.queued.is_empty());
    }

    #[test]
    fn metadata_travels_with_snapshots() {
        let tracker = StatusTracker::new();
        tracker.create(av("root")).unwrap();
        tracker.enqueue(&av("root"), av("v1")).unwrap();
        tracker
            .set_metadata(&av("root"), av("v1"), serde_json::json!({"kind": "attribute"}))
            .unwrap();

        let snap = tracker.snapshot(&av("root")).unwrap();
        assert_eq!(
            snap.metadata.get(&av("v1")),
            Some(&serde_json::json!({"kind": "attribute"}))
        );
    }

    #[test]
    fn retire_returns_final_state_and_removes() {
        let tracker = StatusTracker::new();
        tracker.create(av("root")).unwrap();
        tracker.enqueue(&av("root"), av("v1")).unwrap();

        let snap = tracker.retire(&av("root")).unwrap();
        assert_eq!(snap.queued, vec![av("v1")]);
        assert!(tracker.roots().is_empty());
        assert_eq!(
            tracker.snapshot(&av("root")),
            Err(StatusError::RootNotFound(av("root")))
        );
    }

    #[test]
    fn restore_round_trips_a_snapshot() {
        let tracker = StatusTracker::new();
        tracker.create(av("root")).unwrap();
        tracker.enqueue(&av("root"), av("v1")).unwrap();
        tracker.enqueue(&av("root"), av("v2")).unwrap();
        tracker.claim(&av("root"), &av("v1")).unwrap();
        let snap = tracker.retire(&av("root")).unwrap();

        let recovered = StatusTracker::new();
        recovered.restore(snap.clone()).unwrap();
        assert_eq!(recovered.snapshot(&av("root")).unwrap(), snap);
    }
}
