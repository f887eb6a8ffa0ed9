//! Storage trait definitions for persisted job-state records

use crate::ids::AttributeValueId;
use crate::status::JobSnapshot;
use crate::visibility::Visibility;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("job already exists for root {0}")]
    JobExists(AttributeValueId),

    #[error("no job record for root {0}")]
    JobNotFound(AttributeValueId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// The JSON document persisted per job row.
///
/// The three id lists are ordered lists used as sets; together with the
/// metadata map they are the durable form of a tracker snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub attribute_value_id: AttributeValueId,
    #[serde(default)]
    pub dependent_values_metadata: HashMap<AttributeValueId, serde_json::Value>,
    #[serde(default)]
    pub queued_dependent_value_ids: Vec<AttributeValueId>,
    #[serde(default)]
    pub running_dependent_value_ids: Vec<AttributeValueId>,
    #[serde(default)]
    pub completed_dependent_value_ids: Vec<AttributeValueId>,
}

impl JobRecord {
    /// A fresh record for a root: all three lists empty
    pub fn empty(attribute_value_id: AttributeValueId) -> Self {
        Self {
            attribute_value_id,
            dependent_values_metadata: HashMap::new(),
            queued_dependent_value_ids: Vec::new(),
            running_dependent_value_ids: Vec::new(),
            completed_dependent_value_ids: Vec::new(),
        }
    }
}

impl From<JobSnapshot> for JobRecord {
    fn from(snapshot: JobSnapshot) -> Self {
        Self {
            attribute_value_id: snapshot.root,
            dependent_values_metadata: snapshot.metadata,
            queued_dependent_value_ids: snapshot.queued,
            running_dependent_value_ids: snapshot.running,
            completed_dependent_value_ids: snapshot.completed,
        }
    }
}

impl From<JobRecord> for JobSnapshot {
    fn from(record: JobRecord) -> Self {
        Self {
            root: record.attribute_value_id,
            metadata: record.dependent_values_metadata,
            queued: record.queued_dependent_value_ids,
            running: record.running_dependent_value_ids,
            completed: record.completed_dependent_value_ids,
        }
    }
}

/// Trait for job-record storage backends.
///
/// Every operation is scoped by a tenancy ([`Visibility`]: workspace +
/// change set); rows from one tenancy are invisible to another.
pub trait JobStore: Send + Sync {
    /// Atomically create the record for a root, with all three lists
    /// initialized empty. Fails if the root already has a record in this
    /// tenancy.
    fn create_job(&self, tenancy: &Visibility, root: &AttributeValueId) -> StorageResult<()>;

    /// Persist a record (insert or update by root)
    fn save_job(&self, tenancy: &Visibility, record: &JobRecord) -> StorageResult<()>;

    /// Load the record for a root
    fn load_job(
        &self,
        tenancy: &Visibility,
        root: &AttributeValueId,
    ) -> StorageResult<Option<JobRecord>>;

    /// All records in a tenancy, ordered by root id
    fn list_jobs(&self, tenancy: &Visibility) -> StorageResult<Vec<JobRecord>>;

    /// Delete the record for a root; returns whether one existed
    fn delete_job(&self, tenancy: &Visibility, root: &AttributeValueId) -> StorageResult<bool>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: JobStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
