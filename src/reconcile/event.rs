//! Push events delivered over the reconciliation channel

use crate::ids::{ChangeSetId, ComponentId, WorkspaceId};
use crate::visibility::Visibility;
use serde::{Deserialize, Serialize};

/// What happened server-side.
///
/// A closed tagged union: adding an event kind is a compile-time-checked
/// change to every match over payloads, not a new entry in a string-keyed
/// handler table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum EventPayload {
    /// A new entity exists server-side
    EntityCreated,
    /// A change set's state was written
    ChangeSetWritten(ChangeSetId),
    /// A computed artifact finished for a component
    ComputedArtifactReady(ComponentId),
}

/// The versioned envelope events travel in, scoped to the workspace and
/// change set that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    version: i64,
    workspace_id: WorkspaceId,
    change_set_id: ChangeSetId,
    payload: EventPayload,
}

impl Event {
    pub fn new(visibility: &Visibility, payload: EventPayload) -> Self {
        Self {
            version: 1,
            workspace_id: visibility.workspace_id.clone(),
            change_set_id: visibility.change_set_id.clone(),
            payload,
        }
    }

    pub fn workspace_id(&self) -> &WorkspaceId {
        &self.workspace_id
    }

    pub fn change_set_id(&self) -> &ChangeSetId {
        &self.change_set_id
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }
}

/// Topic strings subscriptions are keyed by.
pub mod topic {
    use crate::ids::{ChangeSetId, WorkspaceId};

    /// Topic for workspace-wide events
    pub fn workspace(id: &WorkspaceId) -> String {
        format!("workspace/{id}")
    }

    /// Topic for one change set's events
    pub fn change_set(id: &ChangeSetId) -> String {
        format!("changeset/{id}")
    }
}
