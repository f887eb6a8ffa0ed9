//! Visibility: the (workspace, change set) scope pair
//!
//! Every remote operation and every persisted job record is scoped by a
//! workspace and a change set. Passing the pair explicitly replaces the
//! per-store global state the scope used to live in.

use crate::ids::{ChangeSetId, WorkspaceId};
use serde::{Deserialize, Serialize};

/// The scope a session operates in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Visibility {
    /// Workspace the change set belongs to
    pub workspace_id: WorkspaceId,
    /// Change set all operations apply to
    pub change_set_id: ChangeSetId,
}

impl Visibility {
    pub fn new(workspace_id: WorkspaceId, change_set_id: ChangeSetId) -> Self {
        Self {
            workspace_id,
            change_set_id,
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.workspace_id, self.change_set_id)
    }
}
