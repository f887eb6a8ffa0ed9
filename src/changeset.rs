//! Change sets: named, versioned branches of graph state
//!
//! A change set owns the actions queued against it and moves through a
//! one-way lifecycle. Illegal transitions are rejected with a typed
//! error, never applied silently.

use crate::action::{linearize, Action, ScheduleResult};
use crate::ids::{ActionId, ChangeSetId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors from change-set lifecycle operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChangeSetError {
    #[error("illegal change set transition: {from} -> {to}")]
    IllegalTransition {
        from: ChangeSetStatus,
        to: ChangeSetStatus,
    },
}

/// Result type for change-set operations
pub type ChangeSetResult<T> = Result<T, ChangeSetError>;

/// Lifecycle state of a change set.
///
/// Created `Open`; each non-`Open` status is entered at most once.
/// `Applied`, `Failed`, `Closed`, and `Abandoned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeSetStatus {
    Open,
    NeedsApproval,
    Applied,
    Failed,
    Closed,
    Abandoned,
}

impl ChangeSetStatus {
    /// The statuses this one may transition to
    pub fn allowed_transitions(self) -> Vec<ChangeSetStatus> {
        use ChangeSetStatus::*;
        match self {
            Open => vec![NeedsApproval, Applied, Failed, Closed, Abandoned],
            NeedsApproval => vec![Applied, Failed, Abandoned],
            Applied => vec![],
            Failed => vec![],
            Closed => vec![],
            Abandoned => vec![],
        }
    }

    pub fn can_transition_to(self, to: ChangeSetStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// True if no further transitions are possible
    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl std::fmt::Display for ChangeSetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Open => "Open",
            Self::NeedsApproval => "NeedsApproval",
            Self::Applied => "Applied",
            Self::Failed => "Failed",
            Self::Closed => "Closed",
            Self::Abandoned => "Abandoned",
        };
        write!(f, "{}", s)
    }
}

/// A named, versioned branch of graph state pending merge into a baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    id: ChangeSetId,
    name: String,
    status: ChangeSetStatus,
    actions: HashMap<ActionId, Action>,
}

impl ChangeSet {
    /// Create an open change set with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(ChangeSetId::new(), name)
    }

    /// Create an open change set with a specific id
    pub fn with_id(id: ChangeSetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            status: ChangeSetStatus::Open,
            actions: HashMap::new(),
        }
    }

    pub fn id(&self) -> &ChangeSetId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ChangeSetStatus {
        self.status
    }

    /// Move to a new status, rejecting illegal transitions
    pub fn transition(&mut self, to: ChangeSetStatus) -> ChangeSetResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(ChangeSetError::IllegalTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    // === Actions ===

    /// Queue an action (replaces any action with the same id)
    pub fn add_action(&mut self, action: Action) {
        self.actions.insert(action.id.clone(), action);
    }

    /// Remove a queued action
    pub fn remove_action(&mut self, id: &ActionId) -> Option<Action> {
        self.actions.remove(id)
    }

    pub fn action(&self, id: &ActionId) -> Option<&Action> {
        self.actions.get(id)
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// The queued actions in a safe execution order
    pub fn linearized_actions(&self) -> ScheduleResult<Vec<Action>> {
        let actions: Vec<Action> = self.actions.values().cloned().collect();
        linearize(&actions)
    }
}
