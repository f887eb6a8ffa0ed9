//! Component representation in the change graph

use crate::ids::{ComponentId, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How an entity differs from the change set's baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeStatus {
    /// Created in this change set, no committed baseline state
    Added,
    /// Exists in the baseline with local edits
    Modified,
    /// Soft-deleted (tombstoned) in this change set
    Deleted,
    /// Identical to the baseline
    Unmodified,
}

/// Who performed a change, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorAndTimestamp {
    pub actor: String,
    pub timestamp: DateTime<Utc>,
}

impl ActorAndTimestamp {
    /// Stamp an actor with the current time
    pub fn now(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A component in the change graph.
///
/// Carries two identities: the primary [`ComponentId`] and a [`NodeId`] in
/// a distinct namespace, mapped 1:1. Edges reference nodes; everything
/// else references components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Primary identity
    pub id: ComponentId,
    /// Secondary node identity (1:1 with `id`)
    pub node_id: NodeId,
    /// Parent component, if any. The parent/child projection over a
    /// change set forms a forest.
    pub parent_id: Option<ComponentId>,
    /// Node identity of the parent, if any
    pub parent_node_id: Option<NodeId>,
    /// Children as reported by the server
    #[serde(default)]
    pub child_ids: Vec<ComponentId>,
    /// Which schema variant this component instantiates
    pub schema_variant_id: Option<String>,
    /// Human-readable name shown on the diagram
    pub display_name: String,
    /// How this component differs from the baseline
    pub change_status: ChangeStatus,
    /// Set when `change_status` is [`ChangeStatus::Deleted`]
    pub deleted_info: Option<ActorAndTimestamp>,
}

impl Component {
    /// Create a component with fresh ids and no baseline state
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: ComponentId::new(),
            node_id: NodeId::new(),
            parent_id: None,
            parent_node_id: None,
            child_ids: Vec::new(),
            schema_variant_id: None,
            display_name: display_name.into(),
            change_status: ChangeStatus::Added,
            deleted_info: None,
        }
    }

    /// Set the schema variant
    pub fn with_schema_variant(mut self, schema_variant_id: impl Into<String>) -> Self {
        self.schema_variant_id = Some(schema_variant_id.into());
        self
    }

    /// Set the parent identities
    pub fn with_parent(mut self, parent_id: ComponentId, parent_node_id: NodeId) -> Self {
        self.parent_id = Some(parent_id);
        self.parent_node_id = Some(parent_node_id);
        self
    }

    /// Set the change status
    pub fn with_change_status(mut self, change_status: ChangeStatus) -> Self {
        self.change_status = change_status;
        self
    }

    /// True if the component carries a tombstone
    pub fn is_deleted(&self) -> bool {
        self.change_status == ChangeStatus::Deleted
    }
}
