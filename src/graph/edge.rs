//! Edge representation: a directed connection between two sockets

use super::component::{ActorAndTimestamp, ChangeStatus};
use crate::ids::{EdgeId, NodeId, SocketId};
use serde::{Deserialize, Serialize};

/// A directed edge from one node's output socket to another node's input
/// socket.
///
/// Both endpoints must reference nodes present in the store; an edge whose
/// endpoint is missing is a defect state and is filtered out of derived
/// views rather than crashing anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Unique identity (provisional until the server confirms creation)
    pub id: EdgeId,
    pub from_node_id: NodeId,
    pub from_socket_id: SocketId,
    pub to_node_id: NodeId,
    pub to_socket_id: SocketId,
    /// How this edge differs from the baseline
    pub change_status: ChangeStatus,
    pub created_info: ActorAndTimestamp,
    /// Set when `change_status` is [`ChangeStatus::Deleted`]
    pub deleted_info: Option<ActorAndTimestamp>,
}

impl Edge {
    /// Create an edge between two sockets, stamped by the given actor
    pub fn new(
        from_node_id: NodeId,
        from_socket_id: SocketId,
        to_node_id: NodeId,
        to_socket_id: SocketId,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            id: EdgeId::new(),
            from_node_id,
            from_socket_id,
            to_node_id,
            to_socket_id,
            change_status: ChangeStatus::Added,
            created_info: ActorAndTimestamp::now(actor),
            deleted_info: None,
        }
    }

    /// Replace the id (used when reconciling a provisional id to the
    /// server-assigned canonical one — every other field is preserved)
    pub fn with_id(mut self, id: EdgeId) -> Self {
        self.id = id;
        self
    }

    /// Set the change status
    pub fn with_change_status(mut self, change_status: ChangeStatus) -> Self {
        self.change_status = change_status;
        self
    }

    /// True if the edge carries a tombstone
    pub fn is_deleted(&self) -> bool {
        self.change_status == ChangeStatus::Deleted
    }
}
