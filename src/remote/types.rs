//! Request and response payloads for remote operations

use crate::graph::{Component, Edge};
use crate::ids::{ActionId, ActionPrototypeId, ComponentId, EdgeId, NodeId, SocketId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from remote calls
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The call exceeded its deadline. For a mutating call this means the
    /// server may still apply it later — callers roll back locally and
    /// surface the ambiguity instead of retrying.
    #[error("remote call timed out; the server may still apply it")]
    Timeout,
    /// The server processed and refused the call
    #[error("rejected by server: {0}")]
    Rejected(String),
    /// The call never reached the server
    #[error("transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    /// True if an idempotent read may be retried after this error.
    /// Rejections are deliberate server answers and are never retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// Result type for remote operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Full components+edges state for a change set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramPayload {
    pub components: Vec<Component>,
    pub edges: Vec<Edge>,
}

/// A schema variant components can be instantiated from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaVariant {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeRequest {
    pub schema_variant_id: String,
    pub display_name: String,
    pub parent_node_id: Option<NodeId>,
}

/// Canonical identities assigned by the server for a created node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeResponse {
    pub component_id: ComponentId,
    pub node_id: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionRequest {
    pub from_node_id: NodeId,
    pub from_socket_id: SocketId,
    pub to_node_id: NodeId,
    pub to_socket_id: SocketId,
}

/// The canonical connection id assigned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionResponse {
    pub connection_id: EdgeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddActionRequest {
    pub prototype_id: ActionPrototypeId,
    pub component_id: ComponentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddActionResponse {
    pub action_id: ActionId,
}

/// Generated code for one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodePayload {
    pub component_id: ComponentId,
    pub code: String,
}

/// Diff of one component against the change set's baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffPayload {
    pub component_id: ComponentId,
    pub diff: String,
}
