//! Mutation intents and their inverses
//!
//! An intent pairs a local speculative transform with a remote call. The
//! transform runs immediately against the store and yields an [`Inverse`]:
//! an explicit undo command that exactly restores the prior state if the
//! remote call fails. Creations mint provisional ids up front so the
//! serialization key exists before anything is applied.

use crate::action::Action;
use crate::changeset::ChangeSet;
use crate::graph::{Component, Edge, GraphStore};
use crate::ids::{ActionId, ActionPrototypeId, ComponentId, EdgeId, NodeId, SocketId};

/// A user-level mutation awaiting optimistic application.
///
/// One variant per mutating remote operation. Closed by design: adding an
/// operation is a compile-time-checked change to every match over intents.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    CreateComponent {
        provisional_id: ComponentId,
        provisional_node_id: NodeId,
        schema_variant_id: String,
        display_name: String,
        parent_id: Option<ComponentId>,
    },
    CreateConnection {
        provisional_id: EdgeId,
        from_node_id: NodeId,
        from_socket_id: SocketId,
        to_node_id: NodeId,
        to_socket_id: SocketId,
    },
    DeleteConnection {
        edge_id: EdgeId,
    },
    RestoreConnection {
        edge_id: EdgeId,
    },
    DeleteComponent {
        component_id: ComponentId,
    },
    RestoreComponent {
        component_id: ComponentId,
    },
    AddAction {
        provisional_id: ActionId,
        prototype_id: ActionPrototypeId,
        component_id: ComponentId,
    },
    RemoveAction {
        action_id: ActionId,
    },
}

impl Intent {
    /// Create a component, optionally under a parent
    pub fn create_component(
        schema_variant_id: impl Into<String>,
        display_name: impl Into<String>,
        parent_id: Option<ComponentId>,
    ) -> Self {
        Self::CreateComponent {
            provisional_id: ComponentId::provisional(),
            provisional_node_id: NodeId::provisional(),
            schema_variant_id: schema_variant_id.into(),
            display_name: display_name.into(),
            parent_id,
        }
    }

    /// Connect an output socket to an input socket
    pub fn create_connection(
        from_node_id: NodeId,
        from_socket_id: SocketId,
        to_node_id: NodeId,
        to_socket_id: SocketId,
    ) -> Self {
        Self::CreateConnection {
            provisional_id: EdgeId::provisional(),
            from_node_id,
            from_socket_id,
            to_node_id,
            to_socket_id,
        }
    }

    pub fn delete_connection(edge_id: EdgeId) -> Self {
        Self::DeleteConnection { edge_id }
    }

    pub fn restore_connection(edge_id: EdgeId) -> Self {
        Self::RestoreConnection { edge_id }
    }

    pub fn delete_component(component_id: ComponentId) -> Self {
        Self::DeleteComponent { component_id }
    }

    pub fn restore_component(component_id: ComponentId) -> Self {
        Self::RestoreComponent { component_id }
    }

    /// Queue an action from a prototype against a component
    pub fn add_action(prototype_id: ActionPrototypeId, component_id: ComponentId) -> Self {
        Self::AddAction {
            provisional_id: ActionId::provisional(),
            prototype_id,
            component_id,
        }
    }

    pub fn remove_action(action_id: ActionId) -> Self {
        Self::RemoveAction { action_id }
    }

    /// The serialization key for this intent.
    ///
    /// At most one remote call is in flight per key; a second intent on
    /// the same key queues behind the first instead of racing it.
    pub fn entity_key(&self) -> String {
        match self {
            Self::CreateComponent { provisional_id, .. } => format!("component/{provisional_id}"),
            Self::DeleteComponent { component_id } | Self::RestoreComponent { component_id } => {
                format!("component/{component_id}")
            }
            Self::CreateConnection { provisional_id, .. } => format!("edge/{provisional_id}"),
            Self::DeleteConnection { edge_id } | Self::RestoreConnection { edge_id } => {
                format!("edge/{edge_id}")
            }
            Self::AddAction { provisional_id, .. } => format!("action/{provisional_id}"),
            Self::RemoveAction { action_id } => format!("action/{action_id}"),
        }
    }
}

/// The exact undo for one applied intent.
///
/// Kept as inspectable data rather than a captured closure, and applied
/// against the *current* state: a concurrent refresh may have replaced or
/// removed the target, in which case the revert variants degrade to
/// no-ops instead of resurrecting stale records.
#[derive(Debug, Clone, PartialEq)]
pub enum Inverse {
    /// Undo a creation: drop the provisional record
    RemoveComponent(ComponentId),
    RemoveEdge(EdgeId),
    RemoveAction(ActionId),
    /// Undo an outright removal: put the prior record back
    InsertComponent(Box<Component>),
    InsertEdge(Box<Edge>),
    InsertAction(Box<Action>),
    /// Undo an in-place mutation: restore the prior record, unless the
    /// entity no longer exists
    RevertComponent(Box<Component>),
    RevertEdge(Box<Edge>),
}

impl Inverse {
    /// Apply the undo to the current local state.
    pub fn apply(self, store: &mut GraphStore, change_set: &mut ChangeSet) {
        match self {
            Self::RemoveComponent(id) => {
                store.remove_component(&id);
            }
            Self::RemoveEdge(id) => {
                store.remove_edge(&id);
            }
            Self::RemoveAction(id) => {
                change_set.remove_action(&id);
            }
            Self::InsertComponent(component) => store.upsert_component(*component),
            Self::InsertEdge(edge) => store.upsert_edge(*edge),
            Self::InsertAction(action) => change_set.add_action(*action),
            Self::RevertComponent(component) => {
                if store.component(&component.id).is_some() {
                    store.upsert_component(*component);
                }
            }
            Self::RevertEdge(edge) => {
                if store.edge(&edge.id).is_some() {
                    store.upsert_edge(*edge);
                }
            }
        }
    }
}
