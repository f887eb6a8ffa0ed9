//! MutationEngine: optimistic application of intents
//!
//! `perform` applies the intent's local transform immediately, issues the
//! remote call, then either reconciles server-assigned canonical ids into
//! the store or applies the inverse. Intents targeting the same entity key
//! are serialized; intents on disjoint keys are unordered relative to each
//! other.

use super::intent::{Intent, Inverse};
use crate::changeset::ChangeSet;
use crate::graph::{ActorAndTimestamp, ChangeStatus, Component, Edge, GraphStore};
use crate::ids::{ActionId, ComponentId, EdgeId, NodeId};
use crate::remote::{
    bounded, AddActionRequest, CallPolicy, CreateConnectionRequest, CreateNodeRequest,
    RemoteClient, RemoteError, RemoteResult,
};
use crate::action::Action;
use crate::visibility::Visibility;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;

/// Errors from optimistic mutations
#[derive(Debug, Error)]
pub enum MutationError {
    /// The remote call failed; the local speculative change was rolled
    /// back before this was returned.
    #[error("remote call failed, local change rolled back: {0}")]
    RemoteCallFailed(#[from] RemoteError),
    /// The intent targets an entity the store does not know
    #[error("entity not found: {0}")]
    EntityNotFound(String),
    /// A restore was attempted on an entity that carries no tombstone
    #[error("entity is not deleted: {0}")]
    NotDeleted(String),
}

/// Result type for mutation operations
pub type MutationResult<T> = Result<T, MutationError>;

/// What a successful mutation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The mutation applied with no new identities
    Applied,
    ComponentCreated {
        component_id: ComponentId,
        node_id: NodeId,
    },
    ConnectionCreated {
        edge_id: EdgeId,
    },
    ActionAdded {
        action_id: ActionId,
    },
}

/// Canonical identities returned by the server, when the call created
/// something.
#[derive(Debug)]
enum ServerAssigned {
    None,
    Component {
        component_id: ComponentId,
        node_id: NodeId,
    },
    Connection {
        edge_id: EdgeId,
    },
    Action {
        action_id: ActionId,
    },
}

/// Applies intents optimistically against the local mirror.
pub struct MutationEngine {
    visibility: Visibility,
    actor: String,
    store: Arc<Mutex<GraphStore>>,
    change_set: Arc<Mutex<ChangeSet>>,
    remote: Arc<dyn RemoteClient>,
    policy: CallPolicy,
    /// One lock per entity key; holding it is what serializes intents
    in_flight: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl MutationEngine {
    pub fn new(
        visibility: Visibility,
        actor: impl Into<String>,
        store: Arc<Mutex<GraphStore>>,
        change_set: Arc<Mutex<ChangeSet>>,
        remote: Arc<dyn RemoteClient>,
        policy: CallPolicy,
    ) -> Self {
        Self {
            visibility,
            actor: actor.into(),
            store,
            change_set,
            remote,
            policy,
            in_flight: DashMap::new(),
        }
    }

    /// Optimistically apply an intent.
    ///
    /// The local transform is visible immediately. On remote success,
    /// provisional ids are reconciled to the server-assigned canonical
    /// ones; on failure the inverse restores the pre-intent state and the
    /// error carries the remote failure.
    pub async fn perform(&self, intent: Intent) -> MutationResult<Outcome> {
        let key = intent.entity_key();
        let lock = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let inverse = self.apply_local(&intent)?;
        match self.dispatch(&intent).await {
            Ok(assigned) => Ok(self.reconcile_ids(&intent, assigned)),
            Err(err) => {
                warn!(key = %key, %err, "remote call failed; rolling back");
                self.undo(inverse);
                Err(MutationError::RemoteCallFailed(err))
            }
        }
    }

    /// Delete many components, strictly sequentially.
    ///
    /// One remote call is fully resolved before the next begins; partial
    /// failure handling assumes a single outstanding operation at a time.
    pub async fn delete_components(
        &self,
        component_ids: &[ComponentId],
    ) -> Vec<(ComponentId, MutationResult<Outcome>)> {
        let mut results = Vec::with_capacity(component_ids.len());
        for component_id in component_ids {
            let result = self
                .perform(Intent::delete_component(component_id.clone()))
                .await;
            results.push((component_id.clone(), result));
        }
        results
    }

    /// Restore many components, strictly sequentially.
    pub async fn restore_components(
        &self,
        component_ids: &[ComponentId],
    ) -> Vec<(ComponentId, MutationResult<Outcome>)> {
        let mut results = Vec::with_capacity(component_ids.len());
        for component_id in component_ids {
            let result = self
                .perform(Intent::restore_component(component_id.clone()))
                .await;
            results.push((component_id.clone(), result));
        }
        results
    }

    /// Apply the intent's local transform, returning the exact undo.
    fn apply_local(&self, intent: &Intent) -> MutationResult<Inverse> {
        let mut store = self.store.lock().unwrap();
        let mut change_set = self.change_set.lock().unwrap();

        match intent {
            Intent::CreateComponent {
                provisional_id,
                provisional_node_id,
                schema_variant_id,
                display_name,
                parent_id,
            } => {
                let parent = match parent_id {
                    Some(parent_id) => Some(
                        store
                            .component(parent_id)
                            .map(|p| (p.id.clone(), p.node_id.clone()))
                            .ok_or_else(|| {
                                MutationError::EntityNotFound(format!("component {parent_id}"))
                            })?,
                    ),
                    None => None,
                };
                let mut component = Component::new(display_name.clone())
                    .with_schema_variant(schema_variant_id.clone());
                component.id = provisional_id.clone();
                component.node_id = provisional_node_id.clone();
                if let Some((parent_id, parent_node_id)) = parent {
                    component.parent_id = Some(parent_id);
                    component.parent_node_id = Some(parent_node_id);
                }
                store.upsert_component(component);
                Ok(Inverse::RemoveComponent(provisional_id.clone()))
            }

            Intent::CreateConnection {
                provisional_id,
                from_node_id,
                from_socket_id,
                to_node_id,
                to_socket_id,
            } => {
                for node_id in [from_node_id, to_node_id] {
                    if store.component_by_node(node_id).is_none() {
                        return Err(MutationError::EntityNotFound(format!("node {node_id}")));
                    }
                }
                let edge = Edge::new(
                    from_node_id.clone(),
                    from_socket_id.clone(),
                    to_node_id.clone(),
                    to_socket_id.clone(),
                    self.actor.clone(),
                )
                .with_id(provisional_id.clone());
                store.upsert_edge(edge);
                Ok(Inverse::RemoveEdge(provisional_id.clone()))
            }

            Intent::DeleteConnection { edge_id } => {
                let prior = store
                    .edge(edge_id)
                    .cloned()
                    .ok_or_else(|| MutationError::EntityNotFound(format!("edge {edge_id}")))?;
                if prior.change_status == ChangeStatus::Added {
                    // Never committed: no tombstone, remove outright
                    store.remove_edge(edge_id);
                    Ok(Inverse::InsertEdge(Box::new(prior)))
                } else {
                    if let Some(edge) = store.edge_mut(edge_id) {
                        edge.change_status = ChangeStatus::Deleted;
                        edge.deleted_info = Some(ActorAndTimestamp::now(self.actor.clone()));
                    }
                    Ok(Inverse::RevertEdge(Box::new(prior)))
                }
            }

            Intent::RestoreConnection { edge_id } => {
                let prior = store
                    .edge(edge_id)
                    .cloned()
                    .ok_or_else(|| MutationError::EntityNotFound(format!("edge {edge_id}")))?;
                if !prior.is_deleted() {
                    return Err(MutationError::NotDeleted(format!("edge {edge_id}")));
                }
                if let Some(edge) = store.edge_mut(edge_id) {
                    edge.change_status = ChangeStatus::Unmodified;
                    edge.deleted_info = None;
                }
                Ok(Inverse::RevertEdge(Box::new(prior)))
            }

            Intent::DeleteComponent { component_id } => {
                let prior = store.component(component_id).cloned().ok_or_else(|| {
                    MutationError::EntityNotFound(format!("component {component_id}"))
                })?;
                if prior.change_status == ChangeStatus::Added {
                    store.remove_component(component_id);
                    Ok(Inverse::InsertComponent(Box::new(prior)))
                } else {
                    if let Some(component) = store.component_mut(component_id) {
                        component.change_status = ChangeStatus::Deleted;
                        component.deleted_info = Some(ActorAndTimestamp::now(self.actor.clone()));
                    }
                    Ok(Inverse::RevertComponent(Box::new(prior)))
                }
            }

            Intent::RestoreComponent { component_id } => {
                let prior = store.component(component_id).cloned().ok_or_else(|| {
                    MutationError::EntityNotFound(format!("component {component_id}"))
                })?;
                if !prior.is_deleted() {
                    return Err(MutationError::NotDeleted(format!("component {component_id}")));
                }
                if let Some(component) = store.component_mut(component_id) {
                    component.change_status = ChangeStatus::Unmodified;
                    component.deleted_info = None;
                }
                Ok(Inverse::RevertComponent(Box::new(prior)))
            }

            Intent::AddAction {
                provisional_id,
                prototype_id,
                component_id,
            } => {
                if store.component(component_id).is_none() {
                    return Err(MutationError::EntityNotFound(format!(
                        "component {component_id}"
                    )));
                }
                let action = Action::new(prototype_id.clone(), component_id.clone())
                    .with_id(provisional_id.clone());
                change_set.add_action(action);
                Ok(Inverse::RemoveAction(provisional_id.clone()))
            }

            Intent::RemoveAction { action_id } => {
                let prior = change_set
                    .remove_action(action_id)
                    .ok_or_else(|| MutationError::EntityNotFound(format!("action {action_id}")))?;
                Ok(Inverse::InsertAction(Box::new(prior)))
            }
        }
    }

    /// Issue the remote call for an intent. Mutating calls get one bounded
    /// attempt and are never retried.
    async fn dispatch(&self, intent: &Intent) -> RemoteResult<ServerAssigned> {
        match intent {
            Intent::CreateComponent {
                provisional_id,
                schema_variant_id,
                display_name,
                ..
            } => {
                let parent_node_id = {
                    let store = self.store.lock().unwrap();
                    store
                        .component(provisional_id)
                        .and_then(|c| c.parent_node_id.clone())
                };
                let request = CreateNodeRequest {
                    schema_variant_id: schema_variant_id.clone(),
                    display_name: display_name.clone(),
                    parent_node_id,
                };
                let response = bounded(
                    &self.policy,
                    self.remote.create_node(&self.visibility, request),
                )
                .await?;
                Ok(ServerAssigned::Component {
                    component_id: response.component_id,
                    node_id: response.node_id,
                })
            }

            Intent::CreateConnection {
                from_node_id,
                from_socket_id,
                to_node_id,
                to_socket_id,
                ..
            } => {
                let request = CreateConnectionRequest {
                    from_node_id: from_node_id.clone(),
                    from_socket_id: from_socket_id.clone(),
                    to_node_id: to_node_id.clone(),
                    to_socket_id: to_socket_id.clone(),
                };
                let response = bounded(
                    &self.policy,
                    self.remote.create_connection(&self.visibility, request),
                )
                .await?;
                Ok(ServerAssigned::Connection {
                    edge_id: response.connection_id,
                })
            }

            Intent::DeleteConnection { edge_id } => {
                bounded(
                    &self.policy,
                    self.remote.delete_connection(&self.visibility, edge_id),
                )
                .await?;
                Ok(ServerAssigned::None)
            }

            Intent::RestoreConnection { edge_id } => {
                bounded(
                    &self.policy,
                    self.remote.restore_connection(&self.visibility, edge_id),
                )
                .await?;
                Ok(ServerAssigned::None)
            }

            Intent::DeleteComponent { component_id } => {
                bounded(
                    &self.policy,
                    self.remote.delete_component(&self.visibility, component_id),
                )
                .await?;
                Ok(ServerAssigned::None)
            }

            Intent::RestoreComponent { component_id } => {
                bounded(
                    &self.policy,
                    self.remote.restore_component(&self.visibility, component_id),
                )
                .await?;
                Ok(ServerAssigned::None)
            }

            Intent::AddAction {
                prototype_id,
                component_id,
                ..
            } => {
                let request = AddActionRequest {
                    prototype_id: prototype_id.clone(),
                    component_id: component_id.clone(),
                };
                let response = bounded(
                    &self.policy,
                    self.remote.add_action(&self.visibility, request),
                )
                .await?;
                Ok(ServerAssigned::Action {
                    action_id: response.action_id,
                })
            }

            Intent::RemoveAction { action_id } => {
                bounded(
                    &self.policy,
                    self.remote.remove_action(&self.visibility, action_id),
                )
                .await?;
                Ok(ServerAssigned::None)
            }
        }
    }

    /// Swap provisional ids for server-assigned canonical ones, preserving
    /// every other field.
    ///
    /// A missing provisional record is fine: a full refresh has already
    /// delivered the canonical state.
    fn reconcile_ids(&self, intent: &Intent, assigned: ServerAssigned) -> Outcome {
        match (intent, assigned) {
            (
                Intent::CreateComponent { provisional_id, .. },
                ServerAssigned::Component {
                    component_id,
                    node_id,
                },
            ) => {
                let mut store = self.store.lock().unwrap();
                if let Some(mut component) = store.remove_component(provisional_id) {
                    component.id = component_id.clone();
                    component.node_id = node_id.clone();
                    store.upsert_component(component);
                }
                Outcome::ComponentCreated {
                    component_id,
                    node_id,
                }
            }
            (
                Intent::CreateConnection { provisional_id, .. },
                ServerAssigned::Connection { edge_id },
            ) => {
                let mut store = self.store.lock().unwrap();
                if let Some(edge) = store.remove_edge(provisional_id) {
                    store.upsert_edge(edge.with_id(edge_id.clone()));
                }
                Outcome::ConnectionCreated { edge_id }
            }
            (Intent::AddAction { provisional_id, .. }, ServerAssigned::Action { action_id }) => {
                let mut change_set = self.change_set.lock().unwrap();
                if let Some(action) = change_set.remove_action(provisional_id) {
                    change_set.add_action(action.with_id(action_id.clone()));
                }
                Outcome::ActionAdded { action_id }
            }
            _ => Outcome::Applied,
        }
    }

    /// Apply an inverse against the current local state.
    fn undo(&self, inverse: Inverse) {
        let mut store = self.store.lock().unwrap();
        let mut change_set = self.change_set.lock().unwrap();
        inverse.apply(&mut store, &mut change_set);
    }
}
