//! Session: the explicit per-scope context object
//!
//! A session is scoped to one (workspace, change set) pair and owns
//! everything the client needs for it: the graph mirror, the change set,
//! the mutation engine, and the reconciler. There is no global state;
//! constructing a session activates a scope, `deactivate` tears it down.

use crate::changeset::ChangeSet;
use crate::graph::GraphStore;
use crate::ids::{ChangeSetId, ComponentId, WorkspaceId};
use crate::mutation::MutationEngine;
use crate::reconcile::{topic, EventBus, ReconcileResult, Reconciler, Subscription};
use crate::remote::{retry_read, CallPolicy, DiffPayload, RemoteClient, RemoteResult, SchemaVariant};
use crate::visibility::Visibility;
use std::sync::{Arc, Mutex};

/// The live subscriptions a session holds while its scope is active.
pub struct SessionChannels {
    /// Workspace-wide events
    pub workspace: Subscription,
    /// Events for the session's change set
    pub change_set: Subscription,
}

/// A client session for one (workspace, change set) scope.
pub struct Session {
    visibility: Visibility,
    store: Arc<Mutex<GraphStore>>,
    change_set: Arc<Mutex<ChangeSet>>,
    remote: Arc<dyn RemoteClient>,
    policy: CallPolicy,
    engine: MutationEngine,
    reconciler: Reconciler,
}

impl Session {
    pub fn new(
        workspace_id: WorkspaceId,
        change_set_id: ChangeSetId,
        change_set_name: impl Into<String>,
        actor: impl Into<String>,
        remote: Arc<dyn RemoteClient>,
        policy: CallPolicy,
    ) -> Self {
        let visibility = Visibility::new(workspace_id, change_set_id.clone());
        let store = Arc::new(Mutex::new(GraphStore::new(change_set_id.clone())));
        let change_set = Arc::new(Mutex::new(ChangeSet::with_id(
            change_set_id,
            change_set_name,
        )));
        let engine = MutationEngine::new(
            visibility.clone(),
            actor,
            store.clone(),
            change_set.clone(),
            remote.clone(),
            policy.clone(),
        );
        let reconciler = Reconciler::new(
            visibility.clone(),
            store.clone(),
            remote.clone(),
            policy.clone(),
        );
        Self {
            visibility,
            store,
            change_set,
            remote,
            policy,
            engine,
            reconciler,
        }
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    /// The graph mirror for this scope
    pub fn store(&self) -> &Arc<Mutex<GraphStore>> {
        &self.store
    }

    /// The change set this session edits
    pub fn change_set(&self) -> &Arc<Mutex<ChangeSet>> {
        &self.change_set
    }

    /// The optimistic mutation engine for this scope
    pub fn engine(&self) -> &MutationEngine {
        &self.engine
    }

    /// The event reconciler for this scope
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Load (or reload) the full graph from the server
    pub async fn refresh(&self) -> ReconcileResult<()> {
        self.reconciler.full_refresh().await
    }

    /// Schema variants available for node creation
    pub async fn list_schema_variants(&self) -> RemoteResult<Vec<SchemaVariant>> {
        retry_read(&self.policy, || {
            self.remote.list_schema_variants(&self.visibility)
        })
        .await
    }

    /// Diff of one component against the change set's baseline
    pub async fn component_diff(&self, component_id: &ComponentId) -> RemoteResult<DiffPayload> {
        retry_read(&self.policy, || {
            self.remote.get_diff(&self.visibility, component_id)
        })
        .await
    }

    /// Subscribe this scope's topics on the bus.
    ///
    /// Feed the returned subscriptions to [`Reconciler::pump`] (or drain
    /// them manually) to keep the mirror convergent.
    pub fn activate(&self, bus: &EventBus) -> SessionChannels {
        SessionChannels {
            workspace: bus.subscribe(&topic::workspace(&self.visibility.workspace_id)),
            change_set: bus.subscribe(&topic::change_set(&self.visibility.change_set_id)),
        }
    }

    /// Close this scope's topics.
    ///
    /// Every subscription on them drains and ends, so a deactivated scope
    /// can never see stale delivery.
    pub fn deactivate(&self, bus: &EventBus) {
        bus.unsubscribe(&topic::workspace(&self.visibility.workspace_id));
        bus.unsubscribe(&topic::change_set(&self.visibility.change_set_id));
    }
}
