//! Common test utilities for integration tests
//!
//! Provides a scriptable in-memory remote plus fixture builders for
//! components and edges.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use weft::remote::{
    AddActionRequest, AddActionResponse, CodePayload, CreateConnectionRequest,
    CreateConnectionResponse, CreateNodeRequest, CreateNodeResponse, DiagramPayload, DiffPayload,
};
use weft::{
    ActionId, ChangeStatus, Component, ComponentId, Edge, EdgeId, NodeId, RemoteClient,
    RemoteError, RemoteResult, SchemaVariant, SocketId, Visibility,
};

/// A scriptable remote: records every call, can fail named operations
/// (permanently or once), and can delay each call so overlap between
/// concurrent intents is observable.
pub struct MockRemote {
    diagram: Mutex<DiagramPayload>,
    code: Mutex<HashMap<ComponentId, String>>,
    fail_ops: Mutex<HashSet<String>>,
    fail_once_ops: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
    next_edge: AtomicUsize,
    next_component: AtomicUsize,
    next_action: AtomicUsize,
}

impl Default for MockRemote {
    fn default() -> Self {
        Self {
            diagram: Mutex::new(DiagramPayload {
                components: vec![],
                edges: vec![],
            }),
            code: Mutex::new(HashMap::new()),
            fail_ops: Mutex::new(HashSet::new()),
            fail_once_ops: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            next_edge: AtomicUsize::new(42),
            next_component: AtomicUsize::new(100),
            next_action: AtomicUsize::new(7),
        }
    }
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `op` fail
    pub fn fail(&self, op: &str) {
        self.fail_ops.lock().unwrap().insert(op.to_string());
    }

    /// Make only the next call to `op` fail
    pub fn fail_once(&self, op: &str) {
        self.fail_once_ops.lock().unwrap().insert(op.to_string());
    }

    /// Script what `fetch_diagram` returns
    pub fn set_diagram(&self, components: Vec<Component>, edges: Vec<Edge>) {
        *self.diagram.lock().unwrap() = DiagramPayload { components, edges };
    }

    /// Script what `get_code` returns for a component
    pub fn set_code(&self, component_id: ComponentId, code: impl Into<String>) {
        self.code.lock().unwrap().insert(component_id, code.into());
    }

    /// Delay every call, so concurrent callers visibly overlap
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// The most calls that were ever in flight at the same time
    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    /// Record the call, apply the scripted delay, then fail if scripted.
    /// Returned guard keeps the call counted as in-flight until dropped.
    async fn observe(&self, call: String) -> RemoteResult<InFlightGuard<'_>> {
        let op = call
            .split(' ')
            .next()
            .unwrap_or(call.as_str())
            .to_string();
        self.calls.lock().unwrap().push(call);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        let guard = InFlightGuard(self);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_once_ops.lock().unwrap().remove(&op)
            || self.fail_ops.lock().unwrap().contains(&op)
        {
            return Err(RemoteError::Rejected(format!("{op} refused")));
        }
        Ok(guard)
    }
}

struct InFlightGuard<'a>(&'a MockRemote);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteClient for MockRemote {
    async fn fetch_diagram(&self, _: &Visibility) -> RemoteResult<DiagramPayload> {
        let _guard = self.observe("fetch_diagram".into()).await?;
        Ok(self.diagram.lock().unwrap().clone())
    }

    async fn list_schema_variants(&self, _: &Visibility) -> RemoteResult<Vec<SchemaVariant>> {
        let _guard = self.observe("list_schema_variants".into()).await?;
        Ok(vec![SchemaVariant {
            id: "variant-1".into(),
            name: "service".into(),
        }])
    }

    async fn get_code(
        &self,
        _: &Visibility,
        component_id: &ComponentId,
    ) -> RemoteResult<CodePayload> {
        let _guard = self.observe(format!("get_code {component_id}")).await?;
        let code = self
            .code
            .lock()
            .unwrap()
            .get(component_id)
            .cloned()
            .unwrap_or_default();
        Ok(CodePayload {
            component_id: component_id.clone(),
            code,
        })
    }

    async fn get_diff(
        &self,
        _: &Visibility,
        component_id: &ComponentId,
    ) -> RemoteResult<DiffPayload> {
        let _guard = self.observe(format!("get_diff {component_id}")).await?;
        Ok(DiffPayload {
            component_id: component_id.clone(),
            diff: String::new(),
        })
    }

    async fn create_node(
        &self,
        _: &Visibility,
        _: CreateNodeRequest,
    ) -> RemoteResult<CreateNodeResponse> {
        let _guard = self.observe("create_node".into()).await?;
        let n = self.next_component.fetch_add(1, Ordering::SeqCst);
        Ok(CreateNodeResponse {
            component_id: ComponentId::from_string(format!("component-{n}")),
            node_id: NodeId::from_string(format!("node-{n}")),
        })
    }

    async fn create_connection(
        &self,
        _: &Visibility,
        _: CreateConnectionRequest,
    ) -> RemoteResult<CreateConnectionResponse> {
        let _guard = self.observe("create_connection".into()).await?;
        let n = self.next_edge.fetch_add(1, Ordering::SeqCst);
        Ok(CreateConnectionResponse {
            connection_id: EdgeId::from_string(format!("edge-{n}")),
        })
    }

    async fn delete_connection(&self, _: &Visibility, edge_id: &EdgeId) -> RemoteResult<()> {
        let _guard = self.observe(format!("delete_connection {edge_id}")).await?;
        Ok(())
    }

    async fn restore_connection(&self, _: &Visibility, edge_id: &EdgeId) -> RemoteResult<()> {
        let _guard = self
            .observe(format!("restore_connection {edge_id}"))
            .await?;
        Ok(())
    }

    async fn delete_component(
        &self,
        _: &Visibility,
        component_id: &ComponentId,
    ) -> RemoteResult<()> {
        let _guard = self
            .observe(format!("delete_component {component_id}"))
            .await?;
        Ok(())
    }

    async fn restore_component(
        &self,
        _: &Visibility,
        component_id: &ComponentId,
    ) -> RemoteResult<()> {
        let _guard = self
            .observe(format!("restore_component {component_id}"))
            .await?;
        Ok(())
    }

    async fn add_action(
        &self,
        _: &Visibility,
        _: AddActionRequest,
    ) -> RemoteResult<AddActionResponse> {
        let _guard = self.observe("add_action".into()).await?;
        let n = self.next_action.fetch_add(1, Ordering::SeqCst);
        Ok(AddActionResponse {
            action_id: ActionId::from_string(format!("action-{n}")),
        })
    }

    async fn remove_action(&self, _: &Visibility, action_id: &ActionId) -> RemoteResult<()> {
        let _guard = self.observe(format!("remove_action {action_id}")).await?;
        Ok(())
    }
}

/// A baseline component with fixed identities
pub fn component(id: &str, node: &str) -> Component {
    let mut c = Component::new(id);
    c.id = ComponentId::from_string(id);
    c.node_id = NodeId::from_string(node);
    c.change_status = ChangeStatus::Unmodified;
    c
}

/// A baseline edge between two nodes' default sockets
pub fn edge(id: &str, from: &str, to: &str) -> Edge {
    Edge::new(
        NodeId::from_string(from),
        SocketId::from_string("out"),
        NodeId::from_string(to),
        SocketId::from_string("in"),
        "seed",
    )
    .with_id(EdgeId::from_string(id))
    .with_change_status(ChangeStatus::Unmodified)
}
