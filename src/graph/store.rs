//! GraphStore: the client-side authoritative mirror of a change set's
//! components and edges
//!
//! Entities live in flat id-keyed maps; all traversal runs over explicit
//! visited sets, so cyclic edge topologies cannot hang or overflow.

use super::component::Component;
use super::edge::Edge;
use crate::ids::{ChangeSetId, ComponentId, EdgeId, NodeId};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::warn;

/// The authoritative local mirror of one change set's graph.
///
/// Owns every component and edge known to the client for its change-set
/// scope. Upserts are idempotent (replace by id); derived views filter
/// defect states (dangling edges) instead of propagating them.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphStore {
    change_set_id: ChangeSetId,
    components: HashMap<ComponentId, Component>,
    /// Secondary identity index, maintained 1:1 with `components`
    node_index: HashMap<NodeId, ComponentId>,
    edges: HashMap<EdgeId, Edge>,
    /// Computed artifacts (generated code) fetched per component
    artifacts: HashMap<ComponentId, String>,
}

impl GraphStore {
    /// Create an empty store scoped to a change set
    pub fn new(change_set_id: ChangeSetId) -> Self {
        Self {
            change_set_id,
            components: HashMap::new(),
            node_index: HashMap::new(),
            edges: HashMap::new(),
            artifacts: HashMap::new(),
        }
    }

    /// The change set this store mirrors
    pub fn change_set_id(&self) -> &ChangeSetId {
        &self.change_set_id
    }

    // === Components ===

    /// Insert or replace a component by id
    pub fn upsert_component(&mut self, component: Component) {
        if let Some(prior) = self.components.get(&component.id) {
            if prior.node_id != component.node_id {
                self.node_index.remove(&prior.node_id);
            }
        }
        self.node_index
            .insert(component.node_id.clone(), component.id.clone());
        self.components.insert(component.id.clone(), component);
    }

    /// Insert or replace components by id (idempotent)
    pub fn upsert_components(&mut self, components: impl IntoIterator<Item = Component>) {
        for component in components {
            self.upsert_component(component);
        }
    }

    /// Remove a component outright, along with its node index entry and
    /// any cached artifact
    pub fn remove_component(&mut self, id: &ComponentId) -> Option<Component> {
        let component = self.components.remove(id)?;
        self.node_index.remove(&component.node_id);
        self.artifacts.remove(id);
        Some(component)
    }

    pub fn component(&self, id: &ComponentId) -> Option<&Component> {
        self.components.get(id)
    }

    pub fn component_mut(&mut self, id: &ComponentId) -> Option<&mut Component> {
        self.components.get_mut(id)
    }

    /// Resolve a component through its secondary node identity
    pub fn component_by_node(&self, node_id: &NodeId) -> Option<&Component> {
        self.node_index
            .get(node_id)
            .and_then(|id| self.components.get(id))
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    // === Edges ===

    /// Insert or replace an edge by id
    pub fn upsert_edge(&mut self, edge: Edge) {
        self.edges.insert(edge.id.clone(), edge);
    }

    /// Insert or replace edges by id (idempotent)
    pub fn upsert_edges(&mut self, edges: impl IntoIterator<Item = Edge>) {
        for edge in edges {
            self.upsert_edge(edge);
        }
    }

    /// Remove an edge outright
    pub fn remove_edge(&mut self, id: &EdgeId) -> Option<Edge> {
        self.edges.remove(id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn edge_mut(&mut self, id: &EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id)
    }

    /// All edges, including tombstoned and dangling ones
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges whose endpoints both resolve to known nodes.
    ///
    /// A dangling edge is a defect state, not a crash condition: it is
    /// dropped from the view and logged.
    pub fn resolved_edges(&self) -> Vec<&Edge> {
        self.edges
            .values()
            .filter(|edge| {
                let resolved = self.node_index.contains_key(&edge.from_node_id)
                    && self.node_index.contains_key(&edge.to_node_id);
                if !resolved {
                    warn!(
                        edge_id = %edge.id,
                        from = %edge.from_node_id,
                        to = %edge.to_node_id,
                        "dropping dangling edge from view"
                    );
                }
                resolved
            })
            .collect()
    }

    // === Full refresh ===

    /// Replace the entire mirror with authoritative server state.
    ///
    /// Cached artifacts are retained only for components that survive the
    /// refresh, so a stale artifact cannot outlive its component.
    pub fn replace_all(
        &mut self,
        components: impl IntoIterator<Item = Component>,
        edges: impl IntoIterator<Item = Edge>,
    ) {
        self.components.clear();
        self.node_index.clear();
        self.edges.clear();
        self.upsert_components(components);
        self.upsert_edges(edges);
        self.artifacts
            .retain(|id, _| self.components.contains_key(id));
    }

    // === Derived parent/child views ===

    /// Components with no (resolvable) parent, in id order
    pub fn root_components(&self) -> Vec<&Component> {
        let mut roots: Vec<&Component> = self
            .components
            .values()
            .filter(|c| match &c.parent_id {
                Some(parent_id) => !self.components.contains_key(parent_id),
                None => true,
            })
            .collect();
        roots.sort_by(|a, b| a.id.cmp(&b.id));
        roots
    }

    /// Direct children of a component, in id order
    pub fn children_of(&self, id: &ComponentId) -> Vec<&Component> {
        let mut children: Vec<&Component> = self
            .components
            .values()
            .filter(|c| c.parent_id.as_ref() == Some(id))
            .collect();
        children.sort_by(|a, b| a.id.cmp(&b.id));
        children
    }

    // === Reachability ===

    /// The transitive closure of the `from → to` edge relation starting at
    /// `root`, inclusive of `root` itself.
    ///
    /// Cycle-safe: a visited set guards against revisiting, so the walk
    /// terminates with a finite result even on cyclic edge sets, and the
    /// result does not depend on edge iteration order. Tombstoned and
    /// dangling edges do not contribute.
    pub fn reachable_from(&self, root: &NodeId) -> HashSet<NodeId> {
        let mut adjacency: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
        for edge in self.resolved_edges() {
            if edge.is_deleted() {
                continue;
            }
            adjacency
                .entry(&edge.from_node_id)
                .or_default()
                .push(&edge.to_node_id);
        }

        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<&NodeId> = VecDeque::new();
        visited.insert(root.clone());
        queue.push_back(root);

        while let Some(node_id) = queue.pop_front() {
            for neighbor in adjacency.get(node_id).into_iter().flatten() {
                if visited.insert((*neighbor).clone()) {
                    queue.push_back(neighbor);
                }
            }
        }

        visited
    }

    // === Computed artifacts ===

    /// Cache a computed artifact for a component
    pub fn set_artifact(&mut self, id: ComponentId, artifact: String) {
        self.artifacts.insert(id, artifact);
    }

    pub fn artifact(&self, id: &ComponentId) -> Option<&str> {
        self.artifacts.get(id).map(String::as_str)
    }
}
