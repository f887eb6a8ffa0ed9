//! Pending actions and their linearization into execution order
//!
//! Actions queued against components form a DAG via their `parents`
//! edges. Before application they are flattened into a total order that
//! respects the partial order, with a deterministic tie-break.

use crate::ids::{ActionId, ActionPrototypeId, ComponentId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::warn;

/// Errors from action scheduling
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The remaining actions all wait on each other; no execution order
    /// exists. Reported instead of looping.
    #[error("cycle detected among actions: {}", .remaining.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", "))]
    CycleDetected { remaining: Vec<ActionId> },
}

/// Result type for scheduling operations
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// A mutation queued against a component, awaiting application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: ActionId,
    /// Template this action was instantiated from
    pub prototype_id: ActionPrototypeId,
    /// Component the action targets
    pub component_id: ComponentId,
    /// Direct predecessors: every parent must execute before this action
    #[serde(default)]
    pub parents: Vec<ActionId>,
}

impl Action {
    /// Create an action with a fresh id and no predecessors
    pub fn new(prototype_id: ActionPrototypeId, component_id: ComponentId) -> Self {
        Self {
            id: ActionId::new(),
            prototype_id,
            component_id,
            parents: Vec::new(),
        }
    }

    /// Replace the id
    pub fn with_id(mut self, id: ActionId) -> Self {
        self.id = id;
        self
    }

    /// Add a direct predecessor
    pub fn with_parent(mut self, parent: ActionId) -> Self {
        self.parents.push(parent);
        self
    }
}

/// Linearize a DAG of actions into a safe execution order.
///
/// Stable variant of Kahn's algorithm: each round emits every action whose
/// predecessors have all been emitted, in ascending lexicographic id order,
/// then discounts them from the remaining actions' `parents`. A round that
/// emits nothing while actions remain means the remainder contains a
/// cycle — reported as [`ScheduleError::CycleDetected`] naming the
/// offending ids, never an unbounded loop.
///
/// A parent id that references no action in the input is treated as
/// already satisfied (and logged): a missing predecessor cannot be waited
/// on forever.
pub fn linearize(actions: &[Action]) -> ScheduleResult<Vec<Action>> {
    let mut remaining: BTreeMap<ActionId, Action> = actions
        .iter()
        .map(|a| (a.id.clone(), a.clone()))
        .collect();
    let known: HashSet<ActionId> = remaining.keys().cloned().collect();

    for action in remaining.values() {
        for parent in &action.parents {
            if !known.contains(parent) {
                warn!(
                    action_id = %action.id,
                    parent_id = %parent,
                    "action references unknown parent; treating as satisfied"
                );
            }
        }
    }

    let mut emitted: HashSet<ActionId> = HashSet::new();
    let mut order: Vec<Action> = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        // BTreeMap iteration yields ascending id order, which is the
        // deterministic tie-break within a generation.
        let ready: Vec<ActionId> = remaining
            .iter()
            .filter(|(_, action)| {
                action
                    .parents
                    .iter()
                    .all(|p| emitted.contains(p) || !known.contains(p))
            })
            .map(|(id, _)| id.clone())
            .collect();

        if ready.is_empty() {
            return Err(ScheduleError::CycleDetected {
                remaining: remaining.keys().cloned().collect(),
            });
        }

        for id in ready {
            if let Some(action) = remaining.remove(&id) {
                emitted.insert(id);
                order.push(action);
            }
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(id: &str, parents: &[&str]) -> Action {
        let mut a = Action::new(
            ActionPrototypeId::from_string("proto"),
            ComponentId::from_string("comp"),
        )
        .with_id(ActionId::from_string(id));
        for p in parents {
            a = a.with_parent(ActionId::from_string(*p));
        }
        a
    }

    fn ids(actions: &[Action]) -> Vec<&str> {
        actions.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn diamond_linearizes_in_exact_order() {
        let actions = vec![
            action("d", &["b", "c"]),
            action("b", &["a"]),
            action("c", &["a"]),
            action("a", &[]),
        ];
        let order = linearize(&actions).unwrap();
        assert_eq!(ids(&order), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn output_respects_topological_order() {
        let actions = vec![
            action("z", &[]),
            action("m", &["z"]),
            action("a", &["m"]),
        ];
        let order = linearize(&actions).unwrap();
        let position: std::collections::HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.as_str(), i))
            .collect();
        for a in &order {
            for p in &a.parents {
                assert!(position[p.as_str()] < position[a.id.as_str()]);
            }
        }
    }

    #[test]
    fn same_input_gives_same_output() {
        let actions = vec![
            action("c", &[]),
            action("a", &[]),
            action("b", &[]),
        ];
        let first = linearize(&actions).unwrap();
        let second = linearize(&actions).unwrap();
        assert_eq!(ids(&first), vec!["a", "b", "c"]);
        assert_eq!(first, second);
    }

    #[test]
    fn two_cycle_is_detected() {
        let actions = vec![action("x", &["y"]), action("y", &["x"])];
        let err = linearize(&actions).unwrap_err();
        match err {
            ScheduleError::CycleDetected { remaining } => {
                assert_eq!(remaining.len(), 2);
                assert!(remaining.contains(&ActionId::from_string("x")));
                assert!(remaining.contains(&ActionId::from_string("y")));
            }
        }
    }

    #[test]
    fn cycle_report_excludes_schedulable_prefix() {
        let actions = vec![
            action("a", &[]),
            action("x", &["a", "y"]),
            action("y", &["x"]),
        ];
        let err = linearize(&actions).unwrap_err();
        match err {
            ScheduleError::CycleDetected { remaining } => {
                assert_eq!(remaining.len(), 2);
                assert!(!remaining.contains(&ActionId::from_string("a")));
            }
        }
    }

    #[test]
    fn unknown_parent_is_treated_as_satisfied() {
        let actions = vec![action("a", &["ghost"])];
        let order = linearize(&actions).unwrap();
        assert_eq!(ids(&order), vec!["a"]);
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(linearize(&[]).unwrap().is_empty());
    }
}
