//! End-to-end optimistic mutation protocol against a scripted remote:
//! canonical-id reconciliation, exact rollback, soft-delete semantics,
//! per-entity-key serialization, and sequential bulk operations.

mod common;

use common::{component, edge, MockRemote};
use std::sync::Arc;
use std::time::Duration;
use weft::{
    ActionId, ActionPrototypeId, CallPolicy, ChangeSetId, ChangeStatus, ComponentId, EdgeId,
    Intent, MutationError, NodeId, Outcome, Session, SocketId, WorkspaceId,
};

fn session_with(remote: Arc<MockRemote>) -> Session {
    let session = Session::new(
        WorkspaceId::from_string("ws-1"),
        ChangeSetId::from_string("cs-1"),
        "integration",
        "alice",
        remote,
        CallPolicy::default(),
    );
    session.store().lock().unwrap().upsert_components([
        component("c1", "n1"),
        component("c2", "n2"),
    ]);
    session
}

fn connect_n1_n2() -> Intent {
    Intent::create_connection(
        NodeId::from_string("n1"),
        SocketId::from_string("out"),
        NodeId::from_string("n2"),
        SocketId::from_string("in"),
    )
}

#[tokio::test]
async fn provisional_edge_is_reconciled_to_canonical_id() {
    let remote = Arc::new(MockRemote::new());
    let session = session_with(remote.clone());

    let outcome = session.engine().perform(connect_n1_n2()).await.unwrap();
    assert_eq!(
        outcome,
        Outcome::ConnectionCreated {
            edge_id: EdgeId::from_string("edge-42"),
        }
    );

    let store = session.store().lock().unwrap();
    let created = store.edge(&EdgeId::from_string("edge-42")).unwrap();
    assert_eq!(created.from_node_id, NodeId::from_string("n1"));
    assert_eq!(created.from_socket_id, SocketId::from_string("out"));
    assert_eq!(created.to_node_id, NodeId::from_string("n2"));
    assert_eq!(created.to_socket_id, SocketId::from_string("in"));
    assert_eq!(created.change_status, ChangeStatus::Added);
    assert_eq!(store.edge_count(), 1);
    assert!(store.edges().all(|e| !e.id.is_provisional()));
}

#[tokio::test]
async fn failed_remote_call_restores_exact_prior_state() {
    let remote = Arc::new(MockRemote::new());
    remote.fail("create_connection");
    let session = session_with(remote);
    let before = session.store().lock().unwrap().clone();

    let err = session.engine().perform(connect_n1_n2()).await.unwrap_err();
    assert!(matches!(err, MutationError::RemoteCallFailed(_)));
    assert_eq!(*session.store().lock().unwrap(), before);
}

#[tokio::test]
async fn soft_delete_distinguishes_added_from_committed() {
    let remote = Arc::new(MockRemote::new());
    let session = session_with(remote);
    {
        let mut store = session.store().lock().unwrap();
        store.upsert_edge(edge("e-added", "n1", "n2").with_change_status(ChangeStatus::Added));
        store.upsert_edge(edge("e-committed", "n1", "n2"));
    }

    // No prior committed state: removed outright
    session
        .engine()
        .perform(Intent::delete_connection(EdgeId::from_string("e-added")))
        .await
        .unwrap();
    // Committed baseline: tombstoned
    session
        .engine()
        .perform(Intent::delete_connection(EdgeId::from_string("e-committed")))
        .await
        .unwrap();

    let store = session.store().lock().unwrap();
    assert!(store.edge(&EdgeId::from_string("e-added")).is_none());
    let tombstoned = store.edge(&EdgeId::from_string("e-committed")).unwrap();
    assert_eq!(tombstoned.change_status, ChangeStatus::Deleted);
    assert_eq!(tombstoned.deleted_info.as_ref().unwrap().actor, "alice");
}

#[tokio::test]
async fn restore_clears_the_tombstone() {
    let remote = Arc::new(MockRemote::new());
    let session = session_with(remote);
    session
        .store()
        .lock()
        .unwrap()
        .upsert_edge(edge("e1", "n1", "n2"));

    session
        .engine()
        .perform(Intent::delete_connection(EdgeId::from_string("e1")))
        .await
        .unwrap();
    session
        .engine()
        .perform(Intent::restore_connection(EdgeId::from_string("e1")))
        .await
        .unwrap();

    let store = session.store().lock().unwrap();
    let restored = store.edge(&EdgeId::from_string("e1")).unwrap();
    assert_eq!(restored.change_status, ChangeStatus::Unmodified);
    assert!(restored.deleted_info.is_none());
}

#[tokio::test]
async fn same_key_intents_are_serialized() {
    let remote = Arc::new(MockRemote::new());
    remote.set_delay(Duration::from_millis(20));
    let session = session_with(remote.clone());
    session
        .store()
        .lock()
        .unwrap()
        .upsert_edge(edge("e1", "n1", "n2"));

    // Two intents on the same entity key, issued concurrently. The second
    // must queue behind the first rather than race it.
    let (first, second) = tokio::join!(
        session
            .engine()
            .perform(Intent::delete_connection(EdgeId::from_string("e1"))),
        session
            .engine()
            .perform(Intent::delete_connection(EdgeId::from_string("e1"))),
    );
    first.unwrap();
    second.unwrap();

    assert_eq!(remote.high_water(), 1);
    assert_eq!(
        remote.calls(),
        vec!["delete_connection e1", "delete_connection e1"]
    );
}

#[tokio::test]
async fn disjoint_keys_are_not_serialized_against_each_other() {
    let remote = Arc::new(MockRemote::new());
    remote.set_delay(Duration::from_millis(20));
    let session = session_with(remote.clone());
    {
        let mut store = session.store().lock().unwrap();
        store.upsert_edge(edge("e1", "n1", "n2"));
        store.upsert_edge(edge("e2", "n2", "n1"));
    }

    let (first, second) = tokio::join!(
        session
            .engine()
            .perform(Intent::delete_connection(EdgeId::from_string("e1"))),
        session
            .engine()
            .perform(Intent::delete_connection(EdgeId::from_string("e2"))),
    );
    first.unwrap();
    second.unwrap();

    // Both calls were in flight at once
    assert_eq!(remote.high_water(), 2);
}

#[tokio::test]
async fn bulk_delete_runs_one_call_at_a_time_in_order() {
    let remote = Arc::new(MockRemote::new());
    remote.set_delay(Duration::from_millis(5));
    let session = session_with(remote.clone());
    session
        .store()
        .lock()
        .unwrap()
        .upsert_component(component("c3", "n3"));

    let targets = vec![
        ComponentId::from_string("c1"),
        ComponentId::from_string("c2"),
        ComponentId::from_string("c3"),
    ];
    let results = session.engine().delete_components(&targets).await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|(_, result)| result.is_ok()));
    assert_eq!(remote.high_water(), 1);
    assert_eq!(
        remote.calls(),
        vec![
            "delete_component c1",
            "delete_component c2",
            "delete_component c3"
        ]
    );
}

#[tokio::test]
async fn bulk_delete_reports_partial_failure_and_continues() {
    let remote = Arc::new(MockRemote::new());
    remote.fail_once("delete_component");
    let session = session_with(remote);

    let targets = vec![
        ComponentId::from_string("c1"),
        ComponentId::from_string("c2"),
    ];
    let results = session.engine().delete_components(&targets).await;

    // First call failed and rolled back; the second still ran
    assert!(results[0].1.is_err());
    assert!(results[1].1.is_ok());

    let store = session.store().lock().unwrap();
    let untouched = store.component(&ComponentId::from_string("c1")).unwrap();
    assert_eq!(untouched.change_status, ChangeStatus::Unmodified);
    assert!(untouched.deleted_info.is_none());
    let tombstoned = store.component(&ComponentId::from_string("c2")).unwrap();
    assert_eq!(tombstoned.change_status, ChangeStatus::Deleted);
}

#[tokio::test]
async fn created_component_accepts_follow_up_action() {
    let remote = Arc::new(MockRemote::new());
    let session = session_with(remote);

    let outcome = session
        .engine()
        .perform(Intent::create_component("variant-1", "load balancer", None))
        .await
        .unwrap();
    let component_id = match outcome {
        Outcome::ComponentCreated { component_id, .. } => component_id,
        other => panic!("expected component creation, got {other:?}"),
    };
    assert_eq!(component_id, ComponentId::from_string("component-100"));

    let outcome = session
        .engine()
        .perform(Intent::add_action(
            ActionPrototypeId::from_string("proto-create"),
            component_id,
        ))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::ActionAdded {
            action_id: ActionId::from_string("action-7"),
        }
    );

    let change_set = session.change_set().lock().unwrap();
    let action = change_set.action(&ActionId::from_string("action-7")).unwrap();
    assert_eq!(action.component_id, ComponentId::from_string("component-100"));
}
