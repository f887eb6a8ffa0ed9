//! Weft: Change-Graph Coordination Engine
//!
//! A coordination layer for collaborative graph modeling: a client-side
//! authoritative mirror of components and edges, mutated optimistically
//! ahead of server confirmation and kept convergent by push-driven
//! reconciliation, with server-side tracking of dependent-value
//! recomputation.
//!
//! # Core Concepts
//!
//! - **Graph Store**: flat id-keyed mirror of one change set's components
//!   and edges, with reachability for impact analysis
//! - **Intents**: optimistic mutations paired with exact inverses, rolled
//!   back precisely when the remote call fails
//! - **Actions**: a DAG of pending mutations, linearized into a safe
//!   execution order before application
//! - **Status Tracker**: per-root queued/running/completed job state for
//!   dependent-value propagation
//! - **Reconciliation**: topic-scoped push events that invalidate or
//!   refresh portions of the mirror
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use weft::{CallPolicy, ChangeSetId, RemoteClient, Session, WorkspaceId};
//!
//! # fn connect() -> Arc<dyn RemoteClient> { unimplemented!() }
//! let remote: Arc<dyn RemoteClient> = connect();
//! let session = Session::new(
//!     WorkspaceId::from_string("ws-1"),
//!     ChangeSetId::from_string("cs-1"),
//!     "add load balancer",
//!     "alice",
//!     remote,
//!     CallPolicy::default(),
//! );
//! // Session is ready for use
//! ```

pub mod action;
pub mod changeset;
mod graph;
pub mod ids;
pub mod mutation;
pub mod reconcile;
pub mod remote;
mod session;
pub mod status;
pub mod storage;
mod visibility;

pub use action::{linearize, Action, ScheduleError, ScheduleResult};
pub use changeset::{ChangeSet, ChangeSetError, ChangeSetResult, ChangeSetStatus};
pub use graph::{ActorAndTimestamp, ChangeStatus, Component, Edge, GraphStore};
pub use ids::{
    ActionId, ActionPrototypeId, AttributeValueId, ChangeSetId, ComponentId, EdgeId, NodeId,
    SocketId, WorkspaceId,
};
pub use mutation::{Intent, Inverse, MutationEngine, MutationError, MutationResult, Outcome};
pub use reconcile::{
    topic, Delivery, Event, EventBus, EventPayload, ReconcileError, ReconcileResult, Reconciler,
    Refresh, Subscription,
};
pub use remote::{
    bounded, retry_read, CallPolicy, DiagramPayload, RemoteClient, RemoteError, RemoteResult,
    SchemaVariant,
};
pub use session::{Session, SessionChannels};
pub use status::{JobSnapshot, StatusError, StatusResult, StatusTracker};
pub use storage::{JobRecord, JobStore, OpenStore, SqliteStore, StorageError, StorageResult};
pub use visibility::Visibility;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
