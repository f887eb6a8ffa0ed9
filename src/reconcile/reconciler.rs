//! Client-side application of push events
//!
//! Partial-update handling here is a performance optimization, not the
//! correctness mechanism: re-fetching the complete current graph is always
//! a correct response to any event, and is the fallback whenever a
//! subscription lags.

use super::channel::{Delivery, Subscription};
use super::event::{Event, EventPayload};
use crate::graph::GraphStore;
use crate::ids::ComponentId;
use crate::remote::{retry_read, CallPolicy, RemoteClient, RemoteError};
use crate::visibility::Visibility;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Errors from reconciliation
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("refresh failed: {0}")]
    Refresh(#[from] RemoteError),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// What handling one event caused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh {
    /// The complete graph was re-fetched
    Full,
    /// One component's artifact was fetched
    Scoped(ComponentId),
    /// The event did not concern this scope, or was stale
    Skipped,
}

/// Applies server-originated events to the local mirror.
pub struct Reconciler {
    visibility: Visibility,
    store: Arc<Mutex<GraphStore>>,
    remote: Arc<dyn RemoteClient>,
    policy: CallPolicy,
}

impl Reconciler {
    pub fn new(
        visibility: Visibility,
        store: Arc<Mutex<GraphStore>>,
        remote: Arc<dyn RemoteClient>,
        policy: CallPolicy,
    ) -> Self {
        Self {
            visibility,
            store,
            remote,
            policy,
        }
    }

    /// Handle one event.
    ///
    /// Exhaustive over the payload union: a new event kind will not
    /// compile until its handling is decided here.
    pub async fn handle_event(&self, event: &Event) -> ReconcileResult<Refresh> {
        if event.workspace_id() != &self.visibility.workspace_id {
            debug!(workspace_id = %event.workspace_id(), "event for a different workspace");
            return Ok(Refresh::Skipped);
        }

        match event.payload() {
            EventPayload::EntityCreated => {
                self.full_refresh().await?;
                Ok(Refresh::Full)
            }
            EventPayload::ChangeSetWritten(change_set_id) => {
                if change_set_id == &self.visibility.change_set_id {
                    self.full_refresh().await?;
                    Ok(Refresh::Full)
                } else {
                    debug!(%change_set_id, "write event for a different change set");
                    Ok(Refresh::Skipped)
                }
            }
            EventPayload::ComputedArtifactReady(component_id) => {
                let known = self
                    .store
                    .lock()
                    .unwrap()
                    .component(component_id)
                    .is_some();
                if !known {
                    // Stale: the component is already gone locally. A full
                    // refresh self-heals, so nothing to do.
                    debug!(%component_id, "artifact event for unknown component; ignoring");
                    return Ok(Refresh::Skipped);
                }
                let payload = retry_read(&self.policy, || {
                    self.remote.get_code(&self.visibility, component_id)
                })
                .await?;
                self.store
                    .lock()
                    .unwrap()
                    .set_artifact(component_id.clone(), payload.code);
                Ok(Refresh::Scoped(component_id.clone()))
            }
        }
    }

    /// Re-fetch the complete current graph and replace the mirror.
    pub async fn full_refresh(&self) -> ReconcileResult<()> {
        let diagram = retry_read(&self.policy, || {
            self.remote.fetch_diagram(&self.visibility)
        })
        .await?;
        self.store
            .lock()
            .unwrap()
            .replace_all(diagram.components, diagram.edges);
        Ok(())
    }

    /// Drive a subscription until its topic closes or shutdown fires.
    ///
    /// Event failures are logged and do not stop the pump; the next
    /// refresh converges the mirror again.
    pub async fn pump(&self, mut subscription: Subscription, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!(topic = subscription.topic(), "reconciler shutting down");
                    break;
                }
                delivery = subscription.next() => match delivery {
                    None => {
                        info!(topic = subscription.topic(), "topic closed");
                        break;
                    }
                    Some(Delivery::Lagged(skipped)) => {
                        warn!(skipped, "subscription lagged; falling back to full refresh");
                        if let Err(err) = self.full_refresh().await {
                            warn!(%err, "lag recovery refresh failed");
                        }
                    }
                    Some(Delivery::Event(event)) => {
                        if let Err(err) = self.handle_event(&event).await {
                            warn!(%err, "event handling failed");
                        }
                    }
                }
            }
        }
    }
}
