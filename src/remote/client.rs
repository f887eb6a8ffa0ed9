//! RemoteClient trait and call policy
//!
//! Every operation is scoped by a [`Visibility`] (workspace + change set).
//! Mutating calls get a single bounded attempt; idempotent reads get a
//! small bounded retry on top of the per-call deadline.

use super::types::{
    AddActionRequest, AddActionResponse, CodePayload, CreateConnectionRequest,
    CreateConnectionResponse, CreateNodeRequest, CreateNodeResponse, DiagramPayload, DiffPayload,
    RemoteError, RemoteResult, SchemaVariant,
};
use crate::ids::{ActionId, ComponentId, EdgeId};
use crate::visibility::Visibility;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::warn;

/// The remote operations a session performs.
///
/// Implementations must be thread-safe (Send + Sync); sessions hold the
/// client behind an `Arc` and share it between the mutation engine and
/// the reconciler.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    // === Idempotent reads ===

    /// Full components+edges state for the scoped change set
    async fn fetch_diagram(&self, visibility: &Visibility) -> RemoteResult<DiagramPayload>;

    /// Schema variants available for node creation
    async fn list_schema_variants(&self, visibility: &Visibility)
        -> RemoteResult<Vec<SchemaVariant>>;

    /// Generated code for a component
    async fn get_code(
        &self,
        visibility: &Visibility,
        component_id: &ComponentId,
    ) -> RemoteResult<CodePayload>;

    /// Diff of a component against the baseline
    async fn get_diff(
        &self,
        visibility: &Visibility,
        component_id: &ComponentId,
    ) -> RemoteResult<DiffPayload>;

    // === Mutations ===

    /// Create a node; returns the canonical identities
    async fn create_node(
        &self,
        visibility: &Visibility,
        request: CreateNodeRequest,
    ) -> RemoteResult<CreateNodeResponse>;

    /// Create a connection; returns the canonical connection id
    async fn create_connection(
        &self,
        visibility: &Visibility,
        request: CreateConnectionRequest,
    ) -> RemoteResult<CreateConnectionResponse>;

    async fn delete_connection(
        &self,
        visibility: &Visibility,
        edge_id: &EdgeId,
    ) -> RemoteResult<()>;

    async fn restore_connection(
        &self,
        visibility: &Visibility,
        edge_id: &EdgeId,
    ) -> RemoteResult<()>;

    async fn delete_component(
        &self,
        visibility: &Visibility,
        component_id: &ComponentId,
    ) -> RemoteResult<()>;

    async fn restore_component(
        &self,
        visibility: &Visibility,
        component_id: &ComponentId,
    ) -> RemoteResult<()>;

    /// Queue an action against a component; returns the canonical action id
    async fn add_action(
        &self,
        visibility: &Visibility,
        request: AddActionRequest,
    ) -> RemoteResult<AddActionResponse>;

    async fn remove_action(&self, visibility: &Visibility, action_id: &ActionId)
        -> RemoteResult<()>;
}

/// Deadline and retry settings for remote calls.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    /// Per-attempt deadline
    pub timeout: Duration,
    /// Extra attempts for idempotent reads (mutations always get one)
    pub read_retries: u32,
    /// Fixed pause between read attempts
    pub retry_backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            read_retries: 2,
            retry_backoff: Duration::from_millis(250),
        }
    }
}

/// Bound a mutating call by the policy deadline.
///
/// Never retried: without idempotency keys a retry could double-apply.
/// A timeout is reported as [`RemoteError::Timeout`] and the caller rolls
/// back locally.
pub async fn bounded<T, F>(policy: &CallPolicy, call: F) -> RemoteResult<T>
where
    F: Future<Output = RemoteResult<T>>,
{
    match timeout(policy.timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout),
    }
}

/// Run an idempotent read with the policy deadline and bounded retry.
///
/// Only retryable errors (timeouts, transport failures) are retried;
/// a server rejection is final.
pub async fn retry_read<T, F, Fut>(policy: &CallPolicy, mut call: F) -> RemoteResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RemoteResult<T>>,
{
    let mut attempt = 0;
    loop {
        let result = match timeout(policy.timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout),
        };
        match result {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.read_retries => {
                attempt += 1;
                warn!(%err, attempt, "retrying idempotent read");
                sleep(policy.retry_backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn quick_policy() -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_millis(50),
            read_retries: 2,
            retry_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn retry_read_recovers_from_transient_failure() {
        let policy = quick_policy();
        let attempts = Arc::new(AtomicU32::new(0));
        let result = retry_read(&policy, || {
            let attempts = attempts.clone();
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(RemoteError::Transport("connection reset".into()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retry_read_gives_up_after_budget() {
        let policy = quick_policy();
        let attempts = Arc::new(AtomicU32::new(0));
        let result: RemoteResult<()> = retry_read(&policy, || {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(RemoteError::Transport("down".into()))
            }
        })
        .await;
        assert!(result.is_err());
        // One initial attempt plus two retries
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_read_does_not_retry_rejections() {
        let policy = quick_policy();
        let attempts = Arc::new(AtomicU32::new(0));
        let result: RemoteResult<()> = retry_read(&policy, || {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(RemoteError::Rejected("no such change set".into()))
            }
        })
        .await;
        assert_eq!(result, Err(RemoteError::Rejected("no such change set".into())));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bounded_reports_timeout() {
        let policy = quick_policy();
        let result: RemoteResult<()> = bounded(&policy, async {
            sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(RemoteError::Timeout));
    }

    #[tokio::test]
    async fn bounded_passes_through_success() {
        let policy = quick_policy();
        let result = bounded(&policy, async { Ok(42) }).await;
        assert_eq!(result, Ok(42));
    }
}
