//! In-process implementations of the change bus and evaluation log sink.
//!
//! These back a single-node deployment; a multi-node deployment fans change
//! events out over Redis pub/sub instead (see [`crate::cache::redis`]).

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use flaps_core::{Decision, EnvironmentId, FlagKey};

use crate::error::StorageResult;
use crate::traits::{ChangeBus, ChangeEvent, EvaluationLogRepository};

/// A `tokio::sync::broadcast`-backed change bus for single-node deployments.
#[derive(Debug, Clone)]
pub struct InMemoryChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl InMemoryChangeBus {
    /// Creates a new bus with the given subscriber buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to change events. Lagging subscribers miss events rather
    /// than block publishers; this trades delivery guarantees for the real-time
    /// push path never backing up flag evaluation.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

impl Default for InMemoryChangeBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ChangeBus for InMemoryChangeBus {
    async fn publish(&self, event: ChangeEvent) -> StorageResult<()> {
        // No subscribers is not an error: bootstrapping before the first SSE
        // client connects is the common case.
        let _ = self.sender.send(event);
        Ok(())
    }
}

/// An [`EvaluationLogRepository`] that emits structured log events instead of
/// persisting to a dedicated store.
#[derive(Debug, Clone, Default)]
pub struct TracingEvaluationLog;

impl EvaluationLogRepository for TracingEvaluationLog {
    async fn append(
        &self,
        flag_key: &FlagKey,
        environment_id: EnvironmentId,
        subject_id: &str,
        decision: &Decision,
        evaluated_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        tracing::info!(
            flag_key = flag_key.as_str(),
            environment_id = %environment_id,
            subject_id,
            enabled = decision.enabled,
            variant = decision.variant.as_deref(),
            reason = %decision.reason,
            evaluated_at = %evaluated_at,
            "flag evaluated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flaps_core::EvaluationReason;

    #[tokio::test]
    async fn test_change_bus_delivers_to_subscriber() {
        let bus = InMemoryChangeBus::default();
        let mut rx = bus.subscribe();

        let event = ChangeEvent {
            flag_id: flaps_core::FlagId::new(),
            environment_id: EnvironmentId::new(),
            occurred_at: Utc::now(),
        };
        bus.publish(event.clone()).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.flag_id, event.flag_id);
    }

    #[tokio::test]
    async fn test_evaluation_log_append_does_not_error() {
        let log = TracingEvaluationLog;
        let decision = Decision {
            enabled: true,
            variant: None,
            reason: EvaluationReason::Default,
            rule_id: None,
        };
        let key = FlagKey::new("checkout");
        log.append(&key, EnvironmentId::new(), "user-1", &decision, Utc::now())
            .await
            .unwrap();
    }
}
