//! Internal stage-attribution bus (spec.md §8 property 6: "every model in
//! `models_used` corresponds to a logged gateway call; every tool in
//! `tools_used` to a logged broker call").
//!
//! Grounded on `coordination/src/events/bus.rs`'s `broadcast`-backed
//! publish/subscribe shape, stripped of its RocksDB persistence layer and
//! its `EnsembleEvent`/`SharedStateStore` coupling — this bus exists only
//! to let the orchestrator reconstruct what actually ran during one
//! request, not to replay history across requests.

use tokio::sync::broadcast;

/// One attributable fact about a single orchestration.
#[derive(Debug, Clone)]
pub enum StageEvent {
    ModelInvoked { model_id: String, provider: String },
    ToolInvoked { tool: String, ok: bool },
    StageCompleted { stage: String, latency_ms: u64 },
}

/// Per-orchestration event bus. Created fresh for every `Query` and
/// dropped with it — there is no cross-request subscriber (spec.md: "all
/// intermediate structures are owned by a single orchestration").
pub struct EventBus {
    sender: broadcast::Sender<StageEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        // Capacity only needs to outlast the slowest subscriber within one
        // orchestration; lagging subscribers drop the oldest events rather
        // than blocking the publisher.
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    pub fn publish(&self, event: StageEvent) {
        // No subscribers is the common case in tests and the CLI harness;
        // a send error there is not a bug.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StageEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_observes_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(StageEvent::ModelInvoked {
            model_id: "gpt-4.1".to_string(),
            provider: "openai".to_string(),
        });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, StageEvent::ModelInvoked { model_id, .. } if model_id == "gpt-4.1"));
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(StageEvent::StageCompleted {
            stage: "classify".to_string(),
            latency_ms: 1,
        });
    }
}
