//! Event types and EventBus
//!
//! Background arbitration never reports back to the request that started it.
//! Outcomes are broadcast here instead, so any interested component (the CLI
//! waiting on a submission, a future notification sender, tests) can observe
//! completions and failures without sharing request-scoped state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Arbitration lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ArbiterEvent {
    /// Job accepted by the arbitration queue
    ArbitrationQueued {
        argument_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A pipeline stage started (normalize, transcribe, judge, persist)
    StageStarted {
        argument_id: Uuid,
        stage: String,
        timestamp: DateTime<Utc>,
    },

    /// Judgment persisted and argument marked complete
    ArbitrationCompleted {
        argument_id: Uuid,
        judgment_id: Uuid,
        /// person_a | person_b | tie
        winner: String,
        conversation_health_score: u8,
        timestamp: DateTime<Utc>,
    },

    /// Argument marked failed
    ArbitrationFailed {
        argument_id: Uuid,
        stage: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Job ended without doing any work (missing argument, terminal status,
    /// duplicate submission)
    ArbitrationSkipped {
        argument_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl ArbiterEvent {
    /// Argument the event refers to
    pub fn argument_id(&self) -> Uuid {
        match self {
            ArbiterEvent::ArbitrationQueued { argument_id, .. }
            | ArbiterEvent::StageStarted { argument_id, .. }
            | ArbiterEvent::ArbitrationCompleted { argument_id, .. }
            | ArbiterEvent::ArbitrationFailed { argument_id, .. }
            | ArbiterEvent::ArbitrationSkipped { argument_id, .. } => *argument_id,
        }
    }

    /// True for events after which no further work happens for this job
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ArbiterEvent::ArbitrationCompleted { .. }
                | ArbiterEvent::ArbitrationFailed { .. }
                | ArbiterEvent::ArbitrationSkipped { .. }
        )
    }
}

/// Broadcast channel for [`ArbiterEvent`]s
///
/// Cloning shares the channel. A subscriber that falls more than `capacity`
/// events behind loses the oldest ones and sees `RecvError::Lagged`.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ArbiterEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ArbiterEvent> {
        self.tx.subscribe()
    }

    /// Publish to current subscribers; returns how many received it
    ///
    /// Events published with nobody subscribed are dropped.
    pub fn emit_lossy(&self, event: ArbiterEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let argument_id = Uuid::new_v4();

        let delivered = bus.emit_lossy(ArbiterEvent::ArbitrationQueued {
            argument_id,
            timestamp: Utc::now(),
        });
        assert_eq!(delivered, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.argument_id(), argument_id);
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);

        let delivered = bus.emit_lossy(ArbiterEvent::ArbitrationSkipped {
            argument_id: Uuid::new_v4(),
            reason: "not found".to_string(),
            timestamp: Utc::now(),
        });
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ArbiterEvent::ArbitrationFailed {
            argument_id: Uuid::nil(),
            stage: "judge".to_string(),
            error: "bad output".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ArbitrationFailed");
        assert_eq!(json["stage"], "judge");
        assert!(event.is_terminal());
    }
}
