//! Broadcast routing with a bounded replay ring.

use crate::payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::{self, Sender};
use tokio_stream::wrappers::BroadcastStream;

/// Stream wrapper handed to subscribers.
pub type EventStream = BroadcastStream<EventEnvelope>;

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    state: Arc<Mutex<ReplayState>>,
    replay_capacity: usize,
}

struct ReplayState {
    next_id: EventId,
    ring: VecDeque<EventEnvelope>,
}

impl EventBus {
    /// Construct a bus with a custom replay capacity.
    #[must_use]
    pub fn with_capacity(replay_capacity: usize) -> Self {
        let replay_capacity = replay_capacity.max(1);
        let (sender, _) = broadcast::channel(replay_capacity);
        Self {
            sender,
            state: Arc::new(Mutex::new(ReplayState {
                next_id: 1,
                ring: VecDeque::with_capacity(replay_capacity),
            })),
            replay_capacity,
        }
    }

    /// Construct a bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        BroadcastStream::new(self.sender.subscribe())
    }

    /// Publish a new event to all subscribers and return its identifier.
    ///
    /// Publishing never fails: with no live subscribers the event is only
    /// retained in the replay ring.
    pub fn publish(&self, event: Event) -> EventId {
        let envelope = {
            let mut state = self.lock_state();
            let id = state.next_id;
            state.next_id = state.next_id.saturating_add(1);
            let envelope = EventEnvelope {
                id,
                timestamp: Utc::now(),
                event,
            };
            if state.ring.len() == self.replay_capacity {
                let _ = state.ring.pop_front();
            }
            state.ring.push_back(envelope.clone());
            envelope
        };
        let id = envelope.id;
        let _ = self.sender.send(envelope);
        id
    }

    /// Last event id retained in the replay ring.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_state().ring.back().map(|env| env.id)
    }

    /// Collect the retained events emitted after the specified id.
    #[must_use]
    pub fn backlog_since(&self, id: EventId) -> Vec<EventEnvelope> {
        self.lock_state()
            .ring
            .iter()
            .filter(|env| env.id > id)
            .cloned()
            .collect()
    }

    /// The most recent `limit` events, oldest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<EventEnvelope> {
        let state = self.lock_state();
        let skip = state.ring.len().saturating_sub(limit);
        state.ring.iter().skip(skip).cloned().collect()
    }

    fn lock_state(&self) -> MutexGuard<'_, ReplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
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
    use tokio_stream::StreamExt;
    use uuid::Uuid;

    fn health(label: &str) -> Event {
        Event::HealthChanged {
            degraded: vec![label.to_string()],
        }
    }

    #[test]
    fn replay_ring_is_bounded_and_ordered() {
        let bus = EventBus::with_capacity(2);
        let first = bus.publish(health("a"));
        let second = bus.publish(health("b"));
        let third = bus.publish(health("c"));

        assert_eq!(bus.last_event_id(), Some(third));
        let backlog = bus.backlog_since(first);
        assert_eq!(
            backlog.iter().map(|env| env.id).collect::<Vec<_>>(),
            vec![second, third]
        );
        assert!(bus.backlog_since(third).is_empty());
    }

    #[test]
    fn recent_returns_tail() {
        let bus = EventBus::with_capacity(8);
        for label in ["a", "b", "c"] {
            let _ = bus.publish(health(label));
        }
        let recent = bus.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].event, health("c"));
        assert_eq!(bus.recent(10).len(), 3);
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe();
        let id = bus.publish(Event::PipelineCompleted {
            run_id: Uuid::nil(),
            final_path: Some("/clean/photo.jpg".into()),
        });
        let envelope = stream
            .next()
            .await
            .expect("stream item")
            .expect("broadcast ok");
        assert_eq!(envelope.id, id);
        assert_eq!(envelope.event.kind(), "pipeline_completed");
    }
}
