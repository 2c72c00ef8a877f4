//! Broadcast of protocol traffic and process lifecycle.
//!
//! The writer emits every command it sends, the line reader emits every
//! non-empty line the engine prints (including the ones the classifier
//! ignores), and an exit is emitted when the engine's stdout closes.
//! Built on [`tokio::sync::broadcast`] so loggers and UIs can listen
//! independently without slowing the reader down.

use tokio::sync::broadcast;

/// Something that happened on the engine connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A command line was written to the engine.
    CommandSent { command: String },
    /// The engine printed a line (trimmed, non-empty).
    LineReceived { line: String },
    /// The engine's stdout closed. Carries the process generation.
    EngineExited { generation: u64 },
}

/// A broadcast channel any component can emit to or subscribe from.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity. Slow
    /// subscribers lag and lose the oldest events; emitters never block.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    /// Returns the number of receivers that will see it.
    pub fn emit(&self, event: Event) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to future events (past ones are not replayed).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_reaches_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.emit(Event::CommandSent {
            command: "usi".to_string(),
        });

        assert_eq!(
            rx.recv().await.unwrap(),
            Event::CommandSent {
                command: "usi".to_string()
            }
        );
    }

    #[tokio::test]
    async fn subscribers_see_events_in_order() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(Event::LineReceived {
            line: "id name Foo".to_string(),
        });
        bus.emit(Event::EngineExited { generation: 1 });

        for rx in [&mut rx1, &mut rx2] {
            assert!(matches!(rx.recv().await.unwrap(), Event::LineReceived { .. }));
            assert_eq!(
                rx.recv().await.unwrap(),
                Event::EngineExited { generation: 1 }
            );
        }
    }

    #[test]
    fn emit_without_subscribers_returns_zero() {
        let bus = EventBus::default();
        assert_eq!(bus.emit(Event::EngineExited { generation: 3 }), 0);
    }

    #[test]
    fn emit_with_subscribers_returns_count() {
        let bus = EventBus::default();
        let _rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();

        let count = bus.emit(Event::LineReceived {
            line: "usiok".to_string(),
        });
        assert_eq!(count, 2);
    }
}
