//! Event bus with typed pub/sub for alarm panel state changes
//!
//! The bus is the Notifier collaborator of the panel engine: every
//! observed-state change is fired here for UI and automation consumers.
//! Subscribers can listen for a specific event type or for all events.

use acp_core::{Context, Event, EventData, MATCH_ALL};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Default channel capacity for event subscriptions
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// The event bus for publishing and subscribing to panel events
///
/// Firing is non-blocking: events are dropped for subscribers that
/// have fallen behind their channel capacity, and firing with no
/// subscribers at all is not an error.
pub struct EventBus {
    /// Map of event types to their broadcast senders
    listeners: DashMap<String, broadcast::Sender<Event<serde_json::Value>>>,
    /// Sender for MATCH_ALL subscribers
    match_all_sender: broadcast::Sender<Event<serde_json::Value>>,
    /// Channel capacity
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with the specified channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (match_all_sender, _) = broadcast::channel(capacity);
        Self {
            listeners: DashMap::new(),
            match_all_sender,
            capacity,
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe(&self, event_type: &str) -> broadcast::Receiver<Event<serde_json::Value>> {
        trace!(event_type, "subscribing to event type");

        if event_type == MATCH_ALL {
            return self.match_all_sender.subscribe();
        }

        self.listeners
            .entry(event_type.to_string())
            .or_insert_with(|| {
                let (tx, _) = broadcast::channel(self.capacity);
                tx
            })
            .subscribe()
    }

    /// Subscribe to a typed event, receiving parsed data
    pub fn subscribe_typed<T: EventData + serde::de::DeserializeOwned>(
        &self,
    ) -> TypedEventReceiver<T> {
        TypedEventReceiver::new(self.subscribe(T::event_type()))
    }

    /// Subscribe to all events
    pub fn subscribe_all(&self) -> broadcast::Receiver<Event<serde_json::Value>> {
        self.match_all_sender.subscribe()
    }

    /// Fire an event to all subscribers of its type and to MATCH_ALL
    /// subscribers
    pub fn fire(&self, event: Event<serde_json::Value>) {
        debug!(event_type = %event.event_type, "firing event");

        if let Some(sender) = self.listeners.get(&event.event_type) {
            // Send errors just mean no active receivers
            let _ = sender.send(event.clone());
        }

        let _ = self.match_all_sender.send(event);
    }

    /// Fire a typed event
    pub fn fire_typed<T: EventData + serde::Serialize>(&self, data: T, context: Context) {
        let typed = Event::typed(data, context);
        let json_data = serde_json::to_value(&typed.data).unwrap_or_default();
        self.fire(Event {
            event_type: typed.event_type,
            data: json_data,
            time_fired: typed.time_fired,
            context: typed.context,
        });
    }

    /// Get the number of event types with active subscriptions
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for EventBus
pub type SharedEventBus = Arc<EventBus>;

/// A receiver that deserializes events into their typed data
pub struct TypedEventReceiver<T> {
    rx: broadcast::Receiver<Event<serde_json::Value>>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: EventData + serde::de::DeserializeOwned> TypedEventReceiver<T> {
    fn new(rx: broadcast::Receiver<Event<serde_json::Value>>) -> Self {
        Self {
            rx,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Receive the next typed event
    ///
    /// Events whose data fails to deserialize are skipped.
    pub async fn recv(&mut self) -> Result<Event<T>, broadcast::error::RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if let Ok(data) = serde_json::from_value::<T>(event.data.clone()) {
                return Ok(Event {
                    event_type: event.event_type,
                    data,
                    time_fired: event.time_fired,
                    context: event.context,
                });
            }
        }
    }

    /// Receive a typed event without waiting
    pub fn try_recv(&mut self) -> Result<Event<T>, broadcast::error::TryRecvError> {
        loop {
            let event = self.rx.try_recv()?;
            if let Ok(data) = serde_json::from_value::<T>(event.data.clone()) {
                return Ok(Event {
                    event_type: event.event_type,
                    data,
                    time_fired: event.time_fired,
                    context: event.context,
                });
            }
        }
    }
}
