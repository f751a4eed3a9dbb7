//! Event types carried by the panel event bus

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Context;

/// Event type string that matches all events
pub const MATCH_ALL: &str = "*";

/// Trait for typed event data
///
/// Implement this for any data type that should be carried by events.
pub trait EventData: Clone + Send + Sync + 'static {
    /// The event type string for this data type
    fn event_type() -> &'static str;
}

/// An event published on the panel event bus
///
/// Events carry typed data, the time they were fired, and the context
/// of the operation that caused them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T = serde_json::Value> {
    /// The type of event
    pub event_type: String,

    /// The event data
    pub data: T,

    /// When the event was fired
    pub time_fired: DateTime<Utc>,

    /// Context tracking the origin and causality
    pub context: Context,
}

impl<T> Event<T> {
    /// Create a new event with the current timestamp
    pub fn new(event_type: impl Into<String>, data: T, context: Context) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            time_fired: Utc::now(),
            context,
        }
    }
}

impl<T: EventData> Event<T> {
    /// Create a typed event from EventData
    pub fn typed(data: T, context: Context) -> Self {
        Self::new(T::event_type(), data, context)
    }
}
