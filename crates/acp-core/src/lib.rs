//! Core types for the alarm control panel engine
//!
//! This crate provides the fundamental types shared by the engine and
//! its collaborators: AlarmState, PanelId, PanelSnapshot, Event, and
//! Context.

mod context;
mod event;
mod panel_id;
mod snapshot;
mod state;

pub use context::Context;
pub use event::{Event, EventData, MATCH_ALL};
pub use panel_id::{PanelId, PanelIdError};
pub use snapshot::{
    PanelSnapshot, ATTR_CODE_ARM_REQUIRED, ATTR_CODE_FORMAT, ATTR_NEXT_STATE, ATTR_PREVIOUS_STATE,
};
pub use state::{AlarmState, AlarmStateParseError, ARMABLE_STATES};

/// Standard event types published by the panel engine
pub mod events {
    use super::*;

    /// Event type for observed-state changes
    pub const STATE_CHANGED: &str = "acp_state_changed";

    /// Data for STATE_CHANGED events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct StateChangedData {
        pub panel: PanelId,
        pub old_state: Option<PanelSnapshot>,
        pub new_state: PanelSnapshot,
    }

    impl EventData for StateChangedData {
        fn event_type() -> &'static str {
            STATE_CHANGED
        }
    }
}
