//! Alarm control panel arming/disarming state machine
//!
//! This crate provides the unified transition engine the vendor
//! integrations share: timed arming/pending/triggered windows, code
//! validation, restart recovery, and observed-state publication. The
//! vendor-specific pieces (wire protocols, transports) plug in through
//! the [`PanelBackend`] capability trait.

mod backend;
mod clock;
mod config;
mod error;
mod panel;
mod scheduler;

pub use backend::{NullBackend, PanelBackend};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::{
    PanelConfig, StateDurations, DEFAULT_ARMING_TIME, DEFAULT_DELAY_TIME, DEFAULT_TRIGGER_TIME,
};
pub use error::{AlarmError, AlarmResult, BackendError};
pub use panel::AlarmPanel;
pub use scheduler::{ManualScheduler, ScheduledTask, Scheduler, TokioScheduler};
