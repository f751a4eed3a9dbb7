//! Hardware command capability seam
//!
//! Vendor integrations (MQTT, serial, HTTP panels) implement
//! [`PanelBackend`] to forward accepted transitions to the physical
//! device; the state machine itself stays vendor-agnostic. Backend
//! failures are logged and do not roll back the local state change.

use crate::error::BackendError;
use acp_core::AlarmState;
use async_trait::async_trait;

/// Forwards accepted panel transitions to vendor hardware
#[async_trait]
pub trait PanelBackend: Send + Sync {
    /// The panel accepted an arm request toward `target`
    async fn send_arm(&self, target: AlarmState, code: Option<&str>) -> Result<(), BackendError>;

    /// The panel accepted a disarm request
    async fn send_disarm(&self, code: Option<&str>) -> Result<(), BackendError>;

    /// The panel accepted a trigger
    async fn send_trigger(&self) -> Result<(), BackendError>;
}

/// Backend for software-only panels: every command is a no-op
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

#[async_trait]
impl PanelBackend for NullBackend {
    async fn send_arm(&self, _target: AlarmState, _code: Option<&str>) -> Result<(), BackendError> {
        Ok(())
    }

    async fn send_disarm(&self, _code: Option<&str>) -> Result<(), BackendError> {
        Ok(())
    }

    async fn send_trigger(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
