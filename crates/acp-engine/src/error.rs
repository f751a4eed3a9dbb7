//! Error types for panel operations

use acp_core::AlarmState;
use thiserror::Error;

/// Result type for panel operations
pub type AlarmResult<T> = Result<T, AlarmError>;

/// Errors a panel operation can report
///
/// The service-style wrappers on `AlarmPanel` swallow these with a
/// warning, matching the hosting framework's behavior; the `request_*`
/// layer returns them so an embedding layer can surface them instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AlarmError {
    /// The submitted code did not authorize the transition
    #[error("invalid code for transition to {target}")]
    InvalidCode { target: AlarmState },

    /// The requested arm target is not an armable state
    #[error("{state} is not an armable state")]
    NotArmable { state: AlarmState },
}

/// Error reported by a hardware backend command
#[derive(Debug, Clone, Error)]
#[error("backend command failed: {0}")]
pub struct BackendError(pub String);
