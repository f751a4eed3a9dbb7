//! Panel ID type: a slug that identifies one panel instance

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for invalid panel IDs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PanelIdError {
    #[error("panel id cannot be empty")]
    Empty,

    #[error(
        "panel id contains invalid characters (must be lowercase alphanumeric with underscores, cannot start/end with underscore)"
    )]
    InvalidChars,
}

/// Identifies a single alarm panel instance (e.g., "house", "garage")
///
/// Panel IDs follow the hosting framework's object-id slug rules:
/// lowercase alphanumeric plus underscores, no leading or trailing
/// underscore. The ID doubles as the storage key suffix for the panel's
/// persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PanelId(String);

impl PanelId {
    /// Create a new PanelId, validating the slug rules
    pub fn new(id: impl Into<String>) -> Result<Self, PanelIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(PanelIdError::Empty);
        }
        if !Self::is_valid_slug(&id) {
            return Err(PanelIdError::InvalidChars);
        }
        Ok(Self(id))
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key for this panel's persisted state
    pub fn storage_key(&self) -> String {
        format!("acp.{}", self.0)
    }

    fn is_valid_slug(s: &str) -> bool {
        if s.starts_with('_') || s.ends_with('_') {
            return false;
        }
        s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }
}

impl FromStr for PanelId {
    type Err = PanelIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PanelId {
    type Error = PanelIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PanelId> for String {
    fn from(id: PanelId) -> String {
        id.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_panel_id() {
        let id = PanelId::new("front_door").unwrap();
        assert_eq!(id.as_str(), "front_door");
        assert_eq!(id.storage_key(), "acp.front_door");
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(PanelId::new("").unwrap_err(), PanelIdError::Empty);
    }

    #[test]
    fn test_invalid_chars_rejected() {
        assert_eq!(PanelId::new("Upper").unwrap_err(), PanelIdError::InvalidChars);
        assert_eq!(
            PanelId::new("with-dash").unwrap_err(),
            PanelIdError::InvalidChars
        );
        assert_eq!(PanelId::new("_lead").unwrap_err(), PanelIdError::InvalidChars);
        assert_eq!(PanelId::new("trail_").unwrap_err(), PanelIdError::InvalidChars);
    }

    #[test]
    fn test_serde_round_trip() {
        let id = PanelId::new("house2").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"house2\"");
        let parsed: PanelId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_serde_rejects_invalid() {
        assert!(serde_json::from_str::<PanelId>("\"NOT OK\"").is_err());
    }
}
