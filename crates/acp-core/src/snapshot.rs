//! Snapshot type describing a panel's externally observable state

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AlarmState, Context, PanelId};

/// Attribute key: the stable state held before the current transition
pub const ATTR_PREVIOUS_STATE: &str = "previous_state";

/// Attribute key: the state the panel is heading toward while the
/// observed state is `arming` or `pending`
pub const ATTR_NEXT_STATE: &str = "next_state";

/// Attribute key: hint describing the shape of the configured code
pub const ATTR_CODE_FORMAT: &str = "code_format";

/// Attribute key: whether arm requests require a code
pub const ATTR_CODE_ARM_REQUIRED: &str = "code_arm_required";

/// The observable state of a panel at a point in time
///
/// A snapshot carries the derived (observed) state rather than the
/// stored stable state, plus an attribute bag for UI and automation
/// consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelSnapshot {
    /// The panel this snapshot belongs to
    pub panel: PanelId,

    /// The observed state (including derived `arming`/`pending`)
    pub state: AlarmState,

    /// Additional attributes associated with the state
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// When the observed state last changed to a different value
    pub last_changed: DateTime<Utc>,

    /// When the snapshot was last published (even if unchanged)
    pub last_updated: DateTime<Utc>,

    /// Context of the operation that produced this snapshot
    pub context: Context,
}

impl PanelSnapshot {
    /// Create a new snapshot with the given timestamp
    pub fn new(
        panel: PanelId,
        state: AlarmState,
        attributes: HashMap<String, serde_json::Value>,
        now: DateTime<Utc>,
        context: Context,
    ) -> Self {
        Self {
            panel,
            state,
            attributes,
            last_changed: now,
            last_updated: now,
            context,
        }
    }

    /// Create an updated snapshot, preserving `last_changed` when the
    /// observed state value is unchanged
    pub fn with_update(
        &self,
        state: AlarmState,
        attributes: HashMap<String, serde_json::Value>,
        now: DateTime<Utc>,
        context: Context,
    ) -> Self {
        Self {
            panel: self.panel.clone(),
            state,
            attributes,
            last_changed: if state != self.state {
                now
            } else {
                self.last_changed
            },
            last_updated: now,
            context,
        }
    }

    /// Get an attribute value by key
    pub fn attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

impl PartialEq for PanelSnapshot {
    fn eq(&self, other: &Self) -> bool {
        // Timestamps and context are not compared
        self.panel == other.panel
            && self.state == other.state
            && self.attributes == other.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(state: AlarmState, now: DateTime<Utc>) -> PanelSnapshot {
        PanelSnapshot::new(
            PanelId::new("test").unwrap(),
            state,
            HashMap::from([(ATTR_PREVIOUS_STATE.to_string(), json!("disarmed"))]),
            now,
            Context::new(),
        )
    }

    #[test]
    fn test_with_update_preserves_last_changed_for_same_state() {
        let t0 = Utc::now();
        let first = snapshot(AlarmState::ArmedAway, t0);
        let later = t0 + chrono::Duration::seconds(30);

        let updated = first.with_update(
            AlarmState::ArmedAway,
            first.attributes.clone(),
            later,
            Context::new(),
        );
        assert_eq!(updated.last_changed, t0);
        assert_eq!(updated.last_updated, later);

        let changed = first.with_update(
            AlarmState::Triggered,
            first.attributes.clone(),
            later,
            Context::new(),
        );
        assert_eq!(changed.last_changed, later);
    }

    #[test]
    fn test_attribute_lookup() {
        let snap = snapshot(AlarmState::Disarmed, Utc::now());
        let prev: Option<String> = snap.attribute(ATTR_PREVIOUS_STATE);
        assert_eq!(prev.as_deref(), Some("disarmed"));
        let missing: Option<String> = snap.attribute(ATTR_NEXT_STATE);
        assert!(missing.is_none());
    }

    #[test]
    fn test_equality_ignores_timestamps() {
        let t0 = Utc::now();
        let a = snapshot(AlarmState::Pending, t0);
        let b = snapshot(AlarmState::Pending, t0 + chrono::Duration::hours(1));
        assert_eq!(a, b);
    }
}
