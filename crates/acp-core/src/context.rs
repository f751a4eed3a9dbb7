//! Context type for tracking request origin and causality

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Context for tracking who initiated an alarm operation
///
/// Every published state change carries a Context identifying the
/// request that caused it, so the hosting framework can trace a chain
/// of actions back to the user or automation that started it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Unique identifier for this context (ULID)
    pub id: String,

    /// User ID that initiated this action (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Parent context ID for tracking causality chains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Context {
    /// Create a new context with a fresh ULID
    pub fn new() -> Self {
        Self {
            id: Ulid::new().to_string(),
            user_id: None,
            parent_id: None,
        }
    }

    /// Create a new context attributed to a specific user
    pub fn with_user(user_id: impl Into<String>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            user_id: Some(user_id.into()),
            parent_id: None,
        }
    }

    /// Create a child context with this context as parent
    ///
    /// Timer-driven transitions publish under a child of the context
    /// that started the transition.
    pub fn child(&self) -> Self {
        Self {
            id: Ulid::new().to_string(),
            user_id: self.user_id.clone(),
            parent_id: Some(self.id.clone()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_are_unique() {
        assert_ne!(Context::new().id, Context::new().id);
    }

    #[test]
    fn test_child_links_parent() {
        let parent = Context::with_user("user_1");
        let child = parent.child();
        assert_eq!(child.parent_id.as_deref(), Some(parent.id.as_str()));
        assert_eq!(child.user_id.as_deref(), Some("user_1"));
        assert_ne!(child.id, parent.id);
    }
}
