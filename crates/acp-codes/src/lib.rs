//! Code validation for alarm panel operations
//!
//! A panel authorizes arm/disarm requests through a [`CodeValidator`].
//! Three implementations are provided: no code configured, a static
//! shared secret, and a Jinja2-compatible template rendered against the
//! transition being requested. Disarm requests always validate; arm
//! requests validate only when the panel requires a code for arming.

use acp_core::AlarmState;
use minijinja::{context, Environment};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Result type for code operations
pub type CodeResult<T> = Result<T, CodeError>;

/// Errors that can occur while building or evaluating a code
#[derive(Debug, Error)]
pub enum CodeError {
    /// The configured code template failed to compile
    #[error("invalid code template: {message}")]
    InvalidTemplate { message: String },

    /// The code template failed to render for a transition
    #[error("failed to render code template: {message}")]
    RenderFailed { message: String },
}

impl From<minijinja::Error> for CodeError {
    fn from(err: minijinja::Error) -> Self {
        CodeError::RenderFailed {
            message: err.to_string(),
        }
    }
}

/// Hint describing the shape of the configured code, for UI keypads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeFormat {
    /// Code consists only of digits
    Number,
    /// Code contains arbitrary text
    Text,
}

impl CodeFormat {
    /// Get the canonical string form of the hint
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeFormat::Number => "number",
            CodeFormat::Text => "text",
        }
    }
}

/// Decides whether a submitted code authorizes a state transition
pub trait CodeValidator: Send + Sync {
    /// Validate a submitted code for the transition `from` -> `to`
    fn validate(&self, submitted: Option<&str>, from: AlarmState, to: AlarmState) -> bool;

    /// Hint describing the configured code, if any
    fn code_format(&self) -> Option<CodeFormat> {
        None
    }
}

/// Validator for panels with no code configured: everything passes
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCode;

impl CodeValidator for NoCode {
    fn validate(&self, _submitted: Option<&str>, _from: AlarmState, _to: AlarmState) -> bool {
        true
    }
}

/// Validator comparing against a static shared secret
#[derive(Debug, Clone)]
pub struct StaticCode {
    code: String,
}

impl StaticCode {
    /// Create a validator for a fixed code
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl CodeValidator for StaticCode {
    fn validate(&self, submitted: Option<&str>, _from: AlarmState, _to: AlarmState) -> bool {
        submitted == Some(self.code.as_str())
    }

    fn code_format(&self) -> Option<CodeFormat> {
        if self.code.chars().all(|c| c.is_ascii_digit()) {
            Some(CodeFormat::Number)
        } else {
            Some(CodeFormat::Text)
        }
    }
}

/// Validator rendering a template to obtain the expected code
///
/// The template is rendered with `from_state` and `to_state` variables
/// holding the canonical state strings. An empty rendering means no
/// code is required for that particular transition, which lets a
/// template waive the code for e.g. arming from `disarmed` while still
/// protecting disarm.
pub struct TemplateCode {
    env: Environment<'static>,
    source: String,
}

impl TemplateCode {
    /// Create a validator from a template source, checking its syntax
    pub fn new(source: impl Into<String>) -> CodeResult<Self> {
        let source = source.into();
        let env = Environment::new();

        // Compile once up front so a bad template fails at setup, not
        // on the first arm request.
        env.template_from_str(&source)
            .map_err(|err| CodeError::InvalidTemplate {
                message: err.to_string(),
            })?;

        Ok(Self { env, source })
    }

    fn expected_code(&self, from: AlarmState, to: AlarmState) -> CodeResult<String> {
        let template = self.env.template_from_str(&self.source)?;
        let rendered = template.render(context! {
            from_state => from.as_str(),
            to_state => to.as_str(),
        })?;
        Ok(rendered)
    }
}

impl CodeValidator for TemplateCode {
    fn validate(&self, submitted: Option<&str>, from: AlarmState, to: AlarmState) -> bool {
        match self.expected_code(from, to) {
            Ok(expected) if expected.is_empty() => true,
            Ok(expected) => submitted == Some(expected.as_str()),
            Err(err) => {
                warn!(%from, %to, error = %err, "code template failed to render, declining");
                false
            }
        }
    }

    fn code_format(&self) -> Option<CodeFormat> {
        Some(CodeFormat::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AlarmState::{ArmedAway, ArmedHome, Disarmed};

    #[test]
    fn test_no_code_accepts_anything() {
        let validator = NoCode;
        assert!(validator.validate(None, Disarmed, ArmedAway));
        assert!(validator.validate(Some("1234"), ArmedAway, Disarmed));
        assert!(validator.code_format().is_none());
    }

    #[test]
    fn test_static_code_match() {
        let validator = StaticCode::new("1234");
        assert!(validator.validate(Some("1234"), Disarmed, ArmedAway));
        assert!(!validator.validate(Some("4321"), Disarmed, ArmedAway));
        assert!(!validator.validate(None, Disarmed, ArmedAway));
    }

    #[test]
    fn test_static_code_format_hint() {
        assert_eq!(
            StaticCode::new("0451").code_format(),
            Some(CodeFormat::Number)
        );
        assert_eq!(
            StaticCode::new("hunter2").code_format(),
            Some(CodeFormat::Text)
        );
    }

    #[test]
    fn test_template_constant_code() {
        let validator = TemplateCode::new(r#"{{ "abc" }}"#).unwrap();
        assert!(validator.validate(Some("abc"), Disarmed, ArmedHome));
        assert!(!validator.validate(Some("xyz"), Disarmed, ArmedHome));
        assert_eq!(validator.code_format(), Some(CodeFormat::Text));
    }

    #[test]
    fn test_template_waives_code_per_transition() {
        // No code needed when leaving disarmed, "abc" otherwise.
        let validator =
            TemplateCode::new(r#"{{ "" if from_state == "disarmed" else "abc" }}"#).unwrap();

        assert!(validator.validate(None, Disarmed, ArmedAway));
        assert!(!validator.validate(None, ArmedAway, Disarmed));
        assert!(validator.validate(Some("abc"), ArmedAway, Disarmed));
    }

    #[test]
    fn test_template_sees_target_state() {
        let validator =
            TemplateCode::new(r#"{{ "night" if to_state == "armed_night" else "day" }}"#).unwrap();

        assert!(validator.validate(Some("night"), Disarmed, AlarmState::ArmedNight));
        assert!(validator.validate(Some("day"), Disarmed, ArmedAway));
        assert!(!validator.validate(Some("night"), Disarmed, ArmedAway));
    }

    #[test]
    fn test_bad_template_rejected_at_setup() {
        assert!(matches!(
            TemplateCode::new("{{ unclosed"),
            Err(CodeError::InvalidTemplate { .. })
        ));
    }
}
