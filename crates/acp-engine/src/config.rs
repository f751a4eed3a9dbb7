//! Panel configuration
//!
//! Global `arming_time`, `delay_time`, and `trigger_time` defaults
//! (in seconds) with per-state override blocks. The config only
//! derives `Deserialize`;
//! how it is loaded (YAML, JSON, test literals) is the host's concern.

use acp_codes::{CodeError, CodeValidator, NoCode, StaticCode, TemplateCode};
use acp_core::{AlarmState, PanelId};
use chrono::Duration;
use serde::Deserialize;
use std::sync::Arc;

/// Default arming window in seconds
pub const DEFAULT_ARMING_TIME: u64 = 60;

/// Default pending (entry delay) window in seconds
pub const DEFAULT_DELAY_TIME: u64 = 60;

/// Default triggered window in seconds
pub const DEFAULT_TRIGGER_TIME: u64 = 120;

fn default_arming_time() -> u64 {
    DEFAULT_ARMING_TIME
}

fn default_delay_time() -> u64 {
    DEFAULT_DELAY_TIME
}

fn default_trigger_time() -> u64 {
    DEFAULT_TRIGGER_TIME
}

fn default_code_arm_required() -> bool {
    true
}

/// Per-state duration overrides, all optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateDurations {
    /// Time spent in the arming window before this state is reached
    pub arming_time: Option<u64>,

    /// Pending window after a trigger fires while this state is active
    pub delay_time: Option<u64>,

    /// Triggered window after a trigger fires while this state is
    /// active; zero disables triggering from this state
    pub trigger_time: Option<u64>,
}

/// Static configuration for one alarm panel
#[derive(Debug, Clone, Deserialize)]
pub struct PanelConfig {
    /// Panel identifier, used for storage keys and event payloads
    pub name: PanelId,

    /// Static code authorizing arm/disarm requests
    #[serde(default)]
    pub code: Option<String>,

    /// Template rendered against the requested transition to obtain
    /// the expected code; takes precedence over `code`
    #[serde(default)]
    pub code_template: Option<String>,

    /// Whether arm requests require a code (disarm always does)
    #[serde(default = "default_code_arm_required")]
    pub code_arm_required: bool,

    /// After the triggered window elapses, return to `disarmed`
    /// instead of the previously active state
    #[serde(default)]
    pub disarm_after_trigger: bool,

    /// Default arming window in seconds
    #[serde(default = "default_arming_time")]
    pub arming_time: u64,

    /// Default pending window in seconds
    #[serde(default = "default_delay_time")]
    pub delay_time: u64,

    /// Default triggered window in seconds
    #[serde(default = "default_trigger_time")]
    pub trigger_time: u64,

    /// Per-state overrides
    #[serde(default)]
    pub armed_away: StateDurations,
    #[serde(default)]
    pub armed_home: StateDurations,
    #[serde(default)]
    pub armed_night: StateDurations,
    #[serde(default)]
    pub armed_vacation: StateDurations,
    #[serde(default)]
    pub armed_custom_bypass: StateDurations,
    #[serde(default)]
    pub disarmed: StateDurations,
    #[serde(default)]
    pub triggered: StateDurations,
}

impl PanelConfig {
    /// Create a config with the given name and all defaults
    pub fn new(name: PanelId) -> Self {
        Self {
            name,
            code: None,
            code_template: None,
            code_arm_required: true,
            disarm_after_trigger: false,
            arming_time: DEFAULT_ARMING_TIME,
            delay_time: DEFAULT_DELAY_TIME,
            trigger_time: DEFAULT_TRIGGER_TIME,
            armed_away: StateDurations::default(),
            armed_home: StateDurations::default(),
            armed_night: StateDurations::default(),
            armed_vacation: StateDurations::default(),
            armed_custom_bypass: StateDurations::default(),
            disarmed: StateDurations::default(),
            triggered: StateDurations::default(),
        }
    }

    fn overrides_for(&self, state: AlarmState) -> Option<&StateDurations> {
        match state {
            AlarmState::ArmedAway => Some(&self.armed_away),
            AlarmState::ArmedHome => Some(&self.armed_home),
            AlarmState::ArmedNight => Some(&self.armed_night),
            AlarmState::ArmedVacation => Some(&self.armed_vacation),
            AlarmState::ArmedCustomBypass => Some(&self.armed_custom_bypass),
            AlarmState::Disarmed => Some(&self.disarmed),
            AlarmState::Triggered => Some(&self.triggered),
            AlarmState::Arming | AlarmState::Pending => None,
        }
    }

    /// Arming window before `state` is considered fully armed
    pub fn arming_time_for(&self, state: AlarmState) -> Duration {
        let seconds = self
            .overrides_for(state)
            .and_then(|d| d.arming_time)
            .unwrap_or(self.arming_time);
        Duration::seconds(seconds as i64)
    }

    /// Pending window for a trigger fired while `state` was active
    pub fn delay_time_for(&self, state: AlarmState) -> Duration {
        let seconds = self
            .overrides_for(state)
            .and_then(|d| d.delay_time)
            .unwrap_or(self.delay_time);
        Duration::seconds(seconds as i64)
    }

    /// Triggered window for a trigger fired while `state` was active
    ///
    /// Zero means triggering is disabled from `state`.
    pub fn trigger_time_for(&self, state: AlarmState) -> Duration {
        let seconds = self
            .overrides_for(state)
            .and_then(|d| d.trigger_time)
            .unwrap_or(self.trigger_time);
        Duration::seconds(seconds as i64)
    }

    /// Build the code validator described by this config
    pub fn build_validator(&self) -> Result<Arc<dyn CodeValidator>, CodeError> {
        if let Some(template) = &self.code_template {
            Ok(Arc::new(TemplateCode::new(template.clone())?))
        } else if let Some(code) = &self.code {
            Ok(Arc::new(StaticCode::new(code.clone())))
        } else {
            Ok(Arc::new(NoCode))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PanelConfig::new(PanelId::new("test").unwrap());
        assert_eq!(
            config.arming_time_for(AlarmState::ArmedAway),
            Duration::seconds(60)
        );
        assert_eq!(
            config.delay_time_for(AlarmState::Disarmed),
            Duration::seconds(60)
        );
        assert_eq!(
            config.trigger_time_for(AlarmState::ArmedHome),
            Duration::seconds(120)
        );
        assert!(config.code_arm_required);
        assert!(!config.disarm_after_trigger);
    }

    #[test]
    fn test_per_state_overrides_win() {
        let mut config = PanelConfig::new(PanelId::new("test").unwrap());
        config.armed_night.arming_time = Some(5);
        config.disarmed.trigger_time = Some(0);

        assert_eq!(
            config.arming_time_for(AlarmState::ArmedNight),
            Duration::seconds(5)
        );
        // Other states still use the global default
        assert_eq!(
            config.arming_time_for(AlarmState::ArmedAway),
            Duration::seconds(60)
        );
        assert_eq!(
            config.trigger_time_for(AlarmState::Disarmed),
            Duration::zero()
        );
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let config: PanelConfig = serde_yaml::from_str(
            r#"
            name: house
            code: "1234"
            arming_time: 30
            delay_time: 10
            armed_home:
              arming_time: 0
            triggered:
              delay_time: 20
            "#,
        )
        .unwrap();

        assert_eq!(config.name.as_str(), "house");
        assert_eq!(config.code.as_deref(), Some("1234"));
        assert_eq!(
            config.arming_time_for(AlarmState::ArmedHome),
            Duration::zero()
        );
        assert_eq!(
            config.arming_time_for(AlarmState::ArmedAway),
            Duration::seconds(30)
        );
        assert_eq!(
            config.delay_time_for(AlarmState::Triggered),
            Duration::seconds(20)
        );
        assert_eq!(
            config.trigger_time_for(AlarmState::ArmedAway),
            Duration::seconds(120)
        );
    }

    #[test]
    fn test_validator_selection() {
        let mut config = PanelConfig::new(PanelId::new("test").unwrap());
        assert!(config.build_validator().unwrap().code_format().is_none());

        config.code = Some("1234".to_string());
        assert!(config.build_validator().unwrap().code_format().is_some());

        // Template takes precedence over the static code
        config.code_template = Some(r#"{{ "abc" }}"#.to_string());
        let validator = config.build_validator().unwrap();
        assert!(validator.validate(Some("abc"), AlarmState::Disarmed, AlarmState::ArmedAway));
    }

    #[test]
    fn test_bad_template_fails_validator_build() {
        let mut config = PanelConfig::new(PanelId::new("test").unwrap());
        config.code_template = Some("{{ broken".to_string());
        assert!(config.build_validator().is_err());
    }
}
