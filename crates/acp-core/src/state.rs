//! Alarm panel state values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for unrecognized state strings
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown alarm state '{0}'")]
pub struct AlarmStateParseError(pub String);

/// The observable state of an alarm control panel
///
/// `Arming` and `Pending` are presentation states derived from a stable
/// state plus elapsed time against a configured window; they are never
/// the stable state of a panel. The string form matches the values the
/// hosting framework exposes to UIs and automations (`armed_away`,
/// `triggered`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmState {
    Disarmed,
    Arming,
    ArmedAway,
    ArmedHome,
    ArmedNight,
    ArmedVacation,
    ArmedCustomBypass,
    Pending,
    Triggered,
}

/// The five states an arm request may target
pub const ARMABLE_STATES: [AlarmState; 5] = [
    AlarmState::ArmedAway,
    AlarmState::ArmedHome,
    AlarmState::ArmedNight,
    AlarmState::ArmedVacation,
    AlarmState::ArmedCustomBypass,
];

impl AlarmState {
    /// Get the canonical string form of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmState::Disarmed => "disarmed",
            AlarmState::Arming => "arming",
            AlarmState::ArmedAway => "armed_away",
            AlarmState::ArmedHome => "armed_home",
            AlarmState::ArmedNight => "armed_night",
            AlarmState::ArmedVacation => "armed_vacation",
            AlarmState::ArmedCustomBypass => "armed_custom_bypass",
            AlarmState::Pending => "pending",
            AlarmState::Triggered => "triggered",
        }
    }

    /// Check whether this state is a valid arm target
    pub fn is_armable(&self) -> bool {
        ARMABLE_STATES.contains(self)
    }

    /// Check whether this is a stable state (one a panel can settle in)
    ///
    /// `Arming` and `Pending` are time-derived and never stored.
    pub fn is_stable(&self) -> bool {
        !matches!(self, AlarmState::Arming | AlarmState::Pending)
    }
}

impl FromStr for AlarmState {
    type Err = AlarmStateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disarmed" => Ok(AlarmState::Disarmed),
            "arming" => Ok(AlarmState::Arming),
            "armed_away" => Ok(AlarmState::ArmedAway),
            "armed_home" => Ok(AlarmState::ArmedHome),
            "armed_night" => Ok(AlarmState::ArmedNight),
            "armed_vacation" => Ok(AlarmState::ArmedVacation),
            "armed_custom_bypass" => Ok(AlarmState::ArmedCustomBypass),
            "pending" => Ok(AlarmState::Pending),
            "triggered" => Ok(AlarmState::Triggered),
            other => Err(AlarmStateParseError(other.to_string())),
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
