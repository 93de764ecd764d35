//! Stepper motor profiles
//!
//! Profiles describe a complete motor setup in TOML:
//!
//! ```toml
//! run-mode = "stepping"
//! start-speed = 100.0
//! soll-speed = 1000.0
//! acceleration-steps = 50
//! steps-to-do = 200
//! direction = "counter-clockwise"
//! step-mode = "half-steps"
//! phase-mode = "two-phase"
//! ```
//!
//! `steps-to-do`, `direction`, `step-mode` and `phase-mode` are optional.

use flink_core::stepper::{Direction, MotorSetup, PhaseMode, RunMode, StepMode};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading a profile
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Profile file could not be read
    #[error("Failed to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Profile is not valid TOML or has invalid fields
    #[error("Invalid profile: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Motor setup loaded from a TOML file
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct StepperProfile {
    pub run_mode: RunMode,
    pub start_speed: f64,
    pub soll_speed: f64,
    pub acceleration_steps: u32,
    #[serde(default)]
    pub steps_to_do: u32,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub step_mode: StepMode,
    #[serde(default)]
    pub phase_mode: PhaseMode,
}

impl StepperProfile {
    /// Load a profile from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse a profile from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ProfileError> {
        Ok(toml::from_str(content)?)
    }

    /// Parameters for `StepperMotor::init_motor`
    pub fn setup(&self) -> MotorSetup {
        MotorSetup::new(
            self.run_mode,
            self.start_speed,
            self.soll_speed,
            self.acceleration_steps,
        )
        .steps_to_do(self.steps_to_do)
        .direction(self.direction)
        .step_mode(self.step_mode)
        .phase_mode(self.phase_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_profile() {
        let toml = r#"
run-mode = "fixed-speed"
start-speed = 100.0
soll-speed = 1000.0
acceleration-steps = 50
steps-to-do = 200
direction = "counter-clockwise"
step-mode = "half-steps"
phase-mode = "one-phase"
"#;
        let profile = StepperProfile::from_toml_str(toml).unwrap();
        assert_eq!(profile.run_mode, RunMode::FixedSpeed);
        assert_eq!(profile.acceleration_steps, 50);

        let setup = profile.setup();
        assert_eq!(setup.steps_to_do, 200);
        assert_eq!(setup.direction, Direction::CounterClockwise);
        assert_eq!(setup.step_mode, StepMode::HalfSteps);
        assert_eq!(setup.phase_mode, PhaseMode::OnePhase);
    }

    #[test]
    fn test_defaults() {
        let toml = r#"
run-mode = "stepping"
start-speed = 10.0
soll-speed = 20.0
acceleration-steps = 5
"#;
        let setup = StepperProfile::from_toml_str(toml).unwrap().setup();
        assert_eq!(setup, MotorSetup::new(RunMode::Stepping, 10.0, 20.0, 5));
    }

    #[test]
    fn test_rejects_invalid_profiles() {
        // reserved run mode has no name
        let toml = r#"
run-mode = "reserved"
start-speed = 10.0
soll-speed = 20.0
acceleration-steps = 5
"#;
        assert!(matches!(
            StepperProfile::from_toml_str(toml),
            Err(ProfileError::Parse(_))
        ));
        assert!(StepperProfile::from_toml_str("run-mode = \"stepping\"").is_err());
        assert!(matches!(
            StepperProfile::from_toml_file("/nonexistent/motor.toml"),
            Err(ProfileError::Io { .. })
        ));
    }
}
