//! Stepper motor configuration types
//!
//! The local configuration register of each channel packs the motor
//! settings into seven bits. [`LocalConfig`] gives access to the raw bits;
//! the enums below are the typed view of the individual fields.

use crate::error::{Error, InvalidArgument};
use bitflags::bitflags;
use core::fmt;
use core::str::FromStr;

bitflags! {
    /// Bits of the per-channel local configuration register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LocalConfig: u32 {
        /// Motor direction (set = clockwise)
        const DIRECTION   = 1 << 0;
        /// Step mode (set = full steps)
        const STEP_MODE   = 1 << 1;
        /// Phase mode (set = two-phase)
        const PHASE_MODE  = 1 << 2;
        /// Run mode, low bit
        const RUN_MODE_0  = 1 << 3;
        /// Run mode, high bit
        const RUN_MODE_1  = 1 << 4;
        /// Motor running
        const START       = 1 << 5;
        /// Writing 1 pulses a reset of the step counter
        const RESET_STEPS = 1 << 6;

        /// Both run mode bits
        const RUN_MODE = Self::RUN_MODE_0.bits() | Self::RUN_MODE_1.bits();
    }
}

/// Position of the run mode field within the local configuration register
const RUN_MODE_SHIFT: u32 = 3;

impl LocalConfig {
    /// Motor direction
    pub fn direction(self) -> Direction {
        if self.contains(Self::DIRECTION) {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        }
    }

    /// Step mode
    pub fn step_mode(self) -> StepMode {
        if self.contains(Self::STEP_MODE) {
            StepMode::FullSteps
        } else {
            StepMode::HalfSteps
        }
    }

    /// Phase mode
    pub fn phase_mode(self) -> PhaseMode {
        if self.contains(Self::PHASE_MODE) {
            PhaseMode::TwoPhase
        } else {
            PhaseMode::OnePhase
        }
    }

    /// Raw 2-bit run mode field
    pub fn run_mode_code(self) -> u8 {
        ((self.bits() & Self::RUN_MODE.bits()) >> RUN_MODE_SHIFT) as u8
    }

    /// Run mode; fails if the register holds the reserved code
    pub fn run_mode(self) -> Result<RunMode, InvalidArgument> {
        RunMode::from_code(self.run_mode_code())
    }

    /// Whether the start bit is set
    pub fn is_running(self) -> bool {
        self.contains(Self::START)
    }
}

/// Motor rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum Direction {
    /// Counter-clockwise rotation
    CounterClockwise,
    /// Clockwise rotation
    #[default]
    Clockwise,
}

/// Stepping resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum StepMode {
    /// Half-step mode
    HalfSteps,
    /// Full-step mode
    #[default]
    FullSteps,
}

/// Coil excitation; only has an effect in full-step mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum PhaseMode {
    /// One coil energized at a time
    OnePhase,
    /// Two coils energized at a time
    #[default]
    TwoPhase,
}

/// Motor operation mode
///
/// The hardware field is two bits wide; code 3 is reserved and has no
/// variant, so it can never be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum RunMode {
    /// Motor disabled, no holding torque
    Disabled,
    /// Motor takes a fixed number of steps
    Stepping,
    /// Motor moves at a constant speed
    FixedSpeed,
}

impl RunMode {
    /// Decode a 2-bit run mode code
    pub fn from_code(code: u8) -> Result<Self, InvalidArgument> {
        match code {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::Stepping),
            2 => Ok(Self::FixedSpeed),
            3 => Err(InvalidArgument::ReservedRunMode),
            other => Err(InvalidArgument::UnknownRunMode(other)),
        }
    }

    /// Raw 2-bit code
    pub fn code(self) -> u8 {
        match self {
            Self::Disabled => 0,
            Self::Stepping => 1,
            Self::FixedSpeed => 2,
        }
    }

    /// Run mode field bits as placed in the local configuration register
    pub fn bits(self) -> LocalConfig {
        LocalConfig::from_bits_retain((self.code() as u32) << RUN_MODE_SHIFT)
    }
}

impl TryFrom<u8> for RunMode {
    type Error = InvalidArgument;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::CounterClockwise => write!(f, "counter-clockwise"),
            Direction::Clockwise => write!(f, "clockwise"),
        }
    }
}

impl fmt::Display for StepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepMode::HalfSteps => write!(f, "half-steps"),
            StepMode::FullSteps => write!(f, "full-steps"),
        }
    }
}

impl fmt::Display for PhaseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseMode::OnePhase => write!(f, "one-phase"),
            PhaseMode::TwoPhase => write!(f, "two-phase"),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Disabled => write!(f, "disabled"),
            RunMode::Stepping => write!(f, "stepping"),
            RunMode::FixedSpeed => write!(f, "fixed-speed"),
        }
    }
}

fn unknown(kind: &'static str) -> Error {
    Error::InvalidArgument(InvalidArgument::UnknownValue { kind })
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cw" | "clockwise" => Ok(Self::Clockwise),
            "ccw" | "counter-clockwise" => Ok(Self::CounterClockwise),
            _ => Err(unknown("direction")),
        }
    }
}

impl FromStr for StepMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" | "full-steps" => Ok(Self::FullSteps),
            "half" | "half-steps" => Ok(Self::HalfSteps),
            _ => Err(unknown("step mode")),
        }
    }
}

impl FromStr for PhaseMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one" | "one-phase" => Ok(Self::OnePhase),
            "two" | "two-phase" => Ok(Self::TwoPhase),
            _ => Err(unknown("phase mode")),
        }
    }
}

impl FromStr for RunMode {
    type Err = Error;

    /// Accepts a mode name or its numeric code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(Self::Disabled),
            "stepping" => Ok(Self::Stepping),
            "fixed-speed" => Ok(Self::FixedSpeed),
            _ => match s.parse::<u8>() {
                Ok(code) => Ok(Self::from_code(code)?),
                Err(_) => Err(unknown("run mode")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_decoding() {
        let config = LocalConfig::from_bits_retain(0b010_0101);
        assert_eq!(config.direction(), Direction::Clockwise);
        assert_eq!(config.step_mode(), StepMode::HalfSteps);
        assert_eq!(config.phase_mode(), PhaseMode::TwoPhase);
        assert_eq!(config.run_mode(), Ok(RunMode::Disabled));
        assert!(config.is_running());
    }

    #[test]
    fn test_run_mode_codes() {
        for mode in [RunMode::Disabled, RunMode::Stepping, RunMode::FixedSpeed] {
            assert_eq!(RunMode::from_code(mode.code()), Ok(mode));
            assert_eq!(LocalConfig::from_bits_retain(mode.bits().bits()).run_mode(), Ok(mode));
        }
        assert_eq!(RunMode::Stepping.bits(), LocalConfig::RUN_MODE_0);
        assert_eq!(RunMode::FixedSpeed.bits(), LocalConfig::RUN_MODE_1);
    }

    #[test]
    fn test_reserved_run_mode_rejected() {
        assert_eq!(RunMode::try_from(3), Err(InvalidArgument::ReservedRunMode));
        assert_eq!(RunMode::try_from(4), Err(InvalidArgument::UnknownRunMode(4)));
        assert_eq!(
            LocalConfig::RUN_MODE.run_mode(),
            Err(InvalidArgument::ReservedRunMode)
        );
        assert_eq!(
            "3".parse::<RunMode>(),
            Err(Error::InvalidArgument(InvalidArgument::ReservedRunMode))
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("fixed-speed".parse::<RunMode>(), Ok(RunMode::FixedSpeed));
        assert_eq!("1".parse::<RunMode>(), Ok(RunMode::Stepping));
        assert_eq!("ccw".parse::<Direction>(), Ok(Direction::CounterClockwise));
        assert_eq!("half".parse::<StepMode>(), Ok(StepMode::HalfSteps));
        assert_eq!("one-phase".parse::<PhaseMode>(), Ok(PhaseMode::OnePhase));
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Direction::default(), Direction::Clockwise);
        assert_eq!(StepMode::default(), StepMode::FullSteps);
        assert_eq!(PhaseMode::default(), PhaseMode::TwoPhase);
    }
}
