//! Stepper motor subdevice
//!
//! [`StepperMotor`] drives the per-channel state machine of a flink stepper
//! motor controller. Every channel is either stopped (start bit clear) or
//! running (start bit set). The hardware clears the start bit on its own
//! when a stepping run completes, so bits of the local configuration
//! register are only ever changed through the atomic set/clear aliases.
//!
//! Nothing is cached except the base clock: every getter re-reads the
//! hardware. Multi-register sequences such as [`StepperMotor::init_motor`]
//! are not transactional; callers that share a channel between processes
//! must lock externally (see [`Flink::select_subdevice`]).
//!
//! # Example
//!
//! ```ignore
//! use flink_core::stepper::{MotorSetup, RunMode, StepperMotor};
//!
//! let mut motor = StepperMotor::open(&mut flink, None)?;
//! motor.init_motor(0, &MotorSetup::new(RunMode::Stepping, 100.0, 1000.0, 50).steps_to_do(200))?;
//! motor.start(0)?;
//! ```
//!
//! [`Flink::select_subdevice`]: crate::device::Flink::select_subdevice

pub mod regs;
mod types;
mod units;

pub use types::{Direction, LocalConfig, PhaseMode, RunMode, StepMode};
pub use units::Units;

use crate::bus::FlinkBus;
use crate::device::Flink;
use crate::error::{Error, InvalidArgument, Result};
use crate::port::RegisterPort;
use crate::regs::{MOD_CONF_OFFSET, REGISTER_WIDTH};
use crate::subdevice::{FunctionId, Subdevice};
use regs::Bank;

/// Parameters for [`StepperMotor::init_motor`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorSetup {
    /// Operation mode
    pub run_mode: RunMode,
    /// Speed at which the motor starts, in steps per second
    pub start_speed: f64,
    /// Speed the motor ramps up to, in steps per second
    pub soll_speed: f64,
    /// Number of steps the ramp from start to soll speed takes
    pub acceleration_steps: u32,
    /// Steps to take in stepping mode
    pub steps_to_do: u32,
    /// Rotation direction
    pub direction: Direction,
    /// Stepping resolution
    pub step_mode: StepMode,
    /// Coil excitation
    pub phase_mode: PhaseMode,
}

impl MotorSetup {
    /// Setup with the default direction, step and phase mode and no steps to do
    pub fn new(run_mode: RunMode, start_speed: f64, soll_speed: f64, acceleration_steps: u32) -> Self {
        Self {
            run_mode,
            start_speed,
            soll_speed,
            acceleration_steps,
            steps_to_do: 0,
            direction: Direction::default(),
            step_mode: StepMode::default(),
            phase_mode: PhaseMode::default(),
        }
    }

    /// Set the number of steps to take in stepping mode
    pub fn steps_to_do(mut self, steps: u32) -> Self {
        self.steps_to_do = steps;
        self
    }

    /// Set the rotation direction
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set the stepping resolution
    pub fn step_mode(mut self, step_mode: StepMode) -> Self {
        self.step_mode = step_mode;
        self
    }

    /// Set the coil excitation
    pub fn phase_mode(mut self, phase_mode: PhaseMode) -> Self {
        self.phase_mode = phase_mode;
        self
    }
}

/// Raw register contents of one channel, read in a single pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
    /// Local configuration register
    pub config: LocalConfig,
    /// Prescaler of the start speed
    pub start_prescaler: u32,
    /// Prescaler of the soll speed
    pub soll_prescaler: u32,
    /// Raw acceleration
    pub acceleration: u32,
    /// Steps to take in stepping mode
    pub steps_to_do: u32,
    /// Steps taken since the last reset
    pub steps_done: u32,
}

/// Stepper motor controller bound to one subdevice
pub struct StepperMotor<B> {
    port: RegisterPort<B>,
    units: Units,
}

impl<'a, B: FlinkBus> StepperMotor<&'a mut B> {
    /// Bind to the stepper subdevice of `flink`
    ///
    /// With `unique_id` set, the subdevice with that unique id is used and
    /// must be a stepper motor; otherwise the first stepper motor subdevice.
    pub fn open(flink: &'a mut Flink<B>, unique_id: Option<u32>) -> Result<Self> {
        let sub = match unique_id {
            Some(uid) => flink.subdevice_by_unique_id(uid)?,
            None => flink.find_subdevice(FunctionId::StepperMotor, 0)?,
        };
        if sub.function != FunctionId::StepperMotor {
            return Err(Error::NotFound(crate::error::NotFound::Function {
                function: FunctionId::StepperMotor.raw(),
                subtype: sub.subtype,
            }));
        }
        Self::new(flink.port(sub))
    }
}

impl<B: FlinkBus> StepperMotor<B> {
    /// Bind to a stepper subdevice, reading its base clock once
    pub fn new(mut port: RegisterPort<B>) -> Result<Self> {
        let base_clock = port.read_reg(regs::BASE_CLOCK_OFFSET)?;
        let sub = port.subdevice();
        log::debug!(
            "Stepper motor on subdevice {}: {} channels, base clock {} Hz",
            sub.id,
            sub.channels,
            base_clock
        );
        if base_clock == 0 {
            log::warn!("Stepper motor reports a base clock of 0 Hz");
        }
        Ok(Self {
            port,
            units: Units::new(base_clock),
        })
    }

    /// The subdevice this controller is bound to
    pub fn subdevice(&self) -> &Subdevice {
        self.port.subdevice()
    }

    /// Number of motor channels
    pub fn channels(&self) -> u32 {
        self.port.subdevice().channels
    }

    /// Base clock in Hz, as read at construction
    pub fn base_clock(&self) -> u32 {
        self.units.base_clock()
    }

    /// Unit conversions for this controller
    pub fn units(&self) -> &Units {
        &self.units
    }

    /// Release the controller, returning the register port
    pub fn into_port(self) -> RegisterPort<B> {
        self.port
    }

    fn offset(&self, bank: Bank, channel: u32) -> Result<u32> {
        let channels = self.channels();
        if channel >= channels {
            return Err(InvalidArgument::ChannelOutOfRange { channel, channels }.into());
        }
        regs::channel_offset(bank, channels, channel).ok_or_else(|| {
            InvalidArgument::OffsetOutOfRange {
                offset: u32::MAX,
                size: REGISTER_WIDTH as u8,
                mem_size: self.subdevice().mem_size,
            }
            .into()
        })
    }

    fn read(&mut self, bank: Bank, channel: u32) -> Result<u32> {
        let offset = self.offset(bank, channel)?;
        self.port.read_reg(offset)
    }

    fn write(&mut self, bank: Bank, channel: u32, value: u32) -> Result<()> {
        let offset = self.offset(bank, channel)?;
        self.port.write_reg(offset, value)
    }

    fn require_state(&mut self, channel: u32, running: bool, operation: &'static str) -> Result<()> {
        let is_running = self.is_motor_running(channel)?;
        if is_running != running {
            return Err(Error::IllegalState {
                channel,
                operation,
                running: is_running,
            });
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Local configuration register
    // ---------------------------------------------------------------------

    /// Read the local configuration register
    pub fn local_configuration(&mut self, channel: u32) -> Result<LocalConfig> {
        self.read(Bank::LocalConfig, channel)
            .map(LocalConfig::from_bits_retain)
    }

    /// Overwrite the whole local configuration register
    ///
    /// Races with the hardware: a start bit cleared by the controller
    /// between the caller's read and this write is set again. Prefer
    /// [`StepperMotor::set_bits_in_local_configuration`] and
    /// [`StepperMotor::reset_bits_in_local_configuration`].
    pub fn write_local_configuration_unsynchronized(
        &mut self,
        channel: u32,
        config: LocalConfig,
    ) -> Result<()> {
        log::debug!(
            "ch{}: unsynchronized local config write 0x{:02X}",
            channel,
            config.bits()
        );
        self.write(Bank::LocalConfig, channel, config.bits())
    }

    /// Atomically set `bits` in the local configuration register
    pub fn set_bits_in_local_configuration(&mut self, channel: u32, bits: LocalConfig) -> Result<()> {
        let offset = self.offset(Bank::LocalConfigSet, channel)?;
        self.port.set_bits_atomic(offset, bits.bits())
    }

    /// Atomically clear `bits` in the local configuration register
    pub fn reset_bits_in_local_configuration(&mut self, channel: u32, bits: LocalConfig) -> Result<()> {
        let offset = self.offset(Bank::LocalConfigReset, channel)?;
        self.port.reset_bits_atomic(offset, bits.bits())
    }

    fn write_flag(&mut self, channel: u32, flag: LocalConfig, value: bool) -> Result<()> {
        if value {
            self.set_bits_in_local_configuration(channel, flag)
        } else {
            self.reset_bits_in_local_configuration(channel, flag)
        }
    }

    /// Set the rotation direction
    pub fn set_direction(&mut self, channel: u32, direction: Direction) -> Result<()> {
        self.write_flag(
            channel,
            LocalConfig::DIRECTION,
            direction == Direction::Clockwise,
        )
    }

    /// Read the rotation direction
    pub fn direction(&mut self, channel: u32) -> Result<Direction> {
        Ok(self.local_configuration(channel)?.direction())
    }

    /// Set the stepping resolution
    pub fn set_step_mode(&mut self, channel: u32, step_mode: StepMode) -> Result<()> {
        self.write_flag(
            channel,
            LocalConfig::STEP_MODE,
            step_mode == StepMode::FullSteps,
        )
    }

    /// Read the stepping resolution
    pub fn step_mode(&mut self, channel: u32) -> Result<StepMode> {
        Ok(self.local_configuration(channel)?.step_mode())
    }

    /// Set the coil excitation
    pub fn set_phase_mode(&mut self, channel: u32, phase_mode: PhaseMode) -> Result<()> {
        self.write_flag(
            channel,
            LocalConfig::PHASE_MODE,
            phase_mode == PhaseMode::TwoPhase,
        )
    }

    /// Read the coil excitation
    pub fn phase_mode(&mut self, channel: u32) -> Result<PhaseMode> {
        Ok(self.local_configuration(channel)?.phase_mode())
    }

    /// Set the operation mode
    ///
    /// Only the run mode bits that differ from `run_mode` are touched.
    /// Bits are cleared before bits are set, so the field passes through
    /// disabled rather than the reserved code when both bits flip.
    pub fn set_run_mode(&mut self, channel: u32, run_mode: RunMode) -> Result<()> {
        let current = self.local_configuration(channel)? & LocalConfig::RUN_MODE;
        let target = run_mode.bits();

        let clear = current - target;
        let set = target - current;
        if !clear.is_empty() {
            self.reset_bits_in_local_configuration(channel, clear)?;
        }
        if !set.is_empty() {
            self.set_bits_in_local_configuration(channel, set)?;
        }
        log::debug!("ch{}: run mode {}", channel, run_mode);
        Ok(())
    }

    /// Set the operation mode from its raw 2-bit code
    ///
    /// The reserved code 3 is rejected before any register is accessed.
    pub fn set_run_mode_code(&mut self, channel: u32, code: u8) -> Result<()> {
        let run_mode = RunMode::from_code(code)?;
        self.set_run_mode(channel, run_mode)
    }

    /// Read the operation mode
    ///
    /// Fails with [`InvalidArgument::ReservedRunMode`] if the register holds
    /// the reserved code.
    pub fn run_mode(&mut self, channel: u32) -> Result<RunMode> {
        Ok(self.local_configuration(channel)?.run_mode()?)
    }

    /// Whether the channel is running
    pub fn is_motor_running(&mut self, channel: u32) -> Result<bool> {
        Ok(self.local_configuration(channel)?.is_running())
    }

    // ---------------------------------------------------------------------
    // Speeds and ramps
    // ---------------------------------------------------------------------

    fn set_start_prescaler(&mut self, channel: u32, prescaler: u32) -> Result<()> {
        self.write(Bank::StartPrescaler, channel, prescaler)
    }

    fn set_soll_prescaler(&mut self, channel: u32, prescaler: u32) -> Result<()> {
        self.write(Bank::SollPrescaler, channel, prescaler)
    }

    fn set_acceleration(&mut self, channel: u32, acceleration: u32) -> Result<()> {
        self.write(Bank::Acceleration, channel, acceleration)
    }

    /// Prescaler of the start speed
    pub fn start_prescaler(&mut self, channel: u32) -> Result<u32> {
        self.read(Bank::StartPrescaler, channel)
    }

    /// Prescaler of the soll speed
    pub fn soll_prescaler(&mut self, channel: u32) -> Result<u32> {
        self.read(Bank::SollPrescaler, channel)
    }

    /// Raw acceleration register
    pub fn raw_acceleration(&mut self, channel: u32) -> Result<u32> {
        self.read(Bank::Acceleration, channel)
    }

    /// Start speed in steps per second
    pub fn start_speed(&mut self, channel: u32) -> Result<f64> {
        let prescaler = self.start_prescaler(channel)?;
        self.units.speed(prescaler)
    }

    /// Soll speed in steps per second
    pub fn soll_speed(&mut self, channel: u32) -> Result<f64> {
        let prescaler = self.soll_prescaler(channel)?;
        self.units.speed(prescaler)
    }

    /// Length of the acceleration ramp in steps
    pub fn acceleration(&mut self, channel: u32) -> Result<f64> {
        let start = self.start_prescaler(channel)?;
        let soll = self.soll_prescaler(channel)?;
        let acceleration = self.raw_acceleration(channel)?;
        self.units.steps_from_acceleration(start, soll, acceleration)
    }

    /// Configure a stopped channel
    ///
    /// Writes run mode, start speed, soll speed, acceleration, steps to do,
    /// direction, step mode and phase mode, in that order. The run mode
    /// goes first so the hardware interprets the following writes in the
    /// new mode. The channel stays stopped.
    pub fn init_motor(&mut self, channel: u32, setup: &MotorSetup) -> Result<()> {
        self.require_state(channel, false, "init_motor")?;

        let start = self.units.prescaler(setup.start_speed)?;
        let soll = self.units.prescaler(setup.soll_speed)?;
        let acceleration = self
            .units
            .acceleration_from_steps(start, soll, setup.acceleration_steps)?;

        self.set_run_mode(channel, setup.run_mode)?;
        self.set_start_prescaler(channel, start)?;
        self.set_soll_prescaler(channel, soll)?;
        self.set_acceleration(channel, acceleration)?;
        self.set_steps_to_do(channel, setup.steps_to_do)?;
        self.set_direction(channel, setup.direction)?;
        self.set_step_mode(channel, setup.step_mode)?;
        self.set_phase_mode(channel, setup.phase_mode)?;

        log::info!(
            "ch{}: initialized ({}, prescaler {} -> {}, acceleration {}, {} steps)",
            channel,
            setup.run_mode,
            start,
            soll,
            acceleration,
            setup.steps_to_do
        );
        Ok(())
    }

    /// Change the soll speed of a running channel
    ///
    /// The new acceleration is written before the new soll speed so the
    /// hardware never targets the new speed with the old ramp.
    pub fn change_soll_speed_while_running(
        &mut self,
        channel: u32,
        soll_speed: f64,
        acceleration_steps: u32,
    ) -> Result<()> {
        self.require_state(channel, true, "change_soll_speed_while_running")?;

        let soll = self.units.prescaler(soll_speed)?;
        let start = self.start_prescaler(channel)?;
        let acceleration = self
            .units
            .acceleration_from_steps(start, soll, acceleration_steps)?;

        self.set_acceleration(channel, acceleration)?;
        self.set_soll_prescaler(channel, soll)?;
        log::debug!(
            "ch{}: soll prescaler {} (acceleration {})",
            channel,
            soll,
            acceleration
        );
        Ok(())
    }

    /// Update start speed, soll speed and ramp of a stopped channel
    pub fn update_speeds(
        &mut self,
        channel: u32,
        start_speed: f64,
        soll_speed: f64,
        acceleration_steps: u32,
    ) -> Result<()> {
        self.require_state(channel, false, "update_speeds")?;

        let start = self.units.prescaler(start_speed)?;
        let soll = self.units.prescaler(soll_speed)?;
        let acceleration = self
            .units
            .acceleration_from_steps(start, soll, acceleration_steps)?;

        self.set_start_prescaler(channel, start)?;
        self.set_soll_prescaler(channel, soll)?;
        self.set_acceleration(channel, acceleration)
    }

    // ---------------------------------------------------------------------
    // Start / stop
    // ---------------------------------------------------------------------

    /// Start the motor
    pub fn start(&mut self, channel: u32) -> Result<()> {
        self.set_bits_in_local_configuration(channel, LocalConfig::START)?;
        log::info!("ch{}: started", channel);
        Ok(())
    }

    /// Stop the motor
    ///
    /// With `acceleration_steps` given and the channel in fixed-speed mode,
    /// a new ramp over that many steps is computed from the current start
    /// and soll prescalers and written before the start bit is cleared, so
    /// the motor decelerates instead of stopping dead. In other modes the
    /// ramp is left alone. If the ramp cannot be computed (for example a
    /// step count of 0) the error is returned before the start bit is
    /// touched, so the motor keeps running.
    pub fn stop(&mut self, channel: u32, acceleration_steps: Option<u32>) -> Result<()> {
        if let Some(steps) = acceleration_steps {
            let config = self.local_configuration(channel)?;
            if config.run_mode_code() == RunMode::FixedSpeed.code() {
                let start = self.start_prescaler(channel)?;
                let soll = self.soll_prescaler(channel)?;
                let acceleration = self.units.acceleration_from_steps(start, soll, steps)?;
                self.set_acceleration(channel, acceleration)?;
            }
        }
        self.reset_bits_in_local_configuration(channel, LocalConfig::START)?;
        log::info!("ch{}: stopped", channel);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Step counters
    // ---------------------------------------------------------------------

    /// Set the number of steps to take in stepping mode
    pub fn set_steps_to_do(&mut self, channel: u32, steps: u32) -> Result<()> {
        self.write(Bank::StepsToDo, channel, steps)
    }

    /// Number of steps to take in stepping mode
    pub fn steps_to_do(&mut self, channel: u32) -> Result<u32> {
        self.read(Bank::StepsToDo, channel)
    }

    /// Number of steps taken since the last reset
    pub fn steps_have_done(&mut self, channel: u32) -> Result<u32> {
        self.read(Bank::StepsDone, channel)
    }

    /// Reset the step counters of all channels
    pub fn reset_steps_global(&mut self) -> Result<()> {
        self.port
            .write_bit(MOD_CONF_OFFSET, regs::MOD_CONF_GLOBAL_STEP_RESET_BIT, true)
    }

    /// Reset the step counter of one channel
    pub fn reset_steps_local(&mut self, channel: u32) -> Result<()> {
        self.set_bits_in_local_configuration(channel, LocalConfig::RESET_STEPS)
    }

    /// Read all registers of a channel
    pub fn status(&mut self, channel: u32) -> Result<ChannelStatus> {
        Ok(ChannelStatus {
            config: self.local_configuration(channel)?,
            start_prescaler: self.start_prescaler(channel)?,
            soll_prescaler: self.soll_prescaler(channel)?,
            acceleration: self.raw_acceleration(channel)?,
            steps_to_do: self.steps_to_do(channel)?,
            steps_done: self.steps_have_done(channel)?,
        })
    }
}
