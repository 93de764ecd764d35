//! flink-dummy - Simulated flink device for testing
//!
//! This crate provides an in-memory flink device with an info subdevice
//! and one stepper motor subdevice. The stepper registers behave like the
//! FPGA implementation:
//!
//! - the set/reset aliases of the local configuration register OR/AND-NOT
//!   the written mask and always read back as 0
//! - the reset-steps bit and the reset pulses in the module configuration
//!   register clear themselves
//! - the base clock, the header and the steps-done counters are read-only
//!
//! Stepping is simulated explicitly with [`DummyFlink::advance`], or on
//! every poll of a steps-done counter when [`DummyConfig::stepping`] is set.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use flink_core::error::{Error, NotFound, Result};
use flink_core::regs::{
    MOD_CONF_OFFSET, MOD_CONF_RESET_BIT, MOD_STATUS_OFFSET, REGISTER_WIDTH, TOTAL_HEADER_SIZE,
};
use flink_core::stepper::regs::{
    self as stepper_regs, Bank, BASE_CLOCK_OFFSET, CHANNEL_BANKS_OFFSET,
    MOD_CONF_GLOBAL_STEP_RESET_BIT,
};
use flink_core::stepper::{LocalConfig, RunMode};
use flink_core::{FlinkBus, FunctionId, Subdevice};

/// Index of the info subdevice
pub const INFO_ID: u8 = 0;
/// Index of the stepper motor subdevice
pub const STEPPER_ID: u8 = 1;

/// Raw code reported for accesses outside a subdevice (-EINVAL)
const EINVAL: i32 = -22;
/// Raw code reported for accesses to a missing subdevice (-ENODEV)
const ENODEV: i32 = -19;

const BANKS: [Bank; stepper_regs::BANK_COUNT as usize] = [
    Bank::LocalConfig,
    Bank::LocalConfigSet,
    Bank::LocalConfigReset,
    Bank::StartPrescaler,
    Bank::SollPrescaler,
    Bank::Acceleration,
    Bank::StepsToDo,
    Bank::StepsDone,
];

/// Configuration for the simulated device
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Number of stepper motor channels
    pub channels: u32,
    /// Base clock of the stepper controller in Hz
    pub base_clock: u32,
    /// Unique id of the info subdevice
    pub info_unique_id: u32,
    /// Unique id of the stepper subdevice
    pub stepper_unique_id: u32,
    /// Steps a running channel advances each time its steps-done counter
    /// is read (0 = only on [`DummyFlink::advance`])
    pub stepping: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            channels: 4,
            base_clock: 1_000_000,
            info_unique_id: 0x0000_0001,
            stepper_unique_id: 0x0015_0001,
            stepping: 0,
        }
    }
}

impl DummyConfig {
    /// Set the number of stepper channels
    pub fn with_channels(mut self, channels: u32) -> Self {
        self.channels = channels;
        self
    }

    /// Set the stepper base clock in Hz
    pub fn with_base_clock(mut self, base_clock: u32) -> Self {
        self.base_clock = base_clock;
        self
    }

    /// Advance running channels by `steps` on every steps-done poll
    pub fn with_stepping(mut self, steps: u32) -> Self {
        self.stepping = steps;
        self
    }
}

#[cfg(feature = "alloc")]
struct Region {
    sub: Subdevice,
    mem: Vec<u8>,
}

/// Simulated flink device
#[cfg(feature = "alloc")]
pub struct DummyFlink {
    config: DummyConfig,
    regions: Vec<Region>,
    faults: Vec<(u8, u32, i32)>,
    writes: Vec<(u8, u32, u32)>,
    selected: Option<(u8, bool)>,
}

#[cfg(feature = "alloc")]
impl DummyFlink {
    /// Create a simulated device with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let info = Subdevice {
            id: INFO_ID,
            function: FunctionId::Info,
            subtype: 0,
            version: 1,
            base_addr: 0,
            mem_size: TOTAL_HEADER_SIZE,
            channels: 0,
            unique_id: config.info_unique_id,
        };
        let stepper = Subdevice {
            id: STEPPER_ID,
            function: FunctionId::StepperMotor,
            subtype: 0,
            version: 1,
            base_addr: info.base_addr + info.mem_size,
            mem_size: stepper_regs::mem_size(config.channels),
            channels: config.channels,
            unique_id: config.stepper_unique_id,
        };

        let mut flink = Self {
            config,
            regions: Vec::new(),
            faults: Vec::new(),
            writes: Vec::new(),
            selected: None,
        };
        for sub in [info, stepper] {
            let mut mem = vec![0u8; sub.mem_size as usize];
            mem[..sub.header().len()].copy_from_slice(&sub.header());
            flink.regions.push(Region { sub, mem });
        }
        flink.reset_stepper();
        flink
    }

    /// Create a simulated device with the default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Description of the stepper subdevice
    pub fn stepper(&self) -> Subdevice {
        self.regions[STEPPER_ID as usize].sub
    }

    /// Make every access to `offset` of `subdevice` fail with `code`
    pub fn fail_at(&mut self, subdevice: u8, offset: u32, code: i32) {
        self.faults.push((subdevice, offset, code));
    }

    /// Remove all injected faults
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// Every write as (subdevice, offset, value), in issue order
    pub fn writes(&self) -> &[(u8, u32, u32)] {
        &self.writes
    }

    /// Forget the recorded writes
    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// Last selected subdevice and whether it was selected exclusively
    pub fn selected(&self) -> Option<(u8, bool)> {
        self.selected
    }

    /// Raw register contents, bypassing register semantics
    pub fn word(&self, subdevice: u8, offset: u32) -> u32 {
        let at = offset as usize;
        let mem = &self.regions[subdevice as usize].mem;
        u32::from_le_bytes([mem[at], mem[at + 1], mem[at + 2], mem[at + 3]])
    }

    /// Overwrite a register, bypassing register semantics
    pub fn set_word(&mut self, subdevice: u8, offset: u32, value: u32) {
        let at = offset as usize;
        self.regions[subdevice as usize].mem[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn reg(&self, bank: Bank, channel: u32) -> u32 {
        match stepper_regs::channel_offset(bank, self.config.channels, channel) {
            Some(offset) => self.word(STEPPER_ID, offset),
            None => 0,
        }
    }

    fn set_reg(&mut self, bank: Bank, channel: u32, value: u32) {
        if let Some(offset) = stepper_regs::channel_offset(bank, self.config.channels, channel) {
            self.set_word(STEPPER_ID, offset, value);
        }
    }

    fn local_config(&self, channel: u32) -> LocalConfig {
        LocalConfig::from_bits_retain(self.reg(Bank::LocalConfig, channel))
    }

    fn set_local_config(&mut self, channel: u32, mut config: LocalConfig) {
        if config.contains(LocalConfig::RESET_STEPS) {
            self.set_reg(Bank::StepsDone, channel, 0);
            config.remove(LocalConfig::RESET_STEPS);
        }
        self.set_reg(Bank::LocalConfig, channel, config.bits());
    }

    /// Put the stepper subdevice into its power-up state
    fn reset_stepper(&mut self) {
        let mem = &mut self.regions[STEPPER_ID as usize].mem;
        for byte in &mut mem[MOD_STATUS_OFFSET as usize..] {
            *byte = 0;
        }
        self.set_word(STEPPER_ID, BASE_CLOCK_OFFSET, self.config.base_clock);
        for channel in 0..self.config.channels {
            self.set_reg(Bank::StartPrescaler, channel, 1);
            self.set_reg(Bank::SollPrescaler, channel, 1);
            self.set_reg(Bank::Acceleration, channel, 1);
        }
    }

    fn bank_of(&self, offset: u32) -> Option<(Bank, u32)> {
        let channels = self.config.channels;
        if channels == 0 || offset < CHANNEL_BANKS_OFFSET || offset % REGISTER_WIDTH != 0 {
            return None;
        }
        let index = (offset - CHANNEL_BANKS_OFFSET) / REGISTER_WIDTH;
        let bank = BANKS.get((index / channels) as usize)?;
        Some((*bank, index % channels))
    }

    /// Let a running channel take `steps` steps
    ///
    /// In stepping mode the channel stops by itself (clearing its start
    /// bit) once steps-done reaches steps-to-do. Disabled channels do not
    /// move. Channels the device does not have are ignored.
    pub fn advance(&mut self, channel: u32, steps: u32) {
        if channel >= self.config.channels {
            return;
        }
        let config = self.local_config(channel);
        if !config.is_running() {
            return;
        }
        let mut done = self.reg(Bank::StepsDone, channel).saturating_add(steps);
        match config.run_mode() {
            Ok(RunMode::Stepping) => {
                let to_do = self.reg(Bank::StepsToDo, channel);
                if done >= to_do {
                    done = to_do;
                    self.set_local_config(channel, config - LocalConfig::START);
                    log::debug!("dummy: ch{} finished {} steps", channel, to_do);
                }
            }
            Ok(RunMode::FixedSpeed) => {}
            _ => return,
        }
        self.set_reg(Bank::StepsDone, channel, done);
    }

    /// Store a register value the way the stepper hardware would
    fn store_word(&mut self, subdevice: u8, offset: u32, value: u32) {
        // everything in the header except the configuration register is read-only
        if offset < TOTAL_HEADER_SIZE && offset != MOD_CONF_OFFSET {
            return;
        }
        if offset == MOD_CONF_OFFSET {
            let pulses = (1 << MOD_CONF_RESET_BIT) | (1 << MOD_CONF_GLOBAL_STEP_RESET_BIT);
            if subdevice == STEPPER_ID {
                if value & (1 << MOD_CONF_RESET_BIT) != 0 {
                    log::debug!("dummy: stepper subdevice reset");
                    self.reset_stepper();
                }
                if value & (1 << MOD_CONF_GLOBAL_STEP_RESET_BIT) != 0 {
                    for channel in 0..self.config.channels {
                        self.set_reg(Bank::StepsDone, channel, 0);
                    }
                }
            }
            self.set_word(subdevice, offset, value & !pulses);
            return;
        }
        if subdevice != STEPPER_ID {
            self.set_word(subdevice, offset, value);
            return;
        }
        if offset == BASE_CLOCK_OFFSET {
            return;
        }

        let bits = LocalConfig::from_bits_retain(value);
        match self.bank_of(offset) {
            Some((Bank::LocalConfig, channel)) => self.set_local_config(channel, bits),
            Some((Bank::LocalConfigSet, channel)) => {
                let config = self.local_config(channel) | bits;
                self.set_local_config(channel, config);
            }
            Some((Bank::LocalConfigReset, channel)) => {
                let config = self.local_config(channel) - bits;
                self.set_local_config(channel, config);
            }
            Some((Bank::StepsDone, _)) => {}
            _ => self.set_word(subdevice, offset, value),
        }
    }

    fn check(&self, subdevice: u8, offset: u32, len: usize) -> Result<()> {
        let transport = |code| Error::Transport {
            subdevice,
            offset,
            code,
        };
        let region = self
            .regions
            .get(subdevice as usize)
            .ok_or(transport(ENODEV))?;
        let end = offset as u64 + len as u64;
        if end > region.sub.mem_size as u64 {
            return Err(transport(EINVAL));
        }
        match self
            .faults
            .iter()
            .find(|(s, o, _)| *s == subdevice && *o == offset)
        {
            Some(&(_, _, code)) => Err(transport(code)),
            None => Ok(()),
        }
    }
}

#[cfg(feature = "alloc")]
impl FlinkBus for DummyFlink {
    fn subdevice_count(&mut self) -> Result<u8> {
        Ok(self.regions.len() as u8)
    }

    fn subdevice_info(&mut self, id: u8) -> Result<Subdevice> {
        self.regions
            .get(id as usize)
            .map(|region| region.sub)
            .ok_or(Error::NotFound(NotFound::Id(id)))
    }

    fn read(&mut self, subdevice: u8, offset: u32, buf: &mut [u8]) -> Result<()> {
        self.check(subdevice, offset, buf.len())?;
        if subdevice == STEPPER_ID && self.config.stepping > 0 {
            if let Some((Bank::StepsDone, channel)) = self.bank_of(offset) {
                self.advance(channel, self.config.stepping);
            }
        }
        let at = offset as usize;
        buf.copy_from_slice(&self.regions[subdevice as usize].mem[at..at + buf.len()]);
        Ok(())
    }

    fn write(&mut self, subdevice: u8, offset: u32, data: &[u8]) -> Result<()> {
        self.check(subdevice, offset, data.len())?;
        let mut padded = [0u8; 4];
        let n = data.len().min(4);
        padded[..n].copy_from_slice(&data[..n]);
        self.writes
            .push((subdevice, offset, u32::from_le_bytes(padded)));

        // merge partial writes into the containing words
        let mut at = offset;
        let mut rest = data;
        while !rest.is_empty() {
            let word_offset = at & !(REGISTER_WIDTH - 1);
            let skip = (at - word_offset) as usize;
            let len = (REGISTER_WIDTH as usize - skip).min(rest.len());
            let mut bytes = self.word(subdevice, word_offset).to_le_bytes();
            bytes[skip..skip + len].copy_from_slice(&rest[..len]);
            self.store_word(subdevice, word_offset, u32::from_le_bytes(bytes));
            at += len as u32;
            rest = &rest[len..];
        }
        Ok(())
    }

    fn read_bit(&mut self, subdevice: u8, offset: u32, bit: u8) -> Result<bool> {
        let mut buf = [0u8; 4];
        self.read(subdevice, offset, &mut buf)?;
        Ok(u32::from_le_bytes(buf) & (1 << bit) != 0)
    }

    fn write_bit(&mut self, subdevice: u8, offset: u32, bit: u8, value: bool) -> Result<()> {
        self.check(subdevice, offset, REGISTER_WIDTH as usize)?;
        let word = self.word(subdevice, offset);
        let word = if value {
            word | (1 << bit)
        } else {
            word & !(1 << bit)
        };
        self.writes.push((subdevice, offset, word));
        self.store_word(subdevice, offset, word);
        Ok(())
    }

    fn select(&mut self, subdevice: u8, exclusive: bool) -> Result<()> {
        if subdevice as usize >= self.regions.len() {
            return Err(NotFound::Id(subdevice).into());
        }
        self.selected = Some((subdevice, exclusive));
        Ok(())
    }
}

/// Parse backend options from key-value pairs
///
/// # Supported options
/// - `channels=N` - number of stepper channels (default 4)
/// - `clock=HZ` - stepper base clock (default 1000000)
/// - `stepping=STEPS` - steps per steps-done poll (default 0)
#[cfg(feature = "std")]
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<DummyConfig, String> {
    let mut config = DummyConfig::default();

    for (key, value) in options {
        let parsed = value
            .parse::<u32>()
            .map_err(|_| format!("Invalid value for dummy option '{}': {}", key, value));
        match *key {
            "channels" => {
                let channels = parsed?;
                if channels == 0 || channels > 64 {
                    return Err(format!("channels must be 1-64, got {}", channels));
                }
                config = config.with_channels(channels);
            }
            "clock" => config = config.with_base_clock(parsed?),
            "stepping" => config = config.with_stepping(parsed?),
            _ => log::warn!("Unknown dummy option: {}={}", key, value),
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flink_core::error::InvalidArgument;
    use flink_core::stepper::{Direction, MotorSetup, PhaseMode, StepMode, StepperMotor};
    use flink_core::Flink;

    fn device() -> Flink<DummyFlink> {
        Flink::new(DummyFlink::new_default())
    }

    fn scenario_setup() -> MotorSetup {
        MotorSetup::new(RunMode::Stepping, 100.0, 1000.0, 50).steps_to_do(200)
    }

    #[test]
    fn test_discovery() {
        let mut flink = device();
        let subs = flink.subdevices().unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].function, FunctionId::Info);
        assert_eq!(subs[1].function, FunctionId::StepperMotor);
        assert_eq!(subs[1].base_addr, subs[0].end_addr() + 1);
        assert_eq!(subs[1].mem_size, stepper_regs::mem_size(4));

        let found = flink.subdevice_by_unique_id(0x0015_0001).unwrap();
        assert_eq!(found, subs[1]);
    }

    #[test]
    fn test_init_scenario() {
        let mut flink = device();
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        assert_eq!(motor.base_clock(), 1_000_000);

        motor.init_motor(0, &scenario_setup()).unwrap();
        assert!(!motor.is_motor_running(0).unwrap());
        assert_eq!(motor.start_prescaler(0).unwrap(), 10_000);
        assert_eq!(motor.soll_prescaler(0).unwrap(), 1_000);
        assert_eq!(motor.raw_acceleration(0).unwrap(), 180);
        assert_eq!(motor.steps_to_do(0).unwrap(), 200);
        assert_eq!(motor.start_speed(0).unwrap(), 100.0);
        assert_eq!(motor.soll_speed(0).unwrap(), 1000.0);
        assert_eq!(motor.acceleration(0).unwrap(), 50.0);
        assert_eq!(motor.run_mode(0).unwrap(), RunMode::Stepping);
        assert_eq!(motor.direction(0).unwrap(), Direction::Clockwise);
        assert_eq!(motor.step_mode(0).unwrap(), StepMode::FullSteps);
        assert_eq!(motor.phase_mode(0).unwrap(), PhaseMode::TwoPhase);
    }

    #[test]
    fn test_init_while_running_rejected() {
        let mut flink = device();
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        motor.init_motor(0, &scenario_setup()).unwrap();
        motor.start(0).unwrap();
        assert!(motor.is_motor_running(0).unwrap());

        assert!(matches!(
            motor.init_motor(0, &scenario_setup()),
            Err(Error::IllegalState { running: true, .. })
        ));
    }

    #[test]
    fn test_change_speed_while_stopped_writes_nothing() {
        let mut flink = device();
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        motor.init_motor(0, &scenario_setup()).unwrap();
        drop(motor);
        flink.bus_mut().clear_writes();

        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        assert!(matches!(
            motor.change_soll_speed_while_running(0, 2000.0, 10),
            Err(Error::IllegalState { running: false, .. })
        ));
        assert_eq!(motor.soll_prescaler(0).unwrap(), 1_000);
        assert_eq!(motor.raw_acceleration(0).unwrap(), 180);
        drop(motor);
        assert!(flink.bus_mut().writes().is_empty());
    }

    #[test]
    fn test_change_speed_while_running() {
        let mut flink = device();
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        motor
            .init_motor(1, &MotorSetup::new(RunMode::FixedSpeed, 100.0, 1000.0, 50))
            .unwrap();
        motor.start(1).unwrap();
        motor.change_soll_speed_while_running(1, 2000.0, 95).unwrap();
        assert_eq!(motor.soll_prescaler(1).unwrap(), 500);
        assert_eq!(motor.raw_acceleration(1).unwrap(), 100);
        assert!(motor.is_motor_running(1).unwrap());
    }

    #[test]
    fn test_reset_steps_global() {
        let mut flink = device();
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        for channel in 0..4 {
            motor
                .init_motor(channel, &MotorSetup::new(RunMode::FixedSpeed, 100.0, 1000.0, 50))
                .unwrap();
            motor.start(channel).unwrap();
        }
        drop(motor);
        for channel in 0..4 {
            flink.bus_mut().advance(channel, 10 + channel);
        }

        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        assert_eq!(motor.steps_have_done(3).unwrap(), 13);
        motor.reset_steps_global().unwrap();
        for channel in 0..4 {
            assert_eq!(motor.steps_have_done(channel).unwrap(), 0);
        }
        drop(motor);
        // the reset pulse does not stick
        let stepper = flink.bus_mut().stepper();
        assert_eq!(flink.bus_mut().word(stepper.id, MOD_CONF_OFFSET), 0);
    }

    #[test]
    fn test_reset_steps_local() {
        let mut flink = device();
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        motor
            .init_motor(2, &MotorSetup::new(RunMode::FixedSpeed, 100.0, 1000.0, 50))
            .unwrap();
        motor.start(2).unwrap();
        motor.init_motor(0, &scenario_setup()).unwrap();
        motor.start(0).unwrap();
        drop(motor);
        flink.bus_mut().advance(0, 7);
        flink.bus_mut().advance(2, 7);

        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        motor.reset_steps_local(2).unwrap();
        assert_eq!(motor.steps_have_done(2).unwrap(), 0);
        assert_eq!(motor.steps_have_done(0).unwrap(), 7);
        let config = motor.local_configuration(2).unwrap();
        assert!(!config.contains(LocalConfig::RESET_STEPS));
        assert!(config.is_running());
    }

    #[test]
    fn test_set_direction_keeps_noise_bits() {
        let mut dummy = DummyFlink::new_default();
        let offset = stepper_regs::channel_offset(Bank::LocalConfig, 4, 0).unwrap();
        let noise = LocalConfig::DIRECTION.bits()
            | LocalConfig::STEP_MODE.bits()
            | LocalConfig::RUN_MODE_1.bits()
            | 1 << 20;
        dummy.set_word(STEPPER_ID, offset, noise);
        let mut flink = Flink::new(dummy);

        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        motor.set_direction(0, Direction::CounterClockwise).unwrap();
        assert_eq!(motor.direction(0).unwrap(), Direction::CounterClockwise);
        assert_eq!(
            motor.local_configuration(0).unwrap().bits(),
            noise & !LocalConfig::DIRECTION.bits()
        );

        motor.set_direction(0, Direction::Clockwise).unwrap();
        assert_eq!(motor.local_configuration(0).unwrap().bits(), noise);
    }

    #[test]
    fn test_reserved_run_mode_never_written() {
        let mut flink = device();
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        assert_eq!(
            motor.set_run_mode_code(0, 3).unwrap_err(),
            Error::InvalidArgument(InvalidArgument::ReservedRunMode)
        );
        drop(motor);
        assert!(flink.bus_mut().writes().is_empty());
    }

    #[test]
    fn test_run_mode_transitions() {
        let mut flink = device();
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        for mode in [
            RunMode::Stepping,
            RunMode::FixedSpeed,
            RunMode::Disabled,
            RunMode::FixedSpeed,
            RunMode::Stepping,
        ] {
            motor.set_run_mode(3, mode).unwrap();
            assert_eq!(motor.run_mode(3).unwrap(), mode);
        }
    }

    #[test]
    fn test_stepping_run_completes() {
        let mut flink = device();
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        motor.init_motor(0, &scenario_setup()).unwrap();
        motor.start(0).unwrap();
        drop(motor);

        flink.bus_mut().advance(0, 150);
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        assert!(motor.is_motor_running(0).unwrap());
        assert_eq!(motor.steps_have_done(0).unwrap(), 150);
        drop(motor);

        flink.bus_mut().advance(0, 150);
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        assert!(!motor.is_motor_running(0).unwrap());
        assert_eq!(motor.steps_have_done(0).unwrap(), 200);

        // a stopped channel can be initialized again
        motor.init_motor(0, &scenario_setup()).unwrap();
    }

    #[test]
    fn test_advance_ignores_missing_channels() {
        let mut flink = device();
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        motor.init_motor(3, &scenario_setup()).unwrap();
        motor.start(3).unwrap();
        drop(motor);

        flink.bus_mut().advance(4, 10);
        flink.bus_mut().advance(u32::MAX, 10);

        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        for channel in 0..4 {
            assert_eq!(motor.steps_have_done(channel).unwrap(), 0);
        }
        assert!(motor.is_motor_running(3).unwrap());
    }

    #[test]
    fn test_auto_stepping() {
        let mut flink = Flink::new(DummyFlink::new(DummyConfig::default().with_stepping(60)));
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        motor.init_motor(1, &scenario_setup()).unwrap();
        assert_eq!(motor.steps_have_done(1).unwrap(), 0);

        motor.start(1).unwrap();
        let mut polls = 0;
        while motor.is_motor_running(1).unwrap() {
            motor.steps_have_done(1).unwrap();
            polls += 1;
        }
        assert_eq!(polls, 4);
        assert_eq!(motor.steps_have_done(1).unwrap(), 200);
    }

    #[test]
    fn test_stop_with_ramp() {
        let mut flink = device();
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        motor
            .init_motor(0, &MotorSetup::new(RunMode::FixedSpeed, 100.0, 1000.0, 50))
            .unwrap();
        motor.start(0).unwrap();
        motor.stop(0, Some(900)).unwrap();
        assert!(!motor.is_motor_running(0).unwrap());
        assert_eq!(motor.raw_acceleration(0).unwrap(), 10);
    }

    #[test]
    fn test_read_only_registers() {
        let mut flink = device();
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        motor.init_motor(0, &scenario_setup()).unwrap();
        let mut port = motor.into_port();
        port.write_reg(BASE_CLOCK_OFFSET, 42).unwrap();
        let steps_done = stepper_regs::channel_offset(Bank::StepsDone, 4, 0).unwrap();
        port.write_reg(steps_done, 42).unwrap();
        assert_eq!(port.read_reg(BASE_CLOCK_OFFSET).unwrap(), 1_000_000);
        assert_eq!(port.read_reg(steps_done).unwrap(), 0);
        // aliases read back as zero
        let set = stepper_regs::channel_offset(Bank::LocalConfigSet, 4, 0).unwrap();
        assert_eq!(port.read_reg(set).unwrap(), 0);
    }

    #[test]
    fn test_subdevice_reset() {
        let mut flink = device();
        let stepper = flink.find_subdevice(FunctionId::StepperMotor, 0).unwrap();
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        motor.init_motor(0, &scenario_setup()).unwrap();
        motor.start(0).unwrap();
        drop(motor);

        flink.reset_subdevice(&stepper).unwrap();
        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        assert!(!motor.is_motor_running(0).unwrap());
        assert_eq!(motor.steps_to_do(0).unwrap(), 0);
        assert_eq!(motor.base_clock(), 1_000_000);
    }

    #[test]
    fn test_select() {
        let mut flink = device();
        let stepper = flink.find_subdevice(FunctionId::StepperMotor, 0).unwrap();
        flink.select_subdevice(&stepper, true).unwrap();
        assert_eq!(flink.bus_mut().selected(), Some((STEPPER_ID, true)));
    }

    #[test]
    fn test_fault_injection() {
        let mut dummy = DummyFlink::new_default();
        let offset = stepper_regs::channel_offset(Bank::SollPrescaler, 4, 0).unwrap();
        dummy.fail_at(STEPPER_ID, offset, -5);
        let mut flink = Flink::new(dummy);

        let mut motor = StepperMotor::open(&mut flink, None).unwrap();
        assert_eq!(
            motor.soll_speed(0).unwrap_err(),
            Error::Transport {
                subdevice: STEPPER_ID,
                offset,
                code: -5
            }
        );
        assert!(motor.start_speed(0).is_ok());
    }

    #[test]
    fn test_partial_write_merges() {
        let mut flink = device();
        let stepper = flink.find_subdevice(FunctionId::StepperMotor, 0).unwrap();
        let mut port = flink.port(stepper);
        let offset = stepper_regs::channel_offset(Bank::StepsToDo, 4, 1).unwrap();
        port.write_reg(offset, 0x1122_3344).unwrap();
        port.write_word(offset, 1, 0xFF).unwrap();
        assert_eq!(port.read_reg(offset).unwrap(), 0x1122_33FF);
    }

    #[test]
    fn test_out_of_range_access() {
        let mut dummy = DummyFlink::new_default();
        let mem_size = dummy.stepper().mem_size;
        let mut buf = [0u8; 4];
        assert_eq!(
            dummy.read(STEPPER_ID, mem_size, &mut buf).unwrap_err(),
            Error::Transport {
                subdevice: STEPPER_ID,
                offset: mem_size,
                code: EINVAL
            }
        );
        assert!(dummy.read(7, 0, &mut buf).is_err());
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[("channels", "2"), ("clock", "50000000"), ("stepping", "5")])
            .unwrap();
        assert_eq!(config.channels, 2);
        assert_eq!(config.base_clock, 50_000_000);
        assert_eq!(config.stepping, 5);

        assert!(parse_options(&[("channels", "0")]).is_err());
        assert!(parse_options(&[("clock", "fast")]).is_err());
    }
}
