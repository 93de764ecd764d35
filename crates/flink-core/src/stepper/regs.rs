//! Stepper motor register map
//!
//! ```text
//! 0x20                      base clock (Hz, read-only)
//! 0x24 + 4 * (bank * n + ch) per-channel banks, n = channel count:
//!   bank 0  local configuration
//!   bank 1  local configuration, write-1-to-set alias
//!   bank 2  local configuration, write-1-to-clear alias
//!   bank 3  start prescaler
//!   bank 4  soll (top) prescaler
//!   bank 5  acceleration
//!   bank 6  steps to do
//!   bank 7  steps done (read-only)
//! ```

use crate::regs::{bank_offset, REGISTER_WIDTH, TOTAL_HEADER_SIZE};

/// Base clock of the stepper controller in Hz
pub const BASE_CLOCK_OFFSET: u32 = TOTAL_HEADER_SIZE;
/// Start of the per-channel register banks
pub const CHANNEL_BANKS_OFFSET: u32 = BASE_CLOCK_OFFSET + REGISTER_WIDTH;

/// Bit in the module configuration register that resets the step
/// counters of all channels
pub const MOD_CONF_GLOBAL_STEP_RESET_BIT: u8 = 1;

/// Per-channel register banks, in memory order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    /// Local configuration register
    LocalConfig = 0,
    /// Write-1-to-set alias of the local configuration register
    LocalConfigSet = 1,
    /// Write-1-to-clear alias of the local configuration register
    LocalConfigReset = 2,
    /// Prescaler of the start speed
    StartPrescaler = 3,
    /// Prescaler of the soll (target) speed
    SollPrescaler = 4,
    /// Raw acceleration
    Acceleration = 5,
    /// Number of steps to take in stepping mode
    StepsToDo = 6,
    /// Number of steps taken since the last reset
    StepsDone = 7,
}

/// Number of per-channel banks
pub const BANK_COUNT: u32 = 8;

/// Offset of the `bank` register of `channel` on a subdevice with `channels` channels
///
/// The channel count comes from the hardware header; `None` means the
/// offset does not fit in 32 bits.
pub const fn channel_offset(bank: Bank, channels: u32, channel: u32) -> Option<u32> {
    let index = match (bank as u32).checked_mul(channels) {
        Some(first) => first.checked_add(channel),
        None => None,
    };
    match index {
        Some(index) => bank_offset(CHANNEL_BANKS_OFFSET, index),
        None => None,
    }
}

/// Memory size needed by a stepper subdevice with `channels` channels
pub const fn mem_size(channels: u32) -> u32 {
    let banks = REGISTER_WIDTH * BANK_COUNT;
    CHANNEL_BANKS_OFFSET.saturating_add(banks.saturating_mul(channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_layout() {
        assert_eq!(BASE_CLOCK_OFFSET, 0x20);
        assert_eq!(channel_offset(Bank::LocalConfig, 4, 0), Some(0x24));
        assert_eq!(channel_offset(Bank::LocalConfig, 4, 3), Some(0x30));
        assert_eq!(channel_offset(Bank::LocalConfigSet, 4, 0), Some(0x34));
        assert_eq!(channel_offset(Bank::StepsDone, 4, 3), Some(0x24 + 4 * 31));
        assert_eq!(mem_size(4), 0x24 + 4 * 32);
    }

    #[test]
    fn test_offset_overflow() {
        assert_eq!(channel_offset(Bank::LocalConfig, 0x2000_0000, 0), Some(0x24));
        assert_eq!(channel_offset(Bank::StepsDone, 0x2000_0000, 0), None);
        assert_eq!(channel_offset(Bank::LocalConfigSet, u32::MAX, 1), None);
        assert_eq!(mem_size(u32::MAX), u32::MAX);
    }
}
