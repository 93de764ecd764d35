//! Register layout shared by all flink subdevices
//!
//! Every subdevice starts with a 16-byte header followed by a 16-byte
//! sub-header. Function-specific registers follow at [`TOTAL_HEADER_SIZE`].
//! All registers are 32-bit little-endian words.

/// Register width in bytes
pub const REGISTER_WIDTH: u32 = 4;
/// Register width in bits
pub const REGISTER_WIDTH_BIT: u32 = REGISTER_WIDTH * 8;
/// Size of the common header in bytes
pub const HEADER_SIZE: u32 = 16;
/// Size of the sub-header in bytes
pub const SUBHEADER_SIZE: u32 = 16;
/// Offset of the first function-specific register
pub const TOTAL_HEADER_SIZE: u32 = HEADER_SIZE + SUBHEADER_SIZE;

/// Type word: function id (31..16), subtype (15..8), interface version (7..0)
pub const TYPE_OFFSET: u32 = 0x00;
/// Memory size of the subdevice in bytes
pub const SIZE_OFFSET: u32 = 0x04;
/// Number of channels
pub const CHANNEL_OFFSET: u32 = 0x08;
/// Unique id assigned at synthesis time
pub const UNIQUE_ID_OFFSET: u32 = 0x0C;
/// Module status register
pub const MOD_STATUS_OFFSET: u32 = 0x10;
/// Module configuration register
pub const MOD_CONF_OFFSET: u32 = 0x14;

/// Bit in the module configuration register that pulses a subdevice reset
pub const MOD_CONF_RESET_BIT: u8 = 0;

/// Mask selecting the function id out of the upper half of the type word
pub const INTERFACE_TYPE_MASK: u32 = 0xFFFF;

/// Byte offset of the register at `index` within a bank of per-channel registers
///
/// Returns `None` if the offset does not fit in 32 bits.
pub const fn bank_offset(bank_start: u32, index: u32) -> Option<u32> {
    match REGISTER_WIDTH.checked_mul(index) {
        Some(delta) => bank_start.checked_add(delta),
        None => None,
    }
}
